use hyper::ext::ReasonPhrase;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::aggregate::Aggregator;

/// Header whose first value names the backend that served the request.
pub const SERVER_HEADER: &str = "X-server";

/// Status recorded when no response was obtained.
pub const STATUS_NO_RESPONSE: u16 = 0;

/// Identity of one issued request.
#[derive(Debug, Clone, Copy)]
pub struct InvocationState {
    pub iteration: u64,
    /// Position within the round (timer) or worker id (client).
    pub index: u64,
    pub start: Instant,
}

impl InvocationState {
    pub fn start(iteration: u64, index: u64) -> Self {
        Self {
            iteration,
            index,
            start: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub iteration: u64,
    pub index: u64,
    pub start: Instant,
    pub elapsed: Duration,
    pub status: u16,
    pub server: Option<String>,
    /// Reason phrase from the status line, non-200 responses only.
    pub reason: Option<String>,
    /// Only read for non-200 responses.
    pub body: Option<String>,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Issues a GET and runs the completion handler on its result.
pub async fn execute(
    client: &Client,
    url: &Url,
    invocation: InvocationState,
    aggregator: &Aggregator,
) -> RequestOutcome {
    let result = client.get(url.clone()).send().await;
    complete(invocation, result, aggregator).await
}

/// Records a finished request and emits at most one diagnostic line.
pub async fn complete(
    invocation: InvocationState,
    result: reqwest::Result<Response>,
    aggregator: &Aggregator,
) -> RequestOutcome {
    let elapsed = invocation.start.elapsed();

    let response = match result {
        Ok(response) => Some(response),
        Err(e) => {
            debug!(
                "{}.{}: transport error (timeout={}, connect={}): {}",
                invocation.iteration,
                invocation.index,
                e.is_timeout(),
                e.is_connect(),
                e
            );
            None
        }
    };

    let status = response
        .as_ref()
        .map_or(STATUS_NO_RESPONSE, |r| r.status().as_u16());
    let server = response.as_ref().and_then(server_identity);

    aggregator.record(status, server.as_deref(), elapsed).await;

    let mut outcome = RequestOutcome {
        iteration: invocation.iteration,
        index: invocation.index,
        start: invocation.start,
        elapsed,
        status,
        server,
        reason: None,
        body: None,
    };

    let Some(response) = response else {
        aggregator.note_timeout();
        warn!(
            "{}.{}: {}ms: request timed out",
            outcome.iteration,
            outcome.index,
            elapsed.as_millis()
        );
        return outcome;
    };

    if outcome.is_success() {
        return outcome;
    }

    let reason = reason_phrase(&response);
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));

    aggregator.note_failure();
    warn!(
        "{}.{}: {}ms: {} {} {}",
        outcome.iteration,
        outcome.index,
        elapsed.as_millis(),
        body,
        status,
        reason
    );

    outcome.reason = Some(reason);
    outcome.body = Some(body);
    outcome
}

/// The phrase the server sent on the status line. hyper only keeps it when it
/// differs from the canonical one.
fn reason_phrase(response: &Response) -> String {
    match response.extensions().get::<ReasonPhrase>() {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    }
}

fn server_identity(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SERVER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
