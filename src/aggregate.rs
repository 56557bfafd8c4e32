use hdrhistogram::Histogram;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::Result;

/// Highest latency tracked by the distribution histogram (one hour, in µs).
const HISTOGRAM_MAX_US: u64 = 3_600_000_000;

/// Everything recorded about a run. Append-only while requests are in
/// flight: counters only grow and latencies are only pushed.
#[derive(Debug, Clone)]
pub struct AggregateState {
    /// `X-server` identity -> responses served.
    pub servers: BTreeMap<String, u64>,
    /// Status code -> responses. `0` is a transport failure or timeout.
    pub statuses: BTreeMap<u16, u64>,
    pub latencies_ms: Vec<f64>,
    pub total_elapsed: Duration,
    pub total_requests: u64,
    /// Latency distribution in microseconds.
    pub histogram: Histogram<u64>,
}

impl AggregateState {
    fn new() -> Result<Self> {
        Ok(Self {
            servers: BTreeMap::new(),
            statuses: BTreeMap::new(),
            latencies_ms: Vec::new(),
            total_elapsed: Duration::ZERO,
            total_requests: 0,
            histogram: Histogram::new_with_bounds(1, HISTOGRAM_MAX_US, 3)?,
        })
    }

    pub fn status_total(&self) -> u64 {
        self.statuses.values().sum()
    }

    pub fn count_for(&self, status: u16) -> u64 {
        self.statuses.get(&status).copied().unwrap_or(0)
    }
}

/// Concurrency-safe sink for request outcomes.
pub struct Aggregator {
    state: Mutex<AggregateState>,
    timeout_notices: AtomicU64,
    failure_notices: AtomicU64,
}

impl Aggregator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            state: Mutex::new(AggregateState::new()?),
            timeout_notices: AtomicU64::new(0),
            failure_notices: AtomicU64::new(0),
        })
    }

    /// Records one completed request. The lock covers only the in-memory update.
    pub async fn record(&self, status: u16, server: Option<&str>, elapsed: Duration) {
        let latency_ms = elapsed.as_secs_f64() * 1000.0;
        let latency_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);

        let mut state = self.state.lock().await;
        if let Some(server) = server {
            *state.servers.entry(server.to_string()).or_insert(0) += 1;
        }
        *state.statuses.entry(status).or_insert(0) += 1;
        state.latencies_ms.push(latency_ms);
        state.histogram.saturating_record(latency_us.max(1));
        state.total_requests += 1;
        state.total_elapsed += elapsed;
    }

    pub fn note_timeout(&self) {
        self.timeout_notices.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_failure(&self) {
        self.failure_notices.fetch_add(1, Ordering::Relaxed);
    }

    /// Timeout/transport notices emitted so far.
    pub fn timeout_notices(&self) -> u64 {
        self.timeout_notices.load(Ordering::Relaxed)
    }

    /// Non-200 diagnostics emitted so far.
    pub fn failure_notices(&self) -> u64 {
        self.failure_notices.load(Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> AggregateState {
        self.state.lock().await.clone()
    }
}
