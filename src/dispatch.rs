use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use crate::aggregate::Aggregator;
use crate::config::{Mode, RunConfig};
use crate::error::Result;
use crate::pool::ConnectionPool;
use crate::request::{self, InvocationState, RequestOutcome};

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Requests issued and settled.
    pub issued: u64,
    /// Settled requests that answered 200.
    pub succeeded: u64,
    /// Settled requests per index: slot within a round (timer) or worker id (client).
    pub settled_by_index: BTreeMap<u64, u64>,
    /// Wall time from the first dispatch to the last completion.
    pub elapsed: Duration,
}

impl RunSummary {
    fn settle(&mut self, outcome: &RequestOutcome) {
        self.issued += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        }
        *self.settled_by_index.entry(outcome.index).or_insert(0) += 1;
    }

    fn merge(&mut self, other: RunSummary) {
        self.issued += other.issued;
        self.succeeded += other.succeeded;
        for (index, settled) in other.settled_by_index {
            *self.settled_by_index.entry(index).or_insert(0) += settled;
        }
    }
}

pub struct Dispatcher {
    config: Arc<RunConfig>,
    pool: Arc<ConnectionPool>,
    aggregator: Arc<Aggregator>,
}

impl Dispatcher {
    pub fn new(config: RunConfig, pool: ConnectionPool, aggregator: Arc<Aggregator>) -> Self {
        Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
            aggregator,
        }
    }

    /// Runs the configured discipline and returns once every request has settled.
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();

        let mut summary = match self.config.mode {
            Mode::Timer => self.run_timer().await?,
            Mode::Client => self.run_clients().await?,
        };

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    // =========================================================================
    // Timer mode
    // =========================================================================

    /// Fires a burst every `delay` without waiting for earlier bursts.
    async fn run_timer(&self) -> Result<RunSummary> {
        let mut in_flight = JoinSet::new();

        for iteration in 0..self.config.iterations {
            info!(
                "Iteration {}: generating {} requests",
                iteration + 1,
                self.config.requests_per_iteration
            );

            for index in 0..self.config.requests_per_iteration {
                let client = self.pool.acquire().clone();
                let url = self.config.url.clone();
                let aggregator = Arc::clone(&self.aggregator);
                let invocation = InvocationState::start(iteration, index);

                in_flight.spawn(async move {
                    request::execute(&client, &url, invocation, &aggregator).await
                });
            }

            sleep(self.config.delay).await;
        }

        // Drain everything before surfacing a failed task.
        let mut summary = RunSummary::default();
        let mut failure: Option<JoinError> = None;
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(outcome) => summary.settle(&outcome),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(summary),
        }
    }

    // =========================================================================
    // Client mode
    // =========================================================================

    /// Spawns one sequential worker per configured request slot.
    async fn run_clients(&self) -> Result<RunSummary> {
        let workers: Vec<_> = (0..self.config.requests_per_iteration)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    self.config.iterations,
                    self.config.delay,
                    self.config.url.clone(),
                    Arc::clone(&self.pool),
                    Arc::clone(&self.aggregator),
                ))
            })
            .collect();

        let mut summary = RunSummary::default();
        let mut failure: Option<JoinError> = None;
        for joined in futures_util::future::join_all(workers).await {
            match joined {
                Ok(tally) => summary.merge(tally),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(summary),
        }
    }
}

async fn run_worker(
    worker: u64,
    steps: u64,
    delay: Duration,
    url: Url,
    pool: Arc<ConnectionPool>,
    aggregator: Arc<Aggregator>,
) -> RunSummary {
    debug!("Worker {} starting {} steps", worker, steps);

    let mut tally = RunSummary::default();

    for step in 0..steps {
        let invocation = InvocationState::start(step, worker);
        let outcome = request::execute(pool.acquire(), &url, invocation, &aggregator).await;

        tally.settle(&outcome);
        debug!(
            "Worker {} step {}: {} in {}ms",
            worker,
            step,
            outcome.status,
            outcome.elapsed.as_millis()
        );

        sleep(delay).await;
    }

    debug!("Worker {} finished after {} requests", worker, tally.issued);
    tally
}
