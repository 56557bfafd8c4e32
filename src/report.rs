use serde::Serialize;
use std::fmt;

use crate::aggregate::AggregateState;
use crate::config::{Mode, RunConfig};
use crate::dispatch::RunSummary;
use crate::error::{Error, Result};
use crate::percentile::LatencyStats;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub mode: Mode,
    pub url: String,
    pub iterations: u64,
    pub requests_per_iteration: u64,
    pub delay_ms: u64,
    pub timeout_secs: Option<u64>,
    pub duration_ms: f64,
    pub total_requests: u64,
    pub throughput_rps: f64,
    pub cumulative_request_ms: f64,
    pub latency: LatencyStats,
    pub statuses: Vec<StatusCount>,
    pub servers: Vec<ServerCount>,
    pub distribution: Vec<LatencyBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: u16,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerCount {
    pub server: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyBucket {
    /// Inclusive upper bound of the bucket.
    pub up_to_ms: f64,
    pub count: u64,
}

impl Report {
    /// Fails with [`Error::NoData`] when nothing was recorded.
    pub fn build(
        config: &RunConfig,
        summary: &RunSummary,
        state: &AggregateState,
    ) -> Result<Self> {
        if state.latencies_ms.is_empty() || state.total_requests == 0 {
            return Err(Error::NoData);
        }

        let latency = LatencyStats::from_values(&state.latencies_ms)?;

        let seconds = summary.elapsed.as_secs_f64();
        let throughput_rps = if seconds > 0.0 {
            state.total_requests as f64 / seconds
        } else {
            0.0
        };

        let distribution = state
            .histogram
            .iter_log(1_000, 2.0)
            .filter(|v| v.count_since_last_iteration() > 0)
            .map(|v| LatencyBucket {
                up_to_ms: v.value_iterated_to() as f64 / 1000.0,
                count: v.count_since_last_iteration(),
            })
            .collect();

        Ok(Self {
            mode: config.mode,
            url: config.url.to_string(),
            iterations: config.iterations,
            requests_per_iteration: config.requests_per_iteration,
            delay_ms: config.delay.as_millis() as u64,
            timeout_secs: config.timeout.map(|t| t.as_secs()),
            duration_ms: summary.elapsed.as_secs_f64() * 1000.0,
            total_requests: state.total_requests,
            throughput_rps,
            cumulative_request_ms: state.total_elapsed.as_secs_f64() * 1000.0,
            latency,
            statuses: state
                .statuses
                .iter()
                .map(|(&status, &count)| StatusCount { status, count })
                .collect(),
            servers: state
                .servers
                .iter()
                .map(|(server, &count)| ServerCount {
                    server: server.clone(),
                    count,
                })
                .collect(),
            distribution,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(sonic_rs::to_string_pretty(self)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Timer => "timer",
            Mode::Client => "client",
        };
        let timeout = match self.timeout_secs {
            Some(secs) => format!("{}s", secs),
            None => "none".to_string(),
        };

        writeln!(f, "════════════════════════════════════════════════════════════")?;
        writeln!(f, "                    BENCHMARK SUMMARY")?;
        writeln!(f, "════════════════════════════════════════════════════════════")?;
        writeln!(f, "Mode:                 {}", mode)?;
        writeln!(f, "URL:                  {}", self.url)?;
        writeln!(f, "Iterations:           {}", self.iterations)?;
        writeln!(f, "Requests/iteration:   {}", self.requests_per_iteration)?;
        writeln!(f, "Delay:                {}ms", self.delay_ms)?;
        writeln!(f, "Timeout:              {}", timeout)?;
        writeln!(f)?;
        writeln!(f, "Total Duration:       {:.2}ms", self.duration_ms)?;
        writeln!(f, "Total Requests:       {}", self.total_requests)?;
        writeln!(f, "Throughput:           {:.2} req/s", self.throughput_rps)?;
        writeln!(f, "Cumulative Time:      {:.2}ms", self.cumulative_request_ms)?;
        writeln!(f)?;
        writeln!(f, "Latency (ms):")?;
        writeln!(f, "  Min:    {:.2}", self.latency.min_ms)?;
        writeln!(f, "  Avg:    {:.2}", self.latency.avg_ms)?;
        writeln!(f, "  p50:    {:.2}", self.latency.p50_ms)?;
        writeln!(f, "  p95:    {:.2}", self.latency.p95_ms)?;
        writeln!(f, "  p99:    {:.2}", self.latency.p99_ms)?;
        writeln!(f, "  Max:    {:.2}", self.latency.max_ms)?;
        writeln!(f)?;
        writeln!(f, "Status Codes:")?;
        for entry in &self.statuses {
            let label = if entry.status == 0 {
                "timeout".to_string()
            } else {
                entry.status.to_string()
            };
            writeln!(f, "  {:<8} {}", label, entry.count)?;
        }
        writeln!(f)?;
        writeln!(f, "Servers:")?;
        if self.servers.is_empty() {
            writeln!(f, "  (no X-server header seen)")?;
        }
        for entry in &self.servers {
            writeln!(f, "  {}: {}", entry.server, entry.count)?;
        }
        writeln!(f)?;
        writeln!(f, "Latency Distribution:")?;
        for bucket in &self.distribution {
            writeln!(f, "  <= {:>10.1}ms  {}", bucket.up_to_ms, bucket.count)?;
        }
        write!(f, "═══════════════════════════════════════════════════════════")
    }
}
