use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::pool::PoolStrategy;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Command Line
// =============================================================================

#[derive(Parser, Debug, Clone)]
#[command(name = "http-benchmark")]
#[command(about = "Concurrent HTTP load generator and latency benchmark", long_about = None)]
pub struct Cli {
    /// Dispatch mode: `timer` fires fixed bursts, `client` runs sequential workers
    #[arg(value_enum)]
    pub mode: Mode,

    /// Target URL (GET)
    pub url: String,

    /// Dispatch rounds (timer) or steps per worker (client)
    pub iterations: u64,

    /// Requests per round (timer) or worker count (client)
    pub requests_per_iteration: u64,

    /// Delay between rounds or steps in milliseconds
    #[arg(default_value = "0")]
    pub delay_ms: u64,

    /// Per-request timeout in seconds (0 disables the timeout)
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// How requests are spread across the connection pool
    #[arg(long, env = "POOL_STRATEGY", value_enum, default_value = "random")]
    pub pool_strategy: PoolStrategy,

    /// Report output format
    #[arg(long, env = "REPORT_FORMAT", value_enum, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Sequential worker loops
    Client,
    /// Fixed-rate bursts
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

// =============================================================================
// Run Configuration
// =============================================================================

/// Validated, immutable settings for a single load test.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: Url,
    pub mode: Mode,
    pub iterations: u64,
    pub requests_per_iteration: u64,
    pub delay: Duration,
    /// `None` waits on every request indefinitely.
    pub timeout: Option<Duration>,
    pub pool_strategy: PoolStrategy,
}

impl RunConfig {
    pub fn new(
        mode: Mode,
        url: &str,
        iterations: u64,
        requests_per_iteration: u64,
    ) -> Result<Self> {
        Ok(Self {
            url: parse_target(url)?,
            mode,
            iterations,
            requests_per_iteration,
            delay: Duration::ZERO,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            pool_strategy: PoolStrategy::Random,
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_pool_strategy(mut self, strategy: PoolStrategy) -> Self {
        self.pool_strategy = strategy;
        self
    }

    /// Upper bound of requests this configuration issues.
    pub fn expected_requests(&self) -> u64 {
        self.iterations.saturating_mul(self.requests_per_iteration)
    }
}

impl TryFrom<&Cli> for RunConfig {
    type Error = Error;

    fn try_from(cli: &Cli) -> Result<Self> {
        let timeout = match cli.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(
            RunConfig::new(cli.mode, &cli.url, cli.iterations, cli.requests_per_iteration)?
                .with_delay(Duration::from_millis(cli.delay_ms))
                .with_timeout(timeout)
                .with_pool_strategy(cli.pool_strategy),
        )
    }
}

fn parse_target(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_argument_list() {
        let cli = Cli::try_parse_from([
            "http-benchmark",
            "timer",
            "http://localhost:8080/health",
            "3",
            "5",
            "250",
        ])
        .unwrap();

        let config = RunConfig::try_from(&cli).unwrap();
        assert_eq!(config.mode, Mode::Timer);
        assert_eq!(config.iterations, 3);
        assert_eq!(config.requests_per_iteration, 5);
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.expected_requests(), 15);
        assert_eq!(cli.format, ReportFormat::Text);
    }

    #[test]
    fn test_delay_defaults_to_zero() {
        let cli =
            Cli::try_parse_from(["http-benchmark", "client", "http://localhost/", "4", "2"])
                .unwrap();

        let config = RunConfig::try_from(&cli).unwrap();
        assert_eq!(config.mode, Mode::Client);
        assert_eq!(config.delay, Duration::ZERO);
    }

    #[test]
    fn test_wrong_argument_count_is_rejected() {
        assert!(Cli::try_parse_from(["http-benchmark", "timer", "http://localhost/"]).is_err());
        assert!(Cli::try_parse_from([
            "http-benchmark",
            "timer",
            "http://localhost/",
            "1",
            "1",
            "0",
            "extra",
        ])
        .is_err());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(
            Cli::try_parse_from(["http-benchmark", "burst", "http://localhost/", "1", "1"])
                .is_err()
        );
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let cli = Cli::try_parse_from([
            "http-benchmark",
            "timer",
            "http://localhost/",
            "1",
            "1",
            "--timeout-secs",
            "0",
        ])
        .unwrap();

        assert_eq!(RunConfig::try_from(&cli).unwrap().timeout, None);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(matches!(
            RunConfig::new(Mode::Timer, "not a url", 1, 1),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(
            RunConfig::new(Mode::Timer, "ftp://example.com/file", 1, 1),
            Err(Error::InvalidUrl { .. })
        ));
    }
}
