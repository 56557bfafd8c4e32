//! Concurrent HTTP load generation with latency and backend distribution
//! reporting.
//!
//! Requests are dispatched in one of two disciplines (see [`config::Mode`]),
//! spread over a pool of independent clients, and recorded into a shared
//! [`aggregate::Aggregator`]. Once every request has settled the aggregate is
//! turned into a [`report::Report`].

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod percentile;
pub mod pool;
pub mod report;
pub mod request;

pub use aggregate::{AggregateState, Aggregator};
pub use config::{Cli, Mode, ReportFormat, RunConfig};
pub use dispatch::{Dispatcher, RunSummary};
pub use error::{Error, Result};
pub use percentile::{percentile, LatencyStats};
pub use pool::{ConnectionPool, PoolStrategy, POOL_SIZE};
pub use report::Report;
pub use request::{InvocationState, RequestOutcome};
