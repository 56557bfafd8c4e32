use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid target url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no latency data recorded; nothing to report")]
    NoData,

    #[error("percentile {0} is outside [0, 1]")]
    InvalidPercentile(f64),

    #[error("failed to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to encode report: {0}")]
    Json(#[from] sonic_rs::Error),

    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
