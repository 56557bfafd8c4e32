use anyhow::{Context, Result};
use clap::Parser;
use http_benchmark::{
    Aggregator, Cli, ConnectionPool, Dispatcher, Error, Report, ReportFormat, RunConfig,
    POOL_SIZE,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RunConfig::try_from(&cli).context("Invalid arguments")?;

    // Print banner
    info!("════════════════════════════════════════════════════════════");
    info!("                  HTTP LOAD BENCHMARK");
    info!("════════════════════════════════════════════════════════════");
    info!("Mode: {:?}", config.mode);
    info!("URL: {}", config.url);
    info!("Iterations: {}", config.iterations);
    info!("Requests per iteration: {}", config.requests_per_iteration);
    info!("Delay: {}ms", config.delay.as_millis());
    match config.timeout {
        Some(timeout) => info!("Request timeout: {}s", timeout.as_secs()),
        None => info!("Request timeout: disabled"),
    }
    info!("Connection pool: {} clients ({:?})", POOL_SIZE, config.pool_strategy);
    info!("════════════════════════════════════════════════════════════");

    let pool = ConnectionPool::new(POOL_SIZE, config.timeout, config.pool_strategy)
        .context("Failed to build connection pool")?;
    let aggregator = Arc::new(Aggregator::new()?);

    let dispatcher = Dispatcher::new(config.clone(), pool, Arc::clone(&aggregator));
    let summary = dispatcher.run().await?;

    info!(
        "All {} requests settled in {:.2}s ({} timeouts, {} non-200 responses)",
        summary.issued,
        summary.elapsed.as_secs_f64(),
        aggregator.timeout_notices(),
        aggregator.failure_notices()
    );

    let state = aggregator.snapshot().await;
    let report = match Report::build(&config, &summary, &state) {
        Ok(report) => report,
        Err(Error::NoData) => {
            warn!("No data: no requests were recorded, nothing to report");
            return Ok(());
        }
        Err(e) => return Err(e).context("Cannot report on this run"),
    };

    match cli.format {
        ReportFormat::Text => println!("{}", report),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}
