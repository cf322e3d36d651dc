//! Process startup: logging, broker connection, and driver assembly for each run mode.

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    driver::Driver,
    error::Error,
    model::report::RunReport,
    pool::{SimulatedBroker, SimulatedLauncher},
    queue::JobQueue,
    worker::ProcessLauncher,
};

/// Install the global tracing subscriber
///
/// Honors `RUST_LOG`, defaulting to `info`. Calling this more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Connect to the Redis broker the worker consumes from
pub async fn connect_to_broker(config: &Config) -> Result<fred::prelude::Pool, Error> {
    use fred::prelude::*;

    let redis_config = Config::from_url(&config.broker_url)?;
    let pool = Pool::new(redis_config, None, None, None, 6)?;

    pool.connect();
    pool.wait_for_connect().await?;

    Ok(pool)
}

/// Run the reproduction loop against the external worker
pub async fn run_celery(config: &Config) -> Result<RunReport, Error> {
    let pool = connect_to_broker(config).await?;
    info!("Connected to broker at {}", config.broker_url);

    let queue = JobQueue::with_config(pool, config.queue_config());
    let launcher = ProcessLauncher::new(config.worker_command(), config.defect_pattern.clone());
    info!("Worker command: {}", launcher.command().display_line());

    let mut driver = Driver::new(config.driver_config()?, launcher, queue, config.job());
    driver.run().await
}

/// Run the reproduction loop against the in-process pool model
pub async fn run_simulated(config: &Config) -> Result<RunReport, Error> {
    let broker = SimulatedBroker::new();
    let launcher = SimulatedLauncher::new(config.pool_config(), broker.clone());
    info!(
        "Running against simulated pool (concurrency={})",
        config.concurrency
    );

    let mut driver = Driver::new(config.driver_config()?, launcher, broker, config.job());
    driver.run().await
}
