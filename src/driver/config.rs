use std::time::Duration;

use crate::{driver::delay::DelayRange, worker::signal::ShutdownSignal};

/// Configuration for the driver loop
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum number of attempts before the run ends.
    pub max_attempts: u32,

    /// Jobs enqueued at the start of every attempt.
    pub batch_size: usize,

    /// Range the pre-signal delay is drawn from.
    pub delay: DelayRange,

    /// How long to wait for the worker to exit after signalling it.
    /// A worker still running after this is force-killed.
    pub exit_timeout: Duration,

    /// Pause after the first launch so the worker can connect and fill its pool.
    pub startup_delay: Duration,

    /// Pause after each restart.
    pub restart_delay: Duration,

    /// Shutdown signal sent at the end of each delay.
    pub signal: ShutdownSignal,

    /// End the run after the first attempt that observed the defect.
    pub stop_on_defect: bool,
}

impl DriverConfig {
    /// Create a new configuration with the reproduction defaults
    ///
    /// # Arguments
    /// * `max_attempts` - Attempt budget for the run
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            batch_size: 16,
            delay: DelayRange::default(), // 1-4 seconds
            exit_timeout: Duration::from_secs(10),
            startup_delay: Duration::from_secs(3),
            restart_delay: Duration::from_secs(2),
            signal: ShutdownSignal::Cold,
            stop_on_defect: false,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new(50)
    }
}
