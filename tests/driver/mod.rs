mod simulated;
mod subprocess;

use std::time::Duration;

use churn_repro::{
    driver::{DelayRange, DriverConfig},
    pool::PoolTimings,
};

/// Driver configuration with no startup or restart pauses and a fixed pre-signal delay.
pub fn quick_config(max_attempts: u32, delay: Duration) -> DriverConfig {
    DriverConfig {
        delay: DelayRange::fixed(delay),
        exit_timeout: Duration::from_secs(1),
        startup_delay: Duration::ZERO,
        restart_delay: Duration::ZERO,
        ..DriverConfig::new(max_attempts)
    }
}

/// Pool timings where a child spawns for 100ms, runs its job for 50ms, and is replaced
/// immediately, so the slot is back in `Spawning` from 150ms to 250ms after launch.
pub fn race_timings() -> PoolTimings {
    PoolTimings {
        spawn_delay: Duration::from_millis(100),
        job_delay: Duration::from_millis(50),
        recycle_delay: Duration::ZERO,
    }
}
