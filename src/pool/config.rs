use std::time::Duration;

/// Delays injected at each child transition.
///
/// With fixed timings and a paused clock the simulated race is fully deterministic: a cold
/// shutdown landing inside `spawn_delay` of a recycle always faults, one landing anywhere else
/// never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTimings {
    /// Time a child spends in `Spawning` before its sentinel exists.
    pub spawn_delay: Duration,
    /// Time a child spends executing one job.
    pub job_delay: Duration,
    /// Time a child spends in `Draining` after hitting its task limit.
    pub recycle_delay: Duration,
}

impl Default for PoolTimings {
    fn default() -> Self {
        Self {
            spawn_delay: Duration::from_millis(50),
            job_delay: Duration::from_millis(20),
            recycle_delay: Duration::from_millis(10),
        }
    }
}

/// How the simulated worker reacts to shutdown signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalHandling {
    /// Cold and warm shutdown behave as documented on [`super::SimulatedWorker`].
    Obey,
    /// Signals are ignored; only a kill stops the worker.
    Ignore,
}

/// Configuration for a simulated prefork pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of child slots kept populated.
    pub concurrency: usize,
    /// Jobs a child runs before it is retired and replaced.
    pub max_tasks_per_child: u32,
    pub timings: PoolTimings,
    pub signal_handling: SignalHandling,
}

impl PoolConfig {
    /// Create a configuration matching the reproduction flags (one task per child)
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            max_tasks_per_child: 1,
            timings: PoolTimings::default(),
            signal_handling: SignalHandling::Obey,
        }
    }

    pub fn with_timings(mut self, timings: PoolTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn ignoring_signals(mut self) -> Self {
        self.signal_handling = SignalHandling::Ignore;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(8)
    }
}
