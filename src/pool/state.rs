//! Pool and child lifecycle states.

use std::fmt;

/// Lifecycle of the pool as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Launched, no child has finished spawning yet.
    Starting,
    /// At least one child is serving jobs.
    Running,
    /// A shutdown signal was received.
    Draining,
    /// All children are gone and the worker has exited.
    Exited,
}

/// Lifecycle of one child process.
///
/// A child only owns a sentinel from `Running` until it has exited. Tearing down the pool
/// while a child is still `Spawning` means polling a sentinel that does not exist yet, which
/// is the defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Spawning,
    Running,
    Draining,
    Exited,
}

/// Handle the pool polls to learn that a child has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinel(pub u64);

/// One slot of the pool and the child currently occupying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSlot {
    pub index: usize,
    pub child_id: u64,
    pub state: ChildState,
    pub sentinel: Option<Sentinel>,
    pub tasks_done: u32,
}

impl ChildSlot {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            child_id: 0,
            state: ChildState::Exited,
            sentinel: None,
            tasks_done: 0,
        }
    }

    /// Polls the child's sentinel during teardown.
    ///
    /// Exited slots are skipped. A live child without a sentinel faults.
    pub fn poll_sentinel(&self) -> Result<(), PoolFault> {
        match (self.state, self.sentinel) {
            (ChildState::Exited, _) | (_, Some(_)) => Ok(()),
            (state, None) => Err(PoolFault::MissingSentinel {
                child_id: self.child_id,
                state,
            }),
        }
    }
}

/// Failures raised inside the simulated pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolFault {
    /// Teardown polled a child that had not finished spawning.
    MissingSentinel { child_id: u64, state: ChildState },
}

impl fmt::Display for PoolFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSentinel { child_id, state } => write!(
                f,
                "AttributeError: 'ForkProcess' object has no attribute '_sentinel_poll' (child {} in {:?})",
                child_id, state
            ),
        }
    }
}

/// Point-in-time view of a simulated pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub state: PoolState,
    pub children: Vec<ChildSlot>,
    pub faults: Vec<PoolFault>,
    pub jobs_completed: u64,
    pub children_spawned: u64,
}
