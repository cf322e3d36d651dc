//! Worker process control.
//!
//! The driver only ever talks to a worker through [`WorkerLauncher`] and [`WorkerHandle`].
//! [`process::ProcessLauncher`] implements them for a real OS process (the external Celery
//! worker); [`crate::pool::SimulatedLauncher`] implements them for the in-process pool model.

pub mod command;
pub mod monitor;
pub mod process;
pub mod signal;

use std::{fmt, os::unix::process::ExitStatusExt, process::ExitStatus, time::Duration};

pub use command::WorkerCommand;
pub use process::{ProcessLauncher, WorkerProcess};
pub use signal::ShutdownSignal;

use crate::error::Error;

/// How a worker ended.
///
/// Mirrors a Unix wait status: either the worker exited with a code, or it was terminated by
/// a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    code: Option<i32>,
    signal: Option<i32>,
}

impl WorkerExit {
    /// Worker exited normally with `code`.
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Worker was terminated by signal number `signal`.
    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exit code, if the worker exited normally.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Terminating signal, if the worker was killed by one.
    pub fn signal(&self) -> Option<i32> {
        self.signal
    }

    /// True only for a normal exit with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::exited(code),
            (None, Some(signal)) => Self::signaled(signal),
            // Neither set only happens for stopped/continued statuses, which wait() never returns
            (None, None) => Self::exited(-1),
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "killed by signal {}", signal),
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

/// A running worker the driver can signal, wait on, and kill.
#[allow(async_fn_in_trait)]
pub trait WorkerHandle {
    /// OS process id, if the worker is a real process.
    fn pid(&self) -> Option<u32>;

    /// Delivers a shutdown signal without waiting for the worker to react.
    ///
    /// # Returns
    /// - `Ok(true)` - Signal was delivered (the worker may still choose to ignore it)
    /// - `Ok(false)` - Worker had already exited, nothing was sent
    async fn signal(&mut self, signal: ShutdownSignal) -> Result<bool, Error>;

    /// Waits at most `timeout` for the worker to exit.
    ///
    /// # Returns
    /// - `Ok(Some(exit))` - Worker exited within the timeout
    /// - `Ok(None)` - Worker is still running after the timeout
    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<WorkerExit>, Error>;

    /// Non-blocking exit check.
    fn try_exit(&mut self) -> Result<Option<WorkerExit>, Error>;

    /// Force-kills the worker and reaps it.
    async fn kill(&mut self) -> Result<WorkerExit, Error>;

    /// Requests a warm shutdown and waits for the worker to exit.
    async fn terminate(&mut self) -> Result<WorkerExit, Error>;

    /// Returns whether the defect signature was observed since the last call, clearing it.
    fn take_defect(&mut self) -> bool;
}

/// Starts workers.
#[allow(async_fn_in_trait)]
pub trait WorkerLauncher {
    /// Handle type of the launched worker.
    type Handle: WorkerHandle;

    /// Launches a new worker. Failure to start is not retried.
    async fn launch(&self) -> Result<Self::Handle, Error>;
}
