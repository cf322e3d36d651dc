//! Worker process error types.
//!
//! These errors occur while launching or controlling the external worker process. A failure to
//! start the worker is not recovered from; it propagates out of the driver and ends the run.

use nix::errno::Errno;
use thiserror::Error;

/// Worker process error type.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The worker process could not be started.
    ///
    /// Usually the configured interpreter is not on `PATH` or the working directory does not
    /// exist.
    #[error("Failed to start worker process `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error from the OS.
        source: std::io::Error,
    },

    /// The worker process was spawned but reported no process id.
    ///
    /// Only happens if the child was reaped before its id was read, which indicates a bug in
    /// the launcher.
    #[error("Worker process has no pid (already reaped)")]
    MissingPid,

    /// Delivering a signal to the worker process failed.
    #[error("Failed to send {signal} to worker pid {pid}: {source}")]
    Signal {
        /// Target process id.
        pid: u32,
        /// Name of the signal that was being sent.
        signal: &'static str,
        /// Errno returned by `kill(2)`.
        source: Errno,
    },

    /// Waiting on, or force-killing, the worker process failed.
    #[error("Failed to wait for worker process: {0}")]
    Wait(#[source] std::io::Error),
}
