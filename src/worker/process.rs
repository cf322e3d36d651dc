//! Real OS worker processes.

use std::time::Duration;

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use tokio::process::Child;
use tracing::debug;

use crate::{
    error::{worker::WorkerError, Error},
    worker::{
        command::WorkerCommand,
        monitor::{OutputMonitor, Stream},
        signal::ShutdownSignal,
        WorkerExit, WorkerHandle, WorkerLauncher,
    },
};

/// How long to keep draining piped output after the worker has been reaped.
const OUTPUT_SETTLE_TIMEOUT: Duration = Duration::from_millis(500);

/// A running worker process with its output being forwarded and monitored.
pub struct WorkerProcess {
    child: Child,
    pid: u32,
    monitor: OutputMonitor,
    exit: Option<WorkerExit>,
}

impl WorkerProcess {
    /// Spawns the worker and starts forwarding its stdout and stderr.
    ///
    /// # Arguments
    /// - `command` - Worker command line
    /// - `defect_pattern` - Substring whose presence in the output marks the defect
    ///
    /// # Returns
    /// - `Ok(WorkerProcess)` - Worker started
    /// - `Err(Error::WorkerError)` - Program could not be started
    pub fn spawn(command: &WorkerCommand, defect_pattern: &str) -> Result<Self, Error> {
        let mut child = command
            .to_command()
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                program: command.program().to_string(),
                source,
            })?;
        let pid = child.id().ok_or(WorkerError::MissingPid)?;

        let mut monitor = OutputMonitor::new();
        if let Some(stdout) = child.stdout.take() {
            monitor.attach(stdout, Stream::Stdout, defect_pattern);
        }
        if let Some(stderr) = child.stderr.take() {
            monitor.attach(stderr, Stream::Stderr, defect_pattern);
        }

        debug!("Spawned worker pid {}: {}", pid, command.display_line());

        Ok(Self {
            child,
            pid,
            monitor,
            exit: None,
        })
    }

    fn send(&mut self, signal: Signal) -> Result<bool, Error> {
        // Never signal a reaped pid, it may already belong to another process
        if self.try_exit()?.is_some() {
            debug!(
                "Worker pid {} already exited, not sending {}",
                self.pid,
                signal.as_str()
            );
            return Ok(false);
        }

        kill(Pid::from_raw(self.pid as i32), signal).map_err(|source| WorkerError::Signal {
            pid: self.pid,
            signal: signal.as_str(),
            source,
        })?;

        Ok(true)
    }

    async fn reaped(&mut self, exit: WorkerExit) -> WorkerExit {
        if self.exit.is_none() {
            self.monitor.settle(OUTPUT_SETTLE_TIMEOUT).await;
            self.exit = Some(exit);
        }
        exit
    }
}

impl WorkerHandle for WorkerProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn signal(&mut self, signal: ShutdownSignal) -> Result<bool, Error> {
        self.send(signal.as_signal())
    }

    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<WorkerExit>, Error> {
        if let Some(exit) = self.exit {
            return Ok(Some(exit));
        }

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => Ok(Some(self.reaped(status.into()).await)),
            Ok(Err(e)) => Err(WorkerError::Wait(e).into()),
            Err(_) => Ok(None),
        }
    }

    fn try_exit(&mut self) -> Result<Option<WorkerExit>, Error> {
        if let Some(exit) = self.exit {
            return Ok(Some(exit));
        }

        // Output is not settled here; callers that need the defect flag go through wait/kill
        let status = self.child.try_wait().map_err(WorkerError::Wait)?;
        Ok(status.map(WorkerExit::from))
    }

    async fn kill(&mut self) -> Result<WorkerExit, Error> {
        if let Some(exit) = self.exit {
            return Ok(exit);
        }

        // tokio refuses to kill a child it has already reaped through try_wait
        if let Some(status) = self.child.try_wait().map_err(WorkerError::Wait)? {
            return Ok(self.reaped(status.into()).await);
        }

        self.child.kill().await.map_err(WorkerError::Wait)?;
        let status = self.child.wait().await.map_err(WorkerError::Wait)?;

        Ok(self.reaped(status.into()).await)
    }

    async fn terminate(&mut self) -> Result<WorkerExit, Error> {
        if let Some(exit) = self.exit {
            return Ok(exit);
        }

        self.send(Signal::SIGTERM)?;
        let status = self.child.wait().await.map_err(WorkerError::Wait)?;

        Ok(self.reaped(status.into()).await)
    }

    fn take_defect(&mut self) -> bool {
        self.monitor.flag().take()
    }
}

/// Launches worker processes from a fixed command line.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: WorkerCommand,
    defect_pattern: String,
}

impl ProcessLauncher {
    pub fn new(command: WorkerCommand, defect_pattern: impl Into<String>) -> Self {
        Self {
            command,
            defect_pattern: defect_pattern.into(),
        }
    }

    pub fn command(&self) -> &WorkerCommand {
        &self.command
    }
}

impl WorkerLauncher for ProcessLauncher {
    type Handle = WorkerProcess;

    async fn launch(&self) -> Result<WorkerProcess, Error> {
        WorkerProcess::spawn(&self.command, &self.defect_pattern)
    }
}
