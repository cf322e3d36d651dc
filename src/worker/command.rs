//! Worker command line.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

/// Program, arguments, working directory and environment of a worker process.
///
/// [`WorkerCommand::celery`] builds the fixed invocation used for reproduction; the generic
/// builder methods exist so tests can launch stand-in workers.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    envs: Vec<(String, OsString)>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
        }
    }

    /// The external worker with the flags that maximise pool churn.
    ///
    /// Equivalent to
    /// `<python> -m celery -A <app> worker --loglevel=info --concurrency <n> --max-tasks-per-child=1`.
    pub fn celery(python: &str, app: &str, concurrency: usize) -> Self {
        Self::new(python)
            .args(["-m", "celery", "-A", app, "worker", "--loglevel=info"])
            .arg("--concurrency")
            .arg(concurrency.to_string())
            .arg("--max-tasks-per-child=1")
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args_slice(&self) -> &[String] {
        &self.args
    }

    /// Working directory the worker is started in, if set.
    pub fn dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Builds the tokio command with stdout/stderr piped for output monitoring.
    ///
    /// `kill_on_drop` is set so a worker can never outlive the harness through a dropped
    /// handle.
    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }

        command
    }

    /// Human-readable command line for log lines.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
