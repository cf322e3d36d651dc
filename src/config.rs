//! Environment-driven configuration.
//!
//! Every setting has a default so the harness runs with nothing but a local Redis. Values are
//! read once at startup (after `dotenvy` has loaded any `.env` file) and split into the
//! per-component configurations consumed by the driver, the worker launcher, and the queue.

use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::{
    driver::{DelayRange, DriverConfig},
    error::config::ConfigError,
    model::job::ChurnJob,
    pool::PoolConfig,
    queue::QueueConfig,
    worker::{command::WorkerCommand, signal::ShutdownSignal},
};

const DEFAULT_BROKER_URL: &str = "redis://localhost:6379/0";
const DEFAULT_RESULT_BACKEND: &str = "redis://localhost:6379/1";
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_MAX_ATTEMPTS: u32 = 50;
const DEFAULT_BATCH_SIZE: usize = 16;
const DEFAULT_MIN_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_DELAY_MS: u64 = 4000;
const DEFAULT_EXIT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STARTUP_DELAY_SECS: u64 = 3;
const DEFAULT_RESTART_DELAY_SECS: u64 = 2;
const DEFAULT_WORKER_PYTHON: &str = "python3";
const DEFAULT_WORKER_APP: &str = "celery_app:app";
/// The bundled worker app and task module shipped next to this crate.
const DEFAULT_WORKER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/worker");
const DEFAULT_QUEUE_NAME: &str = "celery";
const DEFAULT_TASK_NAME: &str = "tasks.churn_task";
const DEFAULT_DEFECT_PATTERN: &str = "_sentinel_poll";

/// Which worker the driver runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Launch the external Celery worker and feed it through Redis.
    Celery,
    /// Run against the in-process pool model.
    Simulate,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "celery" => Ok(Self::Celery),
            "simulate" | "sim" => Ok(Self::Simulate),
            other => Err(format!("expected `celery` or `simulate`, got `{}`", other)),
        }
    }
}

/// Harness configuration read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub broker_url: String,
    pub result_backend: String,
    pub concurrency: usize,
    pub max_attempts: u32,
    pub batch_size: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exit_timeout_secs: u64,
    pub startup_delay_secs: u64,
    pub restart_delay_secs: u64,
    pub shutdown_signal: ShutdownSignal,
    pub worker_python: String,
    pub worker_app: String,
    pub worker_dir: PathBuf,
    pub queue_name: String,
    pub task_name: String,
    pub task_n: u64,
    pub defect_pattern: String,
    pub stop_on_defect: bool,
    pub mode: RunMode,
}

impl Config {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// Unset variables fall back to their defaults; set-but-unparseable variables are an
    /// error rather than being silently replaced.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            broker_url: lookup("CELERY_BROKER_URL").unwrap_or_else(|| DEFAULT_BROKER_URL.into()),
            result_backend: lookup("CELERY_RESULT_BACKEND")
                .unwrap_or_else(|| DEFAULT_RESULT_BACKEND.into()),
            concurrency: parse_var(&lookup, "CELERY_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            max_attempts: parse_var(&lookup, "REPRO_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            batch_size: parse_var(&lookup, "REPRO_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            min_delay_ms: parse_var(&lookup, "REPRO_MIN_DELAY_MS", DEFAULT_MIN_DELAY_MS)?,
            max_delay_ms: parse_var(&lookup, "REPRO_MAX_DELAY_MS", DEFAULT_MAX_DELAY_MS)?,
            exit_timeout_secs: parse_var(
                &lookup,
                "REPRO_EXIT_TIMEOUT_SECS",
                DEFAULT_EXIT_TIMEOUT_SECS,
            )?,
            startup_delay_secs: parse_var(
                &lookup,
                "REPRO_STARTUP_DELAY_SECS",
                DEFAULT_STARTUP_DELAY_SECS,
            )?,
            restart_delay_secs: parse_var(
                &lookup,
                "REPRO_RESTART_DELAY_SECS",
                DEFAULT_RESTART_DELAY_SECS,
            )?,
            shutdown_signal: parse_var(&lookup, "REPRO_SHUTDOWN_SIGNAL", ShutdownSignal::Cold)?,
            worker_python: lookup("REPRO_WORKER_PYTHON")
                .unwrap_or_else(|| DEFAULT_WORKER_PYTHON.into()),
            worker_app: lookup("REPRO_WORKER_APP").unwrap_or_else(|| DEFAULT_WORKER_APP.into()),
            worker_dir: lookup("REPRO_WORKER_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKER_DIR)),
            queue_name: lookup("REPRO_QUEUE_NAME").unwrap_or_else(|| DEFAULT_QUEUE_NAME.into()),
            task_name: lookup("REPRO_TASK_NAME").unwrap_or_else(|| DEFAULT_TASK_NAME.into()),
            task_n: parse_var(&lookup, "REPRO_TASK_N", ChurnJob::DEFAULT_N)?,
            defect_pattern: lookup("REPRO_DEFECT_PATTERN")
                .unwrap_or_else(|| DEFAULT_DEFECT_PATTERN.into()),
            stop_on_defect: parse_var(&lookup, "REPRO_STOP_ON_DEFECT", false)?,
            mode: parse_var(&lookup, "REPRO_MODE", RunMode::Celery)?,
        };

        if config.concurrency == 0 {
            return Err(ConfigError::InvalidEnvValue {
                var: "CELERY_CONCURRENCY".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        // Validate eagerly so a bad range fails at startup rather than on the first attempt
        config.delay_range()?;

        Ok(config)
    }

    /// Randomized pre-signal delay range.
    pub fn delay_range(&self) -> Result<DelayRange, ConfigError> {
        DelayRange::new(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    /// Driver loop configuration.
    pub fn driver_config(&self) -> Result<DriverConfig, ConfigError> {
        Ok(DriverConfig {
            max_attempts: self.max_attempts,
            batch_size: self.batch_size,
            delay: self.delay_range()?,
            exit_timeout: Duration::from_secs(self.exit_timeout_secs),
            startup_delay: Duration::from_secs(self.startup_delay_secs),
            restart_delay: Duration::from_secs(self.restart_delay_secs),
            signal: self.shutdown_signal,
            stop_on_defect: self.stop_on_defect,
        })
    }

    /// Command line for the external worker.
    pub fn worker_command(&self) -> WorkerCommand {
        WorkerCommand::celery(&self.worker_python, &self.worker_app, self.concurrency)
            .env("CELERY_BROKER_URL", &self.broker_url)
            .env("CELERY_RESULT_BACKEND", &self.result_backend)
            .env("CELERY_CONCURRENCY", self.concurrency.to_string())
            .current_dir(&self.worker_dir)
    }

    /// Broker queue configuration.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            queue_name: self.queue_name.clone(),
            task_name: self.task_name.clone(),
        }
    }

    /// The job enqueued on every attempt.
    pub fn job(&self) -> ChurnJob {
        ChurnJob::new(self.task_n)
    }

    /// Simulated pool configuration mirroring the external worker's startup flags.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.concurrency)
    }
}

fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                reason: e.to_string(),
            }),
    }
}
