//! Error types for the reproduction harness.
//!
//! The harness is an observer of failure rather than a handler of it: the defect it provokes
//! is surfaced verbatim by the worker process and never passes through these types. The
//! errors here cover the harness's own plumbing (configuration, subprocess control, broker
//! access, message encoding) and use `thiserror` for the `Display` and `Error` impls.

pub mod config;
pub mod worker;

use thiserror::Error;

use crate::error::{config::ConfigError, worker::WorkerError};

/// Main error type for the harness.
///
/// Aggregates domain-specific errors and external library errors into a single type so the
/// driver can propagate everything with `?`.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (invalid environment variable values).
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    /// Worker process error (spawn, signal delivery, wait).
    #[error(transparent)]
    WorkerError(#[from] WorkerError),
    /// Broker error (connection, command execution).
    #[error(transparent)]
    RedisError(#[from] fred::error::Error),
    /// Failed to serialize a task message for the broker.
    #[error("Failed to serialize task message: {0}")]
    SerializationError(#[from] serde_json::Error),
}
