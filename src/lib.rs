//! Reproduction harness for a worker-pool shutdown race.
//!
//! The harness launches an external task worker configured for maximum pool churn (one task
//! per child process), floods its broker queue with trivial CPU-bound jobs, and sends a cold
//! shutdown signal after a randomized delay so that the signal lands while the pool is
//! repopulating. Each attempt waits a bounded time for the worker to exit, force-kills it on
//! timeout, and restarts it for the next attempt.
//!
//! The [`pool`] module carries an in-process model of the prefork pool in which the same race
//! is deterministic, so the driver can be exercised without a broker or a Python worker.

pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod pool;
pub mod queue;
pub mod startup;
pub mod worker;
