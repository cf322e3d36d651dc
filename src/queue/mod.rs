//! Load generator: pushes churn jobs onto the worker's broker queue.
//!
//! The worker's Redis transport consumes task messages from a plain list named after the
//! queue, so enqueueing is a single `LPUSH` of serialized envelopes. Nothing is acknowledged or
//! read back; the backlog exists only to keep the pool recycling children.

pub mod config;

pub use config::QueueConfig;

use fred::prelude::*;
use tracing::debug;

use crate::{
    error::Error,
    model::{job::ChurnJob, message::TaskMessage},
};

/// Destination for the jobs enqueued on every attempt.
///
/// The driver only depends on this seam; [`JobQueue`] implements it against Redis and
/// [`crate::pool::SimulatedBroker`] against the in-process pool model.
#[allow(async_fn_in_trait)]
pub trait JobSink {
    /// Enqueues exactly `count` copies of `job`, returning how many were enqueued.
    async fn push_batch(&self, job: &ChurnJob, count: usize) -> Result<usize, Error>;
}

/// Redis-backed broker queue.
#[derive(Clone)]
pub struct JobQueue {
    pool: Pool,
    config: QueueConfig,
    origin: String,
}

impl JobQueue {
    /// Creates a queue with the default queue and task names.
    pub fn new(pool: Pool) -> Self {
        Self::with_config(pool, QueueConfig::default())
    }

    /// Creates a queue with a custom configuration (useful for test isolation).
    pub fn with_config(pool: Pool, config: QueueConfig) -> Self {
        Self {
            pool,
            config,
            origin: origin(),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn message(&self, job: &ChurnJob) -> Result<String, Error> {
        let message = TaskMessage::for_job(
            &self.config.task_name,
            &self.config.queue_name,
            &self.origin,
            job,
        )?;
        Ok(message.to_json()?)
    }

    /// Pushes a single job.
    pub async fn push(&self, job: &ChurnJob) -> Result<(), Error> {
        let message = self.message(job)?;
        let _: i64 = self.pool.lpush(self.config.queue_name.as_str(), message).await?;
        Ok(())
    }

    /// Number of messages waiting in the queue.
    pub async fn len(&self) -> Result<u64, Error> {
        let len: u64 = self.pool.llen(self.config.queue_name.as_str()).await?;
        Ok(len)
    }

    /// Returns true if no messages are waiting.
    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    /// Drops every waiting message, returning whether the queue existed.
    pub async fn purge(&self) -> Result<bool, Error> {
        let removed: i64 = self.pool.del(self.config.queue_name.as_str()).await?;
        Ok(removed > 0)
    }
}

impl JobSink for JobQueue {
    async fn push_batch(&self, job: &ChurnJob, count: usize) -> Result<usize, Error> {
        if count == 0 {
            return Ok(0);
        }

        let messages = (0..count)
            .map(|_| self.message(job))
            .collect::<Result<Vec<String>, Error>>()?;

        // One LPUSH for the whole batch so the worker sees it as a single burst
        let len: i64 = self.pool.lpush(self.config.queue_name.as_str(), messages).await?;
        debug!(
            "Pushed {} job(s) to {} (queue length {})",
            count, self.config.queue_name, len
        );

        Ok(count)
    }
}

/// Sender identity recorded in message headers, `churn-repro@<hostname>`.
fn origin() -> String {
    let host = nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("churn-repro@{}", host)
}
