//! In-memory stand-in for the broker queue.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::{Mutex, Notify};

use crate::{error::Error, model::job::ChurnJob, queue::JobSink};

/// Job queue shared by the driver and every simulated pool it launches.
///
/// Like the real broker it outlives individual workers: jobs left over when a worker is shut
/// down are picked up by its replacement.
#[derive(Clone, Default)]
pub struct SimulatedBroker {
    inner: Arc<BrokerRef>,
}

#[derive(Default)]
struct BrokerRef {
    queue: Mutex<VecDeque<ChurnJob>>,
    available: Notify,
    pushed: AtomicU64,
}

impl SimulatedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the next job.
    ///
    /// Cancel-safe: a job is either returned or left in the queue.
    pub async fn pop(&self) -> ChurnJob {
        loop {
            // Register interest before checking so a push between the check and the wait is
            // not missed
            let notified = self.inner.available.notified();

            if let Some(job) = self.inner.queue.lock().await.pop_front() {
                return job;
            }

            notified.await;
        }
    }

    /// Jobs currently waiting.
    pub async fn pending(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Total jobs ever pushed.
    pub fn pushed(&self) -> u64 {
        self.inner.pushed.load(Ordering::Relaxed)
    }
}

impl JobSink for SimulatedBroker {
    async fn push_batch(&self, job: &ChurnJob, count: usize) -> Result<usize, Error> {
        self.inner
            .queue
            .lock()
            .await
            .extend(std::iter::repeat(*job).take(count));
        self.inner.pushed.fetch_add(count as u64, Ordering::Relaxed);
        self.inner.available.notify_waiters();

        Ok(count)
    }
}
