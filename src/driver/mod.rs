//! Orchestration driver: the attempt loop that races a shutdown signal against pool churn.
//!
//! Each attempt floods the queue with a fixed batch of jobs, sleeps a random delay so the
//! signal lands at an arbitrary point of the pool's recycle cycle, signals the worker, and
//! waits a bounded time for it to exit. A worker that does not exit in time is force-killed.
//! Either way a fresh worker is started for the next attempt until the budget runs out.
//!
//! The current worker is carried in a [`WorkerSession`] that every attempt takes by value and
//! hands back, so there is exactly one owner of the live process at any time.
//!
//! An interrupt (Ctrl-C, or the future passed to [`Driver::run_until`]) is observed at every
//! blocking point. It terminates the current worker and ends the run.

mod config;
mod delay;

pub use config::DriverConfig;
pub use delay::DelayRange;

use std::{future::Future, pin::Pin};

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    error::Error,
    model::{
        job::ChurnJob,
        report::{AttemptOutcome, AttemptRecord, RunEnd, RunReport},
        session::WorkerSession,
    },
    queue::JobSink,
    worker::{WorkerExit, WorkerHandle, WorkerLauncher},
};

/// Drives the reproduction loop against a worker launcher and a job sink.
pub struct Driver<L, S> {
    config: DriverConfig,
    launcher: L,
    sink: S,
    job: ChurnJob,
    rng: StdRng,
}

impl<L, S> Driver<L, S>
where
    L: WorkerLauncher,
    S: JobSink,
{
    /// Creates a driver with an OS-seeded delay generator.
    ///
    /// # Arguments
    /// - `config` - Attempt budget, batch size, and timings
    /// - `launcher` - Starts (and restarts) the worker
    /// - `sink` - Queue the job batches are pushed to
    /// - `job` - Job enqueued `batch_size` times per attempt
    pub fn new(config: DriverConfig, launcher: L, sink: S, job: ChurnJob) -> Self {
        Self {
            config,
            launcher,
            sink,
            job,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replaces the delay generator with a seeded one for reproducible delay sequences.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs until the attempt budget is exhausted or Ctrl-C is received.
    pub async fn run(&mut self) -> Result<RunReport, Error> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C, interrupts are disabled: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs until the attempt budget is exhausted or `shutdown` completes.
    ///
    /// # Returns
    /// - `Ok(RunReport)` - Run finished (budget, early worker exit, defect, or interrupt)
    /// - `Err(Error)` - Launching, signalling, or enqueueing failed; the live worker (if any)
    ///   is killed when its handle is dropped
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<RunReport, Error>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut report = RunReport::new();

        info!(
            "Starting worker (signal={}, max attempts={}, batch size={})",
            self.config.signal, self.config.max_attempts, self.config.batch_size
        );
        let handle = self.launcher.launch().await?;
        let mut current = Some(WorkerSession::new(handle, 0));
        let mut pause = self.config.startup_delay;
        let mut attempt = 0;

        while let Some(mut session) = current.take() {
            // Give a fresh worker time to connect and fill its pool
            if interruptible(&mut shutdown, sleep(pause)).await.is_none() {
                report.final_exit = self.stop_worker(&mut session).await;
                report.end = RunEnd::Interrupted;
                break;
            }
            pause = self.config.restart_delay;

            if attempt >= self.config.max_attempts {
                // Only reachable with a zero budget
                report.final_exit = Some(session.handle_mut().kill().await?);
                break;
            }

            if let Some(exit) = session.handle_mut().try_exit()? {
                report.end = RunEnd::WorkerExitedEarly(exit);
                report.final_exit = Some(exit);
                break;
            }

            attempt += 1;
            let (record, next) = self
                .run_attempt(attempt, session, shutdown.as_mut())
                .await?;

            if record.restarted {
                report.restarts += 1;
            }
            if next.is_none() {
                report.final_exit = record.outcome.exit();
                if let AttemptOutcome::Interrupted(_) = record.outcome {
                    report.end = RunEnd::Interrupted;
                } else if record.defect_observed && self.config.stop_on_defect {
                    report.end = RunEnd::DefectObserved;
                }
            }

            report.attempts.push(record);
            current = next;
        }

        report.finished_at = Utc::now();
        report.log_summary();

        Ok(report)
    }

    /// Runs a single attempt against the worker in `session`.
    ///
    /// Enqueues the batch, sleeps a random delay, signals, and waits for exit, force-killing
    /// on timeout. When attempts remain (and the run is not stopping on a defect) a
    /// replacement worker is launched and returned in a new session.
    ///
    /// # Returns
    /// - `(record, Some(session))` - Attempt finished, continue with the restarted worker
    /// - `(record, None)` - Attempt finished and the run is over (budget, defect, interrupt)
    pub async fn run_attempt<F>(
        &mut self,
        attempt: u32,
        mut session: WorkerSession<L::Handle>,
        mut shutdown: Pin<&mut F>,
    ) -> Result<(AttemptRecord, Option<WorkerSession<L::Handle>>), Error>
    where
        F: Future<Output = ()>,
    {
        let mut record = AttemptRecord {
            attempt,
            generation: session.generation(),
            jobs_enqueued: 0,
            delay: None,
            signalled: false,
            outcome: AttemptOutcome::Interrupted(None),
            defect_observed: false,
            restarted: false,
        };

        // Flood with jobs: every job retires a child, so the pool keeps repopulating
        let batch = self.sink.push_batch(&self.job, self.config.batch_size);
        record.jobs_enqueued = match interruptible(&mut shutdown, batch).await {
            Some(pushed) => pushed?,
            None => return Ok(self.interrupted(record, session).await),
        };
        info!(
            "Attempt {}: sent {} tasks, waiting...",
            attempt, record.jobs_enqueued
        );

        let delay = self.config.delay.sample(&mut self.rng);
        record.delay = Some(delay);
        if interruptible(&mut shutdown, sleep(delay)).await.is_none() {
            return Ok(self.interrupted(record, session).await);
        }

        info!(
            "Attempt {}: sending {} after {}ms (race window: pool repopulating)",
            attempt,
            self.config.signal,
            delay.as_millis()
        );
        record.signalled = session.handle_mut().signal(self.config.signal).await?;
        if !record.signalled {
            warn!(
                "Attempt {}: worker exited before {} could be sent",
                attempt, self.config.signal
            );
        }

        let wait = session.handle_mut().wait_timeout(self.config.exit_timeout);
        let waited = match interruptible(&mut shutdown, wait).await {
            Some(waited) => waited?,
            None => return Ok(self.interrupted(record, session).await),
        };

        record.outcome = match waited {
            Some(exit) => {
                info!("Attempt {}: worker exited ({})", attempt, exit);
                AttemptOutcome::Exited(exit)
            }
            None => {
                warn!(
                    "Attempt {}: worker still running after {}s, killing",
                    attempt,
                    self.config.exit_timeout.as_secs()
                );
                AttemptOutcome::ForceKilled(session.handle_mut().kill().await?)
            }
        };

        record.defect_observed = session.handle_mut().take_defect();
        if record.defect_observed {
            warn!("Attempt {}: defect signature observed", attempt);
        }

        let budget_left = attempt < self.config.max_attempts;
        let stop_for_defect = record.defect_observed && self.config.stop_on_defect;
        if !budget_left || stop_for_defect {
            return Ok((record, None));
        }

        info!("Attempt {}: restarting worker for next attempt", attempt);
        let handle = self.launcher.launch().await?;
        record.restarted = true;

        Ok((record, Some(session.restarted(handle))))
    }

    /// Best-effort cleanup after an interrupt mid-attempt.
    async fn interrupted(
        &self,
        mut record: AttemptRecord,
        mut session: WorkerSession<L::Handle>,
    ) -> (AttemptRecord, Option<WorkerSession<L::Handle>>) {
        info!("Attempt {}: interrupted", record.attempt);

        let exit = self.stop_worker(&mut session).await;
        record.defect_observed = session.handle_mut().take_defect();
        record.outcome = AttemptOutcome::Interrupted(exit);

        (record, None)
    }

    /// Terminates the worker, escalating to a kill if it ignores the request.
    ///
    /// Errors are logged rather than returned; this only runs on the way out.
    async fn stop_worker(&self, session: &mut WorkerSession<L::Handle>) -> Option<WorkerExit> {
        let handle = session.handle_mut();

        let terminated =
            tokio::time::timeout(self.config.exit_timeout, handle.terminate()).await;
        let result = match terminated {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Worker ignored termination for {}s, killing",
                    self.config.exit_timeout.as_secs()
                );
                handle.kill().await
            }
        };

        match result {
            Ok(exit) => Some(exit),
            Err(e) => {
                warn!("Failed to stop worker: {}", e);
                None
            }
        }
    }
}

/// Runs `fut` unless `shutdown` completes first.
///
/// `shutdown` must not be polled again once this has returned `None`.
async fn interruptible<F, T>(shutdown: &mut Pin<&mut F>, fut: T) -> Option<T::Output>
where
    F: Future<Output = ()>,
    T: Future,
{
    tokio::select! {
        biased;

        _ = shutdown.as_mut() => None,
        out = fut => Some(out),
    }
}

/// Convenience for tests and callers that never interrupt.
pub fn never() -> impl Future<Output = ()> {
    std::future::pending()
}
