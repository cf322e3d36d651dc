//! Per-attempt and per-run outcomes.
//!
//! The report is the structured counterpart of the console output: it records how every
//! attempt ended and whether the defect signature was seen, so a caller (or a test) can decide
//! whether the run reproduced the race without reading the scrollback.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::worker::WorkerExit;

/// How the worker left an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Worker exited on its own within the exit timeout after being signalled.
    Exited(WorkerExit),
    /// Worker was still running after the exit timeout and was force-killed.
    ForceKilled(WorkerExit),
    /// The harness was interrupted during the attempt and terminated the worker.
    Interrupted(Option<WorkerExit>),
}

impl AttemptOutcome {
    /// Final exit status of the attempt's worker, if known.
    pub fn exit(&self) -> Option<WorkerExit> {
        match self {
            Self::Exited(exit) | Self::ForceKilled(exit) => Some(*exit),
            Self::Interrupted(exit) => *exit,
        }
    }
}

/// One iteration of the driver loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Restart generation of the worker used for this attempt.
    pub generation: u32,
    /// Jobs enqueued before the delay.
    pub jobs_enqueued: usize,
    /// Sampled pre-signal delay, if the attempt got that far.
    pub delay: Option<Duration>,
    /// Whether the shutdown signal was delivered.
    pub signalled: bool,
    pub outcome: AttemptOutcome,
    /// Whether the defect signature was observed during the attempt.
    pub defect_observed: bool,
    /// Whether a replacement worker was started after this attempt.
    pub restarted: bool,
}

/// Why the driver loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// All configured attempts were made.
    BudgetExhausted,
    /// The worker exited outside the controlled signal path before an attempt started.
    WorkerExitedEarly(WorkerExit),
    /// The harness was interrupted.
    Interrupted,
    /// The defect was observed and the run was configured to stop on it.
    DefectObserved,
}

/// Outcome of a complete run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub attempts: Vec<AttemptRecord>,
    pub restarts: u32,
    pub end: RunEnd,
    /// Exit status of the last worker, if it was reaped.
    pub final_exit: Option<WorkerExit>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            attempts: Vec::new(),
            restarts: 0,
            end: RunEnd::BudgetExhausted,
            final_exit: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// Number of attempts that actually started.
    pub fn attempts_made(&self) -> usize {
        self.attempts.len()
    }

    /// Number of attempts during which the defect signature was observed.
    pub fn defect_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.defect_observed).count()
    }

    /// Whether the run reproduced the defect at least once.
    pub fn reproduced(&self) -> bool {
        self.defect_count() > 0
    }

    /// Total jobs enqueued across all attempts.
    pub fn jobs_enqueued(&self) -> usize {
        self.attempts.iter().map(|a| a.jobs_enqueued).sum()
    }

    /// Logs the end-of-run summary lines.
    pub fn log_summary(&self) {
        let elapsed = self.finished_at - self.started_at;

        match self.end {
            RunEnd::Interrupted => info!("Interrupted"),
            RunEnd::WorkerExitedEarly(exit) => {
                warn!("Worker exited outside the signal path ({}), stopping", exit)
            }
            RunEnd::DefectObserved => info!("Defect observed, stopping early"),
            RunEnd::BudgetExhausted => {}
        }

        info!(
            "Completed {} attempt(s) in {}s ({} restart(s), {} job(s) enqueued).",
            self.attempts_made(),
            elapsed.num_seconds(),
            self.restarts,
            self.jobs_enqueued()
        );

        if let Some(exit) = self.final_exit {
            if !exit.success() {
                warn!(
                    "Worker exited with non-zero status ({}) - check output above for errors.",
                    exit
                );
            }
        }

        if self.reproduced() {
            warn!(
                "Defect signature observed in {} of {} attempt(s) - reproduction succeeded.",
                self.defect_count(),
                self.attempts_made()
            );
        } else {
            info!("Defect signature not observed (race is timing-dependent). Run again - the bug is intermittent.");
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
