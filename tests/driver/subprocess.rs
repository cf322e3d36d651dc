//! Driver runs against real shell processes standing in for the worker.

use std::time::Duration;

use churn_repro::{
    driver::{never, DelayRange, Driver, DriverConfig},
    model::{
        job::ChurnJob,
        report::{AttemptOutcome, RunEnd},
    },
    pool::SimulatedBroker,
    worker::{ProcessLauncher, WorkerCommand, WorkerExit},
};
use churn_test_utils::script;

use super::quick_config;

fn launcher(script: &str) -> ProcessLauncher {
    let command = WorkerCommand::new("sh").arg("-c").arg(script);
    ProcessLauncher::new(command, "_sentinel_poll")
}

fn config(max_attempts: u32) -> DriverConfig {
    DriverConfig {
        exit_timeout: Duration::from_secs(5),
        startup_delay: Duration::from_millis(300),
        restart_delay: Duration::from_millis(300),
        ..quick_config(max_attempts, Duration::from_millis(100))
    }
}

/// Tests that the traceback printed by a failing worker is detected on every attempt.
///
/// Expected: both attempts observe the defect, the worker exits with code 1 each time
#[tokio::test]
async fn detects_defect_in_worker_output() {
    let mut driver = Driver::new(
        config(2),
        launcher(script::FAILS_ON_SHUTDOWN),
        SimulatedBroker::new(),
        ChurnJob::default(),
    );

    let report = driver.run_until(never()).await.expect("run should succeed");

    assert_eq!(report.attempts_made(), 2);
    assert_eq!(report.restarts, 1);
    assert_eq!(report.defect_count(), 2);
    for record in &report.attempts {
        assert_eq!(record.outcome, AttemptOutcome::Exited(WorkerExit::exited(1)));
    }
}

/// Tests that a worker that obeys the signal exits cleanly without a defect.
#[tokio::test]
async fn clean_shutdown_reports_no_defect() {
    let mut driver = Driver::new(
        config(2),
        launcher(script::OBEYS_SHUTDOWN),
        SimulatedBroker::new(),
        ChurnJob::default(),
    );

    let report = driver.run_until(never()).await.expect("run should succeed");

    assert_eq!(report.attempts_made(), 2);
    assert!(!report.reproduced());
    assert_eq!(report.final_exit, Some(WorkerExit::exited(0)));
}

/// Tests that a worker dying before the first attempt ends the run.
///
/// Expected: no attempts, run ends with the worker's own exit status
#[tokio::test]
async fn worker_crash_before_attempt_ends_run() {
    let mut driver = Driver::new(
        config(5),
        launcher(script::CRASHES_ON_START),
        SimulatedBroker::new(),
        ChurnJob::default(),
    );

    let report = driver.run_until(never()).await.expect("run should succeed");

    assert_eq!(report.attempts_made(), 0);
    assert_eq!(
        report.end,
        RunEnd::WorkerExitedEarly(WorkerExit::exited(3))
    );
    assert_eq!(driver.sink().pushed(), 0);
}

/// Tests that a worker exiting during the pre-signal delay is not recorded as signalled.
///
/// Expected: the attempt completes with the worker's own exit status and `signalled` unset
#[tokio::test]
async fn worker_exit_during_delay_is_not_signalled() {
    let config = DriverConfig {
        delay: DelayRange::fixed(Duration::from_millis(1_500)),
        ..config(1)
    };
    let mut driver = Driver::new(
        config,
        launcher(script::EXITS_AFTER_ONE_SECOND),
        SimulatedBroker::new(),
        ChurnJob::default(),
    );

    let report = driver.run_until(never()).await.expect("run should succeed");

    assert_eq!(report.attempts_made(), 1);
    let record = &report.attempts[0];
    assert!(!record.signalled, "worker was gone before the signal");
    assert_eq!(record.outcome, AttemptOutcome::Exited(WorkerExit::exited(0)));
}

/// Tests that a missing worker program fails the run with an error.
#[tokio::test]
async fn missing_program_is_an_error() {
    let command = WorkerCommand::new("/nonexistent/churn-worker");
    let mut driver = Driver::new(
        config(1),
        ProcessLauncher::new(command, "_sentinel_poll"),
        SimulatedBroker::new(),
        ChurnJob::default(),
    );

    let result = driver.run_until(never()).await;
    assert!(result.is_err(), "spawn failure should be returned");
}
