//! Driver runs against the in-process pool model.
//!
//! All tests run on a paused clock, so every delay, exit timeout, and pool transition is
//! deterministic and the suite finishes instantly.

use std::time::Duration;

use churn_repro::{
    driver::{never, DelayRange, Driver, DriverConfig},
    model::{
        job::ChurnJob,
        report::{AttemptOutcome, RunEnd},
    },
    pool::{PoolConfig, PoolTimings, SimulatedBroker, SimulatedLauncher},
    worker::{ShutdownSignal, WorkerExit},
};
use tokio::time::sleep;

use super::{quick_config, race_timings};

fn driver(
    config: DriverConfig,
    pool: PoolConfig,
) -> Driver<SimulatedLauncher, SimulatedBroker> {
    let broker = SimulatedBroker::new();
    let launcher = SimulatedLauncher::new(pool, broker.clone());
    Driver::new(config, launcher, broker, ChurnJob::new(1_000)).with_seed(7)
}

mod budget {
    use super::*;

    /// Tests that a single-attempt run enqueues exactly one batch and never restarts.
    ///
    /// Expected: one record, 16 jobs pushed, one launch, budget exhausted
    #[tokio::test(start_paused = true)]
    async fn single_attempt_enqueues_one_batch() {
        let mut driver = driver(
            quick_config(1, Duration::from_millis(100)),
            PoolConfig::new(2),
        );

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 1);
        assert_eq!(report.attempts[0].jobs_enqueued, 16);
        assert!(report.attempts[0].signalled);
        assert!(!report.attempts[0].restarted);
        assert_eq!(report.restarts, 0);
        assert_eq!(report.end, RunEnd::BudgetExhausted);
        assert_eq!(driver.sink().pushed(), 16);
        assert_eq!(driver.launcher().launched(), 1);
    }

    /// Tests that N attempts restart the worker N-1 times with increasing generations.
    ///
    /// Expected: 4 records, 3 restarts, 4 launches, generations 0..4
    #[tokio::test(start_paused = true)]
    async fn restarts_between_attempts() {
        let mut driver = driver(
            quick_config(4, Duration::from_millis(100)),
            PoolConfig::new(2),
        );

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 4);
        assert_eq!(report.restarts, 3);
        assert_eq!(driver.launcher().launched(), 4);
        assert_eq!(report.jobs_enqueued(), 64);

        let generations: Vec<u32> = report.attempts.iter().map(|a| a.generation).collect();
        assert_eq!(generations, vec![0, 1, 2, 3]);
        assert!(report.final_exit.is_some());
    }

    /// Tests that a zero budget launches the worker and stops it without an attempt.
    ///
    /// Expected: no records, worker killed, budget exhausted
    #[tokio::test(start_paused = true)]
    async fn zero_budget_makes_no_attempt() {
        let mut driver = driver(
            quick_config(0, Duration::from_millis(100)),
            PoolConfig::new(2),
        );

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 0);
        assert_eq!(report.end, RunEnd::BudgetExhausted);
        assert_eq!(report.final_exit, Some(WorkerExit::signaled(9)));
        assert_eq!(driver.sink().pushed(), 0);
    }

    /// Tests that sampled delays stay inside the configured range.
    #[tokio::test(start_paused = true)]
    async fn sampled_delays_stay_in_range() {
        let range = DelayRange::new(Duration::from_secs(1), Duration::from_secs(4))
            .expect("range should be valid");
        let config = DriverConfig {
            delay: range,
            ..quick_config(5, Duration::ZERO)
        };
        let mut driver = driver(config, PoolConfig::new(2));

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 5);
        for record in &report.attempts {
            let delay = record.delay.expect("every attempt should sample a delay");
            assert!(range.contains(delay), "{:?} outside range", delay);
        }
    }
}

mod race {
    use super::*;

    /// Tests that a cold shutdown landing while a child respawns surfaces the defect.
    ///
    /// The signal lands 200ms after each launch, inside the 150-250ms respawn window.
    ///
    /// Expected: every attempt observes the defect and the worker exits with code 1
    #[tokio::test(start_paused = true)]
    async fn cold_shutdown_during_respawn_reproduces() {
        let mut driver = driver(
            quick_config(3, Duration::from_millis(200)),
            PoolConfig::new(1).with_timings(race_timings()),
        );

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 3);
        assert_eq!(report.defect_count(), 3);
        assert!(report.reproduced());
        for record in &report.attempts {
            assert_eq!(record.outcome, AttemptOutcome::Exited(WorkerExit::exited(1)));
        }
    }

    /// Tests that a warm shutdown at the same instant does not fault.
    ///
    /// Expected: no defects, every worker exits with code 0
    #[tokio::test(start_paused = true)]
    async fn warm_shutdown_during_respawn_is_clean() {
        let config = DriverConfig {
            signal: ShutdownSignal::Warm,
            ..quick_config(3, Duration::from_millis(200))
        };
        let mut driver = driver(config, PoolConfig::new(1).with_timings(race_timings()));

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 3);
        assert!(!report.reproduced());
        for record in &report.attempts {
            assert_eq!(record.outcome, AttemptOutcome::Exited(WorkerExit::exited(0)));
        }
    }

    /// Tests that the run ends after the first defect when configured to.
    ///
    /// Children never finish spawning, so the first cold shutdown always faults.
    ///
    /// Expected: one attempt, no restart, run ends on the defect
    #[tokio::test(start_paused = true)]
    async fn stops_on_first_defect() {
        let config = DriverConfig {
            stop_on_defect: true,
            ..quick_config(5, Duration::from_millis(100))
        };
        let timings = PoolTimings {
            spawn_delay: Duration::from_secs(60),
            ..race_timings()
        };
        let mut driver = driver(config, PoolConfig::new(4).with_timings(timings));

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 1);
        assert_eq!(report.end, RunEnd::DefectObserved);
        assert_eq!(report.restarts, 0);
        assert_eq!(report.final_exit, Some(WorkerExit::exited(1)));
        assert_eq!(driver.launcher().launched(), 1);
    }
}

mod timeout {
    use super::*;

    /// Tests that a worker ignoring the signal is force-killed and replaced.
    ///
    /// Expected: every attempt ends force-killed by SIGKILL, and the run continues
    #[tokio::test(start_paused = true)]
    async fn unresponsive_worker_is_killed_and_replaced() {
        let mut driver = driver(
            quick_config(2, Duration::from_millis(100)),
            PoolConfig::new(1).ignoring_signals(),
        );

        let report = driver.run_until(never()).await.expect("run should succeed");

        assert_eq!(report.attempts_made(), 2);
        assert_eq!(report.restarts, 1);
        for record in &report.attempts {
            assert_eq!(
                record.outcome,
                AttemptOutcome::ForceKilled(WorkerExit::signaled(9))
            );
        }
    }
}

mod interrupt {
    use super::*;

    /// Tests that an interrupt during the pre-signal delay stops the worker and ends the run.
    ///
    /// Expected: one unsignalled attempt, worker terminated cleanly, run ends interrupted
    #[tokio::test(start_paused = true)]
    async fn interrupt_during_delay_terminates_worker() {
        let mut driver = driver(
            quick_config(10, Duration::from_secs(10)),
            PoolConfig::new(2),
        );

        let report = driver
            .run_until(sleep(Duration::from_secs(5)))
            .await
            .expect("run should succeed");

        assert_eq!(report.end, RunEnd::Interrupted);
        assert_eq!(report.attempts_made(), 1);

        let record = &report.attempts[0];
        assert!(!record.signalled);
        assert_eq!(
            record.outcome,
            AttemptOutcome::Interrupted(Some(WorkerExit::exited(0)))
        );
        assert_eq!(report.final_exit, Some(WorkerExit::exited(0)));
        assert_eq!(driver.launcher().launched(), 1);
    }

    /// Tests that interrupt cleanup escalates to a kill when the worker ignores termination.
    ///
    /// Expected: after waiting out the exit timeout the worker is killed with SIGKILL
    #[tokio::test(start_paused = true)]
    async fn interrupt_kills_worker_ignoring_termination() {
        let mut driver = driver(
            quick_config(10, Duration::from_secs(10)),
            PoolConfig::new(2).ignoring_signals(),
        );

        let started = tokio::time::Instant::now();
        let report = driver
            .run_until(sleep(Duration::from_secs(5)))
            .await
            .expect("run should succeed");

        assert_eq!(report.end, RunEnd::Interrupted);
        assert_eq!(report.attempts_made(), 1);
        assert_eq!(
            report.attempts[0].outcome,
            AttemptOutcome::Interrupted(Some(WorkerExit::signaled(9)))
        );
        assert_eq!(report.final_exit, Some(WorkerExit::signaled(9)));
        // Interrupt at 5s, then the 1s exit timeout before escalating
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    /// Tests that an interrupt during the startup pause makes no attempt.
    #[tokio::test(start_paused = true)]
    async fn interrupt_during_startup_makes_no_attempt() {
        let config = DriverConfig {
            startup_delay: Duration::from_secs(30),
            ..quick_config(10, Duration::from_secs(1))
        };
        let mut driver = driver(config, PoolConfig::new(2));

        let report = driver
            .run_until(sleep(Duration::from_secs(1)))
            .await
            .expect("run should succeed");

        assert_eq!(report.end, RunEnd::Interrupted);
        assert_eq!(report.attempts_made(), 0);
        assert_eq!(driver.sink().pushed(), 0);
    }
}
