//! Tests for WorkerProcess signal delivery, bounded waits, and output monitoring.
//!
//! These use `sh` scripts in place of the real worker so they run without a broker.

use std::time::Duration;

use churn_repro::worker::{
    ProcessLauncher, ShutdownSignal, WorkerCommand, WorkerExit, WorkerHandle, WorkerLauncher,
    WorkerProcess,
};
use churn_test_utils::script;
use tokio::time::sleep;

/// Time for `sh` to install its traps before it is signalled.
const READY: Duration = Duration::from_millis(300);

async fn spawn(script: &str) -> WorkerProcess {
    let command = WorkerCommand::new("sh").arg("-c").arg(script);
    let worker = ProcessLauncher::new(command, "_sentinel_poll")
        .launch()
        .await
        .expect("worker should spawn");
    sleep(READY).await;
    worker
}

mod signal {
    use super::*;

    #[tokio::test]
    async fn cold_shutdown_exits_worker() {
        let mut worker = spawn(script::OBEYS_SHUTDOWN).await;
        assert!(worker.pid().is_some());

        let delivered = worker
            .signal(ShutdownSignal::Cold)
            .await
            .expect("signal should be delivered");
        assert!(delivered);
        let exit = worker
            .wait_timeout(Duration::from_secs(5))
            .await
            .expect("wait should succeed");

        assert_eq!(exit, Some(WorkerExit::exited(0)));
        assert!(!worker.take_defect());
    }

    #[tokio::test]
    async fn signalling_exited_worker_is_noop() {
        let mut worker = spawn(script::CRASHES_ON_START).await;

        let exit = worker
            .wait_timeout(Duration::from_secs(5))
            .await
            .expect("wait should succeed");
        assert_eq!(exit, Some(WorkerExit::exited(3)));

        let delivered = worker
            .signal(ShutdownSignal::Cold)
            .await
            .expect("signalling a reaped worker should not fail");
        assert!(!delivered, "nothing should be sent to a reaped worker");
    }
}

mod timeout {
    use super::*;

    #[tokio::test]
    async fn ignoring_worker_times_out_then_is_killed() {
        let mut worker = spawn(script::IGNORES_SHUTDOWN).await;

        worker
            .signal(ShutdownSignal::Cold)
            .await
            .expect("signal should be delivered");
        let exit = worker
            .wait_timeout(Duration::from_millis(500))
            .await
            .expect("wait should succeed");
        assert_eq!(exit, None, "worker should still be running");

        let exit = worker.kill().await.expect("kill should succeed");
        assert_eq!(exit, WorkerExit::signaled(9));
        assert_eq!(worker.try_exit().expect("try_exit"), Some(exit));
    }

    #[tokio::test]
    async fn terminate_waits_for_exit() {
        let mut worker = spawn(script::OBEYS_SHUTDOWN).await;

        let exit = worker.terminate().await.expect("terminate should succeed");
        assert_eq!(exit, WorkerExit::exited(0));
    }
}

mod defect {
    use super::*;

    #[tokio::test]
    async fn traceback_on_stderr_raises_flag() {
        let mut worker = spawn(script::FAILS_ON_SHUTDOWN).await;

        worker
            .signal(ShutdownSignal::Cold)
            .await
            .expect("signal should be delivered");
        let exit = worker
            .wait_timeout(Duration::from_secs(5))
            .await
            .expect("wait should succeed");

        assert_eq!(exit, Some(WorkerExit::exited(1)));
        assert!(worker.take_defect(), "defect should be observed");
        assert!(!worker.take_defect(), "flag should clear after take");
    }

    #[tokio::test]
    async fn warm_shutdown_does_not_print_traceback() {
        let mut worker = spawn(script::FAILS_ON_SHUTDOWN).await;

        worker
            .signal(ShutdownSignal::Warm)
            .await
            .expect("signal should be delivered");
        let exit = worker
            .wait_timeout(Duration::from_secs(5))
            .await
            .expect("wait should succeed");

        assert_eq!(exit, Some(WorkerExit::exited(0)));
        assert!(!worker.take_defect());
    }
}
