//! In-process model of the external prefork pool.
//!
//! The real defect lives inside a third-party worker and only shows up when a cold shutdown
//! happens to land while the pool is replacing a retired child. This module models that pool as
//! an explicit state machine so the race can be driven deterministically:
//!
//! - The pool moves `Starting -> Running -> Draining -> Exited`.
//! - Every slot cycles its child through `Spawning -> Running -> Draining -> Exited`, pulling
//!   at most `max_tasks_per_child` jobs from the shared [`SimulatedBroker`] before it is retired
//!   and the slot repopulates.
//! - A child owns a sentinel only once it reaches `Running`.
//! - A **cold** shutdown tears the pool down immediately, polling every live child's sentinel.
//!   A child still `Spawning` has none, which raises [`PoolFault::MissingSentinel`] and makes
//!   the worker exit with code 1, the same way the real worker dies on the uncaught error.
//! - A **warm** shutdown stops job intake and waits for every child to finish what it is
//!   doing (including spawning), so it never faults.
//!
//! [`PoolTimings`] injects the delay of each transition. [`SimulatedLauncher`] and
//! [`SimulatedBroker`] implement the driver's launcher and sink seams.

mod broker;
mod config;
mod state;

pub use broker::SimulatedBroker;
pub use config::{PoolConfig, PoolTimings, SignalHandling};
pub use state::{ChildSlot, ChildState, PoolFault, PoolSnapshot, PoolState, Sentinel};

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info};

use crate::{
    error::Error,
    worker::{monitor::DefectFlag, ShutdownSignal, WorkerExit, WorkerHandle, WorkerLauncher},
};

/// Signal number reported for a force-killed simulated worker.
const SIGKILL: i32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownMode {
    None,
    Warm,
    Cold,
}

struct PoolInner {
    state: PoolState,
    children: Vec<ChildSlot>,
    faults: Vec<PoolFault>,
    jobs_completed: u64,
    children_spawned: u64,
}

/// State shared between the worker handle and its slot tasks.
struct PoolRef {
    id: u32,
    config: PoolConfig,
    broker: SimulatedBroker,
    inner: Mutex<PoolInner>,
    mode: watch::Sender<ShutdownMode>,
    exit: watch::Sender<Option<WorkerExit>>,
    defects: DefectFlag,
    slot_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PoolRef {
    fn shutting_down(&self) -> bool {
        *self.mode.borrow() != ShutdownMode::None
    }

    async fn begin_spawn(&self, index: usize) -> u64 {
        let mut inner = self.inner.lock().await;
        inner.children_spawned += 1;
        let child_id = (u64::from(self.id) << 32) | inner.children_spawned;

        let slot = &mut inner.children[index];
        slot.child_id = child_id;
        slot.state = ChildState::Spawning;
        slot.sentinel = None;
        slot.tasks_done = 0;

        child_id
    }

    async fn finish_spawn(&self, index: usize) {
        let mut inner = self.inner.lock().await;
        let slot = &mut inner.children[index];
        slot.state = ChildState::Running;
        slot.sentinel = Some(Sentinel(slot.child_id));

        if inner.state == PoolState::Starting {
            inner.state = PoolState::Running;
        }
    }

    async fn complete_job(&self, index: usize) {
        let mut inner = self.inner.lock().await;
        inner.jobs_completed += 1;
        inner.children[index].tasks_done += 1;
    }

    async fn set_child_state(&self, index: usize, state: ChildState) {
        let mut inner = self.inner.lock().await;
        let slot = &mut inner.children[index];
        slot.state = state;
        if state == ChildState::Exited {
            slot.sentinel = None;
        }
    }

    /// Keeps one slot populated until shutdown.
    async fn run_slot(self: Arc<Self>, index: usize) {
        let mut mode_rx = self.mode.subscribe();
        let timings = self.config.timings;

        while !self.shutting_down() {
            let child_id = self.begin_spawn(index).await;
            debug!("Pool {} slot {}: spawning child {}", self.id, index, child_id);

            sleep(timings.spawn_delay).await;
            self.finish_spawn(index).await;

            let mut done = 0;
            while done < self.config.max_tasks_per_child {
                let job = tokio::select! {
                    biased;

                    _ = stopping(&mut mode_rx) => None,
                    job = self.broker.pop() => Some(job),
                };
                let Some(job) = job else { break };

                sleep(timings.job_delay).await;
                let _ = job.compute();
                self.complete_job(index).await;
                done += 1;
            }

            self.set_child_state(index, ChildState::Draining).await;
            sleep(timings.recycle_delay).await;
            self.set_child_state(index, ChildState::Exited).await;
            debug!("Pool {} slot {}: child {} retired", self.id, index, child_id);
        }
    }

    /// Tears the pool down without waiting, polling every live child's sentinel.
    async fn cold_shutdown(&self) -> WorkerExit {
        let faults: Vec<PoolFault> = {
            let mut inner = self.inner.lock().await;
            inner.state = PoolState::Draining;

            let faults: Vec<PoolFault> = inner
                .children
                .iter()
                .filter_map(|slot| slot.poll_sentinel().err())
                .collect();
            inner.faults.extend(faults.iter().copied());
            faults
        };

        for handle in self.slot_handles.lock().await.drain(..) {
            handle.abort();
        }

        for fault in &faults {
            error!("Pool {}: {}", self.id, fault);
            self.defects.raise();
        }

        self.mark_exited().await;

        if faults.is_empty() {
            WorkerExit::exited(0)
        } else {
            WorkerExit::exited(1)
        }
    }

    /// Lets every slot finish its current step, then exits.
    async fn warm_shutdown(&self) -> WorkerExit {
        self.inner.lock().await.state = PoolState::Draining;

        let handles: Vec<JoinHandle<()>> = self.slot_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        self.mark_exited().await;
        WorkerExit::exited(0)
    }

    async fn mark_exited(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = PoolState::Exited;
        for slot in inner.children.iter_mut() {
            slot.state = ChildState::Exited;
            slot.sentinel = None;
        }
    }

    fn finish(&self, exit: WorkerExit) {
        // First exit wins; a kill racing a warm shutdown must not be overwritten
        self.exit.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(exit);
                true
            } else {
                false
            }
        });
    }
}

/// Resolves once any shutdown has been requested.
async fn stopping(mode_rx: &mut watch::Receiver<ShutdownMode>) {
    let _ = mode_rx.wait_for(|mode| *mode != ShutdownMode::None).await;
}

/// Handle to a running simulated pool.
pub struct SimulatedWorker {
    inner: Arc<PoolRef>,
    controller: Option<JoinHandle<()>>,
}

impl SimulatedWorker {
    /// Starts a pool with every slot spawning its first child.
    pub async fn start(id: u32, config: PoolConfig, broker: SimulatedBroker) -> Self {
        let children = (0..config.concurrency).map(ChildSlot::new).collect();
        let (mode, _) = watch::channel(ShutdownMode::None);
        let (exit, _) = watch::channel(None);

        let inner = Arc::new(PoolRef {
            id,
            config,
            broker,
            inner: Mutex::new(PoolInner {
                state: PoolState::Starting,
                children,
                faults: Vec::new(),
                jobs_completed: 0,
                children_spawned: 0,
            }),
            mode,
            exit,
            defects: DefectFlag::default(),
            slot_handles: Mutex::new(Vec::new()),
        });

        {
            let mut handles = inner.slot_handles.lock().await;
            for index in 0..inner.config.concurrency {
                handles.push(tokio::spawn(Arc::clone(&inner).run_slot(index)));
            }
        }

        info!(
            "Simulated pool {} started (concurrency={}, max tasks per child={})",
            id, inner.config.concurrency, inner.config.max_tasks_per_child
        );

        Self {
            inner,
            controller: None,
        }
    }

    /// Launch number of this pool, starting at 1.
    pub fn id(&self) -> u32 {
        self.inner.id
    }

    /// Current pool state, children, and recorded faults.
    pub async fn snapshot(&self) -> PoolSnapshot {
        let inner = self.inner.inner.lock().await;
        PoolSnapshot {
            state: inner.state,
            children: inner.children.clone(),
            faults: inner.faults.clone(),
            jobs_completed: inner.jobs_completed,
            children_spawned: inner.children_spawned,
        }
    }
}

impl WorkerHandle for SimulatedWorker {
    fn pid(&self) -> Option<u32> {
        None
    }

    /// Cold shutdown completes before this returns; warm shutdown runs in the background.
    async fn signal(&mut self, signal: ShutdownSignal) -> Result<bool, Error> {
        if self.inner.exit.borrow().is_some() {
            return Ok(false);
        }
        if self.inner.config.signal_handling == SignalHandling::Ignore {
            return Ok(true);
        }

        match signal {
            ShutdownSignal::Cold => {
                self.inner.mode.send_replace(ShutdownMode::Cold);
                let exit = self.inner.cold_shutdown().await;
                self.inner.finish(exit);
            }
            ShutdownSignal::Warm => {
                if *self.inner.mode.borrow() != ShutdownMode::None {
                    return Ok(true);
                }
                self.inner.mode.send_replace(ShutdownMode::Warm);

                let inner = Arc::clone(&self.inner);
                self.controller = Some(tokio::spawn(async move {
                    let exit = inner.warm_shutdown().await;
                    inner.finish(exit);
                }));
            }
        }

        Ok(true)
    }

    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<WorkerExit>, Error> {
        let mut exit_rx = self.inner.exit.subscribe();

        let waited = match tokio::time::timeout(timeout, exit_rx.wait_for(Option::is_some)).await
        {
            Ok(Ok(exit)) => *exit,
            // The sender lives in `self.inner`, so it cannot be dropped while we wait
            Ok(Err(_)) => *self.inner.exit.borrow(),
            Err(_) => None,
        };

        Ok(waited)
    }

    fn try_exit(&mut self) -> Result<Option<WorkerExit>, Error> {
        Ok(*self.inner.exit.borrow())
    }

    async fn kill(&mut self) -> Result<WorkerExit, Error> {
        if let Some(exit) = *self.inner.exit.borrow() {
            return Ok(exit);
        }

        if let Some(controller) = self.controller.take() {
            controller.abort();
        }
        for handle in self.inner.slot_handles.lock().await.drain(..) {
            handle.abort();
        }

        self.inner.mark_exited().await;
        self.inner.finish(WorkerExit::signaled(SIGKILL));

        Ok(self.try_exit()?.unwrap_or(WorkerExit::signaled(SIGKILL)))
    }

    async fn terminate(&mut self) -> Result<WorkerExit, Error> {
        self.signal(ShutdownSignal::Warm).await?;

        let mut exit_rx = self.inner.exit.subscribe();
        let exit = match exit_rx.wait_for(Option::is_some).await {
            Ok(exit) => *exit,
            Err(_) => *self.inner.exit.borrow(),
        };

        match exit {
            Some(exit) => Ok(exit),
            None => self.kill().await,
        }
    }

    fn take_defect(&mut self) -> bool {
        self.inner.defects.take()
    }
}

impl Drop for SimulatedWorker {
    fn drop(&mut self) {
        // Mirror kill_on_drop for real workers: no slot task outlives its handle
        if let Some(controller) = self.controller.take() {
            controller.abort();
        }
        if let Ok(mut handles) = self.inner.slot_handles.try_lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }
}

/// Launches simulated pools that all consume from one broker.
#[derive(Clone)]
pub struct SimulatedLauncher {
    config: PoolConfig,
    broker: SimulatedBroker,
    launched: Arc<AtomicU32>,
}

impl SimulatedLauncher {
    pub fn new(config: PoolConfig, broker: SimulatedBroker) -> Self {
        Self {
            config,
            broker,
            launched: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of pools launched so far (initial launch plus restarts).
    pub fn launched(&self) -> u32 {
        self.launched.load(Ordering::Relaxed)
    }

    pub fn broker(&self) -> &SimulatedBroker {
        &self.broker
    }
}

impl WorkerLauncher for SimulatedLauncher {
    type Handle = SimulatedWorker;

    async fn launch(&self) -> Result<SimulatedWorker, Error> {
        let id = self.launched.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SimulatedWorker::start(id, self.config.clone(), self.broker.clone()).await)
    }
}
