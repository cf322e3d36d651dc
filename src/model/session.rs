//! The worker session threaded through the driver loop.

use std::time::{Duration, Instant};

/// The currently running worker together with its restart generation.
///
/// Each attempt takes the session by value and hands back either a session for the next
/// attempt (possibly wrapping a freshly restarted worker) or nothing once the worker is gone
/// for good. A session is only valid between spawn and confirmed exit of its handle.
#[derive(Debug)]
pub struct WorkerSession<H> {
    handle: H,
    generation: u32,
    started_at: Instant,
}

impl<H> WorkerSession<H> {
    /// Wraps a freshly launched worker handle.
    ///
    /// # Arguments
    /// - `handle` - Handle to the launched worker
    /// - `generation` - 0 for the first worker, incremented on every restart
    pub fn new(handle: H, generation: u32) -> Self {
        Self {
            handle,
            generation,
            started_at: Instant::now(),
        }
    }

    /// Replaces the worker with a restarted one, bumping the generation.
    pub fn restarted(self, handle: H) -> Self {
        Self::new(handle, self.generation + 1)
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Consumes the session, returning the handle.
    pub fn into_handle(self) -> H {
        self.handle
    }
}
