//! Data passed between the harness components.
//!
//! Nothing here is persisted. Jobs and task messages are fire-and-forget, the worker session
//! lives only as long as one worker process, and the run report is logged and dropped.

pub mod job;
pub mod message;
pub mod report;
pub mod session;
