//! Broker queue configuration.
//!
//! This module provides the `QueueConfig` struct naming the Redis list the worker consumes from
//! and the task each pushed message invokes.

const DEFAULT_QUEUE_NAME: &str = "celery";
const DEFAULT_TASK_NAME: &str = "tasks.churn_task";

/// Configuration for the broker queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Redis list key, which doubles as the routing key in each message
    pub queue_name: String,
    /// Registered task name the worker dispatches each message to
    pub task_name: String,
}

impl QueueConfig {
    fn new() -> Self {
        Self {
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            task_name: DEFAULT_TASK_NAME.to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}
