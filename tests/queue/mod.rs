pub mod len;

use churn_repro::queue::{JobQueue, QueueConfig};
use churn_test_utils::RedisTest;

pub fn setup_test_queue(redis: &RedisTest) -> JobQueue {
    let config = QueueConfig {
        queue_name: redis.queue_name(),
        ..QueueConfig::default()
    };

    JobQueue::with_config(redis.redis_pool.clone(), config)
}
