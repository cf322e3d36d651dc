//! Redis fixture for broker queue tests.

use fred::prelude::*;
use uuid::Uuid;

use crate::TestError;

/// Local Redis address the `redis-test` suite runs against.
const REDIS_URL: &str = "redis://127.0.0.1:6379";

/// A connection to the local test Redis plus a broker list owned by one test.
///
/// Every instance gets its own list key, so tests enqueueing in parallel never see each
/// other's messages. Call [`RedisTest::cleanup`] at the end of a test; dropping an instance
/// without it only schedules the delete on the current runtime.
pub struct RedisTest {
    pub redis_pool: Pool,
    queue_name: String,
}

impl RedisTest {
    /// Connects to the test Redis and reserves a fresh list key.
    pub async fn new() -> Result<Self, TestError> {
        let pool = Pool::new(Config::from_url(REDIS_URL)?, None, None, None, 2)?;
        pool.init().await?;

        Ok(Self {
            redis_pool: pool,
            queue_name: format!("churn-test:{}:celery", Uuid::new_v4().simple()),
        })
    }

    /// List key to configure the queue under test with.
    pub fn queue_name(&self) -> String {
        self.queue_name.clone()
    }

    /// Deletes the test list and waits for Redis to confirm.
    pub async fn cleanup(self) -> Result<(), TestError> {
        self.redis_pool.del::<(), _>(self.queue_name.as_str()).await?;
        Ok(())
    }
}

impl Drop for RedisTest {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let pool = self.redis_pool.clone();
        let key = std::mem::take(&mut self.queue_name);
        runtime.spawn(async move {
            let _: Result<(), fred::error::Error> = pool.del(key.as_str()).await;
        });
    }
}
