//! Tests for JobQueue::len, is_empty, and purge.

use churn_repro::{model::job::ChurnJob, queue::JobSink};
use churn_test_utils::RedisTest;

use super::setup_test_queue;

mod len {
    use super::*;

    /// Tests that a new queue reports length 0.
    #[tokio::test]
    async fn returns_zero_for_empty_queue() {
        let redis = RedisTest::new().await.expect("Failed to create Redis test");
        let queue = setup_test_queue(&redis);

        let len = queue.len().await.expect("Should get queue length");
        assert_eq!(len, 0, "Empty queue should have length 0");
        assert!(queue.is_empty().await.expect("Should get queue length"));

        redis.cleanup().await.expect("Failed to cleanup Redis");
    }

    /// Tests that batches accumulate since nothing consumes them.
    ///
    /// Expected: len() returns 10 after a batch of 4 and a batch of 6
    #[tokio::test]
    async fn accumulates_across_batches() {
        let redis = RedisTest::new().await.expect("Failed to create Redis test");
        let queue = setup_test_queue(&redis);
        let job = ChurnJob::default();

        queue.push_batch(&job, 4).await.expect("Push should succeed");
        queue.push_batch(&job, 6).await.expect("Push should succeed");

        let len = queue.len().await.expect("Should get queue length");
        assert_eq!(len, 10);

        redis.cleanup().await.expect("Failed to cleanup Redis");
    }

    /// Tests that single pushes count the same as batches.
    #[tokio::test]
    async fn counts_single_pushes() {
        let redis = RedisTest::new().await.expect("Failed to create Redis test");
        let queue = setup_test_queue(&redis);

        queue
            .push(&ChurnJob::default())
            .await
            .expect("Push should succeed");

        assert_eq!(queue.len().await.expect("Should get queue length"), 1);

        redis.cleanup().await.expect("Failed to cleanup Redis");
    }
}

mod purge {
    use super::*;

    /// Tests that purge drops every waiting message.
    #[tokio::test]
    async fn empties_the_queue() {
        let redis = RedisTest::new().await.expect("Failed to create Redis test");
        let queue = setup_test_queue(&redis);

        queue
            .push_batch(&ChurnJob::default(), 5)
            .await
            .expect("Push should succeed");

        assert!(queue.purge().await.expect("Purge should succeed"));
        assert!(queue.is_empty().await.expect("Should get queue length"));
        assert!(
            !queue.purge().await.expect("Purge should succeed"),
            "Purging an empty queue removes nothing"
        );

        redis.cleanup().await.expect("Failed to cleanup Redis");
    }
}
