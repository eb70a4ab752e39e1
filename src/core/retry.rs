//! Deferred retry scheduling
//!
//! At most one retry per table is in flight: a retry marker is claimed with a
//! conditional write before anything is published, and only the claimant
//! publishes.

use crate::adapters::queue::DelayQueue;
use crate::adapters::store::LeaseStore;
use crate::domain::event::RetryMessage;
use crate::domain::ids::TableId;
use crate::domain::table::CompactionRequest;
use crate::domain::{deadline, GateError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Schedules one delayed retry per table
#[derive(Clone)]
pub struct RetryScheduler {
    store: Arc<dyn LeaseStore>,
    queue: Arc<dyn DelayQueue>,
    buffer: Duration,
}

impl RetryScheduler {
    /// Creates a scheduler
    ///
    /// `buffer` keeps a marker alive past the retry's visibility so the retry
    /// itself clears it.
    pub fn new(store: Arc<dyn LeaseStore>, queue: Arc<dyn DelayQueue>, buffer: Duration) -> Self {
        Self {
            store,
            queue,
            buffer,
        }
    }

    /// Whether a live retry marker exists for `table_id`
    pub async fn is_pending(&self, table_id: &TableId, now: i64) -> Result<bool> {
        Ok(self
            .store
            .get_record(table_id)
            .await?
            .is_some_and(|record| record.retry_pending(now)))
    }

    /// Claims the retry marker until `now + delay + buffer`
    pub async fn mark(&self, table_id: &TableId, now: i64, delay: Duration) -> Result<bool> {
        Ok(self.claim(table_id, now, delay).await?.is_some())
    }

    async fn claim(&self, table_id: &TableId, now: i64, delay: Duration) -> Result<Option<i64>> {
        let span = delay.checked_add(self.buffer).ok_or_else(|| {
            GateError::Validation("retry delay plus buffer overflows".to_string())
        })?;
        let until = deadline(now, span)?;
        let claimed = self
            .store
            .set_retry_marker_if_expired(table_id, until, now)
            .await?;
        Ok(claimed.then_some(until))
    }

    /// Removes the retry marker for `table_id`
    ///
    /// Returns whether a marker was removed.
    pub async fn clear(&self, table_id: &TableId) -> Result<bool> {
        self.store.clear_retry_marker(table_id, None).await
    }

    /// Claims the marker and publishes a delayed retry for `request`
    ///
    /// Returns `Ok(false)` without publishing when a retry is already pending.
    /// The published delay is capped at the channel maximum. If publishing
    /// fails the marker just claimed is removed before the error is returned.
    pub async fn enqueue_retry(
        &self,
        request: &CompactionRequest,
        now: i64,
        delay: Duration,
    ) -> Result<bool> {
        let table_id = &request.table_id;

        let Some(until) = self.claim(table_id, now, delay).await? else {
            tracing::debug!(table_id = %table_id, "Retry already pending");
            return Ok(false);
        };

        let message = RetryMessage::new(
            table_id.clone(),
            Some(request.fully_qualified_name.clone()),
            request.bucket.clone(),
        );
        let capped = delay.min(self.queue.max_delay());

        match self.queue.publish(&message, capped, now).await {
            Ok(message_id) => {
                tracing::info!(
                    table_id = %table_id,
                    message_id = %message_id,
                    delay_seconds = capped.as_secs(),
                    retry_queued_until = until,
                    "Retry enqueued"
                );
                Ok(true)
            }
            Err(publish_error) => {
                if let Err(e) = self.store.clear_retry_marker(table_id, Some(until)).await {
                    tracing::warn!(
                        table_id = %table_id,
                        error = %e,
                        "Failed to remove retry marker after publish failure"
                    );
                }
                Err(publish_error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::queue::{InMemoryDelayQueue, QueuedMessage};
    use crate::adapters::store::InMemoryLeaseStore;
    use crate::domain::table::TableIdentity;
    use crate::domain::GateError;
    use async_trait::async_trait;

    struct FailingQueue;

    #[async_trait]
    impl DelayQueue for FailingQueue {
        async fn publish(&self, _: &RetryMessage, _: Duration, _: i64) -> Result<String> {
            Err(GateError::Queue("channel unavailable".to_string()))
        }

        async fn receive(&self, _: usize, _: i64) -> Result<Vec<QueuedMessage>> {
            Ok(Vec::new())
        }

        async fn ack(&self, _: &str) -> Result<()> {
            Ok(())
        }

        fn max_delay(&self) -> Duration {
            Duration::from_secs(900)
        }
    }

    fn request() -> CompactionRequest {
        let identity = TableIdentity::new(TableId::new("sales/orders").unwrap(), "cat.sales.orders");
        CompactionRequest::new(&identity, "lake", None)
    }

    fn scheduler() -> (RetryScheduler, Arc<InMemoryDelayQueue>) {
        let queue = Arc::new(InMemoryDelayQueue::new(
            Duration::from_secs(900),
            Duration::from_secs(120),
        ));
        let scheduler = RetryScheduler::new(
            Arc::new(InMemoryLeaseStore::new()),
            queue.clone(),
            Duration::from_secs(60),
        );
        (scheduler, queue)
    }

    #[tokio::test]
    async fn test_two_enqueues_publish_once() {
        let (scheduler, queue) = scheduler();
        let delay = Duration::from_secs(300);

        assert!(scheduler.enqueue_retry(&request(), 1000, delay).await.unwrap());
        assert!(!scheduler.enqueue_retry(&request(), 1010, delay).await.unwrap());
        assert_eq!(queue.len(), 1);

        let table = TableId::new("sales/orders").unwrap();
        assert!(scheduler.is_pending(&table, 1360).await.unwrap());
        assert!(!scheduler.is_pending(&table, 1361).await.unwrap());
    }

    #[tokio::test]
    async fn test_marker_expiry_allows_new_retry() {
        let (scheduler, queue) = scheduler();
        let delay = Duration::from_secs(300);

        assert!(scheduler.enqueue_retry(&request(), 1000, delay).await.unwrap());
        assert!(scheduler.enqueue_retry(&request(), 1361, delay).await.unwrap());
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_allows_new_retry() {
        let (scheduler, _queue) = scheduler();
        let table = TableId::new("sales/orders").unwrap();

        assert!(scheduler.mark(&table, 1000, Duration::from_secs(300)).await.unwrap());
        assert!(scheduler.clear(&table).await.unwrap());
        assert!(!scheduler.clear(&table).await.unwrap());
        assert!(scheduler.mark(&table, 1001, Duration::from_secs(300)).await.unwrap());
    }

    #[tokio::test]
    async fn test_delay_capped_at_channel_maximum() {
        let (scheduler, queue) = scheduler();

        assert!(scheduler
            .enqueue_retry(&request(), 1000, Duration::from_secs(3600))
            .await
            .unwrap());

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1, 1900);
        assert_eq!(snapshot[0].0["fully_qualified_name"], "cat.sales.orders");
        assert_eq!(snapshot[0].0["schema_version"], 2);

        // marker keeps the uncapped delay plus buffer
        let table = TableId::new("sales/orders").unwrap();
        assert!(scheduler.is_pending(&table, 1000 + 3600 + 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_publish_failure_removes_marker() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let scheduler = RetryScheduler::new(store.clone(), Arc::new(FailingQueue), Duration::from_secs(60));
        let table = TableId::new("sales/orders").unwrap();

        let err = scheduler
            .enqueue_retry(&request(), 1000, Duration::from_secs(300))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Queue(_)));
        assert!(!scheduler.is_pending(&table, 1000).await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_delay_claims_nothing() {
        let (scheduler, queue) = scheduler();
        let table = TableId::new("sales/orders").unwrap();

        let err = scheduler
            .mark(&table, i64::MAX - 10, Duration::from_secs(300))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));
        assert!(scheduler
            .enqueue_retry(&request(), 1000, Duration::MAX)
            .await
            .is_err());
        assert!(queue.is_empty());
        assert!(!scheduler.is_pending(&table, 1000).await.unwrap());
    }
}
