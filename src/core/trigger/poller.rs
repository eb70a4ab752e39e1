//! Delay channel poller
//!
//! Pulls visible retry messages and feeds them to the [`BatchCoordinator`] as
//! retry signals. A message is acknowledged once its table reached a terminal
//! outcome; it is left for redelivery only when the table failed and no new
//! retry could be enqueued in its place.

use super::coordinator::BatchCoordinator;
use super::summary::{InvocationResult, TableOutcome};
use crate::adapters::queue::{DelayQueue, QueuedMessage};
use crate::config::PollConfig;
use crate::domain::event::{ChangeEvent, RetryMessage};
use crate::domain::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Summary of one poll cycle
#[derive(Debug, Clone, Default)]
pub struct PollReport {
    /// Messages received
    pub received: usize,
    /// Messages acknowledged
    pub acknowledged: usize,
    /// Messages that could not be decoded (acknowledged and dropped)
    pub dropped: usize,
    /// Result of processing the decoded retry signals, if any
    pub result: Option<InvocationResult>,
}

/// Polls the delay channel and processes retry signals
pub struct RetryPoller {
    coordinator: Arc<BatchCoordinator>,
    queue: Arc<dyn DelayQueue>,
    batch_size: usize,
    interval: Duration,
}

impl RetryPoller {
    /// Creates a poller
    pub fn new(
        coordinator: Arc<BatchCoordinator>,
        queue: Arc<dyn DelayQueue>,
        config: &PollConfig,
    ) -> Self {
        Self {
            coordinator,
            queue,
            batch_size: config.batch_size,
            interval: Duration::from_secs(config.interval_seconds),
        }
    }

    /// Receives and processes one batch of visible messages at `now`
    pub async fn poll_once(&self, now: i64) -> Result<PollReport> {
        let messages = self.queue.receive(self.batch_size, now).await?;
        let mut report = PollReport {
            received: messages.len(),
            ..PollReport::default()
        };

        if messages.is_empty() {
            return Ok(report);
        }

        let mut decoded: Vec<(QueuedMessage, RetryMessage)> = Vec::with_capacity(messages.len());
        for message in messages {
            match RetryMessage::from_json(&message.body) {
                Ok(retry) => decoded.push((message, retry)),
                Err(e) => {
                    tracing::error!(
                        message_id = %message.id,
                        receive_count = message.receive_count,
                        error = %e,
                        "Dropping undecodable retry message"
                    );
                    self.queue.ack(&message.id).await?;
                    report.dropped += 1;
                    report.acknowledged += 1;
                }
            }
        }

        if decoded.is_empty() {
            return Ok(report);
        }

        let events = decoded
            .iter()
            .map(|(_, retry)| ChangeEvent::RetrySignal(retry.clone()))
            .collect();
        let result = self.coordinator.process_events(events, now).await?;

        for (message, retry) in &decoded {
            let redeliver = matches!(
                result.outcome_for(&retry.table_id),
                Some(TableOutcome::Failed {
                    retry_queued: false,
                    ..
                })
            );

            if redeliver {
                tracing::warn!(
                    message_id = %message.id,
                    table_id = %retry.table_id,
                    "Leaving retry message for redelivery"
                );
                continue;
            }

            self.queue.ack(&message.id).await?;
            report.acknowledged += 1;
        }

        report.result = Some(result);
        Ok(report)
    }

    /// Polls until `shutdown` turns true
    ///
    /// Errors from one cycle are logged and the loop keeps going.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            batch_size = self.batch_size,
            interval_seconds = self.interval.as_secs(),
            "Retry poller started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = chrono::Utc::now().timestamp();
            match self.poll_once(now).await {
                Ok(report) if report.received > 0 => {
                    tracing::info!(
                        received = report.received,
                        acknowledged = report.acknowledged,
                        dropped = report.dropped,
                        "Poll cycle completed"
                    );
                }
                Ok(_) => tracing::trace!("No visible retry messages"),
                Err(e) => tracing::error!(error = %e, "Poll cycle failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Retry poller stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::orchestrator::RecordingOrchestrator;
    use crate::adapters::queue::InMemoryDelayQueue;
    use crate::adapters::store::InMemoryLeaseStore;
    use crate::config::load_config_from_str;
    use crate::domain::ids::TableId;

    fn poller(queue: Arc<InMemoryDelayQueue>, orchestrator: Arc<RecordingOrchestrator>) -> RetryPoller {
        let config = load_config_from_str(
            r#"
[orchestrator]
identifier = "wf"

[store]
backend = "memory"
"#,
        )
        .unwrap();

        let coordinator = BatchCoordinator::new(
            &config,
            Arc::new(InMemoryLeaseStore::new()),
            queue.clone(),
            orchestrator,
        )
        .unwrap();
        RetryPoller::new(Arc::new(coordinator), queue, &config.poll)
    }

    #[tokio::test]
    async fn test_invisible_messages_not_processed() {
        let queue = Arc::new(InMemoryDelayQueue::default());
        let orchestrator = Arc::new(RecordingOrchestrator::new());
        let poller = poller(queue.clone(), orchestrator.clone());

        let message = RetryMessage::new(TableId::new("sales/orders").unwrap(), None, "lake");
        queue
            .publish(&message, Duration::from_secs(300), 1000)
            .await
            .unwrap();

        let report = poller.poll_once(1299).await.unwrap();
        assert_eq!(report.received, 0);
        assert!(orchestrator.executions().is_empty());

        let report = poller.poll_once(1300).await.unwrap();
        assert_eq!(report.received, 1);
        assert_eq!(report.acknowledged, 1);
        assert_eq!(orchestrator.started_tables(), vec!["sales/orders"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_failed_dispatch_with_retry_is_acknowledged() {
        let queue = Arc::new(InMemoryDelayQueue::default());
        let orchestrator = Arc::new(RecordingOrchestrator::new());
        let table = TableId::new("sales/orders").unwrap();
        orchestrator.fail_for(&table);
        let poller = poller(queue.clone(), orchestrator);

        queue
            .publish(&RetryMessage::new(table, None, "lake"), Duration::ZERO, 1000)
            .await
            .unwrap();

        let report = poller.poll_once(1000).await.unwrap();
        assert_eq!(report.acknowledged, 1);
        // replaced by the retry enqueued after the failure
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_message_dropped() {
        let queue = Arc::new(InMemoryDelayQueue::default());
        let poller = poller(queue.clone(), Arc::new(RecordingOrchestrator::new()));

        queue.push_raw(serde_json::json!({"unexpected": true}), 1000);

        let report = poller.poll_once(1000).await.unwrap();
        assert_eq!(report.dropped, 1);
        assert!(report.result.is_none());
        assert!(queue.is_empty());
    }
}
