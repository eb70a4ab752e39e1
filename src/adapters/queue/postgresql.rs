//! PostgreSQL delay queue
//!
//! Messages are rows with a `visible_at` timestamp. Receiving claims rows with
//! `FOR UPDATE SKIP LOCKED` and pushes their visibility forward, so concurrent
//! pollers never receive the same message inside one visibility window.

use super::traits::{DelayQueue, QueuedMessage};
use crate::adapters::postgresql::PostgreSQLClient;
use crate::domain::event::RetryMessage;
use crate::domain::{deadline, GateError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn queue_err(e: GateError) -> GateError {
    match e {
        GateError::Queue(_) => e,
        other => GateError::Queue(other.to_string()),
    }
}

/// Delay queue on a PostgreSQL table
pub struct PostgresDelayQueue {
    client: Arc<PostgreSQLClient>,
    publish_sql: String,
    receive_sql: String,
    ack_sql: String,
    max_delay: Duration,
    visibility_timeout: Duration,
}

impl PostgresDelayQueue {
    /// Creates a queue over the `retry_queue` table
    pub fn new(
        client: Arc<PostgreSQLClient>,
        retry_queue: &str,
        max_delay: Duration,
        visibility_timeout: Duration,
    ) -> Self {
        Self {
            client,
            publish_sql: format!(
                "INSERT INTO {retry_queue} (id, table_id, body, visible_at, enqueued_at, receive_count) \
                 VALUES ($1, $2, $3, $4, $5, 0)"
            ),
            receive_sql: format!(
                "UPDATE {retry_queue} SET visible_at = $2::BIGINT + $3::BIGINT, receive_count = receive_count + 1 \
                 WHERE id IN (\
                     SELECT id FROM {retry_queue} WHERE visible_at <= $2 \
                     ORDER BY visible_at, enqueued_at LIMIT $1 FOR UPDATE SKIP LOCKED\
                 ) RETURNING id, body, receive_count"
            ),
            ack_sql: format!("DELETE FROM {retry_queue} WHERE id = $1"),
            max_delay,
            visibility_timeout,
        }
    }
}

#[async_trait]
impl DelayQueue for PostgresDelayQueue {
    async fn publish(&self, message: &RetryMessage, delay: Duration, now: i64) -> Result<String> {
        if delay > self.max_delay {
            return Err(GateError::Queue(format!(
                "delay {}s exceeds channel maximum {}s",
                delay.as_secs(),
                self.max_delay.as_secs()
            )));
        }

        let id = Uuid::new_v4();
        let body = message.to_json();
        let visible_at = deadline(now, delay)?;

        self.client
            .execute(
                "publish",
                &self.publish_sql,
                &[&id, &message.table_id.as_str(), &body, &visible_at, &now],
            )
            .await
            .map_err(queue_err)?;

        Ok(id.to_string())
    }

    async fn receive(&self, max: usize, now: i64) -> Result<Vec<QueuedMessage>> {
        let limit = max as i64;
        let visibility = self.visibility_timeout.as_secs() as i64;

        let rows = self
            .client
            .query("receive", &self.receive_sql, &[&limit, &now, &visibility])
            .await
            .map_err(queue_err)?;

        rows.iter()
            .map(|row| {
                let id: Uuid = row
                    .try_get("id")
                    .map_err(|e| GateError::Queue(e.to_string()))?;
                let body: serde_json::Value = row
                    .try_get("body")
                    .map_err(|e| GateError::Queue(e.to_string()))?;
                let receive_count: i32 = row
                    .try_get("receive_count")
                    .map_err(|e| GateError::Queue(e.to_string()))?;

                Ok(QueuedMessage {
                    id: id.to_string(),
                    body,
                    receive_count: receive_count.max(0) as u32,
                })
            })
            .collect()
    }

    async fn ack(&self, message_id: &str) -> Result<()> {
        let id = Uuid::parse_str(message_id)
            .map_err(|e| GateError::Queue(format!("invalid message id '{message_id}': {e}")))?;

        self.client
            .execute("ack", &self.ack_sql, &[&id])
            .await
            .map_err(queue_err)?;
        Ok(())
    }

    fn max_delay(&self) -> Duration {
        self.max_delay
    }
}
