//! In-memory delay queue for a single process and tests

use super::traits::{DelayQueue, QueuedMessage};
use crate::domain::event::RetryMessage;
use crate::domain::{deadline, GateError, Result};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

fn poison_err<T>(_: PoisonError<T>) -> GateError {
    GateError::Queue("queue lock poisoned".to_string())
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    body: serde_json::Value,
    visible_at: i64,
    receive_count: u32,
}

/// Delay queue held in a `Mutex`-guarded vector, in publish order
#[derive(Debug)]
pub struct InMemoryDelayQueue {
    entries: Mutex<Vec<Entry>>,
    max_delay: Duration,
    visibility_timeout: Duration,
}

impl Default for InMemoryDelayQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(900), Duration::from_secs(120))
    }
}

impl InMemoryDelayQueue {
    /// Creates an empty queue
    pub fn new(max_delay: Duration, visibility_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_delay,
            visibility_timeout,
        }
    }

    /// Number of messages not yet acknowledged
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the queue holds no messages
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueues a body as-is, visible from `visible_at`
    ///
    /// Lets legacy or malformed messages be injected without encoding.
    pub fn push_raw(&self, body: serde_json::Value, visible_at: i64) -> String {
        let id = Uuid::new_v4().to_string();
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(Entry {
                id: id.clone(),
                body,
                visible_at,
                receive_count: 0,
            });
        }
        id
    }

    /// Bodies of all unacknowledged messages with their visibility time
    pub fn snapshot(&self) -> Vec<(serde_json::Value, i64)> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.body.clone(), e.visible_at))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DelayQueue for InMemoryDelayQueue {
    async fn publish(&self, message: &RetryMessage, delay: Duration, now: i64) -> Result<String> {
        if delay > self.max_delay {
            return Err(GateError::Queue(format!(
                "delay {}s exceeds channel maximum {}s",
                delay.as_secs(),
                self.max_delay.as_secs()
            )));
        }

        let visible_at = deadline(now, delay)?;
        let id = Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().map_err(poison_err)?;
        entries.push(Entry {
            id: id.clone(),
            body: message.to_json(),
            visible_at,
            receive_count: 0,
        });
        Ok(id)
    }

    async fn receive(&self, max: usize, now: i64) -> Result<Vec<QueuedMessage>> {
        let mut entries = self.entries.lock().map_err(poison_err)?;
        let hidden_until = deadline(now, self.visibility_timeout)?;

        let mut received = Vec::new();
        for entry in entries.iter_mut().filter(|e| e.visible_at <= now).take(max) {
            entry.visible_at = hidden_until;
            entry.receive_count += 1;
            received.push(QueuedMessage {
                id: entry.id.clone(),
                body: entry.body.clone(),
                receive_count: entry.receive_count,
            });
        }
        Ok(received)
    }

    async fn ack(&self, message_id: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(poison_err)?;
        entries.retain(|e| e.id != message_id);
        Ok(())
    }

    fn max_delay(&self) -> Duration {
        self.max_delay
    }
}
