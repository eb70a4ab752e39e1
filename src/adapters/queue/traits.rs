//! Delay channel abstraction

use crate::domain::event::RetryMessage;
use crate::domain::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A message handed out by [`DelayQueue::receive`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    /// Identifier used to acknowledge the message
    pub id: String,

    /// Raw body as published (decoded by the consumer)
    pub body: serde_json::Value,

    /// How many times the message has been received, including this one
    pub receive_count: u32,
}

/// A channel whose messages become visible after a per-message delay
///
/// Delivery is at-least-once: a received message is hidden for the
/// visibility timeout and reappears unless it is acknowledged.
#[async_trait]
pub trait DelayQueue: Send + Sync {
    /// Publishes `message`, visible `delay` after `now` (epoch seconds)
    ///
    /// Returns the message id. Delays above [`DelayQueue::max_delay`] are rejected.
    async fn publish(&self, message: &RetryMessage, delay: Duration, now: i64) -> Result<String>;

    /// Receives up to `max` messages visible at `now`
    async fn receive(&self, max: usize, now: i64) -> Result<Vec<QueuedMessage>>;

    /// Deletes a processed message
    async fn ack(&self, message_id: &str) -> Result<()>;

    /// Largest delay the channel supports
    fn max_delay(&self) -> Duration;
}
