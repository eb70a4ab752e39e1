//! Delay channel carrying deferred retry signals
//!
//! - [`InMemoryDelayQueue`] for a single process and tests
//! - [`PostgresDelayQueue`] for shared deployments

pub mod memory;
pub mod postgresql;
pub mod traits;

pub use memory::InMemoryDelayQueue;
pub use postgresql::PostgresDelayQueue;
pub use traits::{DelayQueue, QueuedMessage};
