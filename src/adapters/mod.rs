//! External system integrations for Compaction Gate.
//!
//! - [`envelope`] - decoding of inbound event payloads
//! - [`store`] - lease and retry-marker store (trait-based)
//! - [`queue`] - delay channel for retry signals (trait-based)
//! - [`orchestrator`] - compaction job orchestrator (trait-based)
//! - [`postgresql`] - connection pool shared by the PostgreSQL store and queue
//! - [`factory`] - builds the configured backends
//!
//! # Design Pattern
//!
//! Each collaborator is an `async_trait` with an in-memory implementation and a
//! production one, so the core can be exercised end to end without external
//! services:
//!
//! ```rust
//! use compaction_gate::adapters::store::{InMemoryLeaseStore, LeaseStore};
//! use compaction_gate::domain::TableId;
//!
//! # async fn example() -> compaction_gate::domain::Result<()> {
//! let store = InMemoryLeaseStore::new();
//! let table = TableId::new("sales/orders").map_err(compaction_gate::domain::GateError::Validation)?;
//! assert!(store.put_lease_if_expired(&table, 1900, 1000).await?);
//! assert!(!store.put_lease_if_expired(&table, 2000, 1100).await?);
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod factory;
pub mod orchestrator;
pub mod postgresql;
pub mod queue;
pub mod store;
