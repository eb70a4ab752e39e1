//! Core business logic for Compaction Gate.
//!
//! # Modules
//!
//! - [`resolver`] - Object key to table identity resolution
//! - [`lease`] - Exclusive per-table leases
//! - [`retry`] - One deferred retry per table
//! - [`dispatch`] - Orchestrator invocation
//! - [`trigger`] - Batch coordination, retry polling and results
//!
//! # Trigger Workflow
//!
//! 1. **Decode**: Normalize the inbound payload into change events
//! 2. **Resolve**: Map delete-file keys to table ids and catalog names
//! 3. **Filter**: Apply the allowlist and drop duplicate tables
//! 4. **Lease**: Take the table lease with a conditional write
//! 5. **Dispatch**: Start one compaction execution per leased table
//! 6. **Defer**: Tables whose lease is held get one delayed retry
//!
//! # Example
//!
//! ```rust,no_run
//! use compaction_gate::adapters::factory::{create_backends, create_orchestrator};
//! use compaction_gate::config::load_config;
//! use compaction_gate::core::trigger::BatchCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("compaction-gate.toml")?;
//! let backends = create_backends(&config).await?;
//! let orchestrator = create_orchestrator(&config)?;
//!
//! let coordinator =
//!     BatchCoordinator::new(&config, backends.store, backends.queue, orchestrator)?;
//!
//! let payload = serde_json::json!({
//!     "Records": [{
//!         "s3": {
//!             "bucket": {"name": "lake"},
//!             "object": {"key": "sales/orders/data/00001-deletes.parquet"}
//!         }
//!     }]
//! });
//! let result = coordinator
//!     .process_payload(&payload, chrono::Utc::now().timestamp())
//!     .await?;
//!
//! println!("Status: {}", result.status);
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod lease;
pub mod resolver;
pub mod retry;
pub mod trigger;
