//! Domain models and types for Compaction Gate.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`TableId`])
//! - **Normalized events** ([`ChangeEvent`], [`RetryMessage`])
//! - **Table models** ([`TableIdentity`], [`CompactionRequest`], [`JobHandle`])
//! - **Error types** ([`GateError`], [`EnvelopeError`], [`StoreError`], [`DispatchError`])
//! - **Result type alias** ([`Result`])
//!
//! # Example
//!
//! ```rust
//! use compaction_gate::domain::{CompactionRequest, TableId, TableIdentity};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = TableIdentity::new(TableId::new("sales/orders")?, "cat.sales.orders");
//! let request = CompactionRequest::new(&identity, "lake", None);
//! assert_eq!(request.warehouse_location, "s3://lake/");
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod event;
pub mod ids;
pub mod result;
pub mod table;
pub mod time;

// Re-export commonly used types for convenience
pub use errors::{DispatchError, EnvelopeError, GateError, StoreError};
pub use event::{ChangeEvent, RetryMessage, RetryMessageSchema};
pub use ids::TableId;
pub use result::Result;
pub use table::{CompactionRequest, JobHandle, TableIdentity};
pub use time::deadline;
