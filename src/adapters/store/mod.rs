//! Lease store: one record per table holding the lease and the retry marker
//!
//! - [`InMemoryLeaseStore`] for a single process and tests
//! - [`PostgresLeaseStore`] for deployments where several processes share leases

pub mod memory;
pub mod postgresql;
pub mod traits;

pub use memory::InMemoryLeaseStore;
pub use postgresql::PostgresLeaseStore;
pub use traits::{LeaseRecord, LeaseStore};
