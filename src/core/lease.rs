//! Lease coordination
//!
//! A lease is an exclusive, time-bounded claim on a table, taken with one
//! conditional write against the shared store. Leases are never renewed and
//! normally just expire; the only early release is the owner-checked one used
//! after a failed dispatch.

use crate::adapters::store::LeaseStore;
use crate::domain::ids::TableId;
use crate::domain::{deadline, Result};
use std::sync::Arc;
use std::time::Duration;

/// A lease held by this invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Leased table
    pub table_id: TableId,
    /// Expiry written to the store (epoch seconds)
    pub lock_until: i64,
}

/// Acquires and releases table leases
#[derive(Clone)]
pub struct LeaseCoordinator {
    store: Arc<dyn LeaseStore>,
}

impl LeaseCoordinator {
    /// Creates a coordinator over a lease store
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self { store }
    }

    /// Tries to take the lease for `table_id` until `now + ttl`
    ///
    /// Returns `Ok(None)` when another holder's lease is still valid. Store
    /// failures are returned as errors, never as contention.
    pub async fn try_acquire(
        &self,
        table_id: &TableId,
        now: i64,
        ttl: Duration,
    ) -> Result<Option<Lease>> {
        let lock_until = deadline(now, ttl)?;
        let acquired = self
            .store
            .put_lease_if_expired(table_id, lock_until, now)
            .await?;

        tracing::debug!(table_id = %table_id, acquired, lock_until, "Lease acquisition attempted");

        Ok(acquired.then(|| Lease {
            table_id: table_id.clone(),
            lock_until,
        }))
    }

    /// Whether the lease for `table_id` was acquired
    pub async fn acquire(&self, table_id: &TableId, now: i64, ttl: Duration) -> Result<bool> {
        Ok(self.try_acquire(table_id, now, ttl).await?.is_some())
    }

    /// Releases a lease this invocation holds
    ///
    /// Returns `false` if the stored lease is no longer the one written.
    pub async fn release(&self, lease: &Lease) -> Result<bool> {
        self.store
            .release_lease(&lease.table_id, lease.lock_until)
            .await
    }
}
