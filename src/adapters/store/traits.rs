//! Lease store abstraction
//!
//! The store holds one record per table with two independently updated
//! timestamps: the lease (`lock_until`) and the retry marker
//! (`retry_queued_until`). Every mutation is a single conditional write; a
//! rejected condition is reported as `Ok(false)`, never as an error.

use crate::domain::ids::TableId;
use crate::domain::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One row of the lease store (epoch seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseRecord {
    /// Table the record belongs to
    pub table_id: TableId,

    /// Lease expiry; `None` when no lease was ever written or it was released
    pub lock_until: Option<i64>,

    /// Retry marker expiry; `None` when no retry is pending
    pub retry_queued_until: Option<i64>,
}

impl LeaseRecord {
    /// Creates an empty record for a table
    pub fn empty(table_id: TableId) -> Self {
        Self {
            table_id,
            lock_until: None,
            retry_queued_until: None,
        }
    }

    /// Whether the lease is valid at `now`
    pub fn lease_active(&self, now: i64) -> bool {
        self.lock_until.is_some_and(|until| until >= now)
    }

    /// Whether the retry marker is live at `now`
    pub fn retry_pending(&self, now: i64) -> bool {
        self.retry_queued_until.is_some_and(|until| until >= now)
    }
}

/// Shared store of leases and retry markers
///
/// Implementations must make each conditional write linearizable per
/// `table_id`: concurrent callers racing on the same key see exactly one
/// success.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Writes `lock_until` if the record is absent, has no lease, or its lease
    /// expired before `now`. Leaves the retry marker untouched.
    async fn put_lease_if_expired(&self, table_id: &TableId, lock_until: i64, now: i64)
        -> Result<bool>;

    /// Clears the lease only if the stored value still equals `lock_until`
    async fn release_lease(&self, table_id: &TableId, lock_until: i64) -> Result<bool>;

    /// Writes `until` as the retry marker if none is live at `now`
    async fn set_retry_marker_if_expired(&self, table_id: &TableId, until: i64, now: i64)
        -> Result<bool>;

    /// Removes the retry marker, only if it equals `expected` when one is given
    async fn clear_retry_marker(&self, table_id: &TableId, expected: Option<i64>) -> Result<bool>;

    /// Reads one record
    async fn get_record(&self, table_id: &TableId) -> Result<Option<LeaseRecord>>;

    /// Reads every record, ordered by table id
    async fn list_records(&self) -> Result<Vec<LeaseRecord>>;

    /// Creates backing tables if needed
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    /// Checks the store is reachable
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}
