//! In-memory lease store
//!
//! Single-process only. A write lock is held for the whole of each
//! conditional write, which makes every operation atomic per key.

use super::traits::{LeaseRecord, LeaseStore};
use crate::domain::errors::StoreError;
use crate::domain::ids::TableId;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Poisoned
}

/// Lease store backed by a `RwLock`-guarded map
#[derive(Debug, Default)]
pub struct InMemoryLeaseStore {
    records: RwLock<BTreeMap<TableId, LeaseRecord>>,
}

impl InMemoryLeaseStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn put_lease_if_expired(
        &self,
        table_id: &TableId,
        lock_until: i64,
        now: i64,
    ) -> Result<bool> {
        let mut records = self.records.write().map_err(poison_err)?;
        let record = records
            .entry(table_id.clone())
            .or_insert_with(|| LeaseRecord::empty(table_id.clone()));

        if matches!(record.lock_until, Some(current) if current >= now) {
            return Ok(false);
        }

        record.lock_until = Some(lock_until);
        Ok(true)
    }

    async fn release_lease(&self, table_id: &TableId, lock_until: i64) -> Result<bool> {
        let mut records = self.records.write().map_err(poison_err)?;

        match records.get_mut(table_id) {
            Some(record) if record.lock_until == Some(lock_until) => {
                record.lock_until = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_retry_marker_if_expired(
        &self,
        table_id: &TableId,
        until: i64,
        now: i64,
    ) -> Result<bool> {
        let mut records = self.records.write().map_err(poison_err)?;
        let record = records
            .entry(table_id.clone())
            .or_insert_with(|| LeaseRecord::empty(table_id.clone()));

        if record.retry_pending(now) {
            return Ok(false);
        }

        record.retry_queued_until = Some(until);
        Ok(true)
    }

    async fn clear_retry_marker(&self, table_id: &TableId, expected: Option<i64>) -> Result<bool> {
        let mut records = self.records.write().map_err(poison_err)?;

        let Some(record) = records.get_mut(table_id) else {
            return Ok(false);
        };

        if record.retry_queued_until.is_none() {
            return Ok(false);
        }
        if expected.is_some() && record.retry_queued_until != expected {
            return Ok(false);
        }

        record.retry_queued_until = None;
        Ok(true)
    }

    async fn get_record(&self, table_id: &TableId) -> Result<Option<LeaseRecord>> {
        let records = self.records.read().map_err(poison_err)?;
        Ok(records.get(table_id).cloned())
    }

    async fn list_records(&self) -> Result<Vec<LeaseRecord>> {
        let records = self.records.read().map_err(poison_err)?;
        Ok(records.values().cloned().collect())
    }
}
