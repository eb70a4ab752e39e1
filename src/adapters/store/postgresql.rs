//! PostgreSQL lease store
//!
//! Each conditional write is one `INSERT ... ON CONFLICT DO UPDATE ... WHERE`
//! statement; the affected-row count says whether the condition held. Row
//! locking on the primary key gives single-key linearizability.

use super::traits::{LeaseRecord, LeaseStore};
use crate::adapters::postgresql::PostgreSQLClient;
use crate::domain::errors::StoreError;
use crate::domain::ids::TableId;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::Row;

struct Statements {
    acquire: String,
    release: String,
    mark: String,
    clear_expected: String,
    clear_any: String,
    get: String,
    list: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            acquire: format!(
                "INSERT INTO {table} AS t (table_id, lock_until) VALUES ($1, $2) \
                 ON CONFLICT (table_id) DO UPDATE SET lock_until = EXCLUDED.lock_until \
                 WHERE t.lock_until IS NULL OR t.lock_until < $3"
            ),
            release: format!(
                "UPDATE {table} SET lock_until = NULL WHERE table_id = $1 AND lock_until = $2"
            ),
            mark: format!(
                "INSERT INTO {table} AS t (table_id, retry_queued_until) VALUES ($1, $2) \
                 ON CONFLICT (table_id) DO UPDATE SET retry_queued_until = EXCLUDED.retry_queued_until \
                 WHERE t.retry_queued_until IS NULL OR t.retry_queued_until < $3"
            ),
            clear_expected: format!(
                "UPDATE {table} SET retry_queued_until = NULL \
                 WHERE table_id = $1 AND retry_queued_until = $2"
            ),
            clear_any: format!(
                "UPDATE {table} SET retry_queued_until = NULL \
                 WHERE table_id = $1 AND retry_queued_until IS NOT NULL"
            ),
            get: format!(
                "SELECT table_id, lock_until, retry_queued_until FROM {table} WHERE table_id = $1"
            ),
            list: format!(
                "SELECT table_id, lock_until, retry_queued_until FROM {table} ORDER BY table_id"
            ),
        }
    }
}

/// Lease store on a PostgreSQL table
pub struct PostgresLeaseStore {
    client: Arc<PostgreSQLClient>,
    lease_table: String,
    retry_queue: String,
    statements: Statements,
}

impl PostgresLeaseStore {
    /// Creates a store over `lease_table`
    ///
    /// `retry_queue` is only used by [`LeaseStore::ensure_schema`], which
    /// creates both tables from the shared migration.
    pub fn new(client: Arc<PostgreSQLClient>, lease_table: &str, retry_queue: &str) -> Self {
        Self {
            client,
            lease_table: lease_table.to_string(),
            retry_queue: retry_queue.to_string(),
            statements: Statements::new(lease_table),
        }
    }
}

fn record_from_row(operation: &'static str, row: &Row) -> Result<LeaseRecord> {
    let read_err = |e: tokio_postgres::Error| StoreError::operation(operation, e.to_string());

    let table_id: String = row.try_get("table_id").map_err(read_err)?;
    let table_id = TableId::new(table_id).map_err(|e| StoreError::operation(operation, e))?;

    Ok(LeaseRecord {
        table_id,
        lock_until: row.try_get("lock_until").map_err(read_err)?,
        retry_queued_until: row.try_get("retry_queued_until").map_err(read_err)?,
    })
}

#[async_trait]
impl LeaseStore for PostgresLeaseStore {
    async fn put_lease_if_expired(
        &self,
        table_id: &TableId,
        lock_until: i64,
        now: i64,
    ) -> Result<bool> {
        let affected = self
            .client
            .execute(
                "put_lease_if_expired",
                &self.statements.acquire,
                &[&table_id.as_str(), &lock_until, &now],
            )
            .await?;
        Ok(affected == 1)
    }

    async fn release_lease(&self, table_id: &TableId, lock_until: i64) -> Result<bool> {
        let affected = self
            .client
            .execute(
                "release_lease",
                &self.statements.release,
                &[&table_id.as_str(), &lock_until],
            )
            .await?;
        Ok(affected == 1)
    }

    async fn set_retry_marker_if_expired(
        &self,
        table_id: &TableId,
        until: i64,
        now: i64,
    ) -> Result<bool> {
        let affected = self
            .client
            .execute(
                "set_retry_marker_if_expired",
                &self.statements.mark,
                &[&table_id.as_str(), &until, &now],
            )
            .await?;
        Ok(affected == 1)
    }

    async fn clear_retry_marker(&self, table_id: &TableId, expected: Option<i64>) -> Result<bool> {
        let affected = match expected {
            Some(value) => {
                self.client
                    .execute(
                        "clear_retry_marker",
                        &self.statements.clear_expected,
                        &[&table_id.as_str(), &value],
                    )
                    .await?
            }
            None => {
                self.client
                    .execute(
                        "clear_retry_marker",
                        &self.statements.clear_any,
                        &[&table_id.as_str()],
                    )
                    .await?
            }
        };
        Ok(affected == 1)
    }

    async fn get_record(&self, table_id: &TableId) -> Result<Option<LeaseRecord>> {
        let rows = self
            .client
            .query("get_record", &self.statements.get, &[&table_id.as_str()])
            .await?;

        rows.first()
            .map(|row| record_from_row("get_record", row))
            .transpose()
    }

    async fn list_records(&self) -> Result<Vec<LeaseRecord>> {
        let rows = self
            .client
            .query("list_records", &self.statements.list, &[])
            .await?;

        rows.iter()
            .map(|row| record_from_row("list_records", row))
            .collect()
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client
            .ensure_schema(&self.lease_table, &self.retry_queue)
            .await
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_target_configured_table() {
        let statements = Statements::new("gate_locks");
        assert!(statements.acquire.starts_with("INSERT INTO gate_locks AS t"));
        assert!(statements.acquire.contains("t.lock_until < $3"));
        assert!(!statements.acquire.contains("retry_queued_until"));
        assert!(statements.mark.contains("t.retry_queued_until < $3"));
        assert!(!statements.mark.contains("SET lock_until"));
        assert!(statements.release.contains("AND lock_until = $2"));
        assert!(statements.list.ends_with("ORDER BY table_id"));
    }
}
