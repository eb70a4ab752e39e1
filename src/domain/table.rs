//! Resolved table identity, compaction requests and job handles

use crate::domain::ids::TableId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical identity of a logical table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentity {
    /// Storage-prefix identifier, key of the lease record
    pub table_id: TableId,

    /// Catalog-qualified name, e.g. `glue_catalog.sales.orders`
    pub fully_qualified_name: String,
}

impl TableIdentity {
    /// Creates a table identity
    pub fn new(table_id: TableId, fully_qualified_name: impl Into<String>) -> Self {
        Self {
            table_id,
            fully_qualified_name: fully_qualified_name.into(),
        }
    }
}

/// Parameters handed to the orchestrator for one table
///
/// Constructed once per table per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionRequest {
    /// Table to compact
    pub table_id: TableId,

    /// Catalog-qualified table name
    pub fully_qualified_name: String,

    /// Warehouse root the orchestrator should use
    pub warehouse_location: String,

    /// Bucket of the first event seen for the table in this invocation
    pub bucket: String,
}

impl CompactionRequest {
    /// Builds a request from a resolved identity
    ///
    /// When no default warehouse location is configured the bucket root is used.
    pub fn new(
        identity: &TableIdentity,
        bucket: impl Into<String>,
        default_warehouse_location: Option<&str>,
    ) -> Self {
        let bucket = bucket.into();
        let warehouse_location = match default_warehouse_location {
            Some(location) if !location.is_empty() => location.to_string(),
            _ => format!("s3://{bucket}/"),
        };

        Self {
            table_id: identity.table_id.clone(),
            fully_qualified_name: identity.fully_qualified_name.clone(),
            warehouse_location,
            bucket,
        }
    }
}

/// Handle of a started orchestrator execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Execution identifier assigned by the orchestrator
    pub execution_id: String,

    /// Fresh identifier sent with the invocation
    pub invocation_id: String,

    /// When the invocation was accepted
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> TableIdentity {
        TableIdentity::new(TableId::new("sales/orders").unwrap(), "cat.sales.orders")
    }

    #[test]
    fn test_request_uses_configured_warehouse() {
        let request = CompactionRequest::new(&identity(), "lake", Some("s3://warehouse/"));
        assert_eq!(request.warehouse_location, "s3://warehouse/");
        assert_eq!(request.bucket, "lake");
        assert_eq!(request.fully_qualified_name, "cat.sales.orders");
    }

    #[test]
    fn test_request_falls_back_to_bucket_root() {
        let request = CompactionRequest::new(&identity(), "lake", None);
        assert_eq!(request.warehouse_location, "s3://lake/");

        let request = CompactionRequest::new(&identity(), "lake", Some(""));
        assert_eq!(request.warehouse_location, "s3://lake/");
    }

    #[test]
    fn test_request_serializes_snake_case() {
        let request = CompactionRequest::new(&identity(), "lake", None);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["table_id"], "sales/orders");
        assert_eq!(json["fully_qualified_name"], "cat.sales.orders");
        assert_eq!(json["warehouse_location"], "s3://lake/");
        assert_eq!(json["bucket"], "lake");
    }
}
