//! Normalized change events and the versioned retry message schema
//!
//! The envelope adapter turns every supported inbound payload into a
//! [`ChangeEvent`]. Retry messages travel through the delay channel in a
//! versioned wire format ([`RetryMessageSchema`]) that is upgraded to the
//! canonical [`RetryMessage`] exactly once, at decode time.

use crate::domain::errors::EnvelopeError;
use crate::domain::ids::TableId;
use serde::{Deserialize, Serialize};

/// Current retry message schema version
pub const RETRY_MESSAGE_SCHEMA_VERSION: u32 = 2;

/// A normalized inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A storage object was written; only keys ending in the delete-file
    /// suffix are of interest
    DeleteFile {
        /// Bucket the object was written to
        bucket: String,
        /// Full object key
        key: String,
    },

    /// A deferred retry for a table whose lease was held earlier
    RetrySignal(RetryMessage),
}

impl ChangeEvent {
    /// Creates a delete-file event
    pub fn delete_file(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        ChangeEvent::DeleteFile {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether this event is a retry signal
    pub fn is_retry_signal(&self) -> bool {
        matches!(self, ChangeEvent::RetrySignal(_))
    }
}

/// Canonical retry message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryMessage {
    /// Table to retry
    pub table_id: TableId,

    /// Fully-qualified name resolved when the retry was scheduled, if known
    pub fully_qualified_name: Option<String>,

    /// Bucket of the event that caused the retry
    pub bucket: String,
}

impl RetryMessage {
    /// Creates a retry message
    pub fn new(
        table_id: TableId,
        fully_qualified_name: Option<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            table_id,
            fully_qualified_name,
            bucket: bucket.into(),
        }
    }

    /// Wire representation published to the delay channel (always current version)
    pub fn to_wire(&self) -> RetryMessageV2 {
        RetryMessageV2 {
            schema_version: RETRY_MESSAGE_SCHEMA_VERSION,
            table_id: self.table_id.as_str().to_string(),
            fully_qualified_name: self.fully_qualified_name.clone(),
            bucket: self.bucket.clone(),
        }
    }

    /// Serializes the message body for the delay channel
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.to_wire())
    }

    /// Decodes a delay channel body, upgrading legacy messages
    ///
    /// # Errors
    ///
    /// Returns an error if the body matches no known schema version or carries
    /// an invalid table id.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, EnvelopeError> {
        let schema: RetryMessageSchema =
            serde_json::from_value(body.clone()).map_err(|e| EnvelopeError::InvalidBody {
                index: 0,
                message: e.to_string(),
            })?;
        schema.upgrade()
    }
}

/// Current (v2) wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryMessageV2 {
    /// Always [`RETRY_MESSAGE_SCHEMA_VERSION`]
    pub schema_version: u32,
    /// Table to retry
    pub table_id: String,
    /// Resolved fully-qualified name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    /// Bucket of the triggering event
    pub bucket: String,
}

/// Legacy (unversioned) wire format: `{table_id, bucket}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryMessageV1 {
    /// Table to retry
    pub table_id: String,
    /// Bucket of the triggering event
    pub bucket: String,
    /// Present on some producers that predate versioning
    #[serde(default)]
    pub fully_qualified_name: Option<String>,
}

/// Any known retry message wire version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RetryMessageSchema {
    /// Versioned message
    V2(RetryMessageV2),
    /// Legacy message without a schema version
    V1(RetryMessageV1),
}

impl RetryMessageSchema {
    /// Upgrades any wire version to the canonical message
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported schema version or an empty table id.
    pub fn upgrade(self) -> Result<RetryMessage, EnvelopeError> {
        let (table_id, fully_qualified_name, bucket) = match self {
            RetryMessageSchema::V2(msg) => {
                if msg.schema_version != RETRY_MESSAGE_SCHEMA_VERSION {
                    return Err(EnvelopeError::InvalidField {
                        field: "schema_version",
                        message: format!("unsupported version {}", msg.schema_version),
                    });
                }
                (msg.table_id, msg.fully_qualified_name, msg.bucket)
            }
            RetryMessageSchema::V1(msg) => (msg.table_id, msg.fully_qualified_name, msg.bucket),
        };

        let table_id = TableId::new(table_id).map_err(|message| EnvelopeError::InvalidField {
            field: "table_id",
            message,
        })?;

        Ok(RetryMessage {
            table_id,
            fully_qualified_name: fully_qualified_name.filter(|name| !name.is_empty()),
            bucket,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_message_upgrades() {
        let body = json!({"table_id": "sales/orders", "bucket": "lake"});
        let message = RetryMessage::from_json(&body).unwrap();

        assert_eq!(message.table_id.as_str(), "sales/orders");
        assert_eq!(message.bucket, "lake");
        assert!(message.fully_qualified_name.is_none());
    }

    #[test]
    fn test_current_message_keeps_name() {
        let body = json!({
            "schema_version": 2,
            "table_id": "sales/orders",
            "fully_qualified_name": "cat.sales.orders",
            "bucket": "lake"
        });
        let message = RetryMessage::from_json(&body).unwrap();

        assert_eq!(
            message.fully_qualified_name.as_deref(),
            Some("cat.sales.orders")
        );
    }

    #[test]
    fn test_unknown_version_rejected() {
        let body = json!({"schema_version": 7, "table_id": "t", "bucket": "b"});
        let err = RetryMessage::from_json(&body).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::InvalidField {
                field: "schema_version",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_table_id_rejected() {
        let body = json!({"table_id": "", "bucket": "lake"});
        assert!(RetryMessage::from_json(&body).is_err());
    }

    #[test]
    fn test_published_wire_format_is_versioned() {
        let message = RetryMessage::new(
            TableId::new("sales/orders").unwrap(),
            Some("cat.sales.orders".to_string()),
            "lake",
        );

        let body = message.to_json();
        assert_eq!(body["schema_version"], 2);
        assert_eq!(body["table_id"], "sales/orders");
        assert_eq!(RetryMessage::from_json(&body).unwrap(), message);
    }

    #[test]
    fn test_change_event_accessors() {
        let event = ChangeEvent::delete_file("lake", "sales/orders/data/0001-deletes.parquet");
        assert!(!event.is_retry_signal());

        let retry = ChangeEvent::RetrySignal(RetryMessage::new(
            TableId::new("sales/orders").unwrap(),
            None,
            "lake",
        ));
        assert!(retry.is_retry_signal());
    }
}
