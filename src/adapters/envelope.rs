//! Inbound event envelope decoding
//!
//! Turns a raw invocation payload into normalized [`ChangeEvent`]s. Supported
//! shapes:
//!
//! - `{"Records": [...]}` where each record is one of
//!   - a queue record (`eventSource == "aws:sqs"`) whose `body` is a JSON string
//!     holding either a retry message (`table_id` present) or a
//!     `{bucket, key}` delete-file notification
//!   - an event-bus record `{detail: {bucket: {name}, object: {key}}}`
//!   - a storage notification `{s3: {bucket: {name}, object: {key}}}`
//!   - a plain storage-change notification `{bucket, key}`
//! - a bare event-bus object `{detail: ...}` or a bare `{bucket, key}`,
//!   treated as a single record
//!
//! Anything else fails the whole batch with
//! [`EnvelopeError::UnrecognizedEnvelope`].

use crate::domain::errors::EnvelopeError;
use crate::domain::event::{ChangeEvent, RetryMessageSchema};
use serde_json::Value;

const QUEUE_EVENT_SOURCE: &str = "aws:sqs";

/// Decodes an invocation payload into change events, in input order
///
/// # Errors
///
/// Returns [`EnvelopeError::UnrecognizedEnvelope`] naming the first record that
/// matches no known shape, or [`EnvelopeError::InvalidBody`] for a queue body
/// that is not valid JSON or not a known retry message version.
///
/// # Example
///
/// ```
/// use compaction_gate::adapters::envelope::decode_envelope;
/// use compaction_gate::domain::ChangeEvent;
/// use serde_json::json;
///
/// let payload = json!({
///     "detail": {
///         "bucket": {"name": "lake"},
///         "object": {"key": "sales/orders/data/0001-deletes.parquet"}
///     }
/// });
///
/// let events = decode_envelope(&payload).unwrap();
/// assert_eq!(
///     events,
///     vec![ChangeEvent::delete_file("lake", "sales/orders/data/0001-deletes.parquet")]
/// );
/// ```
pub fn decode_envelope(payload: &Value) -> Result<Vec<ChangeEvent>, EnvelopeError> {
    let records: Vec<&Value> = match payload.get("Records") {
        Some(Value::Array(records)) => records.iter().collect(),
        Some(_) => {
            return Err(EnvelopeError::UnrecognizedEnvelope(
                "'Records' is not an array".to_string(),
            ))
        }
        None if payload.get("detail").is_some() || plain_bucket_and_key(payload).is_some() => {
            vec![payload]
        }
        None => {
            return Err(EnvelopeError::UnrecognizedEnvelope(
                "payload has neither 'Records', 'detail' nor 'bucket' and 'key'".to_string(),
            ))
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| decode_record(index, record))
        .collect()
}

fn decode_record(index: usize, record: &Value) -> Result<ChangeEvent, EnvelopeError> {
    if record.get("eventSource").and_then(Value::as_str) == Some(QUEUE_EVENT_SOURCE) {
        return decode_queue_record(index, record);
    }

    if let Some(detail) = record.get("detail") {
        if let Some((bucket, key)) = bucket_and_key(detail) {
            return Ok(ChangeEvent::delete_file(bucket, key));
        }
    }

    if let Some(s3) = record.get("s3") {
        if let Some((bucket, key)) = bucket_and_key(s3) {
            return Ok(ChangeEvent::delete_file(bucket, decode_object_key(key)));
        }
    }

    if let Some((bucket, key)) = plain_bucket_and_key(record) {
        return Ok(ChangeEvent::delete_file(bucket, key));
    }

    Err(EnvelopeError::UnrecognizedEnvelope(format!(
        "record {index} matches no known event shape"
    )))
}

fn decode_queue_record(index: usize, record: &Value) -> Result<ChangeEvent, EnvelopeError> {
    let raw = record
        .get("body")
        .and_then(Value::as_str)
        .ok_or_else(|| EnvelopeError::InvalidBody {
            index,
            message: "queue record has no string 'body'".to_string(),
        })?;

    let body: Value = serde_json::from_str(raw).map_err(|e| EnvelopeError::InvalidBody {
        index,
        message: e.to_string(),
    })?;

    if body.get("table_id").is_some() {
        let schema: RetryMessageSchema =
            serde_json::from_value(body).map_err(|e| EnvelopeError::InvalidBody {
                index,
                message: e.to_string(),
            })?;
        return Ok(ChangeEvent::RetrySignal(schema.upgrade()?));
    }

    plain_bucket_and_key(&body)
        .map(|(bucket, key)| ChangeEvent::delete_file(bucket, key))
        .ok_or_else(|| {
            EnvelopeError::UnrecognizedEnvelope(format!(
                "record {index}: queue body has neither 'table_id' nor 'bucket' and 'key'"
            ))
        })
}

/// Reads `{bucket, key}` with both fields as strings
fn plain_bucket_and_key(node: &Value) -> Option<(&str, &str)> {
    let bucket = node.get("bucket")?.as_str()?;
    let key = node.get("key")?.as_str()?;
    Some((bucket, key))
}

/// Reads `{bucket: {name}, object: {key}}`
fn bucket_and_key(node: &Value) -> Option<(&str, &str)> {
    let bucket = node.get("bucket")?.get("name")?.as_str()?;
    let key = node.get("object")?.get("key")?.as_str()?;
    Some((bucket, key))
}

/// Storage notifications form-encode object keys (`+` for space, `%XX` escapes)
fn decode_object_key(key: &str) -> String {
    // An encoded key never carries a raw '&' or '='
    if key.contains('&') || key.contains('=') {
        return key.to_string();
    }

    url::form_urlencoded::parse(key.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_else(|| key.to_string())
}
