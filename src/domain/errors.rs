//! Domain error types
//!
//! This module defines the error hierarchy for Compaction Gate.
//! All errors are domain-specific and don't expose third-party types.
//!
//! Lease contention and an already-queued retry are *expected* outcomes and are
//! modelled as values by the core components, not as errors here.

use thiserror::Error;

/// Main Compaction Gate error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration-related errors (fatal, abort before any processing)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Inbound event envelope could not be decoded
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Lease store errors unrelated to a rejected condition
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Delay channel errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// Orchestrator invocation errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors raised while normalizing an inbound event envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload (or one of its records) matches none of the known shapes
    #[error("Unrecognized envelope: {0}")]
    UnrecognizedEnvelope(String),

    /// A queue record body is not valid JSON or not a known message schema
    #[error("Invalid message body in record {index}: {message}")]
    InvalidBody { index: usize, message: String },

    /// A decoded field failed validation (e.g. empty table id)
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },
}

/// Lease store errors
///
/// A rejected conditional write is *not* a `StoreError`; it is reported as
/// `Ok(false)` by the store. These variants cover genuine store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to or obtain a connection for the store
    #[error("Failed to connect to lease store: {0}")]
    ConnectionFailed(String),

    /// A statement failed for reasons other than its condition
    #[error("Lease store operation '{operation}' failed: {message}")]
    OperationFailed {
        operation: &'static str,
        message: String,
    },

    /// Schema creation failed
    #[error("Failed to initialize lease store schema: {0}")]
    SchemaFailed(String),

    /// In-process lock guarding the store was poisoned
    #[error("Lease store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Build an `OperationFailed` error for the named operation
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        StoreError::OperationFailed {
            operation,
            message: message.into(),
        }
    }
}

/// Orchestrator invocation errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Failed to reach the orchestrator
    #[error("Failed to reach orchestrator: {0}")]
    ConnectionFailed(String),

    /// Orchestrator answered with a non-success status
    #[error("Orchestrator rejected execution: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Orchestrator response could not be understood
    #[error("Invalid orchestrator response: {0}")]
    InvalidResponse(String),

    /// Request timed out
    #[error("Orchestrator request timeout: {0}")]
    Timeout(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        GateError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for GateError {
    fn from(err: toml::de::Error) -> Self {
        GateError::Configuration(format!("TOML parse error: {err}"))
    }
}
