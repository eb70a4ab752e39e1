//! Logging and observability
//!
//! Structured logging via `tracing`, plus a few macros that keep the field
//! names of recurring events consistent across the crate.
//!
//! # Example
//!
//! ```no_run
//! use compaction_gate::logging::init_logging;
//! use compaction_gate::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table_id = "sales/orders", "Compaction started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of processing one table
///
/// # Example
///
/// ```no_run
/// use compaction_gate::log_table_outcome;
///
/// log_table_outcome!("sales/orders", "started");
/// ```
#[macro_export]
macro_rules! log_table_outcome {
    ($table_id:expr, $outcome:expr) => {
        tracing::info!(
            table_id = %$table_id,
            outcome = $outcome,
            "Table processed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use compaction_gate::log_error_with_context;
/// use compaction_gate::domain::GateError;
///
/// let error = GateError::Configuration("orchestrator.identifier is required".to_string());
/// log_error_with_context!(&error, "Failed to build coordinator");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log the summary of one invocation
#[macro_export]
macro_rules! log_invocation_summary {
    ($result:expr, $duration:expr) => {
        tracing::info!(
            status = %$result.status,
            matched = $result.matched,
            started = $result.started,
            retried = $result.retried,
            skipped = $result.skipped,
            failed = $result.failed,
            is_retry = $result.is_retry,
            duration_ms = $duration.as_millis() as u64,
            "Invocation completed"
        );
    };
}
