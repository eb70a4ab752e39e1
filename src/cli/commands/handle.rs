//! Handle command implementation
//!
//! This module implements the `handle` command, which runs one invocation
//! over an event payload read from a file or stdin and prints the JSON result.

use super::{connect_backends, EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::adapters::factory::{create_orchestrator, in_memory_backends};
use crate::adapters::orchestrator::{Orchestrator, RecordingOrchestrator};
use crate::config::load_config;
use crate::core::trigger::BatchCoordinator;
use crate::domain::GateError;
use crate::log_error_with_context;
use clap::Args;
use std::io::Read;
use std::sync::Arc;

/// Arguments for the handle command
#[derive(Args, Debug)]
pub struct HandleArgs {
    /// Event payload file ("-" or omitted reads stdin)
    #[arg(short, long)]
    pub event: Option<String>,

    /// Record compaction requests against a throwaway in-memory store and
    /// queue instead of invoking the orchestrator
    #[arg(long)]
    pub dry_run: bool,

    /// Evaluate at this time (epoch seconds) instead of the current time
    #[arg(long)]
    pub now: Option<i64>,
}

impl HandleArgs {
    /// Execute the handle command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let payload = match self.read_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read event payload");
                eprintln!("Failed to read event payload: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        // Dry runs never touch the shared store or queue
        let backends = if self.dry_run {
            tracing::info!("Dry run mode enabled - shared backends and orchestrator untouched");
            in_memory_backends(&config)
        } else {
            match connect_backends(&config).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to lease store");
                    eprintln!("Failed to connect to lease store: {e}");
                    return Ok(EXIT_CONNECTION);
                }
            }
        };

        let orchestrator: Arc<dyn Orchestrator> = if self.dry_run {
            Arc::new(RecordingOrchestrator::new())
        } else {
            match create_orchestrator(&config) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    return Ok(EXIT_CONFIG);
                }
            }
        };

        let coordinator =
            match BatchCoordinator::new(&config, backends.store, backends.queue, orchestrator) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    return Ok(EXIT_CONFIG);
                }
            };

        let now = self.now.unwrap_or_else(|| chrono::Utc::now().timestamp());
        let result = match coordinator.process_payload(&payload, now).await {
            Ok(r) => r,
            Err(GateError::Envelope(e)) => {
                tracing::error!(error = %e, "Unrecognized event payload");
                eprintln!("Unrecognized event payload: {e}");
                return Ok(EXIT_FATAL);
            }
            Err(e) => {
                log_error_with_context!(e, "Invocation failed");
                eprintln!("Invocation failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!("{}", serde_json::to_string_pretty(&result)?);

        Ok(if result.has_failures() {
            EXIT_PARTIAL
        } else {
            EXIT_OK
        })
    }

    fn read_payload(&self) -> anyhow::Result<serde_json::Value> {
        let raw = match self.event.as_deref() {
            Some(path) if path != "-" => std::fs::read_to_string(path)?,
            _ => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
        };
        Ok(serde_json::from_str(&raw)?)
    }
}
