//! Poll command implementation
//!
//! This module implements the `poll` command, which consumes deferred retry
//! signals from the delay channel.

use super::{connect_backends, EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::adapters::factory::create_orchestrator;
use crate::config::load_config;
use crate::core::trigger::{BatchCoordinator, RetryPoller};
use crate::log_error_with_context;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the poll command
#[derive(Args, Debug)]
pub struct PollArgs {
    /// Poll a single batch and exit
    #[arg(long)]
    pub once: bool,

    /// Override poll.batch_size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl PollArgs {
    /// Execute the poll command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if let Some(batch_size) = self.batch_size {
            tracing::info!(batch_size, "Overriding poll batch size from CLI");
            config.poll.batch_size = batch_size;
            if let Err(e) = config.validate() {
                eprintln!("Configuration validation failed: {e}");
                return Ok(EXIT_CONFIG);
            }
        }

        let backends = match connect_backends(&config).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to lease store");
                eprintln!("Failed to connect to lease store: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let coordinator = match create_orchestrator(&config).and_then(|orchestrator| {
            BatchCoordinator::new(
                &config,
                backends.store,
                Arc::clone(&backends.queue),
                orchestrator,
            )
        }) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let poller = RetryPoller::new(Arc::new(coordinator), backends.queue, &config.poll);

        if !self.once {
            poller.run(shutdown_signal).await?;
            return Ok(EXIT_OK);
        }

        let report = match poller.poll_once(chrono::Utc::now().timestamp()).await {
            Ok(r) => r,
            Err(e) => {
                log_error_with_context!(e, "Poll failed");
                eprintln!("Poll failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!(
            "Received: {}  Acknowledged: {}  Dropped: {}",
            report.received, report.acknowledged, report.dropped
        );

        match report.result {
            Some(result) => {
                println!("{}", serde_json::to_string_pretty(&result)?);
                Ok(if result.has_failures() {
                    EXIT_PARTIAL
                } else {
                    EXIT_OK
                })
            }
            None => Ok(EXIT_OK),
        }
    }
}
