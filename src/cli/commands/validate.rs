//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Compaction Gate configuration file.

use super::{connect_backends, EXIT_CONFIG, EXIT_CONNECTION, EXIT_OK};
use crate::config::{load_config, GateConfig, StoreBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also connect to the lease store and create missing tables
    #[arg(long)]
    pub check_connection: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        print_summary(&config);

        if self.check_connection {
            match connect_backends(&config).await {
                Ok(_) => println!("✅ Lease store reachable, schema ensured"),
                Err(e) => {
                    println!("❌ Failed to connect to lease store");
                    println!("   Error: {e}");
                    return Ok(EXIT_CONNECTION);
                }
            }
            println!();
        }

        Ok(EXIT_OK)
    }
}

fn print_summary(config: &GateConfig) {
    println!();
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!(
        "  Orchestrator: {} ({})",
        config.orchestrator.identifier().unwrap_or("-"),
        config.orchestrator.endpoint
    );
    println!("  Delete Suffix: {}", config.trigger.delete_suffix);
    println!("  Lease TTL: {}s", config.trigger.lease_ttl_seconds);
    println!(
        "  Retry Delay: {}s (+{}s marker buffer)",
        config.trigger.retry_delay_seconds, config.trigger.retry_buffer_seconds
    );
    println!(
        "  Allowlist: {}",
        if config.trigger.table_allowlist.is_empty() {
            "All tables".to_string()
        } else {
            config.trigger.table_allowlist.join(", ")
        }
    );
    println!("  Catalog: {}", config.catalog.name);

    match config.store.backend {
        StoreBackend::Memory => println!("  Store Backend: memory"),
        StoreBackend::PostgreSQL => {
            if let Some(ref pg_config) = config.postgresql {
                use secrecy::ExposeSecret;
                println!("  Store Backend: PostgreSQL");
                println!(
                    "  PostgreSQL Connection: {}",
                    connection_target(pg_config.connection_string.expose_secret().as_ref())
                );
                println!("  Max Connections: {}", pg_config.max_connections);
            }
        }
    }
    println!("  Lease Table: {}", config.store.lease_table);
    println!("  Retry Queue: {}", config.store.retry_queue);
    println!();
}

/// Host part of a connection string, without credentials
fn connection_target(connection_string: &str) -> &str {
    connection_string
        .rsplit_once('@')
        .map_or(connection_string, |(_, target)| target)
}
