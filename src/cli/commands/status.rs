//! Status command implementation
//!
//! This module implements the `status` command for displaying table leases
//! and pending retry markers.

use super::{connect_backends, EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL, EXIT_OK};
use crate::adapters::store::LeaseRecord;
use crate::config::load_config;
use chrono::{TimeZone, Utc};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter by table ID
    #[arg(long)]
    pub table_id: Option<String>,

    /// Only show tables with a live lease or pending retry
    #[arg(long)]
    pub active: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking lease status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let backends = match connect_backends(&config).await {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Failed to connect to lease store");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let records = match backends.store.list_records().await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to load lease records");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let now = Utc::now().timestamp();
        let filtered: Vec<&LeaseRecord> = records
            .iter()
            .filter(|r| self.matches(r, now))
            .collect();

        if filtered.is_empty() {
            println!("No lease records found.");
            return Ok(EXIT_OK);
        }

        println!("📊 Lease Status ({} table(s))", filtered.len());
        println!();
        println!(
            "{:<40} {:<10} {:<22} {:<10} {:<22}",
            "Table ID", "Lease", "Lock Until", "Retry", "Retry Queued Until"
        );
        println!("{}", "-".repeat(108));

        for record in filtered {
            println!(
                "{:<40} {:<10} {:<22} {:<10} {:<22}",
                record.table_id.as_str(),
                if record.lease_active(now) { "held" } else { "free" },
                format_timestamp(record.lock_until),
                if record.retry_pending(now) { "pending" } else { "-" },
                format_timestamp(record.retry_queued_until),
            );
        }

        println!();
        Ok(EXIT_OK)
    }

    fn matches(&self, record: &LeaseRecord, now: i64) -> bool {
        if let Some(ref table_id) = self.table_id {
            if record.table_id.as_str() != table_id {
                return false;
            }
        }
        !self.active || record.lease_active(now) || record.retry_pending(now)
    }
}

fn format_timestamp(value: Option<i64>) -> String {
    value
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
