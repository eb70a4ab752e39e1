//! Configuration management for Compaction Gate.
//!
//! Configuration is read once at process start from a TOML file, with
//! `${VAR_NAME}` substitution and `COMPACTION_GATE_<SECTION>_<KEY>`
//! environment overrides, then validated. The resulting [`GateConfig`] is
//! passed by reference into every component; nothing reads the environment
//! after startup.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use compaction_gate::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("compaction-gate.toml")?;
//! println!("Lease TTL: {}s", config.trigger.lease_ttl_seconds);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [orchestrator]
//! identifier = "arn:aws:states:us-east-1:123456789012:stateMachine:iceberg-compaction"
//! endpoint = "https://orchestrator.internal"
//! auth_token = "${ORCHESTRATOR_TOKEN}"
//!
//! [trigger]
//! delete_suffix = "-deletes.parquet"
//! lease_ttl_seconds = 900
//! retry_delay_seconds = 300
//! table_allowlist = ["sales/orders"]
//!
//! [catalog]
//! name = "glue_catalog"
//!
//! [store]
//! backend = "postgresql"
//! lease_table = "iceberg_delete_locks"
//!
//! [postgresql]
//! connection_string = "${COMPACTION_GATE_DATABASE_URL}"
//! ```
//!
//! # Sections
//!
//! - [`ApplicationConfig`] - log level
//! - [`OrchestratorConfig`] - workflow identifier and endpoint
//! - [`TriggerConfig`] - delete suffix, TTLs, allowlist
//! - [`CatalogConfig`] - catalog name and table mappings
//! - [`StoreConfig`] - lease store and delay channel
//! - [`PostgreSQLConfig`] - database connection
//! - [`PollConfig`] - delay channel polling
//! - [`LoggingConfig`] - local file logging

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_from_str, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
pub use schema::{
    ApplicationConfig, CatalogConfig, GateConfig, LoggingConfig, OrchestratorConfig, PollConfig,
    PostgreSQLConfig, StoreBackend, StoreConfig, TriggerConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
