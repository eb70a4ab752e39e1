//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{GateConfig, StoreBackend};
use super::secret::secret_string;
use crate::domain::errors::GateError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "COMPACTION_GATE_CONFIG";

/// Configuration file used when neither `--config` nor [`CONFIG_PATH_ENV`] is given
pub const DEFAULT_CONFIG_PATH: &str = "compaction-gate.toml";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into GateConfig
/// 4. Applies environment variable overrides (COMPACTION_GATE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`GateError::Configuration`] if the file cannot be read or parsed,
/// a referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use compaction_gate::config::loader::load_config;
///
/// let config = load_config("compaction-gate.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GateConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(GateError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        GateError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Loads configuration from TOML text
///
/// Same pipeline as [`load_config`] minus the file read.
///
/// # Errors
///
/// Returns [`GateError::Configuration`] on substitution, parse or validation failure.
pub fn load_config_from_str(contents: &str) -> Result<GateConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: GateConfig = toml::from_str(&contents)
        .map_err(|e| GateError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        GateError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are passed through untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| {
        GateError::Configuration(format!("Failed to compile substitution pattern: {e}"))
    })?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(GateError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        GateError::Configuration(format!("Invalid value '{value}' for environment variable {name}"))
    })
}

/// Applies environment variable overrides using the COMPACTION_GATE_* prefix
///
/// Variables follow the pattern `COMPACTION_GATE_<SECTION>_<KEY>`, for example
/// `COMPACTION_GATE_TRIGGER_LEASE_TTL_SECONDS`. The allowlist override is a
/// comma-separated list; blank entries are dropped.
fn apply_env_overrides(config: &mut GateConfig) -> Result<()> {
    let var = |key: &str| std::env::var(format!("COMPACTION_GATE_{key}")).ok();

    if let Some(val) = var("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Orchestrator
    if let Some(val) = var("ORCHESTRATOR_IDENTIFIER") {
        config.orchestrator.identifier = Some(val);
    }
    if let Some(val) = var("ORCHESTRATOR_ENDPOINT") {
        config.orchestrator.endpoint = val;
    }
    if let Some(val) = var("ORCHESTRATOR_AUTH_TOKEN") {
        config.orchestrator.auth_token = Some(secret_string(val));
    }
    if let Some(val) = var("ORCHESTRATOR_TIMEOUT_SECONDS") {
        config.orchestrator.timeout_seconds =
            parse_override("COMPACTION_GATE_ORCHESTRATOR_TIMEOUT_SECONDS", &val)?;
    }

    // Trigger
    if let Some(val) = var("TRIGGER_DELETE_SUFFIX") {
        config.trigger.delete_suffix = val;
    }
    if let Some(val) = var("TRIGGER_LEASE_TTL_SECONDS") {
        config.trigger.lease_ttl_seconds =
            parse_override("COMPACTION_GATE_TRIGGER_LEASE_TTL_SECONDS", &val)?;
    }
    if let Some(val) = var("TRIGGER_RETRY_DELAY_SECONDS") {
        config.trigger.retry_delay_seconds =
            parse_override("COMPACTION_GATE_TRIGGER_RETRY_DELAY_SECONDS", &val)?;
    }
    if let Some(val) = var("TRIGGER_RETRY_BUFFER_SECONDS") {
        config.trigger.retry_buffer_seconds =
            parse_override("COMPACTION_GATE_TRIGGER_RETRY_BUFFER_SECONDS", &val)?;
    }
    if let Some(val) = var("TRIGGER_TABLE_ALLOWLIST") {
        config.trigger.table_allowlist = parse_allowlist(&val);
    }

    // Catalog
    if let Some(val) = var("CATALOG_NAME") {
        config.catalog.name = val;
    }
    if let Some(val) = var("CATALOG_DEFAULT_WAREHOUSE_LOCATION") {
        config.catalog.default_warehouse_location = Some(val).filter(|v| !v.is_empty());
    }

    // Store
    if let Some(val) = var("STORE_BACKEND") {
        config.store.backend = match val.to_lowercase().as_str() {
            "postgresql" => StoreBackend::PostgreSQL,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(GateError::Configuration(format!(
                    "Invalid store backend '{other}' in COMPACTION_GATE_STORE_BACKEND"
                )))
            }
        };
    }
    if let Some(val) = var("STORE_LEASE_TABLE") {
        config.store.lease_table = val;
    }
    if let Some(val) = var("STORE_RETRY_QUEUE") {
        config.store.retry_queue = val;
    }

    // PostgreSQL (only if configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Some(val) = var("POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(val) = var("POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = parse_override("COMPACTION_GATE_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
        if let Some(val) = var("POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
    }

    // Poll
    if let Some(val) = var("POLL_BATCH_SIZE") {
        config.poll.batch_size = parse_override("COMPACTION_GATE_POLL_BATCH_SIZE", &val)?;
    }
    if let Some(val) = var("POLL_INTERVAL_SECONDS") {
        config.poll.interval_seconds =
            parse_override("COMPACTION_GATE_POLL_INTERVAL_SECONDS", &val)?;
    }

    // Logging
    if let Some(val) = var("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Some(val) = var("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

/// Splits a comma-separated allowlist, trimming entries and dropping blanks
pub fn parse_allowlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
