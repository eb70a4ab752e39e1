//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod handle;
pub mod init;
pub mod poll;
pub mod status;
pub mod validate;

use crate::adapters::factory::{create_backends, Backends};
use crate::config::GateConfig;
use crate::domain::Result;

/// Exit code: success
pub const EXIT_OK: i32 = 0;
/// Exit code: completed, but at least one table failed
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code: configuration error
pub const EXIT_CONFIG: i32 = 2;
/// Exit code: store or queue unreachable
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code: fatal error
pub const EXIT_FATAL: i32 = 5;

/// Creates the configured backends, checks connectivity and ensures the schema
pub(crate) async fn connect_backends(config: &GateConfig) -> Result<Backends> {
    let backends = create_backends(config).await?;
    backends.store.test_connection().await?;
    backends.store.ensure_schema().await?;
    Ok(backends)
}
