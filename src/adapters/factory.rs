//! Backend factory
//!
//! Builds the lease store, delay queue and orchestrator selected by
//! configuration.

use crate::adapters::orchestrator::{HttpOrchestrator, Orchestrator};
use crate::adapters::postgresql::PostgreSQLClient;
use crate::adapters::queue::{DelayQueue, InMemoryDelayQueue, PostgresDelayQueue};
use crate::adapters::store::{InMemoryLeaseStore, LeaseStore, PostgresLeaseStore};
use crate::config::schema::{GateConfig, StoreBackend};
use crate::domain::{GateError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Store and queue sharing one backend
#[derive(Clone)]
pub struct Backends {
    /// Lease and retry-marker store
    pub store: Arc<dyn LeaseStore>,
    /// Delay channel for retry signals
    pub queue: Arc<dyn DelayQueue>,
}

/// Creates the store and queue for `config.store.backend`
///
/// With PostgreSQL both share one connection pool.
///
/// # Errors
///
/// Returns an error if the PostgreSQL pool cannot be created.
pub async fn create_backends(config: &GateConfig) -> Result<Backends> {
    let max_delay = Duration::from_secs(config.store.max_delay_seconds);
    let visibility_timeout = Duration::from_secs(config.store.visibility_timeout_seconds);

    match config.store.backend {
        StoreBackend::Memory => Ok(in_memory_backends(config)),
        StoreBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                GateError::Configuration(
                    "postgresql configuration is required when store.backend = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!(
                lease_table = %config.store.lease_table,
                retry_queue = %config.store.retry_queue,
                "Creating PostgreSQL lease store and delay queue"
            );
            let client = Arc::new(PostgreSQLClient::new(pg_config.clone()).await?);

            Ok(Backends {
                store: Arc::new(PostgresLeaseStore::new(
                    Arc::clone(&client),
                    &config.store.lease_table,
                    &config.store.retry_queue,
                )),
                queue: Arc::new(PostgresDelayQueue::new(
                    client,
                    &config.store.retry_queue,
                    max_delay,
                    visibility_timeout,
                )),
            })
        }
    }
}

/// Creates a process-local store and queue, whatever `store.backend` says
///
/// Nothing written to these is visible to other processes.
pub fn in_memory_backends(config: &GateConfig) -> Backends {
    tracing::info!("Creating in-memory lease store and delay queue");
    Backends {
        store: Arc::new(InMemoryLeaseStore::new()),
        queue: Arc::new(InMemoryDelayQueue::new(
            Duration::from_secs(config.store.max_delay_seconds),
            Duration::from_secs(config.store.visibility_timeout_seconds),
        )),
    }
}

/// Creates the HTTP orchestrator from configuration
///
/// # Errors
///
/// Returns [`GateError::Configuration`] if the orchestrator identifier is missing.
pub fn create_orchestrator(config: &GateConfig) -> Result<Arc<dyn Orchestrator>> {
    Ok(Arc::new(HttpOrchestrator::new(&config.orchestrator)?))
}
