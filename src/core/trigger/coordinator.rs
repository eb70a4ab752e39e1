//! Batch coordinator - drives one invocation end to end
//!
//! 1. Normalized events are resolved to tables (retry signals clear their
//!    marker first; delete-file events must carry the configured suffix)
//! 2. The allowlist, when set, drops other tables
//! 3. Tables are deduplicated, first occurrence wins
//! 4. Each table, in first-seen order, goes through
//!    lease acquire -> dispatch, or retry scheduling when the lease is held
//!
//! A failure for one table is recorded in its outcome and the rest of the
//! batch still runs.

use super::summary::{InvocationResult, TableOutcome, TableReport};
use crate::adapters::envelope::decode_envelope;
use crate::adapters::orchestrator::Orchestrator;
use crate::adapters::queue::DelayQueue;
use crate::adapters::store::LeaseStore;
use crate::config::GateConfig;
use crate::core::dispatch::DispatchGateway;
use crate::core::lease::LeaseCoordinator;
use crate::core::resolver::TableResolver;
use crate::core::retry::RetryScheduler;
use crate::domain::event::ChangeEvent;
use crate::domain::ids::TableId;
use crate::domain::table::{CompactionRequest, TableIdentity};
use crate::domain::{GateError, Result};
use crate::log_table_outcome;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trigger settings taken from configuration once
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    /// Suffix identifying delete files
    pub delete_suffix: String,
    /// Lease time-to-live
    pub lease_ttl: Duration,
    /// Delay before a deferred retry becomes visible
    pub retry_delay: Duration,
    /// Tables to process; empty means all
    pub allowlist: HashSet<String>,
    /// Warehouse root passed to the orchestrator
    pub default_warehouse_location: Option<String>,
}

impl TriggerSettings {
    /// Reads the trigger and catalog sections
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            delete_suffix: config.trigger.delete_suffix.clone(),
            lease_ttl: Duration::from_secs(config.trigger.lease_ttl_seconds),
            retry_delay: Duration::from_secs(config.trigger.retry_delay_seconds),
            allowlist: config
                .trigger
                .table_allowlist
                .iter()
                .map(|t| t.trim().to_string())
                .collect(),
            default_warehouse_location: config.catalog.default_warehouse_location.clone(),
        }
    }

    fn allows(&self, table_id: &TableId) -> bool {
        self.allowlist.is_empty() || self.allowlist.contains(table_id.as_str())
    }
}

/// A distinct table selected for processing
struct Candidate {
    identity: TableIdentity,
    bucket: String,
}

/// Top-level coordinator for one batch of change events
pub struct BatchCoordinator {
    settings: TriggerSettings,
    resolver: TableResolver,
    lease: LeaseCoordinator,
    retry: RetryScheduler,
    dispatch: DispatchGateway,
}

impl BatchCoordinator {
    /// Creates a coordinator
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if the orchestrator identifier is
    /// missing; no event is processed in that case.
    pub fn new(
        config: &GateConfig,
        store: Arc<dyn LeaseStore>,
        queue: Arc<dyn DelayQueue>,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Result<Self> {
        if config.orchestrator.identifier().is_none() {
            return Err(GateError::Configuration(
                "orchestrator.identifier is required".to_string(),
            ));
        }

        Ok(Self {
            settings: TriggerSettings::from_config(config),
            resolver: TableResolver::from_config(&config.catalog),
            lease: LeaseCoordinator::new(Arc::clone(&store)),
            retry: RetryScheduler::new(
                store,
                queue,
                Duration::from_secs(config.trigger.retry_buffer_seconds),
            ),
            dispatch: DispatchGateway::new(orchestrator),
        })
    }

    /// Decodes a raw payload and processes it
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Envelope`] when the payload is not a known shape.
    pub async fn process_payload(
        &self,
        payload: &serde_json::Value,
        now: i64,
    ) -> Result<InvocationResult> {
        let events = decode_envelope(payload)?;
        self.process_events(events, now).await
    }

    /// Processes a batch of normalized events at time `now` (epoch seconds)
    pub async fn process_events(
        &self,
        events: Vec<ChangeEvent>,
        now: i64,
    ) -> Result<InvocationResult> {
        let start_time = Instant::now();
        let is_retry = events.iter().any(ChangeEvent::is_retry_signal);

        tracing::info!(events = events.len(), is_retry, "Processing batch");

        let candidates = self.select_tables(events).await;
        if candidates.is_empty() {
            tracing::info!("No tables matched");
            return Ok(InvocationResult::no_op(is_retry));
        }

        let mut reports = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let request = CompactionRequest::new(
                &candidate.identity,
                candidate.bucket,
                self.settings.default_warehouse_location.as_deref(),
            );
            let outcome = self.process_table(&request, now).await;
            log_table_outcome!(request.table_id, outcome.label());

            reports.push(TableReport {
                table_id: request.table_id,
                fully_qualified_name: request.fully_qualified_name,
                outcome,
            });
        }

        let result = InvocationResult::from_reports(reports, is_retry);
        crate::log_invocation_summary!(result, start_time.elapsed());
        Ok(result)
    }

    /// Resolves, filters and deduplicates events into distinct tables
    async fn select_tables(&self, events: Vec<ChangeEvent>) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for event in events {
            let (identity, bucket) = match event {
                ChangeEvent::RetrySignal(message) => {
                    if let Err(e) = self.retry.clear(&message.table_id).await {
                        tracing::warn!(
                            table_id = %message.table_id,
                            error = %e,
                            "Failed to clear retry marker"
                        );
                    }

                    let identity = match message.fully_qualified_name {
                        Some(name) => TableIdentity::new(message.table_id, name),
                        None => self.resolver.identity_for(message.table_id),
                    };
                    (identity, message.bucket)
                }
                ChangeEvent::DeleteFile { bucket, key } => {
                    if !key.ends_with(&self.settings.delete_suffix) {
                        tracing::trace!(key = %key, "Ignoring non-delete file");
                        continue;
                    }
                    match self.resolver.resolve(&key) {
                        Ok(identity) => (identity, bucket),
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "Skipping unresolvable key");
                            continue;
                        }
                    }
                }
            };

            if !self.settings.allows(&identity.table_id) {
                tracing::debug!(table_id = %identity.table_id, "Table not in allowlist");
                continue;
            }

            if seen.insert(identity.table_id.clone()) {
                candidates.push(Candidate { identity, bucket });
            }
        }

        candidates
    }

    /// Runs one table through lease -> dispatch, or retry scheduling
    async fn process_table(&self, request: &CompactionRequest, now: i64) -> TableOutcome {
        let table_id = &request.table_id;

        let lease = match self
            .lease
            .try_acquire(table_id, now, self.settings.lease_ttl)
            .await
        {
            Ok(lease) => lease,
            Err(e) => {
                tracing::error!(table_id = %table_id, error = %e, "Lease acquisition failed");
                return TableOutcome::Failed {
                    error: e.to_string(),
                    retry_queued: false,
                };
            }
        };

        let Some(lease) = lease else {
            return match self
                .retry
                .enqueue_retry(request, now, self.settings.retry_delay)
                .await
            {
                Ok(true) => TableOutcome::RetryQueued,
                Ok(false) => TableOutcome::RetrySkipped,
                Err(e) => {
                    tracing::error!(table_id = %table_id, error = %e, "Retry scheduling failed");
                    TableOutcome::Failed {
                        error: e.to_string(),
                        retry_queued: false,
                    }
                }
            };
        };

        match self.dispatch.start(request).await {
            Ok(handle) => TableOutcome::Dispatched {
                execution_id: handle.execution_id,
                invocation_id: handle.invocation_id,
            },
            Err(dispatch_error) => {
                tracing::error!(
                    table_id = %table_id,
                    error = %dispatch_error,
                    "Dispatch failed, releasing lease"
                );

                if let Err(e) = self.lease.release(&lease).await {
                    tracing::warn!(table_id = %table_id, error = %e, "Failed to release lease");
                }

                let retry_queued = match self
                    .retry
                    .enqueue_retry(request, now, self.settings.retry_delay)
                    .await
                {
                    Ok(queued) => queued,
                    Err(e) => {
                        tracing::warn!(
                            table_id = %table_id,
                            error = %e,
                            "Failed to schedule retry after dispatch failure"
                        );
                        false
                    }
                };

                TableOutcome::Failed {
                    error: dispatch_error.to_string(),
                    retry_queued,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::orchestrator::RecordingOrchestrator;
    use crate::adapters::queue::InMemoryDelayQueue;
    use crate::adapters::store::InMemoryLeaseStore;
    use crate::config::load_config_from_str;
    use crate::core::trigger::summary::InvocationStatus;
    use crate::domain::event::RetryMessage;

    fn config() -> GateConfig {
        load_config_from_str(
            r#"
[orchestrator]
identifier = "wf"

[catalog]
name = "cat"

[store]
backend = "memory"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_identifier_rejected_at_construction() {
        let mut config = config();
        config.orchestrator.identifier = None;

        let result = BatchCoordinator::new(
            &config,
            Arc::new(InMemoryLeaseStore::new()),
            Arc::new(InMemoryDelayQueue::default()),
            Arc::new(RecordingOrchestrator::new()),
        );
        assert!(matches!(result, Err(GateError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_non_delete_files_ignored() {
        let orchestrator = Arc::new(RecordingOrchestrator::new());
        let coordinator = BatchCoordinator::new(
            &config(),
            Arc::new(InMemoryLeaseStore::new()),
            Arc::new(InMemoryDelayQueue::default()),
            orchestrator.clone(),
        )
        .unwrap();

        let result = coordinator
            .process_events(
                vec![ChangeEvent::delete_file("lake", "sales/orders/data/0001.parquet")],
                1000,
            )
            .await
            .unwrap();

        assert_eq!(result.status, InvocationStatus::NoOp);
        assert!(orchestrator.executions().is_empty());
    }

    #[tokio::test]
    async fn test_retry_signal_clears_marker_and_keeps_carried_name() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let orchestrator = Arc::new(RecordingOrchestrator::new());
        let coordinator = BatchCoordinator::new(
            &config(),
            store.clone(),
            Arc::new(InMemoryDelayQueue::default()),
            orchestrator.clone(),
        )
        .unwrap();

        let table = TableId::new("sales/orders").unwrap();
        store.set_retry_marker_if_expired(&table, 1360, 1000).await.unwrap();

        let result = coordinator
            .process_events(
                vec![ChangeEvent::RetrySignal(RetryMessage::new(
                    table.clone(),
                    Some("other.sales_orders".to_string()),
                    "lake",
                ))],
                1300,
            )
            .await
            .unwrap();

        assert!(result.is_retry);
        assert_eq!(result.status, InvocationStatus::Triggered);
        let record = store.get_record(&table).await.unwrap().unwrap();
        assert_eq!(record.retry_queued_until, None);
        assert_eq!(
            orchestrator.executions()[0].request.fully_qualified_name,
            "other.sales_orders"
        );
    }
}
