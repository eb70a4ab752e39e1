//! Integration tests for batch coordination
//!
//! Every scenario runs against the in-memory lease store, delay queue and a
//! recording orchestrator, so concurrent invocations share state exactly as
//! separate processes would through the shared store.

use compaction_gate::adapters::orchestrator::RecordingOrchestrator;
use compaction_gate::adapters::queue::{DelayQueue, InMemoryDelayQueue};
use compaction_gate::adapters::store::{InMemoryLeaseStore, LeaseStore};
use compaction_gate::config::{load_config_from_str, GateConfig};
use compaction_gate::core::trigger::{BatchCoordinator, InvocationStatus, TableOutcome};
use compaction_gate::domain::{ChangeEvent, GateError, RetryMessage, TableId};
use serde_json::json;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

struct Harness {
    store: Arc<InMemoryLeaseStore>,
    queue: Arc<InMemoryDelayQueue>,
    orchestrator: Arc<RecordingOrchestrator>,
    config: GateConfig,
}

impl Harness {
    fn new() -> Self {
        Self::with_config("")
    }

    fn with_config(extra: &str) -> Self {
        let config = load_config_from_str(&format!(
            "[orchestrator]\nidentifier = \"compaction-wf\"\n\n[store]\nbackend = \"memory\"\n\n{extra}"
        ))
        .unwrap();

        Self {
            store: Arc::new(InMemoryLeaseStore::new()),
            queue: Arc::new(InMemoryDelayQueue::default()),
            orchestrator: Arc::new(RecordingOrchestrator::new()),
            config,
        }
    }

    /// A coordinator sharing this harness's store, queue and orchestrator,
    /// standing in for one invocation process
    fn coordinator(&self) -> BatchCoordinator {
        BatchCoordinator::new(
            &self.config,
            self.store.clone(),
            self.queue.clone(),
            self.orchestrator.clone(),
        )
        .unwrap()
    }
}

fn delete_file(key: &str) -> ChangeEvent {
    ChangeEvent::delete_file("lake", key)
}

fn table(id: &str) -> TableId {
    TableId::new(id).unwrap()
}

#[tokio::test]
async fn test_batch_dispatches_each_table_once_in_first_seen_order() {
    let harness = Harness::new();

    let result = harness
        .coordinator()
        .process_events(
            vec![
                delete_file("sales/orders/data/00001-deletes.parquet"),
                delete_file("sales/orders/data/00002-deletes.parquet"),
                delete_file("sales/customers/data/00001-deletes.parquet"),
            ],
            NOW,
        )
        .await
        .unwrap();

    assert_eq!(result.status, InvocationStatus::Triggered);
    assert_eq!(result.tables, vec![table("sales/orders"), table("sales/customers")]);
    assert_eq!(result.matched, 2);
    assert_eq!(result.started, 2);
    assert!(!result.is_retry);

    let executions = harness.orchestrator.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].request.fully_qualified_name, "glue_catalog.sales.orders");
    assert_eq!(executions[0].request.warehouse_location, "s3://lake/");
    assert_ne!(executions[0].invocation_id, executions[1].invocation_id);

    let record = harness.store.get_record(&table("sales/orders")).await.unwrap().unwrap();
    assert_eq!(record.lock_until, Some(NOW + 900));
}

#[tokio::test]
async fn test_duplicate_table_keeps_first_bucket() {
    let harness = Harness::new();

    let result = harness
        .coordinator()
        .process_events(
            vec![
                ChangeEvent::delete_file("lake-primary", "sales/orders/data/00001-deletes.parquet"),
                ChangeEvent::delete_file("lake-replica", "sales/orders/data/00002-deletes.parquet"),
            ],
            NOW,
        )
        .await
        .unwrap();

    assert_eq!(result.matched, 1);
    assert_eq!(result.started, 1);

    let executions = harness.orchestrator.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].request.bucket, "lake-primary");
    assert_eq!(executions[0].request.warehouse_location, "s3://lake-primary/");
}

#[tokio::test]
async fn test_lease_held_queues_one_retry_then_skips() {
    let harness = Harness::new();
    let events = || vec![delete_file("sales/orders/data/00001-deletes.parquet")];

    let first = harness.coordinator().process_events(events(), NOW).await.unwrap();
    assert_eq!(first.status, InvocationStatus::Triggered);

    let second = harness
        .coordinator()
        .process_events(events(), NOW + 10)
        .await
        .unwrap();
    assert_eq!(second.status, InvocationStatus::Queued);
    assert_eq!(second.retried, 1);

    let third = harness
        .coordinator()
        .process_events(events(), NOW + 20)
        .await
        .unwrap();
    assert_eq!(third.status, InvocationStatus::Skipped);
    assert_eq!(third.skipped, 1);

    assert_eq!(harness.orchestrator.executions().len(), 1);
    assert_eq!(harness.queue.len(), 1);

    let (body, visible_at) = harness.queue.snapshot().remove(0);
    assert_eq!(visible_at, NOW + 10 + 300);
    assert_eq!(body["table_id"], "sales/orders");
    assert_eq!(body["fully_qualified_name"], "glue_catalog.sales.orders");
    assert_eq!(body["bucket"], "lake");

    let record = harness.store.get_record(&table("sales/orders")).await.unwrap().unwrap();
    assert_eq!(record.retry_queued_until, Some(NOW + 10 + 300 + 60));
}

#[tokio::test]
async fn test_concurrent_invocations_dispatch_once() {
    let harness = Harness::new();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let coordinator = Arc::new(harness.coordinator());
        handles.push(tokio::spawn(async move {
            coordinator
                .process_events(
                    vec![delete_file("sales/orders/data/00001-deletes.parquet")],
                    NOW,
                )
                .await
                .unwrap()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap().status);
    }

    let count = |s: InvocationStatus| statuses.iter().filter(|&&x| x == s).count();
    assert_eq!(count(InvocationStatus::Triggered), 1);
    assert_eq!(count(InvocationStatus::Queued), 1);
    assert_eq!(count(InvocationStatus::Skipped), 14);

    assert_eq!(harness.orchestrator.executions().len(), 1);
    assert_eq!(harness.queue.len(), 1);
}

#[tokio::test]
async fn test_retry_signal_redispatches_after_lease_expiry() {
    let harness = Harness::new();
    let key = "sales/orders/data/00001-deletes.parquet";

    harness.coordinator().process_events(vec![delete_file(key)], NOW).await.unwrap();
    harness
        .coordinator()
        .process_events(vec![delete_file(key)], NOW + 700)
        .await
        .unwrap();

    // retry becomes visible at NOW + 1000, after the lease expired at NOW + 900
    let delivered = harness.queue.receive(10, NOW + 1000).await.unwrap();
    assert_eq!(delivered.len(), 1);
    let retry = RetryMessage::from_json(&delivered[0].body).unwrap();

    let result = harness
        .coordinator()
        .process_events(vec![ChangeEvent::RetrySignal(retry)], NOW + 1000)
        .await
        .unwrap();

    assert!(result.is_retry);
    assert_eq!(result.status, InvocationStatus::Triggered);
    assert_eq!(harness.orchestrator.executions().len(), 2);

    let record = harness.store.get_record(&table("sales/orders")).await.unwrap().unwrap();
    assert_eq!(record.retry_queued_until, None);
    assert_eq!(record.lock_until, Some(NOW + 1000 + 900));
}

#[tokio::test]
async fn test_retry_signal_while_lease_held_requeues() {
    let harness = Harness::new();
    let key = "sales/orders/data/00001-deletes.parquet";

    harness.coordinator().process_events(vec![delete_file(key)], NOW).await.unwrap();

    let retry = RetryMessage::new(table("sales/orders"), None, "lake");
    let result = harness
        .coordinator()
        .process_events(vec![ChangeEvent::RetrySignal(retry)], NOW + 300)
        .await
        .unwrap();

    assert_eq!(result.status, InvocationStatus::Queued);
    assert_eq!(harness.queue.len(), 1);
}

#[tokio::test]
async fn test_allowlist_filters_tables() {
    let harness = Harness::with_config("[trigger]\ntable_allowlist = [\"sales/customers\"]\n");

    let result = harness
        .coordinator()
        .process_events(
            vec![delete_file("sales/orders/data/00001-deletes.parquet")],
            NOW,
        )
        .await
        .unwrap();

    assert_eq!(result.status, InvocationStatus::NoOp);
    assert_eq!(result.matched, 0);
    assert!(harness.orchestrator.executions().is_empty());
    assert!(harness.store.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_no_op() {
    let harness = Harness::new();
    let result = harness.coordinator().process_events(Vec::new(), NOW).await.unwrap();

    assert_eq!(result.status, InvocationStatus::NoOp);
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "no-op");
    assert_eq!(value["matched"], 0);
}

#[tokio::test]
async fn test_dispatch_failure_is_isolated_and_retried() {
    let harness = Harness::new();
    harness.orchestrator.fail_for(&table("sales/orders"));

    let result = harness
        .coordinator()
        .process_events(
            vec![
                delete_file("sales/orders/data/00001-deletes.parquet"),
                delete_file("sales/customers/data/00001-deletes.parquet"),
            ],
            NOW,
        )
        .await
        .unwrap();

    assert_eq!(result.status, InvocationStatus::Triggered);
    assert_eq!(result.started, 1);
    assert_eq!(result.failed, 1);
    assert!(matches!(
        result.outcome_for(&table("sales/orders")),
        Some(TableOutcome::Failed {
            retry_queued: true,
            ..
        })
    ));
    assert_eq!(harness.orchestrator.started_tables(), vec!["sales/customers"]);

    // lease released so the retry can take it
    let record = harness.store.get_record(&table("sales/orders")).await.unwrap().unwrap();
    assert_eq!(record.lock_until, None);
    assert_eq!(harness.queue.len(), 1);
}

#[tokio::test]
async fn test_table_mapping_and_warehouse_location() {
    let harness = Harness::with_config(
        "[catalog]\nname = \"lake_catalog\"\ndefault_warehouse_location = \"s3://warehouse/\"\n\n[catalog.table_mappings]\n\"sales/orders\" = \"sales.orders_v2\"\n",
    );

    harness
        .coordinator()
        .process_events(
            vec![delete_file("sales/orders/metadata/00001-deletes.parquet")],
            NOW,
        )
        .await
        .unwrap();

    let executions = harness.orchestrator.executions();
    assert_eq!(
        executions[0].request.fully_qualified_name,
        "lake_catalog.sales.orders_v2"
    );
    assert_eq!(executions[0].request.warehouse_location, "s3://warehouse/");
}

#[tokio::test]
async fn test_payload_decoded_and_processed() {
    let harness = Harness::new();

    let payload = json!({
        "Records": [
            {
                "s3": {
                    "bucket": {"name": "lake"},
                    "object": {"key": "sales/order+lines/data/00001-deletes.parquet"}
                }
            },
            {
                "eventSource": "aws:sqs",
                "body": "{\"bucket\": \"lake\", \"key\": \"sales/customers/data/00002-deletes.parquet\"}"
            }
        ]
    });

    let result = harness.coordinator().process_payload(&payload, NOW).await.unwrap();

    assert_eq!(
        result.tables,
        vec![table("sales/order lines"), table("sales/customers")]
    );
}

#[tokio::test]
async fn test_unrecognized_payload_fails_whole_batch() {
    let harness = Harness::new();

    let err = harness
        .coordinator()
        .process_payload(&json!({"Records": [{"unexpected": 1}]}), NOW)
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::Envelope(_)));
    assert!(harness.orchestrator.executions().is_empty());
}

#[tokio::test]
async fn test_missing_identifier_fails_before_processing() {
    let harness = Harness::new();
    let mut config = harness.config.clone();
    config.orchestrator.identifier = Some("   ".to_string());

    let result = BatchCoordinator::new(
        &config,
        harness.store.clone(),
        harness.queue.clone(),
        harness.orchestrator.clone(),
    );

    assert!(matches!(result, Err(GateError::Configuration(_))));
}
