//! Invocation results
//!
//! Serialized as the JSON result of an invocation:
//!
//! ```json
//! {
//!   "status": "triggered",
//!   "tables": ["sales/orders"],
//!   "matched": 1,
//!   "started": 1,
//!   "retried": 0,
//!   "skipped": 0,
//!   "failed": 0,
//!   "is_retry": false,
//!   "outcomes": [{"table_id": "sales/orders", "outcome": "dispatched", ...}]
//! }
//! ```

use crate::domain::ids::TableId;
use serde::Serialize;
use std::fmt;

/// Overall status of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationStatus {
    /// No event matched a table
    NoOp,
    /// At least one compaction was started
    Triggered,
    /// Nothing started, at least one retry enqueued
    Queued,
    /// Nothing started or enqueued, at least one table failed
    Failed,
    /// Every table was already covered by a pending retry
    Skipped,
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvocationStatus::NoOp => "no-op",
            InvocationStatus::Triggered => "triggered",
            InvocationStatus::Queued => "queued",
            InvocationStatus::Failed => "failed",
            InvocationStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of one table within an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TableOutcome {
    /// Lease acquired and compaction started
    Dispatched {
        /// Orchestrator execution id
        execution_id: String,
        /// Invocation id sent with the request
        invocation_id: String,
    },
    /// Lease held elsewhere; a retry was enqueued
    RetryQueued,
    /// Lease held elsewhere and a retry is already pending
    RetrySkipped,
    /// Store or orchestrator failure for this table
    Failed {
        /// Error description
        error: String,
        /// Whether a retry was enqueued after the failure
        retry_queued: bool,
    },
}

impl TableOutcome {
    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            TableOutcome::Dispatched { .. } => "dispatched",
            TableOutcome::RetryQueued => "retry_queued",
            TableOutcome::RetrySkipped => "retry_skipped",
            TableOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one table, with its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    /// Table processed
    pub table_id: TableId,
    /// Name sent to the orchestrator
    pub fully_qualified_name: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

/// Aggregate result of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    /// Overall status
    pub status: InvocationStatus,
    /// Distinct tables matched, in first-seen order
    pub tables: Vec<TableId>,
    /// Number of distinct tables matched
    pub matched: usize,
    /// Compactions started
    pub started: usize,
    /// Retries enqueued because the lease was held
    pub retried: usize,
    /// Tables skipped because a retry was already pending
    pub skipped: usize,
    /// Tables that failed
    pub failed: usize,
    /// Whether the batch carried any retry signal
    pub is_retry: bool,
    /// Per-table outcomes, in processing order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<TableReport>,
}

impl InvocationResult {
    /// Result of a batch in which no table matched
    pub fn no_op(is_retry: bool) -> Self {
        Self {
            status: InvocationStatus::NoOp,
            tables: Vec::new(),
            matched: 0,
            started: 0,
            retried: 0,
            skipped: 0,
            failed: 0,
            is_retry,
            outcomes: Vec::new(),
        }
    }

    /// Aggregates per-table reports
    pub fn from_reports(reports: Vec<TableReport>, is_retry: bool) -> Self {
        if reports.is_empty() {
            return Self::no_op(is_retry);
        }

        let count = |pred: fn(&TableOutcome) -> bool| {
            reports.iter().filter(|r| pred(&r.outcome)).count()
        };
        let started = count(|o| matches!(o, TableOutcome::Dispatched { .. }));
        let retried = count(|o| matches!(o, TableOutcome::RetryQueued));
        let skipped = count(|o| matches!(o, TableOutcome::RetrySkipped));
        let failed = count(|o| matches!(o, TableOutcome::Failed { .. }));

        let status = if started > 0 {
            InvocationStatus::Triggered
        } else if retried > 0 {
            InvocationStatus::Queued
        } else if failed > 0 {
            InvocationStatus::Failed
        } else {
            InvocationStatus::Skipped
        };

        Self {
            status,
            tables: reports.iter().map(|r| r.table_id.clone()).collect(),
            matched: reports.len(),
            started,
            retried,
            skipped,
            failed,
            is_retry,
            outcomes: reports,
        }
    }

    /// Whether any table failed
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Outcome recorded for `table_id`
    pub fn outcome_for(&self, table_id: &TableId) -> Option<&TableOutcome> {
        self.outcomes
            .iter()
            .find(|r| &r.table_id == table_id)
            .map(|r| &r.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(id: &str, outcome: TableOutcome) -> TableReport {
        TableReport {
            table_id: TableId::new(id).unwrap(),
            fully_qualified_name: format!("cat.{}", id.replace('/', ".")),
            outcome,
        }
    }

    fn dispatched() -> TableOutcome {
        TableOutcome::Dispatched {
            execution_id: "exec-1".to_string(),
            invocation_id: "inv-1".to_string(),
        }
    }

    fn failed() -> TableOutcome {
        TableOutcome::Failed {
            error: "boom".to_string(),
            retry_queued: false,
        }
    }

    #[test]
    fn test_no_op_serialization() {
        let value = serde_json::to_value(InvocationResult::no_op(false)).unwrap();
        assert_eq!(value["status"], "no-op");
        assert_eq!(value["matched"], 0);
        assert!(value.get("outcomes").is_none());
    }

    #[test]
    fn test_status_ladder() {
        let triggered = InvocationResult::from_reports(
            vec![report("a/b", TableOutcome::RetryQueued), report("c/d", dispatched())],
            false,
        );
        assert_eq!(triggered.status, InvocationStatus::Triggered);

        let queued = InvocationResult::from_reports(
            vec![report("a/b", failed()), report("c/d", TableOutcome::RetryQueued)],
            false,
        );
        assert_eq!(queued.status, InvocationStatus::Queued);
        assert!(queued.has_failures());

        let failed_status = InvocationResult::from_reports(
            vec![report("a/b", failed()), report("c/d", TableOutcome::RetrySkipped)],
            false,
        );
        assert_eq!(failed_status.status, InvocationStatus::Failed);

        let skipped =
            InvocationResult::from_reports(vec![report("a/b", TableOutcome::RetrySkipped)], true);
        assert_eq!(skipped.status, InvocationStatus::Skipped);
        assert!(skipped.is_retry);
    }

    #[test]
    fn test_counts_and_table_order() {
        let result = InvocationResult::from_reports(
            vec![
                report("sales/orders", dispatched()),
                report("sales/customers", TableOutcome::RetryQueued),
                report("warehouse/events", TableOutcome::RetrySkipped),
            ],
            false,
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value["tables"],
            json!(["sales/orders", "sales/customers", "warehouse/events"])
        );
        assert_eq!(value["matched"], 3);
        assert_eq!(value["started"], 1);
        assert_eq!(value["retried"], 1);
        assert_eq!(value["skipped"], 1);
        assert_eq!(value["failed"], 0);
        assert_eq!(value["outcomes"][0]["outcome"], "dispatched");
        assert_eq!(value["outcomes"][0]["execution_id"], "exec-1");
        assert_eq!(value["outcomes"][1]["outcome"], "retry_queued");
    }
}
