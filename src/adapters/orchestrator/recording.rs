//! In-memory orchestrator that records every request
//!
//! Used by tests and by the CLI when no orchestrator should actually be
//! invoked (`handle --dry-run`).

use super::traits::Orchestrator;
use crate::domain::errors::DispatchError;
use crate::domain::ids::TableId;
use crate::domain::table::{CompactionRequest, JobHandle};
use crate::domain::{GateError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

fn poison_err<T>(_: PoisonError<T>) -> GateError {
    DispatchError::ConnectionFailed("recording lock poisoned".to_string()).into()
}

/// A recorded `start_execution` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExecution {
    /// Request as received
    pub request: CompactionRequest,
    /// Invocation id as received
    pub invocation_id: String,
}

/// Orchestrator that stores requests instead of sending them
#[derive(Debug, Default)]
pub struct RecordingOrchestrator {
    executions: Mutex<Vec<RecordedExecution>>,
    failing_tables: Mutex<HashSet<TableId>>,
}

impl RecordingOrchestrator {
    /// Creates an orchestrator that accepts every request
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every request for `table_id` fail with a rejection
    pub fn fail_for(&self, table_id: &TableId) {
        if let Ok(mut failing) = self.failing_tables.lock() {
            failing.insert(table_id.clone());
        }
    }

    /// Accepted executions, in call order
    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Table ids of accepted executions, in call order
    pub fn started_tables(&self) -> Vec<String> {
        self.executions()
            .into_iter()
            .map(|e| e.request.table_id.into_inner())
            .collect()
    }
}

#[async_trait]
impl Orchestrator for RecordingOrchestrator {
    async fn start_execution(
        &self,
        request: &CompactionRequest,
        invocation_id: &str,
    ) -> Result<JobHandle> {
        if self
            .failing_tables
            .lock()
            .map_err(poison_err)?
            .contains(&request.table_id)
        {
            return Err(DispatchError::Rejected {
                status: 500,
                message: format!("simulated failure for {}", request.table_id),
            }
            .into());
        }

        let mut executions = self.executions.lock().map_err(poison_err)?;
        executions.push(RecordedExecution {
            request: request.clone(),
            invocation_id: invocation_id.to_string(),
        });

        Ok(JobHandle {
            execution_id: format!("recorded-{}", executions.len()),
            invocation_id: invocation_id.to_string(),
            started_at: Utc::now(),
        })
    }
}
