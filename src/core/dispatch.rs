//! Orchestrator dispatch

use crate::adapters::orchestrator::Orchestrator;
use crate::domain::table::{CompactionRequest, JobHandle};
use crate::domain::Result;
use std::sync::Arc;
use uuid::Uuid;

/// Starts one compaction execution per call, with a fresh invocation id
///
/// Not retried internally; failures go back to the caller.
#[derive(Clone)]
pub struct DispatchGateway {
    orchestrator: Arc<dyn Orchestrator>,
}

impl DispatchGateway {
    /// Creates a gateway over an orchestrator
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Starts compaction for `request`
    pub async fn start(&self, request: &CompactionRequest) -> Result<JobHandle> {
        let invocation_id = Uuid::new_v4().to_string();

        let handle = self
            .orchestrator
            .start_execution(request, &invocation_id)
            .await?;

        tracing::info!(
            table_id = %request.table_id,
            fully_qualified_name = %request.fully_qualified_name,
            execution_id = %handle.execution_id,
            invocation_id = %handle.invocation_id,
            "Compaction started"
        );
        Ok(handle)
    }
}
