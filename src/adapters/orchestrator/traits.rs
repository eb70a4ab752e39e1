//! Orchestrator abstraction

use crate::domain::table::{CompactionRequest, JobHandle};
use crate::domain::Result;
use async_trait::async_trait;

/// External job orchestrator that runs the actual compaction
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Starts one execution for `request`
    ///
    /// `invocation_id` is unique per call; the orchestrator may use it as the
    /// execution name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::GateError::Dispatch`] if the orchestrator
    /// cannot be reached or refuses the execution.
    async fn start_execution(
        &self,
        request: &CompactionRequest,
        invocation_id: &str,
    ) -> Result<JobHandle>;
}
