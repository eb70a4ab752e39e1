//! Compaction triggering
//!
//! This module turns batches of change events into compaction executions:
//! - Batch coordination (resolve, filter, deduplicate, lease, dispatch)
//! - Polling of the delay channel for deferred retries
//! - Invocation results

pub mod coordinator;
pub mod poller;
pub mod summary;

pub use coordinator::{BatchCoordinator, TriggerSettings};
pub use poller::{PollReport, RetryPoller};
pub use summary::{InvocationResult, InvocationStatus, TableOutcome, TableReport};
