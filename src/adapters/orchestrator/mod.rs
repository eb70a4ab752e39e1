//! Job orchestrator integration
//!
//! - [`HttpOrchestrator`] starts executions over HTTP
//! - [`RecordingOrchestrator`] keeps requests in memory

pub mod http;
pub mod recording;
pub mod traits;

pub use http::HttpOrchestrator;
pub use recording::{RecordedExecution, RecordingOrchestrator};
pub use traits::Orchestrator;
