//! HTTP orchestrator client
//!
//! Starts executions with `POST {endpoint}/executions`:
//!
//! ```json
//! {
//!   "orchestrator_id": "arn:aws:states:...:stateMachine:iceberg-compaction",
//!   "name": "5f0c1c8e-...",
//!   "input": {
//!     "table_id": "sales/orders",
//!     "fully_qualified_name": "glue_catalog.sales.orders",
//!     "warehouse_location": "s3://lake/",
//!     "bucket": "lake"
//!   }
//! }
//! ```
//!
//! A 2xx response carrying `execution_id` is a started execution.

use super::traits::Orchestrator;
use crate::config::OrchestratorConfig;
use crate::domain::errors::DispatchError;
use crate::domain::table::{CompactionRequest, JobHandle};
use crate::domain::{GateError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct StartExecutionRequest<'a> {
    orchestrator_id: &'a str,
    name: &'a str,
    input: &'a CompactionRequest,
}

#[derive(Debug, Deserialize)]
struct StartExecutionResponse {
    execution_id: String,
}

/// Orchestrator reached over HTTP with `reqwest`
pub struct HttpOrchestrator {
    client: Client,
    executions_url: String,
    orchestrator_id: String,
    auth_header: Option<String>,
}

impl HttpOrchestrator {
    /// Creates a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if the identifier is missing or the
    /// HTTP client cannot be built.
    pub fn new(config: &OrchestratorConfig) -> Result<Self> {
        let orchestrator_id = config
            .identifier()
            .ok_or_else(|| {
                GateError::Configuration("orchestrator.identifier is required".to_string())
            })?
            .to_string();

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)))
            .build()
            .map_err(|e| GateError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let auth_header = config
            .auth_token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret().as_ref()));

        Ok(Self {
            client,
            executions_url: format!("{}/executions", config.endpoint.trim_end_matches('/')),
            orchestrator_id,
            auth_header,
        })
    }
}

#[async_trait]
impl Orchestrator for HttpOrchestrator {
    async fn start_execution(
        &self,
        request: &CompactionRequest,
        invocation_id: &str,
    ) -> Result<JobHandle> {
        let body = StartExecutionRequest {
            orchestrator_id: &self.orchestrator_id,
            name: invocation_id,
            input: request,
        };

        let mut http_request = self.client.post(&self.executions_url).json(&body);
        if let Some(ref auth) = self.auth_header {
            http_request = http_request.header("Authorization", auth);
        }

        let resp = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout(e.to_string())
            } else {
                DispatchError::ConnectionFailed(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let message = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let parsed: StartExecutionResponse = resp
            .json()
            .await
            .map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;

        Ok(JobHandle {
            execution_id: parsed.execution_id,
            invocation_id: invocation_id.to_string(),
            started_at: Utc::now(),
        })
    }
}
