//! Webhook executor.

use crate::executor::Executor;
use async_trait::async_trait;
use conveyor_core::{ConveyorError, ConveyorResult, Job, WebhookPayload};
use reqwest::{Client, Method};
use tracing::debug;

/// Delivers webhook jobs over HTTP. A transport failure or a non-success
/// response status is an execution error and drives the retry policy.
pub struct WebhookExecutor {
    client: Client,
}

impl WebhookExecutor {
    /// Creates an executor with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Creates an executor over a preconfigured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for WebhookExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for WebhookExecutor {
    async fn execute(&self, job: &Job) -> ConveyorResult<()> {
        let payload: WebhookPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| ConveyorError::executor(format!("invalid webhook payload: {e}")))?;

        let method = Method::from_bytes(payload.method.as_bytes())
            .map_err(|_| ConveyorError::executor(format!("invalid HTTP method: {}", payload.method)))?;

        let mut request = self.client.request(method, &payload.url);
        if let Some(headers) = &payload.headers {
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }
        if let Some(body) = &payload.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConveyorError::executor(format!("webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConveyorError::executor(format!(
                "webhook call to {} returned {}",
                payload.url, status
            )));
        }

        debug!(job_id = %job.id, url = %payload.url, status = %status, "webhook delivered");

        Ok(())
    }
}
