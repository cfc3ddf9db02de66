//! Shared application state for the HTTP layer.

use conveyor_service::JobService;
use std::sync::Arc;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The job orchestrator.
    pub job_service: Arc<JobService>,
    /// Environment tag reported by the health endpoint.
    pub environment: String,
}

impl AppState {
    /// Creates the application state.
    #[must_use]
    pub fn new(job_service: Arc<JobService>, environment: impl Into<String>) -> Self {
        Self {
            job_service,
            environment: environment.into(),
        }
    }
}
