//! Request and patch types consumed by the job service.

use chrono::{DateTime, Utc};
use conveyor_core::{JobStatus, TaskKind};
use serde::Deserialize;
use serde_json::Value;

/// Request to create a job.
///
/// Missing fields deserialize to their zero values so that presence is
/// checked by validation (reported as a 422 field error) rather than by the
/// JSON decoder (a 400).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub task: TaskKind,

    #[serde(default)]
    pub payload: Value,

    /// If absent, the job is created unscheduled.
    #[serde(default)]
    pub run_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub max_retries: Option<i64>,

    #[serde(default)]
    pub retry_delay_sec: Option<i64>,
}

/// Partial mutation of a job record. Unset fields are left untouched.
///
/// `last_error` is doubly optional so a successful attempt can null it out.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub run_at: Option<DateTime<Utc>>,
    pub status: Option<JobStatus>,
    pub finished_at: Option<DateTime<Utc>>,
    pub retries: Option<u32>,
    pub last_error: Option<Option<String>>,
}

impl JobPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status (transition legality is verified on apply).
    #[must_use]
    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the run-at instant.
    #[must_use]
    pub fn run_at(mut self, run_at: DateTime<Utc>) -> Self {
        self.run_at = Some(run_at);
        self
    }

    /// Sets the finished-at instant.
    #[must_use]
    pub fn finished_at(mut self, finished_at: DateTime<Utc>) -> Self {
        self.finished_at = Some(finished_at);
        self
    }

    /// Sets the retry counter.
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Records a failure message.
    #[must_use]
    pub fn last_error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(Some(message.into()));
        self
    }

    /// Clears any recorded failure message.
    #[must_use]
    pub fn clear_last_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }
}
