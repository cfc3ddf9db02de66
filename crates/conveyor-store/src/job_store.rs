//! Job record store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conveyor_core::{ConveyorResult, Job, JobId, JobStatus, Page, PageParams, TaskKind};

/// Filters for the job search endpoint. All filters are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct JobSearchCriteria {
    /// Filter by task kind.
    pub task: Option<TaskKind>,
    /// Filter by status.
    pub status: Option<JobStatus>,
    /// Lower bound (inclusive) on run_at.
    pub run_at_from: Option<DateTime<Utc>>,
    /// Upper bound (inclusive) on run_at.
    pub run_at_to: Option<DateTime<Utc>>,
}

/// Transactional per-record repository for jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new record. Fails with `Conflict` if the id already exists.
    async fn save(&self, job: &Job) -> ConveyorResult<()>;

    /// Fetches a record. Fails with `NotFound` if absent.
    async fn get(&self, id: JobId) -> ConveyorResult<Job>;

    /// Full-record update by id. Fails with `NotFound` if absent.
    /// `id` and `created_at` are never modified.
    async fn update(&self, job: &Job) -> ConveyorResult<()>;

    /// Filtered, paginated search with a whitelisted sort key.
    async fn search(
        &self,
        criteria: &JobSearchCriteria,
        page: &PageParams,
    ) -> ConveyorResult<Page<Job>>;
}
