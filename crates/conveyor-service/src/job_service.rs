//! Job orchestration.

use crate::dto::{CreateJobRequest, JobPatch};
use chrono::{DateTime, Utc};
use conveyor_core::{
    task, Clock, ConveyorError, ConveyorResult, FieldErrors, Job, JobId, JobStatus, Page,
    PageParams,
};
use conveyor_queue::Dispatcher;
use conveyor_store::{JobSearchCriteria, JobStore};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Default seconds between a failed attempt and its retry.
pub const DEFAULT_RETRY_DELAY_SECS: u32 = 60;

/// Orchestrates every job mutation against the record store and the
/// schedule index, enforcing the status state machine on each write.
pub struct JobService {
    store: Arc<dyn JobStore>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
}

impl JobService {
    /// Creates a job service.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, dispatcher: Dispatcher, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            dispatcher,
            clock,
        }
    }

    /// Validates and persists a new job; schedules it if a run-at was given.
    pub async fn create_job(&self, request: CreateJobRequest) -> ConveyorResult<Job> {
        let now = self.clock.now();

        let mut errors = FieldErrors::new();
        validate_create(&request, now, &mut errors);
        if !errors.is_empty() {
            return Err(ConveyorError::Validation(errors));
        }

        let status = if request.run_at.is_some() {
            JobStatus::Queued
        } else {
            JobStatus::Created
        };

        let job = Job {
            id: JobId::new(),
            task: request.task,
            payload: request.payload,
            run_at: request.run_at,
            status,
            created_at: now,
            finished_at: None,
            retries: 0,
            max_retries: request.max_retries.unwrap_or(0) as u32,
            retry_delay_sec: request
                .retry_delay_sec
                .map_or(DEFAULT_RETRY_DELAY_SECS, |v| v as u32),
            last_error: None,
        };

        if let Err(e) = self.store.save(&job).await {
            error!(job_id = %job.id, error = %e, "failed to store job");
            return Err(e);
        }

        // The record is written first and the schedule entry second. A
        // failure between the two leaves the job Queued but unscheduled;
        // the error surfaces to the caller and nothing is rolled back.
        if let Some(run_at) = job.run_at {
            if let Err(e) = self.dispatcher.enqueue(job.id, run_at).await {
                error!(job_id = %job.id, error = %e, "failed to enqueue job");
                return Err(e);
            }
        }

        info!(job_id = %job.id, task = %job.task, status = %job.status, "created job");

        Ok(job)
    }

    /// Fetches a job by id.
    pub async fn get_job(&self, id: JobId) -> ConveyorResult<Job> {
        self.store.get(id).await
    }

    /// Schedules (or re-schedules) a job for execution at `run_at`.
    ///
    /// Legal only where the transition to Queued is: from Created and from
    /// Failed.
    pub async fn schedule_job(&self, id: JobId, run_at: DateTime<Utc>) -> ConveyorResult<Job> {
        let mut job = self.store.get(id).await?;

        if !job.status.can_transition_to(JobStatus::Queued) {
            return Err(ConveyorError::InvalidStatusTransition {
                from: job.status,
                to: JobStatus::Queued,
            });
        }

        job.run_at = Some(run_at);
        job.status = JobStatus::Queued;

        self.store.update(&job).await?;
        self.dispatcher.enqueue(job.id, run_at).await?;

        info!(job_id = %job.id, run_at = %run_at, "scheduled job");

        Ok(job)
    }

    /// Applies a status transition, rejecting illegal ones.
    ///
    /// A transition into Done, Failed or Cancelled stamps `finished_at` so
    /// terminal records always carry a completion time.
    pub async fn update_job_status(&self, id: JobId, new_status: JobStatus) -> ConveyorResult<Job> {
        let mut job = self.store.get(id).await?;

        if !job.status.can_transition_to(new_status) {
            return Err(ConveyorError::InvalidStatusTransition {
                from: job.status,
                to: new_status,
            });
        }

        job.status = new_status;
        if matches!(
            new_status,
            JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled
        ) && job.finished_at.is_none()
        {
            job.finished_at = Some(self.clock.now());
        }

        self.store.update(&job).await?;

        Ok(job)
    }

    /// Applies a partial field update. A patched status must still be a
    /// legal transition; the retry path uses [`JobService::requeue`]
    /// instead.
    pub async fn update_job_fields(&self, id: JobId, patch: JobPatch) -> ConveyorResult<Job> {
        let mut job = self.store.get(id).await?;

        if let Some(status) = patch.status {
            if !job.status.can_transition_to(status) {
                return Err(ConveyorError::InvalidStatusTransition {
                    from: job.status,
                    to: status,
                });
            }
            job.status = status;
        }
        if let Some(run_at) = patch.run_at {
            job.run_at = Some(run_at);
        }
        if let Some(finished_at) = patch.finished_at {
            job.finished_at = Some(finished_at);
        }
        if let Some(retries) = patch.retries {
            if retries > job.max_retries {
                return Err(ConveyorError::internal(format!(
                    "retries {retries} would exceed max_retries {}",
                    job.max_retries
                )));
            }
            job.retries = retries;
        }
        if let Some(last_error) = patch.last_error {
            job.last_error = last_error;
        }

        self.store.update(&job).await?;

        Ok(job)
    }

    /// Books a failed attempt and puts the job back on the schedule.
    ///
    /// This is the only path from Running back to Queued; it consumes one
    /// unit of the retry budget, records the failure, and re-enqueues.
    pub async fn requeue(
        &self,
        id: JobId,
        run_at: DateTime<Utc>,
        last_error: impl Into<String>,
    ) -> ConveyorResult<Job> {
        let mut job = self.store.get(id).await?;

        if job.status != JobStatus::Running {
            return Err(ConveyorError::InvalidStatusTransition {
                from: job.status,
                to: JobStatus::Queued,
            });
        }
        if !job.can_retry() {
            return Err(ConveyorError::internal(format!(
                "retry budget exhausted: {}/{}",
                job.retries, job.max_retries
            )));
        }

        job.retries += 1;
        job.status = JobStatus::Queued;
        job.run_at = Some(run_at);
        job.finished_at = Some(self.clock.now());
        job.last_error = Some(last_error.into());

        self.store.update(&job).await?;
        self.dispatcher.enqueue(job.id, run_at).await?;

        info!(
            job_id = %job.id,
            retries = job.retries,
            max_retries = job.max_retries,
            run_at = %run_at,
            "requeued job for retry"
        );

        Ok(job)
    }

    /// Cancels a job: Queued → Cancelled, then drops the schedule entry.
    ///
    /// The removal is best-effort: if a worker claimed the id this tick the
    /// entry is already gone, the worker's own Running transition will be
    /// rejected, and the cancel wins.
    pub async fn cancel_job(&self, id: JobId) -> ConveyorResult<Job> {
        let job = self.update_job_status(id, JobStatus::Cancelled).await?;

        if let Err(e) = self.dispatcher.remove(id).await {
            warn!(job_id = %id, error = %e, "failed to remove cancelled job from schedule");
            return Err(e);
        }

        info!(job_id = %id, "cancelled job");

        Ok(job)
    }

    /// Filtered, paginated job search.
    pub async fn search_jobs(
        &self,
        criteria: &JobSearchCriteria,
        page: &PageParams,
    ) -> ConveyorResult<Page<Job>> {
        let mut errors = FieldErrors::new();
        page.validate(&mut errors);
        if !errors.is_empty() {
            return Err(ConveyorError::Validation(errors));
        }

        self.store.search(criteria, page).await
    }
}

fn validate_create(request: &CreateJobRequest, now: DateTime<Utc>, errors: &mut FieldErrors) {
    errors.require(!request.task.as_str().is_empty(), "task");
    errors.check(request.task.is_supported(), "task", "unsupported task");
    errors.require(!request.payload.is_null(), "payload");
    errors.check(
        request.run_at.map_or(true, |run_at| run_at > now),
        "run_at",
        "must be in the future",
    );
    errors.check(
        request.max_retries.map_or(true, |v| v >= 0),
        "max_retries",
        "must not be negative",
    );
    errors.check(
        request.retry_delay_sec.map_or(true, |v| v > 0),
        "retry_delay_sec",
        "must be greater than zero",
    );

    task::validate_payload(&request.task, &request.payload, errors);
}
