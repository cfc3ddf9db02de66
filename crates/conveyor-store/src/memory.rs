//! In-memory job store.
//!
//! Implements the full store contract over a locked map. Used by tests and
//! single-process development setups.

use crate::job_store::{JobSearchCriteria, JobStore};
use async_trait::async_trait;
use conveyor_core::{ConveyorError, ConveyorResult, Job, JobId, Page, PageParams};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Job store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

fn matches(job: &Job, criteria: &JobSearchCriteria) -> bool {
    if let Some(task) = &criteria.task {
        if &job.task != task {
            return false;
        }
    }
    if let Some(status) = criteria.status {
        if job.status != status {
            return false;
        }
    }
    if let Some(from) = criteria.run_at_from {
        if job.run_at.map_or(true, |run_at| run_at < from) {
            return false;
        }
    }
    if let Some(to) = criteria.run_at_to {
        if job.run_at.map_or(true, |run_at| run_at > to) {
            return false;
        }
    }
    true
}

fn compare(a: &Job, b: &Job, column: &str) -> Ordering {
    match column {
        "id" => a.id.cmp(&b.id),
        "task" => a.task.as_str().cmp(b.task.as_str()),
        "run_at" => a.run_at.cmp(&b.run_at),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        _ => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn save(&self, job: &Job) -> ConveyorResult<()> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(ConveyorError::Conflict(format!(
                "job already exists: {}",
                job.id
            )));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> ConveyorResult<Job> {
        self.jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| ConveyorError::not_found("job", id))
    }

    async fn update(&self, job: &Job) -> ConveyorResult<()> {
        let mut jobs = self.jobs.write();
        match jobs.get_mut(&job.id) {
            Some(existing) => {
                let mut updated = job.clone();
                // id and created_at are immutable.
                updated.created_at = existing.created_at;
                *existing = updated;
                Ok(())
            }
            None => Err(ConveyorError::not_found("job", job.id)),
        }
    }

    async fn search(
        &self,
        criteria: &JobSearchCriteria,
        page: &PageParams,
    ) -> ConveyorResult<Page<Job>> {
        let jobs = self.jobs.read();

        let mut hits: Vec<Job> = jobs
            .values()
            .filter(|job| matches(job, criteria))
            .cloned()
            .collect();

        let total = hits.len() as u64;
        if total == 0 {
            return Ok(Page::empty());
        }

        let column = page.sort_column();
        let descending = page.sort_descending();
        hits.sort_by(|a, b| {
            let order = compare(a, b, column);
            let order = if descending { order.reverse() } else { order };
            order.then_with(|| a.id.cmp(&b.id))
        });

        let offset = page.offset().max(0) as usize;
        let items: Vec<Job> = hits
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .collect();

        Ok(Page::new(items, total, page))
    }
}
