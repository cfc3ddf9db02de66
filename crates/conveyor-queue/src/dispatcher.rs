//! Dispatcher: thin façade over the schedule index.

use crate::schedule::ScheduleIndex;
use chrono::{DateTime, Utc};
use conveyor_core::{ConveyorResult, JobId};
use std::sync::Arc;

/// Translates instants into index scores. Owns no state of its own: all
/// concurrency safety is delegated to the index.
#[derive(Clone)]
pub struct Dispatcher {
    index: Arc<dyn ScheduleIndex>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given index.
    #[must_use]
    pub fn new(index: Arc<dyn ScheduleIndex>) -> Self {
        Self { index }
    }

    /// Schedules a job at (or before, after rounding down) `run_at`.
    pub async fn enqueue(&self, id: JobId, run_at: DateTime<Utc>) -> ConveyorResult<()> {
        self.index.add(id, run_at.timestamp()).await
    }

    /// Claims every job due at or before `now`.
    pub async fn dequeue(&self, now: DateTime<Utc>) -> ConveyorResult<Vec<JobId>> {
        self.index.claim_due(now.timestamp()).await
    }

    /// Drops a job from the schedule, if still scheduled.
    pub async fn remove(&self, id: JobId) -> ConveyorResult<()> {
        self.index.remove(id).await
    }
}
