//! In-process schedule index.
//!
//! Equivalent to the Redis index for a single process: a locked map provides
//! the same upsert/claim/remove contract, with the mutex standing in for the
//! server-side script. Used by tests and single-node deployments.

use crate::schedule::ScheduleIndex;
use async_trait::async_trait;
use conveyor_core::{ConveyorResult, JobId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Schedule index held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryScheduleIndex {
    entries: Mutex<HashMap<JobId, i64>>,
}

impl InMemoryScheduleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the score for an entry, if scheduled. For assertions.
    #[must_use]
    pub fn score(&self, id: JobId) -> Option<i64> {
        self.entries.lock().get(&id).copied()
    }

    /// Returns the number of scheduled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no entries are scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl ScheduleIndex for InMemoryScheduleIndex {
    async fn add(&self, id: JobId, run_at_unix: i64) -> ConveyorResult<()> {
        self.entries.lock().insert(id, run_at_unix);
        Ok(())
    }

    async fn claim_due(&self, threshold_unix: i64) -> ConveyorResult<Vec<JobId>> {
        let mut entries = self.entries.lock();

        let mut due: Vec<(i64, JobId)> = entries
            .iter()
            .filter(|(_, score)| **score <= threshold_unix)
            .map(|(id, score)| (*score, *id))
            .collect();

        for (_, id) in &due {
            entries.remove(id);
        }

        due.sort_unstable();

        Ok(due.into_iter().map(|(_, id)| id).collect())
    }

    async fn remove(&self, id: JobId) -> ConveyorResult<()> {
        self.entries.lock().remove(&id);
        Ok(())
    }
}
