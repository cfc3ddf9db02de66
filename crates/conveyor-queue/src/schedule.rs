//! Schedule index contract.

use async_trait::async_trait;
use conveyor_core::{ConveyorResult, JobId};

/// A time-ordered set of pending job ids, scored by unix-second run-at.
///
/// Scores are coarse (whole seconds). The only hard requirement is the
/// atomicity of [`ScheduleIndex::claim_due`]: across all callers, every id
/// is returned exactly once. This is what prevents two workers from running
/// the same job.
#[async_trait]
pub trait ScheduleIndex: Send + Sync {
    /// Upserts an entry. A second add for the same id replaces the previous
    /// score rather than duplicating the entry.
    async fn add(&self, id: JobId, run_at_unix: i64) -> ConveyorResult<()>;

    /// Atomically removes and returns every entry with score `<= threshold`,
    /// ascending by score. Returns an empty vec when nothing is due.
    async fn claim_due(&self, threshold_unix: i64) -> ConveyorResult<Vec<JobId>>;

    /// Removes the entry if present. A missing entry is not an error.
    async fn remove(&self, id: JobId) -> ConveyorResult<()>;
}
