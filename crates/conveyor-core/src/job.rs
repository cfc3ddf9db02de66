//! The job entity and its status state machine.

use crate::id::JobId;
use crate::task::TaskKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a job.
///
/// `Done` and `Cancelled` are terminal. `Failed` admits one outgoing
/// transition (back to `Queued`) so exhausted jobs can be re-scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created but not yet scheduled.
    Created,
    /// Scheduled; visible to workers via the schedule index.
    Queued,
    /// Claimed by a worker and executing.
    Running,
    /// Executed successfully.
    Done,
    /// Retry budget exhausted.
    Failed,
    /// Cancelled before execution.
    Cancelled,
}

impl JobStatus {
    /// Returns true if `next` is a legal transition from this status.
    #[must_use]
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::{Cancelled, Created, Done, Failed, Queued, Running};
        matches!(
            (self, next),
            (Created, Queued)
                | (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Done)
                | (Running, Failed)
                | (Failed, Queued)
        )
    }

    /// Returns true if no transition out of this status is legal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Cancelled)
    }

    /// Parses a status from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Created" => Some(JobStatus::Created),
            "Queued" => Some(JobStatus::Queued),
            "Running" => Some(JobStatus::Running),
            "Done" => Some(JobStatus::Done),
            "Failed" => Some(JobStatus::Failed),
            "Cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Created => "Created",
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Done => "Done",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of work with a payload and an optional scheduled instant.
///
/// The record store owns every attribute; the schedule index only ever sees
/// the id and the run-at score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Server-generated identifier, immutable.
    pub id: JobId,

    /// Task kind; selects the executor.
    pub task: TaskKind,

    /// Opaque payload, interpreted only by the matching executor.
    pub payload: serde_json::Value,

    /// Target execution time. Absent while the job is merely Created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_at: Option<DateTime<Utc>>,

    /// Current lifecycle status.
    pub status: JobStatus,

    /// Set on create, immutable.
    pub created_at: DateTime<Utc>,

    /// Set when an attempt completes or the job reaches a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Count of retry attempts consumed so far.
    pub retries: u32,

    /// Configured retry ceiling; 0 means no retries.
    pub max_retries: u32,

    /// Seconds between a failed attempt and its retry.
    pub retry_delay_sec: u32,

    /// Diagnostic text from the most recent failure; cleared on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Job {
    /// Returns true if the retry budget still allows another attempt.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.retries < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [JobStatus; 6] = [
        JobStatus::Created,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    #[test]
    fn test_legal_transitions() {
        assert!(JobStatus::Created.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Failed.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn test_terminal_statuses_admit_nothing() {
        for terminal in [JobStatus::Done, JobStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        assert!(!JobStatus::Created.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Created.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Done));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Running));
        for status in ALL {
            assert!(!status.can_transition_to(status), "{status} -> {status}");
        }
    }

    #[test]
    fn test_status_wire_round_trip() {
        for status in ALL {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("queued"), None);
        assert_eq!(JobStatus::parse("xyz"), None);
    }

    #[test]
    fn test_status_serializes_as_wire_name() {
        let json = serde_json::to_string(&JobStatus::Queued).unwrap();
        assert_eq!(json, "\"Queued\"");
    }
}
