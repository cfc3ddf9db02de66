//! # Conveyor Service
//!
//! The transactional orchestrator between the HTTP control plane, the record
//! store and the schedule index. Every job mutation goes through
//! [`JobService`], which enforces the status state machine on each write.

pub mod dto;
pub mod job_service;

pub use dto::{CreateJobRequest, JobPatch};
pub use job_service::{JobService, DEFAULT_RETRY_DELAY_SECS};
