//! # Conveyor Queue
//!
//! The schedule index: a process-external, time-ordered set of pending job
//! ids, scored by unix-second run-at. Producers add entries, workers claim
//! every entry due by a threshold in one atomic step, and cancellation
//! removes single entries.
//!
//! The Redis implementation backs the index with a sorted set and performs
//! the claim with a server-side script so that no two workers can observe
//! the same id. The in-memory implementation guards a map with a mutex and
//! provides the same contract inside one process.

pub mod dispatcher;
pub mod memory;
pub mod redis;
pub mod schedule;

pub use crate::redis::{create_pool, RedisScheduleIndex};
pub use dispatcher::Dispatcher;
pub use memory::InMemoryScheduleIndex;
pub use schedule::ScheduleIndex;
