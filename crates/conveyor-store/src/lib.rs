//! # Conveyor Store
//!
//! Durable, authoritative persistence for job records. The store owns every
//! attribute of a job; the schedule index only ever holds ids. Backends:
//! PostgreSQL for deployments, an in-memory map for tests and single-process
//! development.

pub mod job_store;
pub mod memory;
pub mod postgres;

pub use job_store::{JobSearchCriteria, JobStore};
pub use memory::InMemoryJobStore;
pub use postgres::{create_pool, run_migrations, PgJobStore};
