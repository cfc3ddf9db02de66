//! # Conveyor Worker
//!
//! The consumer side of the queue: a ticker claims due job ids from the
//! schedule index, fans each one out to a concurrent handler, and drives the
//! job through Running to Done, Failed, or a requeued retry. Task bodies are
//! delegated to pluggable [`Executor`]s selected by task kind.

pub mod email;
pub mod executor;
pub mod webhook;
pub mod worker;

pub use email::SendEmailExecutor;
pub use executor::{Executor, ExecutorRegistry};
pub use webhook::WebhookExecutor;
pub use worker::Worker;
