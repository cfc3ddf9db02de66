//! Executor contract and registry.

use async_trait::async_trait;
use conveyor_core::{ConveyorResult, Job, TaskKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs the body of one task kind.
///
/// Executors must not mutate the job record, must honour the ambient
/// deadline, and are expected to be idempotent with respect to the payload:
/// delivery is at-least-once.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes the job's payload. Any error drives the retry policy.
    async fn execute(&self, job: &Job) -> ConveyorResult<()>;
}

/// Immutable mapping from task kind to executor, built once at startup.
///
/// A dequeued job whose kind has no entry fails with an executor error; it
/// is never a panic.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskKind, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an executor for a task kind, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, kind: TaskKind, executor: Arc<dyn Executor>) -> Self {
        self.executors.insert(kind, executor);
        self
    }

    /// Looks up the executor for a task kind.
    #[must_use]
    pub fn get(&self, kind: &TaskKind) -> Option<&Arc<dyn Executor>> {
        self.executors.get(kind)
    }

    /// Returns the number of registered executors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// Returns true if no executors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::ConveyorError;

    struct NoopExecutor;

    #[async_trait]
    impl Executor for NoopExecutor {
        async fn execute(&self, _job: &Job) -> ConveyorResult<()> {
            Ok(())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl Executor for FailingExecutor {
        async fn execute(&self, _job: &Job) -> ConveyorResult<()> {
            Err(ConveyorError::executor("always fails"))
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ExecutorRegistry::new()
            .with(TaskKind::webhook(), Arc::new(NoopExecutor))
            .with(TaskKind::send_email(), Arc::new(FailingExecutor));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&TaskKind::webhook()).is_some());
        assert!(registry.get(&TaskKind::new("xyz")).is_none());
    }

    #[test]
    fn test_registry_replaces_duplicate_kind() {
        let registry = ExecutorRegistry::new()
            .with(TaskKind::webhook(), Arc::new(NoopExecutor))
            .with(TaskKind::webhook(), Arc::new(FailingExecutor));

        assert_eq!(registry.len(), 1);
    }
}
