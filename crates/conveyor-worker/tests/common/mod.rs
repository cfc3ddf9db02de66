//! Shared fixtures for worker integration tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use conveyor_config::WorkerConfig;
use conveyor_core::{Clock, ConveyorError, ConveyorResult, Job, ManualClock, TaskKind};
use conveyor_queue::{Dispatcher, InMemoryScheduleIndex};
use conveyor_service::JobService;
use conveyor_store::InMemoryJobStore;
use conveyor_worker::{Executor, ExecutorRegistry, Worker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The frozen scenario clock: 2025-01-01T00:00:00Z.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Executor that fails a scripted number of times, then succeeds.
pub struct ScriptedExecutor {
    failures_remaining: AtomicUsize,
    message: String,
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn succeeding() -> Self {
        Self::failing_times(0, "")
    }

    pub fn failing_times(failures: usize, message: impl Into<String>) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(failures),
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, _job: &Job) -> ConveyorResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ConveyorError::executor(self.message.clone()));
        }

        Ok(())
    }
}

/// A fully wired in-memory worker setup driven by a manual clock.
pub struct Fixture {
    pub service: Arc<JobService>,
    pub dispatcher: Dispatcher,
    pub store: Arc<InMemoryJobStore>,
    pub index: Arc<InMemoryScheduleIndex>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryJobStore::new());
        let index = Arc::new(InMemoryScheduleIndex::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let dispatcher = Dispatcher::new(index.clone());
        let service = Arc::new(JobService::new(
            store.clone(),
            dispatcher.clone(),
            clock.clone(),
        ));

        Self {
            service,
            dispatcher,
            store,
            index,
            clock,
        }
    }

    /// Builds a worker over this fixture with the given executor for `kind`.
    pub fn worker(&self, kind: TaskKind, executor: Arc<dyn Executor>) -> Arc<Worker> {
        self.worker_with_registry(ExecutorRegistry::new().with(kind, executor))
    }

    pub fn worker_with_registry(&self, registry: ExecutorRegistry) -> Arc<Worker> {
        Arc::new(Worker::new(
            self.service.clone(),
            self.dispatcher.clone(),
            Arc::new(registry),
            self.clock.clone() as Arc<dyn Clock>,
            &WorkerConfig::default(),
        ))
    }
}
