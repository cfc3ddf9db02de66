//! Worker loop.

use crate::executor::ExecutorRegistry;
use chrono::Duration as ChronoDuration;
use conveyor_config::WorkerConfig;
use conveyor_core::{Clock, ConveyorError, ConveyorResult, Job, JobId, JobStatus};
use conveyor_queue::Dispatcher;
use conveyor_service::{JobPatch, JobService};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Periodically claims due jobs from the schedule index and fans each one
/// out to a concurrent handler.
///
/// Handler-scope errors are logged and swallowed: nothing inside a job
/// handler may tear down the loop. The loop itself exits only on
/// [`Worker::stop`].
pub struct Worker {
    service: Arc<JobService>,
    dispatcher: Dispatcher,
    registry: Arc<ExecutorRegistry>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    job_timeout: Duration,
    semaphore: Option<Arc<Semaphore>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Worker {
    /// Creates a worker.
    #[must_use]
    pub fn new(
        service: Arc<JobService>,
        dispatcher: Dispatcher,
        registry: Arc<ExecutorRegistry>,
        clock: Arc<dyn Clock>,
        config: &WorkerConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let semaphore = match config.max_concurrency {
            0 => None,
            cap => Some(Arc::new(Semaphore::new(cap))),
        };

        Self {
            service,
            dispatcher,
            registry,
            clock,
            tick_interval: config.tick_interval(),
            job_timeout: config.job_timeout(),
            semaphore,
            shutdown_tx,
        }
    }

    /// Runs the tick loop until [`Worker::stop`] is called.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(tick_interval = ?self.tick_interval, "worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::tick(&self).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("worker stopped");
                    return;
                }
            }
        }
    }

    /// Signals the loop to exit after the current tick.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Claims every due job and spawns one handler per id.
    async fn tick(this: &Arc<Self>) {
        let now = this.clock.now();

        let ids = match this.dispatcher.dequeue(now).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to dequeue jobs");
                return;
            }
        };

        if !ids.is_empty() {
            debug!(count = ids.len(), "claimed due jobs");
        }

        for id in ids {
            let permit = match &this.semaphore {
                Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
                    Ok(permit) => Some(permit),
                    // The semaphore is never closed while the worker runs.
                    Err(_) => None,
                },
                None => None,
            };

            let worker = Arc::clone(this);
            tokio::spawn(async move {
                worker.handle_job(id).await;
                drop(permit);
            });
        }
    }

    /// Drives one claimed job through Running to Done, Failed, or a
    /// requeued retry. Never returns an error: every failure is logged and
    /// classified here.
    pub async fn handle_job(&self, id: JobId) {
        // Claim the record. A rejected transition means another actor got
        // there first (cancellation between claim and now); the claim is
        // already consumed, so back off silently.
        match self.service.update_job_status(id, JobStatus::Running).await {
            Ok(_) => {}
            Err(ConveyorError::InvalidStatusTransition { from, .. }) => {
                debug!(job_id = %id, status = %from, "job no longer queued, skipping");
                return;
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "failed to mark job running");
                return;
            }
        }

        // Re-read for up-to-date retry bookkeeping and payload.
        let job = match self.service.get_job(id).await {
            Ok(job) => job,
            Err(e) => {
                error!(job_id = %id, error = %e, "failed to load job");
                return;
            }
        };

        let result = self.execute(&job).await;
        let now = self.clock.now();

        match result {
            Ok(()) => {
                counter!("conveyor_worker_jobs_succeeded_total").increment(1);
                let patch = JobPatch::new()
                    .status(JobStatus::Done)
                    .finished_at(now)
                    .clear_last_error();
                if let Err(e) = self.service.update_job_fields(id, patch).await {
                    error!(job_id = %id, error = %e, "failed to record job success");
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(job_id = %id, error = %message, "job execution failed");

                if job.can_retry() {
                    counter!("conveyor_worker_jobs_retried_total").increment(1);
                    let run_at = now + ChronoDuration::seconds(i64::from(job.retry_delay_sec));
                    if let Err(e) = self.service.requeue(id, run_at, message).await {
                        error!(job_id = %id, error = %e, "failed to requeue job");
                    }
                } else {
                    counter!("conveyor_worker_jobs_failed_total").increment(1);
                    let patch = JobPatch::new()
                        .status(JobStatus::Failed)
                        .finished_at(now)
                        .last_error(message);
                    if let Err(e) = self.service.update_job_fields(id, patch).await {
                        error!(job_id = %id, error = %e, "failed to record job failure");
                    }
                }
            }
        }
    }

    /// Dispatches to the registered executor, bounded by the job timeout.
    async fn execute(&self, job: &Job) -> ConveyorResult<()> {
        let Some(executor) = self.registry.get(&job.task) else {
            return Err(ConveyorError::executor(format!(
                "no executor registered for task: {}",
                job.task
            )));
        };

        match timeout(self.job_timeout, executor.execute(job)).await {
            Ok(result) => result,
            Err(_) => Err(ConveyorError::executor(format!(
                "execution timed out after {:?}",
                self.job_timeout
            ))),
        }
    }
}
