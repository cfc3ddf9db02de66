//! # Conveyor Server
//!
//! Entry point for the Conveyor job queue. One binary serves both process
//! roles:
//! - **api**: the HTTP control plane (create / schedule / cancel / search)
//! - **worker**: the tick loop that claims and executes due jobs
//! - **all**: both in a single process
//!
//! Bootstrap pings both the record store and the schedule index; failure of
//! either exits with status 1.

use conveyor_config::{AppConfig, ConfigLoader, ServiceRole};
use conveyor_core::{Clock, ConveyorError, ConveyorResult, SystemClock, TaskKind};
use conveyor_queue::{Dispatcher, RedisScheduleIndex, ScheduleIndex};
use conveyor_rest::{create_router, AppState};
use conveyor_service::JobService;
use conveyor_store::{JobStore, PgJobStore};
use conveyor_worker::{ExecutorRegistry, SendEmailExecutor, WebhookExecutor, Worker};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    init_logging();

    info!("Starting Conveyor...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> ConveyorResult<()> {
    let config = ConfigLoader::from_default_location()?;

    info!(
        environment = %config.app.environment,
        role = %config.role,
        "configuration loaded"
    );

    // Both backends must answer before this process serves anything.
    let db_pool = conveyor_store::create_pool(&config.database).await?;
    conveyor_store::run_migrations(&db_pool).await?;
    let redis_pool = conveyor_queue::create_pool(&config.redis.url, config.redis.pool_size).await?;

    let store: Arc<dyn JobStore> = Arc::new(
        PgJobStore::new(db_pool).with_op_timeout(config.database.op_timeout()),
    );
    let index: Arc<dyn ScheduleIndex> = Arc::new(RedisScheduleIndex::new(
        redis_pool,
        config.redis.key_prefix.clone(),
    ));
    let dispatcher = Dispatcher::new(index);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(JobService::new(store, dispatcher.clone(), clock.clone()));

    match config.role {
        ServiceRole::Api => run_api(&config, service).await,
        ServiceRole::Worker => run_worker(&config, service, dispatcher, clock).await,
        ServiceRole::All => run_all(&config, service, dispatcher, clock).await,
    }
}

async fn run_api(config: &AppConfig, service: Arc<JobService>) -> ConveyorResult<()> {
    let state = AppState::new(service, config.app.environment.clone());
    let router = create_router(state, config.server.cors_enabled);

    let addr = config.server.addr();
    info!("Starting API server on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConveyorError::Internal(format!("failed to bind {addr}: {e}")))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConveyorError::Internal(format!("server error: {e}")))?;

    info!("API server shutdown complete");
    Ok(())
}

async fn run_worker(
    config: &AppConfig,
    service: Arc<JobService>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
) -> ConveyorResult<()> {
    let worker = build_worker(config, service, dispatcher, clock)?;

    let handle = tokio::spawn(Arc::clone(&worker).run());

    shutdown_signal().await;
    worker.stop();
    let _ = handle.await;

    info!("Worker shutdown complete");
    Ok(())
}

async fn run_all(
    config: &AppConfig,
    service: Arc<JobService>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
) -> ConveyorResult<()> {
    let worker = build_worker(config, service.clone(), dispatcher, clock)?;
    let handle = tokio::spawn(Arc::clone(&worker).run());

    // The API server owns the shutdown signal; the worker follows it down.
    let result = run_api(config, service).await;

    worker.stop();
    let _ = handle.await;

    result
}

fn build_worker(
    config: &AppConfig,
    service: Arc<JobService>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
) -> ConveyorResult<Arc<Worker>> {
    let registry = ExecutorRegistry::new()
        .with(TaskKind::webhook(), Arc::new(WebhookExecutor::new()))
        .with(
            TaskKind::send_email(),
            Arc::new(SendEmailExecutor::new(&config.smtp)?),
        );

    Ok(Arc::new(Worker::new(
        service,
        dispatcher,
        Arc::new(registry),
        clock,
        &config.worker,
    )))
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,conveyor=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
