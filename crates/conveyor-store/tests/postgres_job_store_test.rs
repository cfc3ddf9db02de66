//! Integration tests for the PostgreSQL job store.
//!
//! These run against a real database and are ignored by default:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/conveyor_test \
//!     cargo test -p conveyor-store -- --ignored
//! ```

use chrono::{Duration, Utc};
use conveyor_core::{ConveyorError, Job, JobId, JobStatus, PageParams, TaskKind};
use conveyor_store::{create_pool, run_migrations, JobSearchCriteria, JobStore, PgJobStore};
use serde_json::json;

async fn store() -> PgJobStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let config = conveyor_config::DatabaseConfig {
        url,
        ..Default::default()
    };
    let pool = create_pool(&config).await.expect("database pool");
    run_migrations(&pool).await.expect("migrations");
    PgJobStore::new(pool)
}

fn send_email_job() -> Job {
    let now = Utc::now();
    Job {
        id: JobId::new(),
        task: TaskKind::send_email(),
        payload: json!({
            "to": "receiver@example.com",
            "from": "sender@example.com",
            "subject": "Hi"
        }),
        run_at: Some(now + Duration::hours(1)),
        status: JobStatus::Queued,
        created_at: now,
        finished_at: None,
        retries: 0,
        max_retries: 2,
        retry_delay_sec: 60,
        last_error: None,
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL; set DATABASE_URL"]
async fn test_save_then_get_round_trip() {
    let store = store().await;
    let job = send_email_job();

    store.save(&job).await.unwrap();
    let found = store.get(job.id).await.unwrap();

    assert_eq!(found.id, job.id);
    assert_eq!(found.task, job.task);
    assert_eq!(found.status, job.status);
    assert_eq!(found.payload, job.payload);
    assert_eq!(found.retries, 0);
    assert_eq!(found.max_retries, 2);
    // Postgres rounds timestamps to microseconds.
    assert_eq!(
        found.created_at.timestamp_micros(),
        job.created_at.timestamp_micros()
    );
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL; set DATABASE_URL"]
async fn test_save_duplicate_pk_conflicts() {
    let store = store().await;
    let job = send_email_job();

    store.save(&job).await.unwrap();

    let mut duplicate = send_email_job();
    duplicate.id = job.id;

    let err = store.save(&duplicate).await.unwrap_err();
    assert!(matches!(err, ConveyorError::Conflict(_)), "got {err}");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL; set DATABASE_URL"]
async fn test_get_missing_is_not_found() {
    let store = store().await;
    let err = store.get(JobId::new()).await.unwrap_err();
    assert!(matches!(err, ConveyorError::NotFound { .. }), "got {err}");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL; set DATABASE_URL"]
async fn test_update_mutates_record() {
    let store = store().await;
    let mut job = send_email_job();
    store.save(&job).await.unwrap();

    job.status = JobStatus::Cancelled;
    job.finished_at = Some(Utc::now());
    store.update(&job).await.unwrap();

    let found = store.get(job.id).await.unwrap();
    assert_eq!(found.status, JobStatus::Cancelled);
    assert!(found.finished_at.is_some());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL; set DATABASE_URL"]
async fn test_update_unknown_id_is_not_found() {
    let store = store().await;
    let job = send_email_job();

    let err = store.update(&job).await.unwrap_err();
    assert!(matches!(err, ConveyorError::NotFound { .. }), "got {err}");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL; set DATABASE_URL"]
async fn test_search_filters_by_task() {
    let store = store().await;
    let job = send_email_job();
    store.save(&job).await.unwrap();

    let criteria = JobSearchCriteria {
        task: Some(TaskKind::send_email()),
        ..Default::default()
    };
    let page = store
        .search(&criteria, &PageParams::default())
        .await
        .unwrap();

    assert!(page.metadata.total_records >= 1);
    assert!(page.items.iter().all(|j| j.task == TaskKind::send_email()));
}
