//! PostgreSQL job store.

use crate::job_store::{JobSearchCriteria, JobStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conveyor_config::DatabaseConfig;
use conveyor_core::{
    ConveyorError, ConveyorResult, Job, JobId, JobStatus, Page, PageParams, TaskKind,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, QueryBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Creates a PostgreSQL connection pool and verifies connectivity.
pub async fn create_pool(config: &DatabaseConfig) -> ConveyorResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .idle_timeout(config.idle_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| ConveyorError::Storage(format!("failed to connect to database: {e}")))?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("Database connection successful");

    Ok(pool)
}

/// Applies embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> ConveyorResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ConveyorError::Storage(format!("migration failed: {e}")))?;
    Ok(())
}

/// Job store backed by PostgreSQL.
pub struct PgJobStore {
    pool: PgPool,
    op_timeout: Duration,
}

const SELECT_COLUMNS: &str = "id, task, payload, run_at, status, created_at, finished_at, \
     retries, max_retries, retry_delay_sec, last_error";

impl PgJobStore {
    /// Creates a store with the default 3 s per-operation deadline.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            op_timeout: Duration::from_secs(3),
        }
    }

    /// Overrides the per-operation deadline.
    #[must_use]
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Bounds a query future by the per-operation deadline.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> ConveyorResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(ConveyorError::from),
            Err(_) => Err(ConveyorError::Timeout(format!(
                "{op} exceeded {:?}",
                self.op_timeout
            ))),
        }
    }
}

/// Database row representation of a job.
#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    task: String,
    payload: serde_json::Value,
    run_at: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    retries: i32,
    max_retries: i32,
    retry_delay_sec: i32,
    last_error: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = ConveyorError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status).ok_or_else(|| {
            ConveyorError::Storage(format!("unknown status in database: {}", row.status))
        })?;

        Ok(Job {
            id: JobId::from_uuid(row.id),
            task: TaskKind::new(row.task),
            payload: row.payload,
            run_at: row.run_at,
            status,
            created_at: row.created_at,
            finished_at: row.finished_at,
            retries: non_negative(row.retries, "retries")?,
            max_retries: non_negative(row.max_retries, "max_retries")?,
            retry_delay_sec: non_negative(row.retry_delay_sec, "retry_delay_sec")?,
            last_error: row.last_error,
        })
    }
}

fn non_negative(value: i32, column: &str) -> ConveyorResult<u32> {
    u32::try_from(value)
        .map_err(|_| ConveyorError::Storage(format!("negative {column} in database: {value}")))
}

/// Appends the criteria filters to a query builder.
fn push_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, criteria: &JobSearchCriteria) {
    if let Some(task) = &criteria.task {
        builder.push(" AND task = ");
        builder.push_bind(task.as_str().to_owned());
    }
    if let Some(status) = criteria.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(from) = criteria.run_at_from {
        builder.push(" AND run_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = criteria.run_at_to {
        builder.push(" AND run_at <= ");
        builder.push_bind(to);
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn save(&self, job: &Job) -> ConveyorResult<()> {
        let result = self
            .bounded(
                "save",
                sqlx::query(
                    r#"
                    INSERT INTO jobs (id, task, payload, run_at, status, created_at,
                                      finished_at, retries, max_retries, retry_delay_sec, last_error)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(job.id.into_inner())
                .bind(job.task.as_str())
                .bind(&job.payload)
                .bind(job.run_at)
                .bind(job.status.as_str())
                .bind(job.created_at)
                .bind(job.finished_at)
                .bind(job.retries as i32)
                .bind(job.max_retries as i32)
                .bind(job.retry_delay_sec as i32)
                .bind(&job.last_error)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() != 1 {
            return Err(ConveyorError::Storage(
                "no rows affected by insert".to_string(),
            ));
        }

        debug!(job_id = %job.id, "saved job");
        Ok(())
    }

    async fn get(&self, id: JobId) -> ConveyorResult<Job> {
        let row: Option<JobRow> = self
            .bounded(
                "get",
                sqlx::query_as(
                    r#"
                    SELECT id, task, payload, run_at, status, created_at, finished_at,
                           retries, max_retries, retry_delay_sec, last_error
                    FROM jobs
                    WHERE id = $1
                    "#,
                )
                .bind(id.into_inner())
                .fetch_optional(&self.pool),
            )
            .await?;

        row.ok_or_else(|| ConveyorError::not_found("job", id))?
            .try_into()
    }

    async fn update(&self, job: &Job) -> ConveyorResult<()> {
        let result = self
            .bounded(
                "update",
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET task = $1, payload = $2, run_at = $3, status = $4, finished_at = $5,
                        retries = $6, max_retries = $7, retry_delay_sec = $8, last_error = $9
                    WHERE id = $10
                    "#,
                )
                .bind(job.task.as_str())
                .bind(&job.payload)
                .bind(job.run_at)
                .bind(job.status.as_str())
                .bind(job.finished_at)
                .bind(job.retries as i32)
                .bind(job.max_retries as i32)
                .bind(job.retry_delay_sec as i32)
                .bind(&job.last_error)
                .bind(job.id.into_inner())
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() != 1 {
            return Err(ConveyorError::not_found("job", job.id));
        }

        debug!(job_id = %job.id, status = %job.status, "updated job");
        Ok(())
    }

    async fn search(
        &self,
        criteria: &JobSearchCriteria,
        page: &PageParams,
    ) -> ConveyorResult<Page<Job>> {
        let mut count_builder = QueryBuilder::new("SELECT count(*) FROM jobs WHERE TRUE");
        push_filters(&mut count_builder, criteria);

        let total: i64 = self
            .bounded(
                "search",
                count_builder.build_query_scalar().fetch_one(&self.pool),
            )
            .await?;

        if total == 0 {
            return Ok(Page::empty());
        }

        let mut builder =
            QueryBuilder::new(format!("SELECT {SELECT_COLUMNS} FROM jobs WHERE TRUE"));
        push_filters(&mut builder, criteria);

        // Safe: the sort column comes from the whitelist, never from input.
        let direction = if page.sort_descending() { "DESC" } else { "ASC" };
        builder.push(format!(
            " ORDER BY {} {}, id ASC",
            page.sort_column(),
            direction
        ));
        builder.push(" LIMIT ");
        builder.push_bind(page.limit());
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let rows: Vec<JobRow> = self
            .bounded("search", builder.build_query_as().fetch_all(&self.pool))
            .await?;

        let jobs = rows
            .into_iter()
            .map(Job::try_from)
            .collect::<ConveyorResult<Vec<_>>>()?;

        Ok(Page::new(jobs, total as u64, page))
    }
}
