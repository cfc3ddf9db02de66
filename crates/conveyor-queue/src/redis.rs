//! Redis-backed schedule index.

use crate::schedule::ScheduleIndex;
use async_trait::async_trait;
use conveyor_core::{ConveyorError, ConveyorResult, JobId};
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, Script};
use tracing::{debug, info, warn};

/// Claims every member with score in `[ARGV[1], ARGV[2]]` and removes the
/// claimed members in the same script invocation, so concurrent callers can
/// never observe the same member.
const CLAIM_DUE_SCRIPT: &str = r#"
local jobs = redis.call("ZRANGEBYSCORE", KEYS[1], ARGV[1], ARGV[2])
if #jobs > 0 then
  redis.call("ZREM", KEYS[1], unpack(jobs))
end
return jobs
"#;

/// Creates a Redis connection pool and verifies connectivity.
pub async fn create_pool(url: &str, pool_size: usize) -> ConveyorResult<Pool> {
    let cfg = Config::from_url(url);

    let pool = cfg
        .builder()
        .map_err(|e| ConveyorError::Configuration(format!("invalid Redis config: {e}")))?
        .max_size(pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| ConveyorError::Configuration(format!("failed to create Redis pool: {e}")))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("Redis connection successful");

    Ok(pool)
}

/// Schedule index backed by a Redis sorted set.
pub struct RedisScheduleIndex {
    pool: Pool,
    key: String,
    claim_script: Script,
}

impl RedisScheduleIndex {
    /// Creates an index over the named set `{prefix}:schedule:default`.
    #[must_use]
    pub fn new(pool: Pool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            key: format!("{}:schedule:default", key_prefix.into()),
            claim_script: Script::new(CLAIM_DUE_SCRIPT),
        }
    }

    /// The backing sorted-set key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl ScheduleIndex for RedisScheduleIndex {
    async fn add(&self, id: JobId, run_at_unix: i64) -> ConveyorResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.zadd(&self.key, id.to_string(), run_at_unix).await?;
        debug!(job_id = %id, score = run_at_unix, "added schedule entry");
        Ok(())
    }

    async fn claim_due(&self, threshold_unix: i64) -> ConveyorResult<Vec<JobId>> {
        let mut conn = self.pool.get().await?;

        let members: Vec<String> = self
            .claim_script
            .key(&self.key)
            .arg(0i64)
            .arg(threshold_unix)
            .invoke_async(&mut *conn)
            .await?;

        let mut ids = Vec::with_capacity(members.len());
        for member in members {
            match JobId::parse(&member) {
                Ok(id) => ids.push(id),
                // A malformed member cannot be re-claimed (the script already
                // removed it), so log it and move on.
                Err(e) => warn!(member = %member, error = %e, "dropping unparseable schedule entry"),
            }
        }

        if !ids.is_empty() {
            debug!(count = ids.len(), threshold = threshold_unix, "claimed due jobs");
        }

        Ok(ids)
    }

    async fn remove(&self, id: JobId) -> ConveyorResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.zrem(&self.key, id.to_string()).await?;
        debug!(job_id = %id, "removed schedule entry");
        Ok(())
    }
}
