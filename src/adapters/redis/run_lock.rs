//! Redis reconciliation run lock.
//!
//! `SET key token NX PX ttl` acquires; release deletes only when the stored
//! token still matches, so an expired lease cannot free someone else's lock.

use async_trait::async_trait;
use chrono::NaiveDate;
use redis::aio::MultiplexedConnection;
use uuid::Uuid;

use crate::config::RedisConfig;
use crate::domain::foundation::{DomainError, Platform};
use crate::ports::{ReconciliationRunLock, RunLease};

use super::cache_error;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisRunLock {
    conn: MultiplexedConnection,
    lease_ms: u64,
}

impl RedisRunLock {
    /// `lease_ms` bounds how long a crashed run can block the key.
    pub fn new(conn: MultiplexedConnection, lease_ms: u64) -> Self {
        Self { conn, lease_ms }
    }

    pub fn from_config(conn: MultiplexedConnection, config: &RedisConfig) -> Self {
        let lease_ms = u64::try_from(config.run_lock_lease().as_millis()).unwrap_or(u64::MAX);
        Self::new(conn, lease_ms)
    }
}

#[async_trait]
impl ReconciliationRunLock for RedisRunLock {
    async fn try_acquire(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Option<RunLease>, DomainError> {
        let key = RunLease::key_for(date, platform);
        let token = Uuid::new_v4().to_string();
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(self.lease_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("Failed to acquire run lock", e))?;

        Ok(reply.map(|_| RunLease { key, token }))
    }

    async fn release(&self, lease: &RunLease) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        redis::Script::new(RELEASE_SCRIPT)
            .key(&lease.key)
            .arg(&lease.token)
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map_err(|e| cache_error("Failed to release run lock", e))?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisRunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRunLock")
            .field("lease_ms", &self.lease_ms)
            .finish_non_exhaustive()
    }
}
