//! Redis idempotency key store.
//!
//! Admission is a single `SET key value NX EX ttl`, so concurrent deliveries
//! race on one atomic command. Retention is enforced by the key TTL.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::IdempotencyKeyStore;

use super::cache_error;

const KEY_PREFIX: &str = "idempotency:";

#[derive(Clone)]
pub struct RedisIdempotencyKeyStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisIdempotencyKeyStore {
    pub fn new(conn: MultiplexedConnection, retention_days: u32) -> Self {
        Self {
            conn,
            ttl_secs: u64::from(retention_days.max(1)) * 86_400,
        }
    }

    fn redis_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

#[async_trait]
impl IdempotencyKeyStore for RedisIdempotencyKeyStore {
    async fn insert_if_absent(
        &self,
        key: &str,
        admitted_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg(admitted_at.as_unix_millis())
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("Failed to admit idempotency key", e))?;
        Ok(reply.is_some())
    }

    async fn contains(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        conn.exists(Self::redis_key(key))
            .await
            .map_err(|e| cache_error("Failed to check idempotency key", e))
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::redis_key(key))
            .await
            .map_err(|e| cache_error("Failed to release idempotency key", e))
    }

    /// Keys expire on their own TTL; nothing to sweep.
    async fn delete_before(&self, _cutoff: Timestamp) -> Result<u64, DomainError> {
        Ok(0)
    }
}

impl std::fmt::Debug for RedisIdempotencyKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisIdempotencyKeyStore")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
