//! Redis-backed adapters for multi-instance deployments.

mod idempotency_key_store;
mod run_lock;

pub use idempotency_key_store::RedisIdempotencyKeyStore;
pub use run_lock::RedisRunLock;

use redis::aio::MultiplexedConnection;
use secrecy::ExposeSecret;

use crate::config::RedisConfig;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Opens a multiplexed connection, bounded by the configured timeout.
pub async fn connect(config: &RedisConfig) -> Result<MultiplexedConnection, DomainError> {
    let client = redis::Client::open(config.url.expose_secret().as_str())
        .map_err(|e| cache_error("Invalid Redis URL", e))?;

    match tokio::time::timeout(config.timeout(), client.get_multiplexed_tokio_connection()).await {
        Ok(conn) => conn.map_err(|e| cache_error("Failed to connect to Redis", e)),
        Err(_) => Err(DomainError::new(
            ErrorCode::CacheError,
            format!("Redis connection timed out after {:?}", config.timeout()),
        )),
    }
}

fn cache_error(context: &str, err: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("{}: {}", context, err))
}
