//! PostgreSQL idempotency key store.
//!
//! Admission is `INSERT ... ON CONFLICT DO NOTHING`; the affected row count
//! tells the caller whether it won.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::IdempotencyKeyStore;

pub struct PostgresIdempotencyKeyStore {
    pool: PgPool,
}

impl PostgresIdempotencyKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyKeyStore for PostgresIdempotencyKeyStore {
    async fn insert_if_absent(
        &self,
        key: &str,
        admitted_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (natural_key, admitted_at)
            VALUES ($1, $2)
            ON CONFLICT (natural_key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(admitted_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to admit idempotency key: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn contains(&self, key: &str) -> Result<bool, DomainError> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT natural_key FROM idempotency_keys WHERE natural_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to check idempotency key: {}", e))
                })?;

        Ok(found.is_some())
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM idempotency_keys WHERE natural_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to release idempotency key: {}", e))
            })?;
        Ok(())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM idempotency_keys WHERE admitted_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to purge idempotency keys: {}", e))
            })?;
        Ok(result.rows_affected())
    }
}
