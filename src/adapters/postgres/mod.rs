//! PostgreSQL adapters.
//!
//! Schema lives in `migrations/` at the crate root and is applied with
//! [`run_migrations`].

mod idempotency_key_store;
mod reconciliation_repository;

pub use idempotency_key_store::PostgresIdempotencyKeyStore;
pub use reconciliation_repository::PostgresReconciliationRepository;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Opens a connection pool sized from configuration, applying migrations
/// first when `run_migrations` is set.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(config.url.expose_secret())
        .await
        .map_err(|e| DomainError::database(format!("Failed to connect to database: {}", e)))?;

    if config.run_migrations {
        run_migrations(&pool).await?;
        info!("Database migrations applied");
    }
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to run migrations: {}", e)))
}
