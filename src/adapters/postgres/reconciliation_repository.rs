//! PostgreSQL reconciliation result repository.
//!
//! Each run is one immutable row; the full result is stored as JSONB next to
//! the columns used for lookup.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Platform, ReconciliationRunId};
use crate::domain::reconciliation::ReconciliationResult;
use crate::ports::ReconciliationRepository;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresReconciliationRepository {
    pool: PgPool,
}

impl PostgresReconciliationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    result: Json<ReconciliationResult>,
}

fn query_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, err))
}

#[async_trait]
impl ReconciliationRepository for PostgresReconciliationRepository {
    async fn save(&self, result: &ReconciliationResult) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO reconciliation_results
                (id, settlement_date, platform, status, supersedes, created_at, result)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(result.id().as_uuid())
        .bind(result.date())
        .bind(result.platform().as_str())
        .bind(result.status().as_str())
        .bind(result.supersedes().map(|id| *id.as_uuid()))
        .bind(result.created_at().as_datetime())
        .bind(Json(result))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                    return DomainError::new(
                        ErrorCode::AlreadyExists,
                        format!("Reconciliation run {} already stored", result.id()),
                    );
                }
            }
            query_error("Failed to save reconciliation result", e)
        })?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ReconciliationRunId,
    ) -> Result<Option<ReconciliationResult>, DomainError> {
        let row: Option<ResultRow> =
            sqlx::query_as("SELECT result FROM reconciliation_results WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_error("Failed to find reconciliation result", e))?;

        Ok(row.map(|r| r.result.0))
    }

    async fn find_latest(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Option<ReconciliationResult>, DomainError> {
        let row: Option<ResultRow> = sqlx::query_as(
            r#"
            SELECT result FROM reconciliation_results
            WHERE settlement_date = $1 AND platform = $2
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(date)
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("Failed to find latest reconciliation result", e))?;

        Ok(row.map(|r| r.result.0))
    }

    async fn find_history(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Vec<ReconciliationResult>, DomainError> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            r#"
            SELECT result FROM reconciliation_results
            WHERE settlement_date = $1 AND platform = $2
            ORDER BY seq ASC
            "#,
        )
        .bind(date)
        .bind(platform.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("Failed to load reconciliation history", e))?;

        Ok(rows.into_iter().map(|r| r.result.0).collect())
    }

    async fn find_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReconciliationResult>, DomainError> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (settlement_date, platform) result
            FROM reconciliation_results
            WHERE settlement_date BETWEEN $1 AND $2
            ORDER BY settlement_date, platform, seq DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("Failed to load reconciliation results", e))?;

        Ok(rows.into_iter().map(|r| r.result.0).collect())
    }
}
