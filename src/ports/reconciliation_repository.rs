//! Reconciliation result repository port.
//!
//! Append-only. A re-run saves a new result that references the one it
//! supersedes; stored results are never modified.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, Platform, ReconciliationRunId};
use crate::domain::reconciliation::ReconciliationResult;

#[async_trait]
pub trait ReconciliationRepository: Send + Sync {
    /// Append a finalized result.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a result with the same run id was stored
    async fn save(&self, result: &ReconciliationResult) -> Result<(), DomainError>;

    async fn find_by_id(
        &self,
        id: &ReconciliationRunId,
    ) -> Result<Option<ReconciliationResult>, DomainError>;

    /// Most recent result for `(date, platform)`.
    async fn find_latest(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Option<ReconciliationResult>, DomainError>;

    /// Every result for `(date, platform)`, oldest first.
    async fn find_history(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Vec<ReconciliationResult>, DomainError>;

    /// Latest result per `(date, platform)` for `from <= date <= to`.
    async fn find_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReconciliationResult>, DomainError>;
}
