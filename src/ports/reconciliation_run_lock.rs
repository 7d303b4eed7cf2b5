//! Run lock port - keeps daily runs for the same `(date, platform)` from
//! interleaving. Distinct keys never contend.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, Platform};

/// Proof of a held run lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLease {
    pub key: String,
    /// Random owner token so only the holder can release.
    pub token: String,
}

impl RunLease {
    pub fn key_for(date: NaiveDate, platform: Platform) -> String {
        format!("reconciliation:{}:{}", platform, date)
    }
}

#[async_trait]
pub trait ReconciliationRunLock: Send + Sync {
    /// Returns `None` when another run holds the key.
    async fn try_acquire(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Option<RunLease>, DomainError>;

    /// Releases the lease. Releasing an expired or foreign lease is a no-op.
    async fn release(&self, lease: &RunLease) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_key_includes_platform_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            RunLease::key_for(date, Platform::AppStore),
            "reconciliation:app_store:2024-01-15"
        );
    }

    #[test]
    fn run_lock_is_object_safe() {
        fn _accepts_dyn(_lock: &dyn ReconciliationRunLock) {}
    }
}
