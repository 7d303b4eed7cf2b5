//! In-memory reconciliation run lock.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, Platform};
use crate::ports::{ReconciliationRunLock, RunLease};

/// Process-local lock. Leases never expire; they are held until released.
#[derive(Debug, Default)]
pub struct InMemoryRunLock {
    held: DashMap<String, String>,
}

impl InMemoryRunLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, date: NaiveDate, platform: Platform) -> bool {
        self.held.contains_key(&RunLease::key_for(date, platform))
    }
}

#[async_trait]
impl ReconciliationRunLock for InMemoryRunLock {
    async fn try_acquire(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Option<RunLease>, DomainError> {
        let key = RunLease::key_for(date, platform);
        match self.held.entry(key.clone()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let token = Uuid::new_v4().to_string();
                slot.insert(token.clone());
                Ok(Some(RunLease { key, token }))
            }
        }
    }

    async fn release(&self, lease: &RunLease) -> Result<(), DomainError> {
        self.held.remove_if(&lease.key, |_, token| *token == lease.token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn same_key_is_exclusive_until_released() {
        let lock = InMemoryRunLock::new();
        let lease = lock.try_acquire(day(), Platform::GooglePlay).await.unwrap().unwrap();

        assert!(lock.try_acquire(day(), Platform::GooglePlay).await.unwrap().is_none());
        assert!(lock.try_acquire(day(), Platform::AppStore).await.unwrap().is_some());

        lock.release(&lease).await.unwrap();
        assert!(lock.try_acquire(day(), Platform::GooglePlay).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn foreign_lease_cannot_release() {
        let lock = InMemoryRunLock::new();
        let lease = lock.try_acquire(day(), Platform::GooglePlay).await.unwrap().unwrap();
        let forged = RunLease {
            key: lease.key.clone(),
            token: "other".to_string(),
        };

        lock.release(&forged).await.unwrap();
        assert!(lock.is_held(day(), Platform::GooglePlay));
    }
}
