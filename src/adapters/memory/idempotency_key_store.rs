//! In-memory idempotency key store.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::IdempotencyKeyStore;

/// Key set backed by a DashMap; `insert_if_absent` uses the entry API so
/// concurrent admissions of the same key have exactly one winner.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyKeyStore {
    keys: DashMap<String, Timestamp>,
}

impl InMemoryIdempotencyKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl IdempotencyKeyStore for InMemoryIdempotencyKeyStore {
    async fn insert_if_absent(
        &self,
        key: &str,
        admitted_at: Timestamp,
    ) -> Result<bool, DomainError> {
        match self.keys.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(admitted_at);
                Ok(true)
            }
        }
    }

    async fn contains(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.keys.contains_key(key))
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.keys.remove(key);
        Ok(())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let before = self.keys.len();
        self.keys.retain(|_, admitted_at| !admitted_at.is_before(&cutoff));
        Ok(before.saturating_sub(self.keys.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn second_insert_is_rejected() {
        let store = InMemoryIdempotencyKeyStore::new();
        let now = Timestamp::now();

        assert!(store.insert_if_absent("k", now).await.unwrap());
        assert!(!store.insert_if_absent("k", now).await.unwrap());
        assert!(store.contains("k").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_inserts_have_one_winner() {
        let store = Arc::new(InMemoryIdempotencyKeyStore::new());
        let now = Timestamp::now();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_if_absent("same", now).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn delete_before_removes_only_old_keys() {
        let store = InMemoryIdempotencyKeyStore::new();
        let now = Timestamp::now();
        store.insert_if_absent("old", now.minus_days(40)).await.unwrap();
        store.insert_if_absent("new", now).await.unwrap();

        let removed = store.delete_before(now.minus_days(30)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!store.contains("old").await.unwrap());
        assert!(store.contains("new").await.unwrap());
    }

    #[tokio::test]
    async fn removed_key_can_be_admitted_again() {
        let store = InMemoryIdempotencyKeyStore::new();
        let now = Timestamp::now();
        store.insert_if_absent("k", now).await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.insert_if_absent("k", now).await.unwrap());
    }
}
