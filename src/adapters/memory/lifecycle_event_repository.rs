//! In-memory lifecycle event repository.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, EventId, Platform, Timestamp};
use crate::domain::lifecycle::{LifecycleEvent, NaturalKey};
use crate::ports::{LifecycleEventRepository, SaveResult};

#[derive(Debug, Default)]
pub struct InMemoryLifecycleEventRepository {
    by_key: DashMap<String, LifecycleEvent>,
    key_by_id: DashMap<EventId, String>,
}

impl InMemoryLifecycleEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Every stored event, ordered by `occurred_at`.
    pub fn all(&self) -> Vec<LifecycleEvent> {
        let mut events: Vec<_> = self.by_key.iter().map(|e| e.value().clone()).collect();
        events.sort_by_key(|e| e.occurred_at());
        events
    }
}

#[async_trait]
impl LifecycleEventRepository for InMemoryLifecycleEventRepository {
    async fn save(&self, event: &LifecycleEvent) -> Result<SaveResult, DomainError> {
        match self.by_key.entry(event.natural_key().storage_key()) {
            Entry::Occupied(_) => Ok(SaveResult::AlreadyExists),
            Entry::Vacant(slot) => {
                self.key_by_id.insert(event.id(), slot.key().clone());
                slot.insert(event.clone());
                Ok(SaveResult::Inserted)
            }
        }
    }

    async fn find_by_id(&self, id: &EventId) -> Result<Option<LifecycleEvent>, DomainError> {
        let Some(key) = self.key_by_id.get(id).map(|k| k.value().clone()) else {
            return Ok(None);
        };
        Ok(self.by_key.get(&key).map(|e| e.value().clone()))
    }

    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<LifecycleEvent>, DomainError> {
        Ok(self.by_key.get(&key.storage_key()).map(|e| e.value().clone()))
    }

    async fn find_by_date_range(
        &self,
        platform: Platform,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<LifecycleEvent>, DomainError> {
        let mut events: Vec<_> = self
            .by_key
            .iter()
            .filter(|e| {
                e.platform() == platform
                    && !e.occurred_at().is_before(&from)
                    && e.occurred_at().is_before(&to)
            })
            .map(|e| e.value().clone())
            .collect();
        events.sort_by_key(|e| e.occurred_at());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::event::test_support::event;
    use crate::domain::lifecycle::EventKind;

    #[tokio::test]
    async fn second_save_of_same_natural_key_is_reported() {
        let repo = InMemoryLifecycleEventRepository::new();
        let first = LifecycleEvent::new(event(
            Platform::GooglePlay,
            EventKind::Renewal,
            "tok",
            "n-1",
        ))
        .unwrap();
        let second = LifecycleEvent::new(event(
            Platform::GooglePlay,
            EventKind::Renewal,
            "tok",
            "n-1",
        ))
        .unwrap();

        assert_eq!(repo.save(&first).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.save(&second).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.find_by_id(&first.id()).await.unwrap().unwrap().id(), first.id());
        assert!(repo.find_by_id(&second.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn date_range_is_half_open_and_per_platform() {
        let repo = InMemoryLifecycleEventRepository::new();
        let google = LifecycleEvent::new(event(
            Platform::GooglePlay,
            EventKind::Renewal,
            "tok",
            "n-1",
        ))
        .unwrap();
        let apple = LifecycleEvent::new(event(Platform::AppStore, EventKind::Renewal, "tok", "n-2"))
            .unwrap();
        repo.save(&google).await.unwrap();
        repo.save(&apple).await.unwrap();

        let at = google.occurred_at();
        let found = repo
            .find_by_date_range(Platform::GooglePlay, at, at.plus_secs(1))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let excluded = repo
            .find_by_date_range(Platform::GooglePlay, at.minus_days(1), at)
            .await
            .unwrap();
        assert!(excluded.is_empty());
    }
}
