//! Lifecycle event repository port.
//!
//! Events are immutable. `save` inserts once per natural key; a second save
//! of the same key reports `AlreadyExists` instead of failing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId, Platform, Timestamp};
use crate::domain::lifecycle::{LifecycleEvent, NaturalKey};

/// Result of an insert-if-absent save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was newly inserted.
    Inserted,
    /// A record with the same unique key already existed. Nothing changed.
    AlreadyExists,
}

#[async_trait]
pub trait LifecycleEventRepository: Send + Sync {
    async fn save(&self, event: &LifecycleEvent) -> Result<SaveResult, DomainError>;

    async fn find_by_id(&self, id: &EventId) -> Result<Option<LifecycleEvent>, DomainError>;

    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<LifecycleEvent>, DomainError>;

    /// Events for a platform with `from <= occurred_at < to`, ordered by `occurred_at`.
    async fn find_by_date_range(
        &self,
        platform: Platform,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<LifecycleEvent>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_event_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn LifecycleEventRepository) {}
    }
}
