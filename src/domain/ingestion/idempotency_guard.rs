//! Idempotency guard for lifecycle events.
//!
//! Admission is a single atomic insert of the event's natural key. Platforms
//! deliver at least once, so a duplicate is an expected outcome and never an
//! error.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::lifecycle::LifecycleEvent;
use crate::ports::IdempotencyKeyStore;

/// Result of admitting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting of the natural key. Process the event.
    Accepted,
    /// Key already admitted. Drop the event and acknowledge the sender.
    DuplicateIgnored,
}

/// Deduplicates events by natural key before any state mutation.
pub struct IdempotencyGuard {
    store: Arc<dyn IdempotencyKeyStore>,
    retention_days: i64,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn IdempotencyKeyStore>, retention_days: i64) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Atomically records the event's natural key.
    pub async fn admit(&self, event: &LifecycleEvent) -> Result<Admission, DomainError> {
        let key = event.natural_key();
        let storage_key = key.storage_key();

        if self
            .store
            .insert_if_absent(&storage_key, event.received_at())
            .await?
        {
            debug!(natural_key = %key, "Event admitted");
            Ok(Admission::Accepted)
        } else {
            info!(
                platform = %event.platform(),
                kind = %event.kind(),
                natural_key = %key,
                "Duplicate event ignored"
            );
            Ok(Admission::DuplicateIgnored)
        }
    }

    /// Forgets an admitted event so its redelivery is processed.
    ///
    /// Only for failures that happened before any state was mutated.
    pub async fn release(&self, event: &LifecycleEvent) -> Result<(), DomainError> {
        let key = event.natural_key();
        self.store.remove(&key.storage_key()).await?;
        info!(natural_key = %key, "Idempotency key released for redelivery");
        Ok(())
    }

    /// Deletes keys older than the retention window.
    pub async fn purge_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        let cutoff = now.minus_days(self.retention_days);
        let removed = self.store.delete_before(cutoff).await?;
        info!(removed, cutoff = %cutoff, "Purged expired idempotency keys");
        Ok(removed)
    }
}
