//! PurgeIdempotencyKeysHandler - Drops admitted keys past the retention window.

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::ingestion::IdempotencyGuard;

/// Command to purge expired idempotency keys.
#[derive(Debug, Clone, Copy)]
pub struct PurgeIdempotencyKeysCommand {
    pub now: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeIdempotencyKeysResult {
    pub removed: u64,
}

/// Scheduled housekeeping for the idempotency key store.
pub struct PurgeIdempotencyKeysHandler {
    guard: IdempotencyGuard,
}

impl PurgeIdempotencyKeysHandler {
    pub fn new(guard: IdempotencyGuard) -> Self {
        Self { guard }
    }

    pub async fn handle(
        &self,
        cmd: PurgeIdempotencyKeysCommand,
    ) -> Result<PurgeIdempotencyKeysResult, DomainError> {
        let removed = self.guard.purge_expired(cmd.now).await?;
        Ok(PurgeIdempotencyKeysResult { removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryIdempotencyKeyStore;
    use crate::ports::IdempotencyKeyStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn removes_only_keys_older_than_retention() {
        let store = Arc::new(InMemoryIdempotencyKeyStore::new());
        let now = Timestamp::now();
        store.insert_if_absent("old", now.minus_days(31)).await.unwrap();
        store.insert_if_absent("fresh", now.minus_days(1)).await.unwrap();

        let handler = PurgeIdempotencyKeysHandler::new(IdempotencyGuard::new(store.clone(), 30));
        let result = handler.handle(PurgeIdempotencyKeysCommand { now }).await.unwrap();

        assert_eq!(result.removed, 1);
        assert!(!store.contains("old").await.unwrap());
        assert!(store.contains("fresh").await.unwrap());
    }
}
