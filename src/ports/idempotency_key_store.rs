//! IdempotencyKeyStore port - durable set of admitted natural keys.
//!
//! The guard relies on `insert_if_absent` being a single atomic operation
//! (`SET NX`, `INSERT ... ON CONFLICT DO NOTHING`, a map entry API). A
//! check followed by a separate insert leaves a race window and is not an
//! acceptable implementation.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

#[async_trait]
pub trait IdempotencyKeyStore: Send + Sync {
    /// Atomically inserts `key` if absent.
    ///
    /// Returns `true` when this call inserted the key and `false` when it
    /// already existed.
    async fn insert_if_absent(
        &self,
        key: &str,
        admitted_at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Check if a key has been admitted.
    async fn contains(&self, key: &str) -> Result<bool, DomainError>;

    /// Remove a key so a redelivery is admitted again.
    async fn remove(&self, key: &str) -> Result<(), DomainError>;

    /// Delete keys admitted before `cutoff`. Returns the number removed.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn IdempotencyKeyStore) {}
    }
}
