//! Subscription repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Platform, SubscriptionId};
use crate::domain::lifecycle::{Subscription, SubscriptionStatus};

/// Repository port for Subscription aggregate persistence.
///
/// Implementations must ensure:
/// - one subscription per `(platform, purchase_token)`
/// - optimistic locking on `update`
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the purchase token is already mapped
    /// - `DatabaseError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription.
    ///
    /// Succeeds only when the stored version equals `subscription.version()`;
    /// the stored version is then incremented. Returns the new version.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` on version mismatch
    /// - `SubscriptionNotFound` if it was never saved
    async fn update(&self, subscription: &Subscription) -> Result<u64, DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_purchase_token(
        &self,
        platform: Platform,
        purchase_token: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError>;
}
