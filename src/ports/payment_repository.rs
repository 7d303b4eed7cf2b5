//! Payment repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId, Platform, Timestamp};
use crate::domain::lifecycle::{Payment, PaymentStatus};

use super::SaveResult;

/// Repository port for Payment aggregate persistence.
///
/// `(platform, transaction_ref)` is unique.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert unless a payment with the same transaction ref exists.
    async fn save(&self, payment: &Payment) -> Result<SaveResult, DomainError>;

    /// Optimistic update; see [`super::SubscriptionRepository::update`].
    async fn update(&self, payment: &Payment) -> Result<u64, DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    async fn find_by_transaction_ref(
        &self,
        platform: Platform,
        transaction_ref: &str,
    ) -> Result<Option<Payment>, DomainError>;

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, DomainError>;

    /// Payments for a platform with `from <= payment_at < to`, ordered by `payment_at`.
    async fn find_by_date_range(
        &self,
        platform: Platform,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Payment>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PaymentRepository) {}
    }
}
