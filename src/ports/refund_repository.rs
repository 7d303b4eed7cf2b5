//! Refund repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId, RefundId};
use crate::domain::lifecycle::{RefundStatus, RefundTransaction};

#[async_trait]
pub trait RefundRepository: Send + Sync {
    /// Save a new refund.
    ///
    /// Must atomically reject the insert when another active (non-terminal)
    /// refund exists for the same payment.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` when an active refund exists for the payment
    async fn save(&self, refund: &RefundTransaction) -> Result<(), DomainError>;

    /// Optimistic update; see [`super::SubscriptionRepository::update`].
    async fn update(&self, refund: &RefundTransaction) -> Result<u64, DomainError>;

    async fn find_by_id(&self, id: &RefundId) -> Result<Option<RefundTransaction>, DomainError>;

    async fn find_active_for_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<RefundTransaction>, DomainError>;

    async fn find_by_status(
        &self,
        status: RefundStatus,
    ) -> Result<Vec<RefundTransaction>, DomainError>;
}
