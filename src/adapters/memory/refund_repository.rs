//! In-memory refund repository.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, RefundId};
use crate::domain::lifecycle::{RefundStatus, RefundTransaction};
use crate::ports::RefundRepository;

use super::versioned_update;

/// Keeps an index of the single active refund per payment. The index entry is
/// claimed with the entry API on save and dropped once the refund turns terminal.
#[derive(Debug, Default)]
pub struct InMemoryRefundRepository {
    refunds: DashMap<RefundId, RefundTransaction>,
    active_by_payment: DashMap<PaymentId, RefundId>,
}

impl InMemoryRefundRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundRepository for InMemoryRefundRepository {
    async fn save(&self, refund: &RefundTransaction) -> Result<(), DomainError> {
        if !refund.is_active() {
            self.refunds.insert(refund.id(), refund.clone());
            return Ok(());
        }

        match self.active_by_payment.entry(refund.payment_id()) {
            Entry::Occupied(existing) => Err(DomainError::new(
                ErrorCode::AlreadyExists,
                format!(
                    "Payment {} already has active refund {}",
                    refund.payment_id(),
                    existing.get()
                ),
            )),
            Entry::Vacant(slot) => {
                self.refunds.insert(refund.id(), refund.clone());
                slot.insert(refund.id());
                Ok(())
            }
        }
    }

    async fn update(&self, refund: &RefundTransaction) -> Result<u64, DomainError> {
        let version = versioned_update(&self.refunds, &refund.id(), refund)?;
        if !refund.is_active() {
            self.active_by_payment
                .remove_if(&refund.payment_id(), |_, active| *active == refund.id());
        }
        Ok(version)
    }

    async fn find_by_id(&self, id: &RefundId) -> Result<Option<RefundTransaction>, DomainError> {
        Ok(self.refunds.get(id).map(|r| r.value().clone()))
    }

    async fn find_active_for_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<RefundTransaction>, DomainError> {
        let Some(id) = self.active_by_payment.get(payment_id).map(|id| *id.value()) else {
            return Ok(None);
        };
        Ok(self.refunds.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_status(
        &self,
        status: RefundStatus,
    ) -> Result<Vec<RefundTransaction>, DomainError> {
        Ok(self
            .refunds
            .iter()
            .filter(|r| r.status() == status)
            .map(|r| r.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, Money, Timestamp};
    use crate::domain::lifecycle::payment::test_support::new_payment;
    use crate::domain::lifecycle::{Payment, RefundReason};

    fn refund_for(payment: &Payment) -> RefundTransaction {
        let amount = Money::new(500, Currency::new("USD").unwrap());
        RefundTransaction::request(payment, amount, RefundReason::CustomerRequest, Timestamp::now())
            .unwrap()
    }

    #[tokio::test]
    async fn second_active_refund_is_rejected() {
        let repo = InMemoryRefundRepository::new();
        let payment = Payment::succeeded(new_payment("T1", 999)).unwrap();

        repo.save(&refund_for(&payment)).await.unwrap();
        let err = repo.save(&refund_for(&payment)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::AlreadyExists);
    }

    #[tokio::test]
    async fn terminal_refund_frees_the_payment() {
        let repo = InMemoryRefundRepository::new();
        let payment = Payment::succeeded(new_payment("T1", 999)).unwrap();
        let mut first = refund_for(&payment);
        repo.save(&first).await.unwrap();

        first.cancel().unwrap();
        repo.update(&first).await.unwrap();

        assert!(repo.find_active_for_payment(&payment.id()).await.unwrap().is_none());
        repo.save(&refund_for(&payment)).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_saves_admit_one_active_refund() {
        let repo = std::sync::Arc::new(InMemoryRefundRepository::new());
        let payment = Payment::succeeded(new_payment("T1", 999)).unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let refund = refund_for(&payment);
                tokio::spawn(async move { repo.save(&refund).await.is_ok() })
            })
            .collect();

        let mut saved = 0;
        for task in tasks {
            if task.await.unwrap() {
                saved += 1;
            }
        }
        assert_eq!(saved, 1);
    }
}
