//! In-memory payment repository.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, PaymentId, Platform, Timestamp};
use crate::domain::lifecycle::{Payment, PaymentStatus};
use crate::ports::{PaymentRepository, SaveResult};

use super::versioned_update;

#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    payments: DashMap<PaymentId, Payment>,
    by_transaction: DashMap<(Platform, String), PaymentId>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<SaveResult, DomainError> {
        let key = (payment.platform(), payment.transaction_ref().to_string());
        match self.by_transaction.entry(key) {
            Entry::Occupied(_) => Ok(SaveResult::AlreadyExists),
            Entry::Vacant(slot) => {
                self.payments.insert(payment.id(), payment.clone());
                slot.insert(payment.id());
                Ok(SaveResult::Inserted)
            }
        }
    }

    async fn update(&self, payment: &Payment) -> Result<u64, DomainError> {
        versioned_update(&self.payments, &payment.id(), payment)
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.get(id).map(|p| p.value().clone()))
    }

    async fn find_by_transaction_ref(
        &self,
        platform: Platform,
        transaction_ref: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let Some(id) = self
            .by_transaction
            .get(&(platform, transaction_ref.to_string()))
            .map(|id| *id.value())
        else {
            return Ok(None);
        };
        Ok(self.payments.get(&id).map(|p| p.value().clone()))
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .payments
            .iter()
            .filter(|p| p.status() == status)
            .map(|p| p.value().clone())
            .collect())
    }

    async fn find_by_date_range(
        &self,
        platform: Platform,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Payment>, DomainError> {
        let mut payments: Vec<_> = self
            .payments
            .iter()
            .filter(|p| {
                p.platform() == platform
                    && !p.payment_at().is_before(&from)
                    && p.payment_at().is_before(&to)
            })
            .map(|p| p.value().clone())
            .collect();
        payments.sort_by_key(|p| p.payment_at());
        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;
    use crate::domain::lifecycle::payment::test_support::new_payment;

    #[tokio::test]
    async fn transaction_ref_is_unique_per_platform() {
        let repo = InMemoryPaymentRepository::new();
        let first = Payment::succeeded(new_payment("T1", 999)).unwrap();
        let again = Payment::succeeded(new_payment("T1", 999)).unwrap();

        assert_eq!(repo.save(&first).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.save(&again).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(
            repo.find_by_transaction_ref(Platform::GooglePlay, "T1").await.unwrap().unwrap().id(),
            first.id()
        );
        assert!(repo.find_by_transaction_ref(Platform::AppStore, "T1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_update_is_a_conflict() {
        let repo = InMemoryPaymentRepository::new();
        let payment = Payment::succeeded(new_payment("T1", 999)).unwrap();
        repo.save(&payment).await.unwrap();

        let mut first = payment.clone();
        first.acknowledge(Timestamp::now()).unwrap();
        assert_eq!(repo.update(&first).await.unwrap(), 1);

        let mut stale = payment;
        stale.mark_refunded(Timestamp::now()).unwrap();
        let err = repo.update(&stale).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
    }

    #[tokio::test]
    async fn update_of_unknown_payment_is_not_found() {
        let repo = InMemoryPaymentRepository::new();
        let payment = Payment::succeeded(new_payment("T1", 999)).unwrap();
        let err = repo.update(&payment).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentNotFound);
    }
}
