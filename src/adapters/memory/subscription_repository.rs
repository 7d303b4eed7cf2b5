//! In-memory subscription repository.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, ErrorCode, Platform, SubscriptionId};
use crate::domain::lifecycle::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

use super::versioned_update;

#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: DashMap<SubscriptionId, Subscription>,
    by_token: DashMap<(Platform, String), SubscriptionId>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let token = (subscription.platform(), subscription.purchase_token().to_string());
        match self.by_token.entry(token) {
            Entry::Occupied(_) => Err(DomainError::new(
                ErrorCode::AlreadyExists,
                format!(
                    "Subscription for {} token already exists",
                    subscription.platform()
                ),
            )),
            Entry::Vacant(slot) => {
                self.subscriptions.insert(subscription.id(), subscription.clone());
                slot.insert(subscription.id());
                Ok(())
            }
        }
    }

    async fn update(&self, subscription: &Subscription) -> Result<u64, DomainError> {
        versioned_update(&self.subscriptions, &subscription.id(), subscription)
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.get(id).map(|s| s.value().clone()))
    }

    async fn find_by_purchase_token(
        &self,
        platform: Platform,
        purchase_token: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let Some(id) = self
            .by_token
            .get(&(platform, purchase_token.to_string()))
            .map(|id| *id.value())
        else {
            return Ok(None);
        };
        Ok(self.subscriptions.get(&id).map(|s| s.value().clone()))
    }

    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|s| s.status() == status)
            .map(|s| s.value().clone())
            .collect())
    }
}
