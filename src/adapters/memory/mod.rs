//! In-memory adapters for every storage and platform port.
//!
//! Suitable for development and tests. Maps are DashMap-backed so every
//! per-key operation is atomic without a global lock.

mod idempotency_key_store;
mod lifecycle_event_repository;
mod payment_repository;
mod platform_gateway;
mod reconciliation_repository;
mod refund_repository;
mod run_lock;
mod settlement_source;
mod subscription_repository;

pub use idempotency_key_store::InMemoryIdempotencyKeyStore;
pub use lifecycle_event_repository::InMemoryLifecycleEventRepository;
pub use payment_repository::InMemoryPaymentRepository;
pub use platform_gateway::{method as gateway_method, GatewayCall, ScriptedPlatformGateway};
pub use reconciliation_repository::InMemoryReconciliationRepository;
pub use refund_repository::InMemoryRefundRepository;
pub use run_lock::InMemoryRunLock;
pub use settlement_source::StaticSettlementSource;
pub use subscription_repository::InMemorySubscriptionRepository;

use dashmap::DashMap;
use std::hash::Hash;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::lifecycle::{Payment, RefundTransaction, Subscription};

/// Aggregates stored with an optimistic version.
pub(crate) trait Versioned: Clone {
    const ENTITY: &'static str;
    const NOT_FOUND: ErrorCode;

    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

impl Versioned for Subscription {
    const ENTITY: &'static str = "Subscription";
    const NOT_FOUND: ErrorCode = ErrorCode::SubscriptionNotFound;

    fn version(&self) -> u64 {
        Subscription::version(self)
    }

    fn set_version(&mut self, version: u64) {
        Subscription::set_version(self, version)
    }
}

impl Versioned for Payment {
    const ENTITY: &'static str = "Payment";
    const NOT_FOUND: ErrorCode = ErrorCode::PaymentNotFound;

    fn version(&self) -> u64 {
        Payment::version(self)
    }

    fn set_version(&mut self, version: u64) {
        Payment::set_version(self, version)
    }
}

impl Versioned for RefundTransaction {
    const ENTITY: &'static str = "RefundTransaction";
    const NOT_FOUND: ErrorCode = ErrorCode::RefundNotFound;

    fn version(&self) -> u64 {
        RefundTransaction::version(self)
    }

    fn set_version(&mut self, version: u64) {
        RefundTransaction::set_version(self, version)
    }
}

/// Compare-and-swap on the stored version. Returns the new version.
pub(crate) fn versioned_update<K, T>(
    map: &DashMap<K, T>,
    key: &K,
    incoming: &T,
) -> Result<u64, DomainError>
where
    K: Eq + Hash + std::fmt::Display,
    T: Versioned,
{
    let mut stored = map
        .get_mut(key)
        .ok_or_else(|| DomainError::new(T::NOT_FOUND, format!("{} {} not found", T::ENTITY, key)))?;

    if stored.version() != incoming.version() {
        return Err(DomainError::conflict(T::ENTITY, key));
    }

    let next = incoming.version() + 1;
    let mut updated = incoming.clone();
    updated.set_version(next);
    *stored = updated;
    Ok(next)
}
