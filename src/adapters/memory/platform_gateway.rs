//! Scripted platform gateway for development and tests.
//!
//! Supports:
//! - Pre-configured subscription snapshots per purchase token
//! - Queued error injection per method
//! - Call tracking

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::foundation::Platform;
use crate::domain::lifecycle::{Payment, RefundTransaction};
use crate::ports::{PlatformError, PlatformGateway, RefundReceipt, SubscriptionSnapshot};

/// Gateway method names used for error injection and call tracking.
pub mod method {
    pub const VERIFY_SUBSCRIPTION: &str = "verify_subscription";
    pub const ACKNOWLEDGE_PAYMENT: &str = "acknowledge_payment";
    pub const PROCESS_REFUND: &str = "process_refund";
}

/// Recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub method: &'static str,
    pub platform: Platform,
    pub reference: String,
}

#[derive(Default)]
struct ScriptState {
    snapshots: HashMap<(Platform, String), SubscriptionSnapshot>,
    errors: HashMap<&'static str, VecDeque<PlatformError>>,
    calls: Vec<GatewayCall>,
    refunds_issued: u64,
}

/// Unknown purchase tokens verify as invalid.
#[derive(Default)]
pub struct ScriptedPlatformGateway {
    state: Mutex<ScriptState>,
}

impl ScriptedPlatformGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Snapshot returned for `purchase_token` on `platform`.
    pub fn set_snapshot(
        &self,
        platform: Platform,
        purchase_token: impl Into<String>,
        snapshot: SubscriptionSnapshot,
    ) {
        self.state().snapshots.insert((platform, purchase_token.into()), snapshot);
    }

    /// Queues an error for the next call of `method`.
    pub fn fail_next(&self, method: &'static str, error: PlatformError) {
        self.state().errors.entry(method).or_default().push_back(error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|c| c.method == method).count()
    }

    fn record(
        &self,
        method: &'static str,
        platform: Platform,
        reference: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.calls.push(GatewayCall {
            method,
            platform,
            reference: reference.to_string(),
        });
        match state.errors.get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlatformGateway for ScriptedPlatformGateway {
    async fn verify_subscription(
        &self,
        platform: Platform,
        _product_ref: &str,
        purchase_token: &str,
    ) -> Result<SubscriptionSnapshot, PlatformError> {
        self.record(method::VERIFY_SUBSCRIPTION, platform, purchase_token)?;
        Ok(self
            .state()
            .snapshots
            .get(&(platform, purchase_token.to_string()))
            .cloned()
            .unwrap_or_else(SubscriptionSnapshot::invalid))
    }

    async fn acknowledge_payment(&self, payment: &Payment) -> Result<(), PlatformError> {
        self.record(method::ACKNOWLEDGE_PAYMENT, payment.platform(), payment.transaction_ref())
    }

    async fn process_refund(
        &self,
        refund: &RefundTransaction,
    ) -> Result<RefundReceipt, PlatformError> {
        self.record(method::PROCESS_REFUND, refund.platform(), refund.original_transaction_ref())?;
        let mut state = self.state();
        state.refunds_issued += 1;
        Ok(RefundReceipt {
            platform_refund_ref: format!("refund-{}", state.refunds_issued),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let gateway = ScriptedPlatformGateway::new();
        let snapshot = gateway
            .verify_subscription(Platform::GooglePlay, "P1", "missing")
            .await
            .unwrap();
        assert!(!snapshot.valid);
        assert_eq!(gateway.call_count(method::VERIFY_SUBSCRIPTION), 1);
    }

    #[tokio::test]
    async fn queued_errors_are_returned_once() {
        let gateway = ScriptedPlatformGateway::new();
        gateway.fail_next(method::VERIFY_SUBSCRIPTION, PlatformError::Timeout("slow".into()));

        assert!(gateway.verify_subscription(Platform::AppStore, "P1", "t").await.is_err());
        assert!(gateway.verify_subscription(Platform::AppStore, "P1", "t").await.is_ok());
    }
}
