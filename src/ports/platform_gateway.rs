//! Platform gateway port - calls into a store platform's payment API.
//!
//! The core never retries these calls. Retryable failures are surfaced to
//! the caller, who owns backoff.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, Money, Platform, Timestamp};
use crate::domain::lifecycle::{Payment, RefundTransaction};

/// Errors from platform API calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// Platform returned a server-side error.
    #[error("Platform service error: {0}")]
    Service(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Platform call timed out: {0}")]
    Timeout(String),

    /// Credentials rejected. Never retryable.
    #[error("Platform authorization failed: {0}")]
    Authorization(String),

    /// Response could not be interpreted.
    #[error("Invalid platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Short code recorded on failed refunds.
    pub fn code(&self) -> &'static str {
        match self {
            PlatformError::Service(_) => "PLATFORM_SERVICE_ERROR",
            PlatformError::Network(_) => "NETWORK_ERROR",
            PlatformError::Timeout(_) => "TIMEOUT",
            PlatformError::Authorization(_) => "AUTHORIZATION_ERROR",
            PlatformError::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }

    /// Service, network and timeout failures may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlatformError::Service(_) | PlatformError::Network(_) | PlatformError::Timeout(_)
        )
    }
}

impl From<PlatformError> for DomainError {
    fn from(err: PlatformError) -> Self {
        let code = match err {
            PlatformError::Service(_) | PlatformError::InvalidResponse(_) => {
                ErrorCode::PlatformServiceError
            }
            PlatformError::Network(_) => ErrorCode::NetworkError,
            PlatformError::Timeout(_) => ErrorCode::Timeout,
            PlatformError::Authorization(_) => ErrorCode::Unauthorized,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Platform view of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    /// False when the platform does not recognise the token.
    pub valid: bool,
    pub product_ref: Option<String>,
    pub owner_ref: Option<String>,
    pub start_at: Option<Timestamp>,
    pub expiry_at: Option<Timestamp>,
    pub auto_renew: bool,
    /// Latest charge for the subscription.
    pub latest_transaction_ref: Option<String>,
    pub latest_order_ref: Option<String>,
    pub latest_amount: Option<Money>,
}

impl SubscriptionSnapshot {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            product_ref: None,
            owner_ref: None,
            start_at: None,
            expiry_at: None,
            auto_renew: false,
            latest_transaction_ref: None,
            latest_order_ref: None,
            latest_amount: None,
        }
    }
}

/// Confirmation of a processed refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub platform_refund_ref: String,
}

#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Looks up the current state of a subscription.
    async fn verify_subscription(
        &self,
        platform: Platform,
        product_ref: &str,
        purchase_token: &str,
    ) -> Result<SubscriptionSnapshot, PlatformError>;

    /// Confirms entitlement was granted for a payment.
    async fn acknowledge_payment(&self, payment: &Payment) -> Result<(), PlatformError>;

    /// Submits a refund to the platform.
    async fn process_refund(
        &self,
        refund: &RefundTransaction,
    ) -> Result<RefundReceipt, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_is_never_retryable() {
        assert!(!PlatformError::Authorization("bad key".into()).is_retryable());
        assert!(!PlatformError::InvalidResponse("garbled".into()).is_retryable());
        assert!(PlatformError::Timeout("30s".into()).is_retryable());
    }

    #[test]
    fn converts_to_domain_error_codes() {
        let err: DomainError = PlatformError::Network("reset".into()).into();
        assert_eq!(err.code, ErrorCode::NetworkError);
        assert!(err.is_retryable());

        let err: DomainError = PlatformError::Authorization("denied".into()).into();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(!err.is_retryable());
    }

    #[test]
    fn platform_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PlatformGateway) {}
    }
}
