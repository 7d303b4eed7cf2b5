//! Lifecycle-specific error types.
//!
//! Errors raised while applying state transitions to subscriptions,
//! payments and refunds.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, TransitionError, ValidationError};

/// Errors from lifecycle commands and event application.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// Transition is not in the entity's table.
    #[error("{entity} cannot transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Entity is in a terminal state.
    #[error("{entity} is already finalized in state {state}")]
    AlreadyFinalized { entity: &'static str, state: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A non-terminal refund already exists for the payment.
    #[error("Payment {transaction_ref} already has an active refund")]
    ActiveRefundExists { transaction_ref: String },

    #[error("Refund amount {requested} exceeds payment amount {available}")]
    RefundExceedsPayment { requested: i64, available: i64 },

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// Optimistic version check failed; safe to reload and retry.
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(DomainError),
}

impl LifecycleError {
    pub fn from_transition(entity: &'static str, err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { from, to } => {
                LifecycleError::InvalidTransition { entity, from, to }
            }
            TransitionError::AlreadyFinalized { state } => {
                LifecycleError::AlreadyFinalized { entity, state }
            }
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LifecycleError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LifecycleError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            LifecycleError::AlreadyFinalized { .. } => ErrorCode::AlreadyFinalized,
            LifecycleError::NotFound { entity, .. } => match *entity {
                "Subscription" => ErrorCode::SubscriptionNotFound,
                "Payment" => ErrorCode::PaymentNotFound,
                "RefundTransaction" => ErrorCode::RefundNotFound,
                _ => ErrorCode::EventNotFound,
            },
            LifecycleError::ActiveRefundExists { .. } => ErrorCode::AlreadyExists,
            LifecycleError::RefundExceedsPayment { .. } => ErrorCode::OutOfRange,
            LifecycleError::CurrencyMismatch { .. } => ErrorCode::ValidationFailed,
            LifecycleError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            LifecycleError::Validation(_) => ErrorCode::ValidationFailed,
            LifecycleError::Repository(err) => err.code,
        }
    }

    /// Returns true if the command may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            LifecycleError::ConcurrentModification(_) => true,
            LifecycleError::Repository(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<DomainError> for LifecycleError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ConcurrentModification => {
                LifecycleError::ConcurrentModification(err.message)
            }
            _ => LifecycleError::Repository(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_keep_entity_name() {
        let err = LifecycleError::from_transition(
            "RefundTransaction",
            TransitionError::AlreadyFinalized {
                state: "Completed".to_string(),
            },
        );
        assert_eq!(err.code(), ErrorCode::AlreadyFinalized);
        assert_eq!(
            err.to_string(),
            "RefundTransaction is already finalized in state Completed"
        );
    }

    #[test]
    fn conflict_domain_errors_become_concurrent_modification() {
        let err: LifecycleError = DomainError::conflict("Subscription", "abc").into();
        assert!(matches!(err, LifecycleError::ConcurrentModification(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn database_errors_are_retryable_repository_errors() {
        let err: LifecycleError = DomainError::database("connection reset").into();
        assert!(matches!(err, LifecycleError::Repository(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn invalid_transition_is_not_retryable() {
        let err = LifecycleError::InvalidTransition {
            entity: "Payment",
            from: "Refunded".to_string(),
            to: "Refunded".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn not_found_maps_entity_to_code() {
        assert_eq!(
            LifecycleError::not_found("Payment", "T1").code(),
            ErrorCode::PaymentNotFound
        );
    }
}
