//! Refund command errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::lifecycle::LifecycleError;

/// Errors from refund commands.
///
/// Platform failures during processing are not errors here; they are
/// recorded on the refund as a [`RefundFailure`](crate::domain::lifecycle::RefundFailure).
#[derive(Debug, Clone, Error)]
pub enum RefundCommandError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Storage error: {0}")]
    Storage(DomainError),
}

impl RefundCommandError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RefundCommandError::Lifecycle(err) => err.code(),
            RefundCommandError::Storage(err) => err.code,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RefundCommandError::Lifecycle(err) => err.is_retryable(),
            RefundCommandError::Storage(err) => err.is_retryable(),
        }
    }
}

impl From<DomainError> for RefundCommandError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ConcurrentModification => RefundCommandError::Lifecycle(err.into()),
            _ => RefundCommandError::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_become_retryable_lifecycle_errors() {
        let err: RefundCommandError = DomainError::conflict("RefundTransaction", "r-1").into();
        assert!(matches!(
            err,
            RefundCommandError::Lifecycle(LifecycleError::ConcurrentModification(_))
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn finalized_refunds_are_not_retryable() {
        let err = RefundCommandError::Lifecycle(LifecycleError::AlreadyFinalized {
            entity: "RefundTransaction",
            state: "Completed".to_string(),
        });
        assert_eq!(err.code(), ErrorCode::AlreadyFinalized);
        assert!(!err.is_retryable());
    }
}
