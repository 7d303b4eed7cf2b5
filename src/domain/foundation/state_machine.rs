//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state transitions
//! across the subscription, payment, and refund lifecycles.

use thiserror::Error;

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Entity is already finalized in state {state}")]
    AlreadyFinalized { state: String },
}

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for RefundStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Requested, Approved) | (Approved, Processing))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Requested => vec![Approved],
///             Approved => vec![Processing],
///             Processing => vec![],
///         }
///     }
/// }
///
/// let next = current.transition_to(RefundStatus::Processing)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// Requests out of a terminal state fail with `AlreadyFinalized` rather
    /// than `InvalidTransition`.
    fn transition_to(&self, target: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else if self.is_terminal() {
            Err(TransitionError::AlreadyFinalized {
                state: format!("{:?}", self),
            })
        } else {
            Err(TransitionError::InvalidTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", target),
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
