//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the lifecycle and reconciliation domain.

mod errors;
mod ids;
mod money;
mod percentage;
mod platform;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    DiscrepancyId, EventId, PaymentId, ReconciliationRunId, RefundId, SettlementRecordId,
    SubscriptionId,
};
pub use money::{parse_minor_units, saturate_minor, Currency, Money, MINOR_UNIT_DIGITS};
pub use percentage::Percentage;
pub use platform::Platform;
pub use state_machine::{StateMachine, TransitionError};
pub use timestamp::Timestamp;
