//! Refund transaction aggregate and its state machine.
//!
//! ```text
//! Requested       -> PendingApproval | Approved | Rejected | Cancelled
//! PendingApproval -> Approved | Rejected | Cancelled
//! Approved        -> Processing | Failed | Cancelled
//! Processing      -> Completed | Failed
//! ```
//!
//! `Completed`, `Failed`, `Rejected` and `Cancelled` are terminal.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{
    Money, PaymentId, Platform, RefundId, StateMachine, Timestamp, ValidationError,
};

use super::{LifecycleError, Payment};

const ENTITY: &str = "RefundTransaction";

/// Refund status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Requested,
    PendingApproval,
    Approved,
    Processing,
    Completed,
    Failed,
    Rejected,
    Cancelled,
}

impl RefundStatus {
    pub const ALL: [RefundStatus; 8] = [
        RefundStatus::Requested,
        RefundStatus::PendingApproval,
        RefundStatus::Approved,
        RefundStatus::Processing,
        RefundStatus::Completed,
        RefundStatus::Failed,
        RefundStatus::Rejected,
        RefundStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Requested => "requested",
            RefundStatus::PendingApproval => "pending_approval",
            RefundStatus::Approved => "approved",
            RefundStatus::Processing => "processing",
            RefundStatus::Completed => "completed",
            RefundStatus::Failed => "failed",
            RefundStatus::Rejected => "rejected",
            RefundStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for RefundStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RefundStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("refund_status", format!("unknown status '{}'", s))
            })
    }
}

impl StateMachine for RefundStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RefundStatus::*;
        matches!(
            (self, target),
            (Requested, PendingApproval)
                | (Requested, Approved)
                | (Requested, Rejected)
                | (Requested, Cancelled)
                | (PendingApproval, Approved)
                | (PendingApproval, Rejected)
                | (PendingApproval, Cancelled)
                | (Approved, Processing)
                | (Approved, Failed)
                | (Approved, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RefundStatus::*;
        match self {
            Requested => vec![PendingApproval, Approved, Rejected, Cancelled],
            PendingApproval => vec![Approved, Rejected, Cancelled],
            Approved => vec![Processing, Failed, Cancelled],
            Processing => vec![Completed, Failed],
            Completed | Failed | Rejected | Cancelled => vec![],
        }
    }
}

/// Why a refund was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    CustomerRequest,
    Duplicate,
    Fraudulent,
    ProductNotDelivered,
    TechnicalIssue,
    Other,
}

/// Failure reported by the platform while processing a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundFailure {
    pub code: String,
    pub message: String,
    /// Whether a batch retrier may try the refund again.
    pub retryable: bool,
}

/// A refund against one successful payment.
///
/// # Invariants
///
/// - `amount <= original payment amount`, same currency
/// - at most one non-terminal refund per payment (enforced by the repository)
/// - `requested_at <= processed_at <= completed_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundTransaction {
    id: RefundId,
    payment_id: PaymentId,
    platform: Platform,
    original_transaction_ref: String,
    platform_refund_ref: Option<String>,
    amount: Money,
    reason: RefundReason,
    status: RefundStatus,
    requested_at: Timestamp,
    processed_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    failure: Option<RefundFailure>,
    version: u64,
}

impl RefundTransaction {
    /// Requests a refund against a successful payment.
    pub fn request(
        payment: &Payment,
        amount: Money,
        reason: RefundReason,
        now: Timestamp,
    ) -> Result<Self, LifecycleError> {
        payment.ensure_refundable()?;

        if !amount.same_currency(payment.amount()) {
            return Err(LifecycleError::CurrencyMismatch {
                expected: payment.amount().currency().to_string(),
                actual: amount.currency().to_string(),
            });
        }
        if !amount.is_positive() {
            return Err(ValidationError::out_of_range(
                "amount",
                1,
                payment.amount().minor_units(),
                amount.minor_units(),
            )
            .into());
        }
        if amount.minor_units() > payment.amount().minor_units() {
            return Err(LifecycleError::RefundExceedsPayment {
                requested: amount.minor_units(),
                available: payment.amount().minor_units(),
            });
        }

        Ok(Self {
            id: RefundId::new(),
            payment_id: payment.id(),
            platform: payment.platform(),
            original_transaction_ref: payment.transaction_ref().to_string(),
            platform_refund_ref: None,
            amount,
            reason,
            status: RefundStatus::Requested,
            requested_at: now,
            processed_at: None,
            completed_at: None,
            failure: None,
            version: 0,
        })
    }

    pub fn submit_for_approval(&mut self) -> Result<(), LifecycleError> {
        self.transition(RefundStatus::PendingApproval)
    }

    pub fn approve(&mut self) -> Result<(), LifecycleError> {
        self.transition(RefundStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<(), LifecycleError> {
        self.transition(RefundStatus::Rejected)
    }

    pub fn cancel(&mut self) -> Result<(), LifecycleError> {
        self.transition(RefundStatus::Cancelled)
    }

    /// Hands the refund to the platform.
    pub fn start_processing(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(RefundStatus::Processing)?;
        self.processed_at = Some(now.not_before(&[Some(self.requested_at)]));
        Ok(())
    }

    /// Records platform confirmation.
    pub fn complete(
        &mut self,
        platform_refund_ref: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let platform_refund_ref = platform_refund_ref.into();
        if platform_refund_ref.trim().is_empty() {
            return Err(ValidationError::empty_field("platform_refund_ref").into());
        }
        self.transition(RefundStatus::Completed)?;
        self.platform_refund_ref = Some(platform_refund_ref);
        self.completed_at = Some(now.not_before(&[Some(self.requested_at), self.processed_at]));
        Ok(())
    }

    /// Records a processing failure.
    pub fn fail(&mut self, failure: RefundFailure, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(RefundStatus::Failed)?;
        if self.processed_at.is_none() {
            self.processed_at = Some(now.not_before(&[Some(self.requested_at)]));
        }
        self.failure = Some(failure);
        Ok(())
    }

    /// Non-terminal refunds block further refunds on the same payment.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Failed with a retryable platform error.
    pub fn is_retry_eligible(&self) -> bool {
        self.status == RefundStatus::Failed
            && self.failure.as_ref().map(|f| f.retryable).unwrap_or(false)
    }

    fn transition(&mut self, target: RefundStatus) -> Result<(), LifecycleError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|e| LifecycleError::from_transition(ENTITY, e))?;
        Ok(())
    }

    pub fn id(&self) -> RefundId {
        self.id
    }

    pub fn payment_id(&self) -> PaymentId {
        self.payment_id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn original_transaction_ref(&self) -> &str {
        &self.original_transaction_ref
    }

    pub fn platform_refund_ref(&self) -> Option<&str> {
        self.platform_refund_ref.as_deref()
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn reason(&self) -> RefundReason {
        self.reason
    }

    pub fn status(&self) -> RefundStatus {
        self.status
    }

    pub fn requested_at(&self) -> Timestamp {
        self.requested_at
    }

    pub fn processed_at(&self) -> Option<Timestamp> {
        self.processed_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn failure(&self) -> Option<&RefundFailure> {
        self.failure.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the stored version. Called by repository implementations only.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
