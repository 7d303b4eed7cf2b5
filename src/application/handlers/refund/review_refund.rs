//! ReviewRefundHandler - Command handler for approving, rejecting or
//! cancelling a refund before it reaches the platform.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::RefundId;
use crate::domain::lifecycle::{LifecycleError, RefundTransaction};
use crate::ports::RefundRepository;

use super::RefundCommandError;

/// Reviewer decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundDecision {
    Approve,
    Reject,
    Cancel,
}

impl RefundDecision {
    fn as_str(&self) -> &'static str {
        match self {
            RefundDecision::Approve => "approve",
            RefundDecision::Reject => "reject",
            RefundDecision::Cancel => "cancel",
        }
    }
}

/// Command to review a refund.
#[derive(Debug, Clone)]
pub struct ReviewRefundCommand {
    pub refund_id: RefundId,
    pub decision: RefundDecision,
}

/// Result of a successful review.
#[derive(Debug, Clone)]
pub struct ReviewRefundResult {
    pub refund: RefundTransaction,
}

/// Handler for refund review decisions.
///
/// Invalid decisions for the refund's state fail with `InvalidTransition` or
/// `AlreadyFinalized` and leave the stored refund unchanged.
pub struct ReviewRefundHandler {
    refunds: Arc<dyn RefundRepository>,
}

impl ReviewRefundHandler {
    pub fn new(refunds: Arc<dyn RefundRepository>) -> Self {
        Self { refunds }
    }

    pub async fn handle(
        &self,
        cmd: ReviewRefundCommand,
    ) -> Result<ReviewRefundResult, RefundCommandError> {
        let mut refund = self
            .refunds
            .find_by_id(&cmd.refund_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("RefundTransaction", cmd.refund_id))?;

        match cmd.decision {
            RefundDecision::Approve => refund.approve()?,
            RefundDecision::Reject => refund.reject()?,
            RefundDecision::Cancel => refund.cancel()?,
        }

        let version = self.refunds.update(&refund).await?;
        refund.set_version(version);

        info!(
            refund_id = %refund.id(),
            decision = cmd.decision.as_str(),
            status = refund.status().as_str(),
            "Refund reviewed"
        );

        Ok(ReviewRefundResult { refund })
    }
}
