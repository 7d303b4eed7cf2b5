//! RequestRefundHandler - Command handler for opening a refund against a payment.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{ErrorCode, Money, PaymentId, Timestamp};
use crate::domain::lifecycle::{LifecycleError, RefundReason, RefundTransaction};
use crate::ports::{PaymentRepository, RefundRepository};

use super::RefundCommandError;

/// Command to request a refund.
#[derive(Debug, Clone)]
pub struct RequestRefundCommand {
    pub payment_id: PaymentId,
    pub amount: Money,
    pub reason: RefundReason,
}

/// Result of a refund request.
#[derive(Debug, Clone)]
pub struct RequestRefundResult {
    pub refund: RefundTransaction,
    /// Small refunds skip manual review.
    pub auto_approved: bool,
}

/// Handler for refund requests.
///
/// Amounts up to `auto_approve_max_minor` go straight to `Approved`; larger
/// ones wait in `PendingApproval`. The repository rejects a second active
/// refund for the same payment.
pub struct RequestRefundHandler {
    refunds: Arc<dyn RefundRepository>,
    payments: Arc<dyn PaymentRepository>,
    auto_approve_max_minor: i64,
}

impl RequestRefundHandler {
    pub fn new(
        refunds: Arc<dyn RefundRepository>,
        payments: Arc<dyn PaymentRepository>,
        auto_approve_max_minor: i64,
    ) -> Self {
        Self {
            refunds,
            payments,
            auto_approve_max_minor,
        }
    }

    pub async fn handle(
        &self,
        cmd: RequestRefundCommand,
    ) -> Result<RequestRefundResult, RefundCommandError> {
        // 1. Load the payment
        let payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Payment", cmd.payment_id))?;

        // 2. Open the refund (domain checks refundability and amount)
        let mut refund =
            RefundTransaction::request(&payment, cmd.amount, cmd.reason, Timestamp::now())?;
        let auto_approved = refund.amount().minor_units() <= self.auto_approve_max_minor;
        if auto_approved {
            refund.approve()?;
        } else {
            refund.submit_for_approval()?;
        }

        // 3. Persist; the active-refund check is atomic in the repository
        match self.refunds.save(&refund).await {
            Ok(()) => {}
            Err(err) if err.code == ErrorCode::AlreadyExists => {
                return Err(LifecycleError::ActiveRefundExists {
                    transaction_ref: payment.transaction_ref().to_string(),
                }
                .into())
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            refund_id = %refund.id(),
            payment_id = %payment.id(),
            amount = %refund.amount(),
            status = refund.status().as_str(),
            "Refund requested"
        );

        Ok(RequestRefundResult {
            refund,
            auto_approved,
        })
    }
}
