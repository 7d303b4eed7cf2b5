//! ProcessRefundHandler - Command handler that hands an approved refund to
//! the platform and records the outcome.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::{PaymentId, RefundId, Timestamp};
use crate::domain::lifecycle::{LifecycleError, PaymentStatus, RefundFailure, RefundTransaction};
use crate::ports::{PaymentRepository, PlatformGateway, RefundRepository};

use super::RefundCommandError;

/// Command to process an approved refund.
#[derive(Debug, Clone)]
pub struct ProcessRefundCommand {
    pub refund_id: RefundId,
}

/// Result of processing. The refund ends `Completed` or `Failed`.
#[derive(Debug, Clone)]
pub struct ProcessRefundResult {
    pub refund: RefundTransaction,
}

/// Handler for refund processing.
///
/// `Approved -> Processing` is persisted before the platform call so two
/// workers cannot both submit the same refund. A platform error becomes a
/// `Failed` refund carrying the error's retryable flag. On completion the
/// original payment moves to `Refunded`.
pub struct ProcessRefundHandler {
    refunds: Arc<dyn RefundRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PlatformGateway>,
    max_transition_retries: u32,
}

impl ProcessRefundHandler {
    pub fn new(
        refunds: Arc<dyn RefundRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PlatformGateway>,
    ) -> Self {
        Self {
            refunds,
            payments,
            gateway,
            max_transition_retries: 3,
        }
    }

    pub fn with_max_transition_retries(mut self, retries: u32) -> Self {
        self.max_transition_retries = retries;
        self
    }

    pub async fn handle(
        &self,
        cmd: ProcessRefundCommand,
    ) -> Result<ProcessRefundResult, RefundCommandError> {
        // 1. Claim the refund
        let mut refund = self
            .refunds
            .find_by_id(&cmd.refund_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("RefundTransaction", cmd.refund_id))?;
        refund.start_processing(Timestamp::now())?;
        let version = self.refunds.update(&refund).await?;
        refund.set_version(version);

        // 2. Submit to the platform
        match self.gateway.process_refund(&refund).await {
            Ok(receipt) => {
                refund.complete(receipt.platform_refund_ref, Timestamp::now())?;
            }
            Err(err) => {
                warn!(
                    refund_id = %refund.id(),
                    platform = %refund.platform(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "Platform refund failed"
                );
                refund.fail(
                    RefundFailure {
                        code: err.code().to_string(),
                        message: err.to_string(),
                        retryable: err.is_retryable(),
                    },
                    Timestamp::now(),
                )?;
            }
        }

        // 3. Record the outcome
        let version = self.refunds.update(&refund).await?;
        refund.set_version(version);

        if refund.platform_refund_ref().is_some() {
            self.mark_payment_refunded(refund.payment_id()).await?;
        }

        info!(
            refund_id = %refund.id(),
            status = refund.status().as_str(),
            "Refund processed"
        );

        Ok(ProcessRefundResult { refund })
    }

    async fn mark_payment_refunded(&self, payment_id: PaymentId) -> Result<(), RefundCommandError> {
        let mut retries = 0;
        loop {
            let mut payment = self
                .payments
                .find_by_id(&payment_id)
                .await?
                .ok_or_else(|| LifecycleError::not_found("Payment", payment_id))?;
            if payment.status() == PaymentStatus::Refunded {
                return Ok(());
            }
            payment.mark_refunded(Timestamp::now())?;

            match self.payments.update(&payment).await.map_err(RefundCommandError::from) {
                Err(err) if err.is_retryable() && retries < self.max_transition_retries => {
                    retries += 1;
                }
                other => return other.map(|_| ()),
            }
        }
    }
}
