//! AcknowledgePaymentHandler - Confirms entitlement grant to the platform.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, Timestamp};
use crate::domain::lifecycle::{LifecycleError, Payment};
use crate::ports::{PaymentRepository, PlatformError, PlatformGateway};

/// Command to acknowledge a payment.
#[derive(Debug, Clone)]
pub struct AcknowledgePaymentCommand {
    pub payment_id: PaymentId,
}

/// Result of acknowledgment.
#[derive(Debug, Clone)]
pub struct AcknowledgePaymentResult {
    pub payment: Payment,
    /// False when the payment was already acknowledged and nothing was sent.
    pub newly_acknowledged: bool,
}

/// Errors from payment acknowledgment.
#[derive(Debug, Clone, Error)]
pub enum AcknowledgePaymentError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Platform acknowledgment failed: {0}")]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    Storage(DomainError),
}

impl AcknowledgePaymentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AcknowledgePaymentError::Lifecycle(err) => err.is_retryable(),
            AcknowledgePaymentError::Platform(err) => err.is_retryable(),
            AcknowledgePaymentError::Storage(err) => err.is_retryable(),
        }
    }
}

impl From<DomainError> for AcknowledgePaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ConcurrentModification => AcknowledgePaymentError::Lifecycle(err.into()),
            _ => AcknowledgePaymentError::Storage(err),
        }
    }
}

/// Handler for payment acknowledgment.
///
/// Only `Success` payments can be acknowledged. The platform is called
/// before the flag is stored.
pub struct AcknowledgePaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PlatformGateway>,
}

impl AcknowledgePaymentHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>, gateway: Arc<dyn PlatformGateway>) -> Self {
        Self { payments, gateway }
    }

    pub async fn handle(
        &self,
        cmd: AcknowledgePaymentCommand,
    ) -> Result<AcknowledgePaymentResult, AcknowledgePaymentError> {
        // 1. Load the payment
        let mut payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Payment", cmd.payment_id))?;

        // 2. Validate on a copy so a platform failure leaves nothing half-applied
        let mut acknowledged = payment.clone();
        if !acknowledged.acknowledge(Timestamp::now())? {
            debug!(payment_id = %payment.id(), "Payment already acknowledged");
            return Ok(AcknowledgePaymentResult {
                payment,
                newly_acknowledged: false,
            });
        }

        // 3. Tell the platform, then persist
        self.gateway.acknowledge_payment(&payment).await?;
        payment = acknowledged;
        let version = self.payments.update(&payment).await?;
        payment.set_version(version);

        info!(
            payment_id = %payment.id(),
            platform = %payment.platform(),
            transaction_ref = payment.transaction_ref(),
            "Payment acknowledged"
        );

        Ok(AcknowledgePaymentResult {
            payment,
            newly_acknowledged: true,
        })
    }
}
