//! Payment aggregate and its status state machine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{
    Money, PaymentId, Platform, StateMachine, SubscriptionId, Timestamp, ValidationError,
};

use super::LifecycleError;

const ENTITY: &str = "Payment";

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
    Canceled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Success,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
        PaymentStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("payment_status", format!("unknown status '{}'", s))
            })
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Success) | (Pending, Failed) | (Pending, Canceled) | (Success, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Success, Failed, Canceled],
            Success => vec![Refunded],
            Failed | Refunded | Canceled => vec![],
        }
    }
}

/// Fields needed to record a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub subscription_id: Option<SubscriptionId>,
    pub platform: Platform,
    pub order_ref: Option<String>,
    pub transaction_ref: String,
    pub product_ref: Option<String>,
    pub amount: Money,
    pub payment_at: Timestamp,
}

/// A single charge reported by a platform.
///
/// # Invariants
///
/// - `amount > 0`
/// - only `Success` payments may be acknowledged or refunded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    subscription_id: Option<SubscriptionId>,
    platform: Platform,
    order_ref: Option<String>,
    transaction_ref: String,
    product_ref: Option<String>,
    amount: Money,
    status: PaymentStatus,
    payment_at: Timestamp,
    acknowledged: bool,
    updated_at: Timestamp,
    version: u64,
}

impl Payment {
    /// Records a payment awaiting platform confirmation.
    pub fn pending(fields: NewPayment) -> Result<Self, LifecycleError> {
        if fields.transaction_ref.trim().is_empty() {
            return Err(ValidationError::empty_field("transaction_ref").into());
        }
        if !fields.amount.is_positive() {
            return Err(ValidationError::out_of_range(
                "amount",
                1,
                i64::MAX,
                fields.amount.minor_units(),
            )
            .into());
        }

        Ok(Self {
            id: PaymentId::new(),
            subscription_id: fields.subscription_id,
            platform: fields.platform,
            order_ref: fields.order_ref,
            transaction_ref: fields.transaction_ref,
            product_ref: fields.product_ref,
            amount: fields.amount,
            status: PaymentStatus::Pending,
            payment_at: fields.payment_at,
            acknowledged: false,
            updated_at: fields.payment_at,
            version: 0,
        })
    }

    /// Records a payment the platform already reports as charged.
    pub fn succeeded(fields: NewPayment) -> Result<Self, LifecycleError> {
        let mut payment = Self::pending(fields)?;
        let at = payment.payment_at;
        payment.complete(at)?;
        Ok(payment)
    }

    pub fn complete(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(PaymentStatus::Success, now)
    }

    pub fn fail(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(PaymentStatus::Failed, now)
    }

    pub fn cancel(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(PaymentStatus::Canceled, now)
    }

    /// Marks the payment acknowledged.
    ///
    /// Returns `Ok(false)` when it already was.
    pub fn acknowledge(&mut self, now: Timestamp) -> Result<bool, LifecycleError> {
        if self.status != PaymentStatus::Success {
            return Err(LifecycleError::InvalidTransition {
                entity: ENTITY,
                from: format!("{:?}", self.status),
                to: "Acknowledged".to_string(),
            });
        }
        if self.acknowledged {
            return Ok(false);
        }
        self.acknowledged = true;
        self.updated_at = now.not_before(&[Some(self.updated_at)]);
        Ok(true)
    }

    /// Checks that a refund may be requested against this payment.
    ///
    /// Anything but `Success` is an invalid transition, including a payment
    /// that is already refunded.
    pub fn ensure_refundable(&self) -> Result<(), LifecycleError> {
        if self.status.can_transition_to(&PaymentStatus::Refunded) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                entity: ENTITY,
                from: format!("{:?}", self.status),
                to: format!("{:?}", PaymentStatus::Refunded),
            })
        }
    }

    pub fn mark_refunded(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(PaymentStatus::Refunded, now)
    }

    fn transition(&mut self, target: PaymentStatus, now: Timestamp) -> Result<(), LifecycleError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|e| LifecycleError::from_transition(ENTITY, e))?;
        self.updated_at = now.not_before(&[Some(self.updated_at)]);
        Ok(())
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription_id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn order_ref(&self) -> Option<&str> {
        self.order_ref.as_deref()
    }

    pub fn transaction_ref(&self) -> &str {
        &self.transaction_ref
    }

    pub fn product_ref(&self) -> Option<&str> {
        self.product_ref.as_deref()
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn payment_at(&self) -> Timestamp {
        self.payment_at
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the stored version. Called by repository implementations only.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::foundation::Currency;

    pub fn new_payment(transaction_ref: &str, minor_units: i64) -> NewPayment {
        NewPayment {
            subscription_id: None,
            platform: Platform::GooglePlay,
            order_ref: Some(format!("GPA.{}", transaction_ref)),
            transaction_ref: transaction_ref.to_string(),
            product_ref: Some("P1".to_string()),
            amount: Money::new(minor_units, Currency::new("USD").unwrap()),
            payment_at: Timestamp::from_unix_millis(1_704_067_200_000).unwrap(),
        }
    }
}
