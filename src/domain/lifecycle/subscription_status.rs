//! Subscription status state machine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and within the current period.
    Active,

    /// Renewal payment failed; platform is retrying and access continues.
    InGracePeriod,

    /// Grace period ended without payment; access suspended.
    OnHold,

    /// User paused renewals.
    Paused,

    /// Auto-renew turned off. Access continues until expiry.
    Canceled,

    /// Period ended or entitlement revoked.
    Expired,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 6] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::InGracePeriod,
        SubscriptionStatus::OnHold,
        SubscriptionStatus::Paused,
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::InGracePeriod => "in_grace_period",
            SubscriptionStatus::OnHold => "on_hold",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "subscription_status",
                    format!("unknown status '{}'", s),
                )
            })
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From ACTIVE
            (Active, Active) // Renewal
                | (Active, InGracePeriod)
                | (Active, OnHold)
                | (Active, Paused)
                | (Active, Canceled)
                | (Active, Expired)
            // From IN_GRACE_PERIOD
                | (InGracePeriod, Active)
                | (InGracePeriod, OnHold)
                | (InGracePeriod, Canceled)
                | (InGracePeriod, Expired)
            // From ON_HOLD
                | (OnHold, Active)
                | (OnHold, Canceled)
                | (OnHold, Expired)
            // From PAUSED
                | (Paused, Active)
                | (Paused, Canceled)
                | (Paused, Expired)
            // From CANCELED
                | (Canceled, Active) // Resubscribed before expiry
                | (Canceled, Expired)
            // From EXPIRED
                | (Expired, Active) // Repurchase or recovered renewal
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Active, InGracePeriod, OnHold, Paused, Canceled, Expired],
            InGracePeriod => vec![Active, OnHold, Canceled, Expired],
            OnHold => vec![Active, Canceled, Expired],
            Paused => vec![Active, Canceled, Expired],
            Canceled => vec![Active, Expired],
            Expired => vec![Active],
        }
    }
}
