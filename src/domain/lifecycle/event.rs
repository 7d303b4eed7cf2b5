//! Canonical lifecycle events.
//!
//! Every platform notification is normalized into a [`LifecycleEvent`] before
//! it reaches the idempotency guard or any state machine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{EventId, Money, Platform, Timestamp, ValidationError};

use super::LifecycleError;

/// Kind of lifecycle change reported by a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Purchase,
    Renewal,
    Cancellation,
    Refund,
    Expiration,
    GracePeriodStart,
    GracePeriodEnd,
    Pause,
    Resume,
    /// Platform notification type with no lifecycle mapping.
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Purchase => "purchase",
            EventKind::Renewal => "renewal",
            EventKind::Cancellation => "cancellation",
            EventKind::Refund => "refund",
            EventKind::Expiration => "expiration",
            EventKind::GracePeriodStart => "grace_period_start",
            EventKind::GracePeriodEnd => "grace_period_end",
            EventKind::Pause => "pause",
            EventKind::Resume => "resume",
            EventKind::Unknown => "unknown",
        }
    }

    /// Purchase and renewal events represent money moving to the merchant.
    pub fn is_charge(&self) -> bool {
        matches!(self, EventKind::Purchase | EventKind::Renewal)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "purchase" => EventKind::Purchase,
            "renewal" => EventKind::Renewal,
            "cancellation" => EventKind::Cancellation,
            "refund" => EventKind::Refund,
            "expiration" => EventKind::Expiration,
            "grace_period_start" => EventKind::GracePeriodStart,
            "grace_period_end" => EventKind::GracePeriodEnd,
            "pause" => EventKind::Pause,
            "resume" => EventKind::Resume,
            "unknown" => EventKind::Unknown,
            other => {
                return Err(ValidationError::invalid_format(
                    "event_kind",
                    format!("unknown event kind '{}'", other),
                ))
            }
        })
    }
}

/// Deduplication key: `(platform, source token, kind, platform notification id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub platform: Platform,
    pub source_token: String,
    pub kind: EventKind,
    pub notification_id: String,
}

impl NaturalKey {
    /// Fixed-length storage key.
    ///
    /// Tokens can be long and contain arbitrary characters, so the variable
    /// parts are hashed. Format: `<platform>:<kind>:<sha256 hex>`.
    pub fn storage_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source_token.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.notification_id.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("{}:{}:{}", self.platform, self.kind, hex)
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.platform, self.kind, self.notification_id
        )
    }
}

/// Fields needed to construct a [`LifecycleEvent`].
#[derive(Debug, Clone)]
pub struct NewLifecycleEvent {
    pub platform: Platform,
    pub kind: EventKind,
    pub entity_ref: String,
    pub source_token: String,
    pub platform_notification_id: String,
    pub transaction_ref: Option<String>,
    pub product_ref: Option<String>,
    pub amount: Option<Money>,
    pub expiry_at: Option<Timestamp>,
    /// Non-renewing product purchase with no subscription behind it.
    pub one_time: bool,
    pub payload: Map<String, Value>,
    pub occurred_at: Timestamp,
    pub received_at: Timestamp,
}

/// A normalized, immutable lifecycle event.
///
/// Only `processed_at` changes after creation, and only once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    id: EventId,
    platform: Platform,
    kind: EventKind,
    entity_ref: String,
    source_token: String,
    platform_notification_id: String,
    transaction_ref: Option<String>,
    product_ref: Option<String>,
    amount: Option<Money>,
    expiry_at: Option<Timestamp>,
    #[serde(default)]
    one_time: bool,
    payload: Map<String, Value>,
    occurred_at: Timestamp,
    received_at: Timestamp,
    processed_at: Option<Timestamp>,
}

impl LifecycleEvent {
    pub fn new(fields: NewLifecycleEvent) -> Result<Self, ValidationError> {
        require_non_empty("entity_ref", &fields.entity_ref)?;
        require_non_empty("source_token", &fields.source_token)?;
        require_non_empty("platform_notification_id", &fields.platform_notification_id)?;
        if let Some(transaction_ref) = &fields.transaction_ref {
            require_non_empty("transaction_ref", transaction_ref)?;
        }

        Ok(Self {
            id: EventId::new(),
            platform: fields.platform,
            kind: fields.kind,
            entity_ref: fields.entity_ref,
            source_token: fields.source_token,
            platform_notification_id: fields.platform_notification_id,
            transaction_ref: fields.transaction_ref,
            product_ref: fields.product_ref,
            amount: fields.amount,
            expiry_at: fields.expiry_at,
            one_time: fields.one_time,
            payload: fields.payload,
            occurred_at: fields.occurred_at,
            received_at: fields.received_at,
            processed_at: None,
        })
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            platform: self.platform,
            source_token: self.source_token.clone(),
            kind: self.kind,
            notification_id: self.platform_notification_id.clone(),
        }
    }

    /// Records when processing finished. Fails if already recorded.
    pub fn mark_processed(&mut self, at: Timestamp) -> Result<(), LifecycleError> {
        if let Some(existing) = self.processed_at {
            return Err(LifecycleError::AlreadyFinalized {
                entity: "LifecycleEvent",
                state: format!("processed at {}", existing),
            });
        }
        self.processed_at = Some(at.not_before(&[Some(self.received_at)]));
        Ok(())
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Reference to the affected subscription or payment (purchase token or
    /// original transaction id).
    pub fn entity_ref(&self) -> &str {
        &self.entity_ref
    }

    pub fn source_token(&self) -> &str {
        &self.source_token
    }

    pub fn platform_notification_id(&self) -> &str {
        &self.platform_notification_id
    }

    pub fn transaction_ref(&self) -> Option<&str> {
        self.transaction_ref.as_deref()
    }

    pub fn product_ref(&self) -> Option<&str> {
        self.product_ref.as_deref()
    }

    pub fn amount(&self) -> Option<&Money> {
        self.amount.as_ref()
    }

    pub fn expiry_at(&self) -> Option<Timestamp> {
        self.expiry_at
    }

    /// True for one-time product purchases, which never create a subscription.
    pub fn is_one_time(&self) -> bool {
        self.one_time
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }

    pub fn processed_at(&self) -> Option<Timestamp> {
        self.processed_at
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::empty_field(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Builds a minimal valid event for tests.
    pub fn event(
        platform: Platform,
        kind: EventKind,
        token: &str,
        notification_id: &str,
    ) -> NewLifecycleEvent {
        let now = Timestamp::now();
        NewLifecycleEvent {
            platform,
            kind,
            entity_ref: token.to_string(),
            source_token: token.to_string(),
            platform_notification_id: notification_id.to_string(),
            transaction_ref: None,
            product_ref: None,
            amount: None,
            expiry_at: None,
            one_time: false,
            payload: Map::new(),
            occurred_at: now,
            received_at: now,
        }
    }
}
