//! Subscription aggregate.
//!
//! One subscription exists per purchase token. Status changes only through
//! [`Subscription::apply_event`], which validates the whole change before
//! touching any field.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Platform, StateMachine, SubscriptionId, Timestamp, ValidationError};

use super::{EventKind, LifecycleError, LifecycleEvent, SubscriptionStatus};

const ENTITY: &str = "Subscription";

/// Why an event did not change the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Event occurred before the last applied event.
    StaleEvent,
    /// Event kind has no subscription mapping.
    UnsupportedKind,
    /// Subscription is already in the requested state.
    AlreadyInState,
}

/// Result of applying an event to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },
    Ignored(IgnoreReason),
}

/// Subscription aggregate.
///
/// # Invariants
///
/// - `expiry_at > start_at`
/// - `status == Active` is only entered when `expiry_at > now`
/// - `purchase_token` is unique per platform (enforced by the repository)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    id: SubscriptionId,
    owner_ref: Option<String>,
    plan_ref: String,
    platform: Platform,
    purchase_token: String,
    status: SubscriptionStatus,
    start_at: Timestamp,
    expiry_at: Timestamp,
    auto_renew: bool,
    last_event_at: Option<Timestamp>,
    updated_at: Timestamp,
    version: u64,
}

impl Subscription {
    /// Creates a subscription from its first purchase or renewal event.
    pub fn start(
        event: &LifecycleEvent,
        plan_ref: impl Into<String>,
        owner_ref: Option<String>,
        expiry_at: Timestamp,
        now: Timestamp,
    ) -> Result<Self, LifecycleError> {
        let plan_ref = plan_ref.into();
        if plan_ref.trim().is_empty() {
            return Err(ValidationError::empty_field("plan_ref").into());
        }
        let start_at = event.occurred_at();
        ensure_expiry_after_start(start_at, expiry_at)?;

        let status = if expiry_at.is_after(&now) {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Expired
        };

        Ok(Self {
            id: SubscriptionId::new(),
            owner_ref,
            plan_ref,
            platform: event.platform(),
            purchase_token: event.source_token().to_string(),
            status,
            start_at,
            expiry_at,
            auto_renew: status == SubscriptionStatus::Active,
            last_event_at: Some(event.occurred_at()),
            updated_at: now,
            version: 0,
        })
    }

    /// Applies a lifecycle event.
    ///
    /// The target state and expiry are computed and validated first. On error
    /// the subscription is unchanged.
    pub fn apply_event(
        &mut self,
        event: &LifecycleEvent,
        now: Timestamp,
    ) -> Result<TransitionOutcome, LifecycleError> {
        self.apply_event_with_expiry(event, None, now)
    }

    /// Applies a lifecycle event, using `verified_expiry` when the event itself
    /// carries no expiry (for example a renewal confirmed with the platform).
    pub fn apply_event_with_expiry(
        &mut self,
        event: &LifecycleEvent,
        verified_expiry: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<TransitionOutcome, LifecycleError> {
        if let Some(last) = self.last_event_at {
            if event.occurred_at().is_before(&last) {
                return Ok(TransitionOutcome::Ignored(IgnoreReason::StaleEvent));
            }
        }

        let expiry_at = match event.kind() {
            EventKind::Purchase | EventKind::Renewal | EventKind::Resume => event
                .expiry_at()
                .or(verified_expiry)
                .unwrap_or(self.expiry_at),
            _ => self.expiry_at,
        };
        let live = expiry_at.is_after(&now);

        let (target, auto_renew) = match event.kind() {
            EventKind::Purchase | EventKind::Renewal | EventKind::Resume => {
                if live {
                    (SubscriptionStatus::Active, true)
                } else {
                    (SubscriptionStatus::Expired, self.auto_renew)
                }
            }
            EventKind::Cancellation => (SubscriptionStatus::Canceled, false),
            EventKind::Refund | EventKind::Expiration => (SubscriptionStatus::Expired, false),
            EventKind::GracePeriodStart => (SubscriptionStatus::InGracePeriod, self.auto_renew),
            EventKind::GracePeriodEnd => (SubscriptionStatus::OnHold, self.auto_renew),
            EventKind::Pause => (SubscriptionStatus::Paused, self.auto_renew),
            EventKind::Unknown => {
                return Ok(TransitionOutcome::Ignored(IgnoreReason::UnsupportedKind))
            }
        };

        if target == self.status && target != SubscriptionStatus::Active {
            return Ok(TransitionOutcome::Ignored(IgnoreReason::AlreadyInState));
        }

        let from = self.status;
        let to = from
            .transition_to(target)
            .map_err(|e| LifecycleError::from_transition(ENTITY, e))?;
        ensure_expiry_after_start(self.start_at, expiry_at)?;

        self.status = to;
        self.expiry_at = expiry_at;
        self.auto_renew = auto_renew;
        self.last_event_at = Some(event.occurred_at());
        self.updated_at = now.not_before(&[Some(self.updated_at)]);

        Ok(TransitionOutcome::Applied { from, to })
    }

    /// Active and not yet past expiry. Derived from status, never stored.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.expiry_at.is_after(&now)
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn owner_ref(&self) -> Option<&str> {
        self.owner_ref.as_deref()
    }

    pub fn plan_ref(&self) -> &str {
        &self.plan_ref
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn purchase_token(&self) -> &str {
        &self.purchase_token
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn start_at(&self) -> Timestamp {
        self.start_at
    }

    pub fn expiry_at(&self) -> Timestamp {
        self.expiry_at
    }

    pub fn auto_renew(&self) -> bool {
        self.auto_renew
    }

    pub fn last_event_at(&self) -> Option<Timestamp> {
        self.last_event_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Optimistic concurrency version, managed by repositories.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the stored version. Called by repository implementations only.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn ensure_expiry_after_start(
    start_at: Timestamp,
    expiry_at: Timestamp,
) -> Result<(), LifecycleError> {
    if expiry_at.is_after(&start_at) {
        Ok(())
    } else {
        Err(ValidationError::invalid_format(
            "expiry_at",
            format!("expiry {} must be after start {}", expiry_at, start_at),
        )
        .into())
    }
}
