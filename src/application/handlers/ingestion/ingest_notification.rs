//! IngestNotificationHandler - Command handler for inbound platform notifications.
//!
//! Pipeline: normalize, admit through the idempotency guard, apply to the
//! subscription, record payment effects, store the processed event.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, Platform, SubscriptionId, Timestamp,
};
use crate::domain::ingestion::{Admission, IdempotencyGuard};
use crate::domain::lifecycle::{
    EventKind, LifecycleError, LifecycleEvent, NewPayment, Payment, PaymentStatus, Subscription,
    SubscriptionStatus, TransitionOutcome,
};
use crate::domain::notification::{InboundNotification, NotificationNormalizer, ParseError};
use crate::ports::{
    LifecycleEventRepository, PaymentRepository, PlatformError, PlatformGateway, SaveResult,
    SubscriptionRepository, SubscriptionSnapshot,
};

/// Command to ingest one inbound notification.
#[derive(Debug, Clone)]
pub struct IngestNotificationCommand {
    pub notification: InboundNotification,
}

/// What the event did to its subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEffect {
    /// First event for the purchase token created the subscription.
    Created {
        subscription_id: SubscriptionId,
        status: SubscriptionStatus,
    },
    /// Event was applied to (or ignored by) an existing subscription.
    Transitioned {
        subscription_id: SubscriptionId,
        outcome: TransitionOutcome,
    },
    /// No subscription is tracked for this event.
    Untracked,
}

impl SubscriptionEffect {
    fn wrote_state(&self) -> bool {
        matches!(
            self,
            SubscriptionEffect::Created { .. }
                | SubscriptionEffect::Transitioned {
                    outcome: TransitionOutcome::Applied { .. },
                    ..
                }
        )
    }

    fn subscription_id(&self) -> Option<SubscriptionId> {
        match self {
            SubscriptionEffect::Created { subscription_id, .. }
            | SubscriptionEffect::Transitioned { subscription_id, .. } => Some(*subscription_id),
            SubscriptionEffect::Untracked => None,
        }
    }
}

/// What the event did to the payment ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEffect {
    None,
    Recorded(PaymentId),
    /// A payment with the same transaction ref already existed.
    AlreadyRecorded(PaymentId),
    Refunded(PaymentId),
    AlreadyRefunded(PaymentId),
    /// Refund for a transaction never recorded here.
    RefundForUnknownPayment,
}

impl PaymentEffect {
    fn wrote_state(&self) -> bool {
        matches!(self, PaymentEffect::Recorded(_) | PaymentEffect::Refunded(_))
    }
}

/// Result of ingesting a notification.
#[derive(Debug, Clone)]
pub enum IngestNotificationResult {
    Processed {
        event: LifecycleEvent,
        subscription: SubscriptionEffect,
        payment: PaymentEffect,
    },
    /// Natural key was already admitted. Acknowledge the sender, do nothing.
    Duplicate { natural_key: String },
}

/// Errors from notification ingestion.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// Payload is malformed or untrusted. Acknowledge and drop.
    #[error("Rejected notification: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Platform call failed: {0}")]
    Platform(#[from] PlatformError),

    #[error("Platform reports no valid subscription for {platform} token {purchase_token}")]
    InvalidSubscription {
        platform: Platform,
        purchase_token: String,
    },

    #[error("Storage error: {0}")]
    Storage(DomainError),
}

impl IngestError {
    /// Returns true if redelivery of the same notification may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Parse(_) | IngestError::InvalidSubscription { .. } => false,
            IngestError::Lifecycle(err) => err.is_retryable(),
            IngestError::Platform(err) => err.is_retryable(),
            IngestError::Storage(err) => err.is_retryable(),
        }
    }

    fn is_conflict(&self) -> bool {
        matches!(self, IngestError::Lifecycle(LifecycleError::ConcurrentModification(_)))
    }
}

/// Handler for inbound platform notifications.
///
/// Duplicates are dropped by the idempotency guard before any state changes.
/// Version conflicts on a subscription or payment are retried up to
/// `max_transition_retries` times. If a retryable failure happens before
/// anything was written, the natural key is released so the platform's
/// redelivery is processed.
pub struct IngestNotificationHandler {
    normalizer: NotificationNormalizer,
    guard: IdempotencyGuard,
    events: Arc<dyn LifecycleEventRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PlatformGateway>,
    max_transition_retries: u32,
}

impl IngestNotificationHandler {
    pub fn new(
        normalizer: NotificationNormalizer,
        guard: IdempotencyGuard,
        events: Arc<dyn LifecycleEventRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PlatformGateway>,
    ) -> Self {
        Self {
            normalizer,
            guard,
            events,
            subscriptions,
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
        cmd: IngestNotificationCommand,
    ) -> Result<IngestNotificationResult, IngestError> {
        let platform = cmd.notification.platform;

        // 1. Normalize. Malformed payloads never reach the guard.
        let mut event = self.normalizer.normalize(&cmd.notification).map_err(|e| {
            warn!(%platform, error = %e, kind = e.kind(), "Rejected inbound notification");
            e
        })?;

        // 2. Admit
        match self.guard.admit(&event).await.map_err(IngestError::Storage)? {
            Admission::DuplicateIgnored => {
                return Ok(IngestNotificationResult::Duplicate {
                    natural_key: event.natural_key().to_string(),
                })
            }
            Admission::Accepted => {}
        }

        // 3. Apply
        let mut mutated = false;
        match self.process(&mut event, &mut mutated).await {
            Ok((subscription, payment)) => {
                info!(
                    %platform,
                    kind = %event.kind(),
                    event_id = %event.id(),
                    ?subscription,
                    ?payment,
                    "Lifecycle event processed"
                );
                Ok(IngestNotificationResult::Processed {
                    event,
                    subscription,
                    payment,
                })
            }
            Err(err) => {
                warn!(
                    %platform,
                    kind = %event.kind(),
                    natural_key = %event.natural_key(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "Lifecycle event processing failed"
                );
                if err.is_retryable() && !mutated {
                    if let Err(release_err) = self.guard.release(&event).await {
                        error!(
                            natural_key = %event.natural_key(),
                            error = %release_err,
                            "Failed to release idempotency key"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    async fn process(
        &self,
        event: &mut LifecycleEvent,
        mutated: &mut bool,
    ) -> Result<(SubscriptionEffect, PaymentEffect), IngestError> {
        let snapshot = self.verify_if_needed(event).await?;
        let snapshot = snapshot.as_ref();
        let current: &LifecycleEvent = event;

        let subscription = self
            .retrying(move || self.apply_to_subscription(current, snapshot))
            .await?;
        *mutated |= subscription.wrote_state();

        let subscription_id = subscription.subscription_id();
        let payment = self
            .retrying(move || self.apply_to_payments(current, snapshot, subscription_id))
            .await?;
        *mutated |= payment.wrote_state();

        event.mark_processed(Timestamp::now())?;
        match self.events.save(event).await.map_err(IngestError::Storage)? {
            SaveResult::Inserted => {}
            SaveResult::AlreadyExists => debug!(event_id = %event.id(), "Event already stored"),
        }
        *mutated = true;

        Ok((subscription, payment))
    }

    /// Runs `step` again while it fails with a version conflict.
    async fn retrying<T, F, Fut>(&self, mut step: F) -> Result<T, IngestError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, IngestError>>,
    {
        let mut retries = 0;
        loop {
            match step().await {
                Err(err) if err.is_conflict() && retries < self.max_transition_retries => {
                    retries += 1;
                    debug!(retries, error = %err, "Retrying after concurrent modification");
                }
                other => return other,
            }
        }
    }

    /// Asks the platform for the subscription state when a charge event
    /// carries no expiry of its own.
    async fn verify_if_needed(
        &self,
        event: &LifecycleEvent,
    ) -> Result<Option<SubscriptionSnapshot>, IngestError> {
        if !event.kind().is_charge() || event.expiry_at().is_some() || event.is_one_time() {
            return Ok(None);
        }

        let snapshot = self
            .gateway
            .verify_subscription(
                event.platform(),
                event.product_ref().unwrap_or_default(),
                event.source_token(),
            )
            .await?;

        if !snapshot.valid {
            return Err(IngestError::InvalidSubscription {
                platform: event.platform(),
                purchase_token: event.source_token().to_string(),
            });
        }
        Ok(Some(snapshot))
    }

    async fn apply_to_subscription(
        &self,
        event: &LifecycleEvent,
        snapshot: Option<&SubscriptionSnapshot>,
    ) -> Result<SubscriptionEffect, IngestError> {
        if event.is_one_time() {
            return Ok(SubscriptionEffect::Untracked);
        }

        let now = Timestamp::now();
        let verified_expiry = snapshot.and_then(|s| s.expiry_at);
        let existing = self
            .subscriptions
            .find_by_purchase_token(event.platform(), event.source_token())
            .await
            .map_err(IngestError::Storage)?;

        if let Some(mut subscription) = existing {
            let outcome = subscription.apply_event_with_expiry(event, verified_expiry, now)?;
            if matches!(outcome, TransitionOutcome::Applied { .. }) {
                self.subscriptions
                    .update(&subscription)
                    .await
                    .map_err(LifecycleError::from)?;
            }
            return Ok(SubscriptionEffect::Transitioned {
                subscription_id: subscription.id(),
                outcome,
            });
        }

        if !event.kind().is_charge() {
            info!(
                platform = %event.platform(),
                kind = %event.kind(),
                "No subscription tracked for purchase token"
            );
            return Ok(SubscriptionEffect::Untracked);
        }

        let expiry_at = event.expiry_at().or(verified_expiry).ok_or_else(|| {
            IngestError::InvalidSubscription {
                platform: event.platform(),
                purchase_token: event.source_token().to_string(),
            }
        })?;
        let plan_ref = event
            .product_ref()
            .map(str::to_string)
            .or_else(|| snapshot.and_then(|s| s.product_ref.clone()))
            .unwrap_or_default();
        let owner_ref = snapshot.and_then(|s| s.owner_ref.clone());

        let subscription = Subscription::start(event, plan_ref, owner_ref, expiry_at, now)?;
        match self.subscriptions.save(&subscription).await {
            Ok(()) => Ok(SubscriptionEffect::Created {
                subscription_id: subscription.id(),
                status: subscription.status(),
            }),
            // Lost the race to another delivery for the same token. Reload and apply.
            Err(err) if err.code == ErrorCode::AlreadyExists => {
                Err(LifecycleError::ConcurrentModification(err.message).into())
            }
            Err(err) => Err(IngestError::Storage(err)),
        }
    }

    async fn apply_to_payments(
        &self,
        event: &LifecycleEvent,
        snapshot: Option<&SubscriptionSnapshot>,
        subscription_id: Option<SubscriptionId>,
    ) -> Result<PaymentEffect, IngestError> {
        match event.kind() {
            EventKind::Purchase | EventKind::Renewal => {
                self.record_charge(event, snapshot, subscription_id).await
            }
            EventKind::Refund => self.record_refund(event).await,
            _ => Ok(PaymentEffect::None),
        }
    }

    async fn record_charge(
        &self,
        event: &LifecycleEvent,
        snapshot: Option<&SubscriptionSnapshot>,
        subscription_id: Option<SubscriptionId>,
    ) -> Result<PaymentEffect, IngestError> {
        let transaction_ref = event
            .transaction_ref()
            .map(str::to_string)
            .or_else(|| snapshot.and_then(|s| s.latest_transaction_ref.clone()));
        let amount = event
            .amount()
            .cloned()
            .or_else(|| snapshot.and_then(|s| s.latest_amount.clone()));
        let (Some(transaction_ref), Some(amount)) = (transaction_ref, amount) else {
            return Ok(PaymentEffect::None);
        };

        if let Some(existing) = self
            .payments
            .find_by_transaction_ref(event.platform(), &transaction_ref)
            .await
            .map_err(IngestError::Storage)?
        {
            return Ok(PaymentEffect::AlreadyRecorded(existing.id()));
        }

        let payment = Payment::succeeded(NewPayment {
            subscription_id,
            platform: event.platform(),
            order_ref: snapshot.and_then(|s| s.latest_order_ref.clone()),
            transaction_ref: transaction_ref.clone(),
            product_ref: event.product_ref().map(str::to_string),
            amount,
            payment_at: event.occurred_at(),
        })?;

        match self.payments.save(&payment).await.map_err(IngestError::Storage)? {
            SaveResult::Inserted => Ok(PaymentEffect::Recorded(payment.id())),
            SaveResult::AlreadyExists => {
                let existing = self
                    .payments
                    .find_by_transaction_ref(event.platform(), &transaction_ref)
                    .await
                    .map_err(IngestError::Storage)?;
                Ok(existing
                    .map(|p| PaymentEffect::AlreadyRecorded(p.id()))
                    .unwrap_or(PaymentEffect::None))
            }
        }
    }

    async fn record_refund(&self, event: &LifecycleEvent) -> Result<PaymentEffect, IngestError> {
        let Some(transaction_ref) = event.transaction_ref() else {
            return Ok(PaymentEffect::None);
        };

        let Some(mut payment) = self
            .payments
            .find_by_transaction_ref(event.platform(), transaction_ref)
            .await
            .map_err(IngestError::Storage)?
        else {
            info!(
                platform = %event.platform(),
                transaction_ref,
                "Refund reported for unknown payment"
            );
            return Ok(PaymentEffect::RefundForUnknownPayment);
        };

        if payment.status() == PaymentStatus::Refunded {
            return Ok(PaymentEffect::AlreadyRefunded(payment.id()));
        }

        payment.mark_refunded(event.occurred_at())?;
        self.payments
            .update(&payment)
            .await
            .map_err(LifecycleError::from)?;
        Ok(PaymentEffect::Refunded(payment.id()))
    }
}
