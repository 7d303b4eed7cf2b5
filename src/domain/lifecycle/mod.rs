//! Lifecycle domain - events and the subscription, payment and refund
//! state machines they drive.

mod errors;
pub(crate) mod event;
pub(crate) mod payment;
mod refund;
mod subscription;
mod subscription_status;

pub use errors::LifecycleError;
pub use event::{EventKind, LifecycleEvent, NaturalKey, NewLifecycleEvent};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use refund::{RefundFailure, RefundReason, RefundStatus, RefundTransaction};
pub use subscription::{IgnoreReason, Subscription, TransitionOutcome};
pub use subscription_status::SubscriptionStatus;
