//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `SubscriptionRepository`, `PaymentRepository`, `RefundRepository`
//! - `LifecycleEventRepository` - immutable normalized events
//! - `ReconciliationRepository` - append-only run results
//! - `IdempotencyKeyStore` - atomic set of admitted natural keys
//! - `ReconciliationRunLock` - per `(date, platform)` mutual exclusion
//!
//! ## Platform Ports
//!
//! - `PlatformGateway` - subscription lookup, acknowledgment, refunds
//! - `SettlementSource` - settlement export rows
//! - `SignatureVerifier` - trust decision for signed envelopes

mod idempotency_key_store;
mod lifecycle_event_repository;
mod payment_repository;
mod platform_gateway;
mod reconciliation_repository;
mod reconciliation_run_lock;
mod refund_repository;
mod settlement_source;
mod signature_verifier;
mod subscription_repository;

pub use idempotency_key_store::IdempotencyKeyStore;
pub use lifecycle_event_repository::{LifecycleEventRepository, SaveResult};
pub use payment_repository::PaymentRepository;
pub use platform_gateway::{PlatformError, PlatformGateway, RefundReceipt, SubscriptionSnapshot};
pub use reconciliation_repository::ReconciliationRepository;
pub use reconciliation_run_lock::{ReconciliationRunLock, RunLease};
pub use refund_repository::RefundRepository;
pub use settlement_source::{SettlementFetch, SettlementSource};
pub use signature_verifier::{SignatureRejected, SignatureVerifier};
pub use subscription_repository::SubscriptionRepository;
