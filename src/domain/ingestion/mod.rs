//! Ingestion domain - deduplication of inbound lifecycle events.

mod idempotency_guard;

pub use idempotency_guard::{Admission, IdempotencyGuard};
