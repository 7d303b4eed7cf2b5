//! Ingestion handlers.
//!
//! - Ingesting platform notifications into lifecycle state
//! - Purging expired idempotency keys

mod ingest_notification;
mod purge_idempotency_keys;

pub use ingest_notification::{
    IngestError, IngestNotificationCommand, IngestNotificationHandler, IngestNotificationResult,
    PaymentEffect, SubscriptionEffect,
};
pub use purge_idempotency_keys::{
    PurgeIdempotencyKeysCommand, PurgeIdempotencyKeysHandler, PurgeIdempotencyKeysResult,
};
