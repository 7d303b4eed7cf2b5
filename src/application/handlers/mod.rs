//! Application handlers.
//!
//! Command handlers that orchestrate domain operations over the ports.

pub mod ingestion;
pub mod payment;
pub mod reconciliation;
pub mod refund;

pub use ingestion::{
    IngestError, IngestNotificationCommand, IngestNotificationHandler, IngestNotificationResult,
    PaymentEffect, PurgeIdempotencyKeysCommand, PurgeIdempotencyKeysHandler,
    PurgeIdempotencyKeysResult, SubscriptionEffect,
};
pub use payment::{
    AcknowledgePaymentCommand, AcknowledgePaymentError, AcknowledgePaymentHandler,
    AcknowledgePaymentResult,
};
pub use reconciliation::{
    DailyReconciliationResult, ReconciliationRunError, ReconciliationSettings,
    RunDailyReconciliationCommand, RunReconciliationCommand, RunReconciliationHandler,
};
pub use refund::{
    ProcessRefundCommand, ProcessRefundHandler, ProcessRefundResult, RefundCommandError,
    RefundDecision, RequestRefundCommand, RequestRefundHandler, RequestRefundResult,
    ReviewRefundCommand, ReviewRefundHandler, ReviewRefundResult,
};
