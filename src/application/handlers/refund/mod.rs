//! Refund handlers.
//!
//! ## Commands
//! - Requesting a refund (auto-approved below a threshold)
//! - Reviewing a refund (approve, reject, cancel)
//! - Processing an approved refund through the platform

mod errors;
mod process_refund;
mod request_refund;
mod review_refund;

pub use errors::RefundCommandError;
pub use process_refund::{ProcessRefundCommand, ProcessRefundHandler, ProcessRefundResult};
pub use request_refund::{RequestRefundCommand, RequestRefundHandler, RequestRefundResult};
pub use review_refund::{
    RefundDecision, ReviewRefundCommand, ReviewRefundHandler, ReviewRefundResult,
};
