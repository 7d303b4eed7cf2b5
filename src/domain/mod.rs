//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, money, timestamps, errors, state machine trait)
//! - `lifecycle` - Subscription, payment and refund aggregates driven by lifecycle events
//! - `notification` - Platform payload decoding into normalized lifecycle events
//! - `ingestion` - Exactly-once admission of lifecycle events
//! - `reconciliation` - Settlement matching, discrepancy analysis and daily reports

pub mod foundation;
pub mod ingestion;
pub mod lifecycle;
pub mod notification;
pub mod reconciliation;
