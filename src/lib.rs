//! Subscription Reconciler - Payment lifecycle and settlement reconciliation
//!
//! This crate ingests platform subscription notifications (Google Play RTDN,
//! App Store server notifications), drives the subscription, payment and
//! refund state machines idempotently, and reconciles daily platform
//! settlement reports against the internally recorded payments.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod ports;
