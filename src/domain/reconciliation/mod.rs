//! Settlement reconciliation.
//!
//! Settlement rows are collected and normalized, matched against internal
//! records, analyzed for discrepancies, and folded into a daily report.

mod aggregator;
mod discrepancy;
mod internal;
pub(crate) mod matcher;
pub mod presentation;
mod result;
mod settlement;

pub use aggregator::{aggregate, overall_status, DailyReport, PlatformBreakdown};
pub use discrepancy::{
    analyze, Discrepancy, DiscrepancyKind, DiscrepancyReport, ResolutionMethod, ResolutionPolicy,
    ResolvedDiscrepancy,
};
pub use internal::{internal_records, InternalRecord};
pub use matcher::{
    match_records, pattern_confidence, MatchKind, MatchOutcome, MatchPolicy, ReconciliationMatch,
};
pub use result::{
    PlatformStatus, ReconciliationCounts, ReconciliationResult, SettlementSummary, StatusThresholds,
};
pub use settlement::{collect, RawSettlementRow, SettlementBatch, SettlementRecord, SkippedRow};
