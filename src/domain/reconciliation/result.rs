//! Reconciliation result for one `(date, platform)`.
//!
//! Results are write-once. A re-run creates a new result pointing at the one
//! it supersedes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    saturate_minor, Currency, Platform, ReconciliationRunId, Timestamp,
};

use super::{
    DiscrepancyReport, InternalRecord, MatchKind, MatchOutcome, ReconciliationMatch,
    SettlementBatch, SettlementRecord, SkippedRow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformStatus {
    Matched,
    PartialMatch,
    MajorDiscrepancy,
    Failed,
    /// Platform has not published settlement data. Zero-filled placeholder.
    NoData,
}

impl PlatformStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformStatus::Matched => "matched",
            PlatformStatus::PartialMatch => "partial_match",
            PlatformStatus::MajorDiscrepancy => "major_discrepancy",
            PlatformStatus::Failed => "failed",
            PlatformStatus::NoData => "no_data",
        }
    }
}

/// When unresolved discrepancies count as major.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusThresholds {
    /// Unresolved discrepancies divided by records considered.
    pub major_discrepancy_ratio: f64,
    /// Sum of absolute unresolved deltas, minor units.
    pub major_discrepancy_amount_minor: i64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            major_discrepancy_ratio: 0.1,
            major_discrepancy_amount_minor: 10_000,
        }
    }
}

/// Settlement totals in the reporting currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub currency: Currency,
    pub transactions: u64,
    pub gross_minor: i64,
    pub fee_minor: i64,
    pub net_minor: i64,
    /// Records in other currencies, left out of the totals.
    pub excluded_currency_records: u64,
}

impl SettlementSummary {
    pub fn empty(currency: Currency) -> Self {
        Self {
            currency,
            transactions: 0,
            gross_minor: 0,
            fee_minor: 0,
            net_minor: 0,
            excluded_currency_records: 0,
        }
    }

    pub fn from_records(records: &[SettlementRecord], currency: Currency) -> Self {
        let mut summary = Self::empty(currency);
        let (mut gross, mut fee, mut net) = (0i128, 0i128, 0i128);
        for record in records {
            if record.currency() != &summary.currency {
                summary.excluded_currency_records += 1;
                continue;
            }
            summary.transactions += 1;
            gross += i128::from(record.gross_amount.minor_units());
            fee += i128::from(record.platform_fee.minor_units());
            net += i128::from(record.net_amount.minor_units());
        }
        summary.gross_minor = saturate_minor(gross);
        summary.fee_minor = saturate_minor(fee);
        summary.net_minor = saturate_minor(net);
        summary
    }
}

/// Counts reported with every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationCounts {
    pub settlement_records: usize,
    pub internal_records: usize,
    pub skipped_rows: usize,
    pub exact_matches: usize,
    pub pattern_matches: usize,
    pub unmatched_settlements: usize,
    pub unmatched_events: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    id: ReconciliationRunId,
    date: NaiveDate,
    platform: Platform,
    status: PlatformStatus,
    placeholder: bool,
    summary: SettlementSummary,
    matched: Vec<ReconciliationMatch>,
    unmatched_settlements: Vec<SettlementRecord>,
    unmatched_events: Vec<InternalRecord>,
    discrepancies: DiscrepancyReport,
    skipped: Vec<SkippedRow>,
    failure: Option<String>,
    supersedes: Option<ReconciliationRunId>,
    created_at: Timestamp,
}

impl ReconciliationResult {
    /// Finalizes a completed run and derives its status.
    #[allow(clippy::too_many_arguments)]
    pub fn completed(
        date: NaiveDate,
        platform: Platform,
        reporting_currency: Currency,
        batch: SettlementBatch,
        outcome: MatchOutcome,
        discrepancies: DiscrepancyReport,
        thresholds: &StatusThresholds,
        supersedes: Option<ReconciliationRunId>,
        now: Timestamp,
    ) -> Self {
        let considered = batch.records.len() + outcome.unmatched_events.len();
        let status = derive_status(&discrepancies, considered, thresholds);
        let summary = SettlementSummary::from_records(&batch.records, reporting_currency);

        Self {
            id: ReconciliationRunId::new(),
            date,
            platform,
            status,
            placeholder: false,
            summary,
            matched: outcome.matches,
            unmatched_settlements: outcome.unmatched_settlements,
            unmatched_events: outcome.unmatched_events,
            discrepancies,
            skipped: batch.skipped,
            failure: None,
            supersedes,
            created_at: now,
        }
    }

    /// Zero-filled placeholder for a platform with no published data.
    pub fn no_data(
        date: NaiveDate,
        platform: Platform,
        reporting_currency: Currency,
        supersedes: Option<ReconciliationRunId>,
        now: Timestamp,
    ) -> Self {
        Self::empty(
            date,
            platform,
            PlatformStatus::NoData,
            reporting_currency,
            None,
            supersedes,
            now,
        )
    }

    /// Result for a run whose collaborator failed.
    pub fn failed(
        date: NaiveDate,
        platform: Platform,
        reporting_currency: Currency,
        reason: impl Into<String>,
        supersedes: Option<ReconciliationRunId>,
        now: Timestamp,
    ) -> Self {
        Self::empty(
            date,
            platform,
            PlatformStatus::Failed,
            reporting_currency,
            Some(reason.into()),
            supersedes,
            now,
        )
    }

    fn empty(
        date: NaiveDate,
        platform: Platform,
        status: PlatformStatus,
        reporting_currency: Currency,
        failure: Option<String>,
        supersedes: Option<ReconciliationRunId>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ReconciliationRunId::new(),
            date,
            platform,
            status,
            placeholder: true,
            summary: SettlementSummary::empty(reporting_currency),
            matched: Vec::new(),
            unmatched_settlements: Vec::new(),
            unmatched_events: Vec::new(),
            discrepancies: DiscrepancyReport::default(),
            skipped: Vec::new(),
            failure,
            supersedes,
            created_at: now,
        }
    }

    pub fn counts(&self) -> ReconciliationCounts {
        let exact_matches = self.matched.iter().filter(|m| m.kind == MatchKind::Exact).count();
        ReconciliationCounts {
            settlement_records: self.matched.len() + self.unmatched_settlements.len(),
            internal_records: self.matched.len() + self.unmatched_events.len(),
            skipped_rows: self.skipped.len(),
            exact_matches,
            pattern_matches: self.matched.len() - exact_matches,
            unmatched_settlements: self.unmatched_settlements.len(),
            unmatched_events: self.unmatched_events.len(),
            resolved: self.discrepancies.resolved.len(),
            unresolved: self.discrepancies.unresolved.len(),
        }
    }

    pub fn id(&self) -> ReconciliationRunId {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn status(&self) -> PlatformStatus {
        self.status
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn summary(&self) -> &SettlementSummary {
        &self.summary
    }

    pub fn matched(&self) -> &[ReconciliationMatch] {
        &self.matched
    }

    pub fn unmatched_settlements(&self) -> &[SettlementRecord] {
        &self.unmatched_settlements
    }

    pub fn unmatched_events(&self) -> &[InternalRecord] {
        &self.unmatched_events
    }

    pub fn discrepancies(&self) -> &DiscrepancyReport {
        &self.discrepancies
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn supersedes(&self) -> Option<ReconciliationRunId> {
        self.supersedes
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

fn derive_status(
    report: &DiscrepancyReport,
    considered: usize,
    thresholds: &StatusThresholds,
) -> PlatformStatus {
    let unresolved = report.unresolved.len();
    if unresolved == 0 {
        return PlatformStatus::Matched;
    }
    let ratio = unresolved as f64 / considered.max(1) as f64;
    if ratio > thresholds.major_discrepancy_ratio
        || report.unresolved_amount() > thresholds.major_discrepancy_amount_minor
    {
        PlatformStatus::MajorDiscrepancy
    } else {
        PlatformStatus::PartialMatch
    }
}
