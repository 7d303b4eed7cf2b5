//! Daily aggregator: folds per-platform results into one cross-platform report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    saturate_minor, Currency, Percentage, Platform, ReconciliationRunId,
};

use super::{PlatformStatus, ReconciliationCounts, ReconciliationResult};

/// Overall status across platforms.
///
/// Precedence: all `Matched` wins outright, then any `Failed`, then any
/// `MajorDiscrepancy`, otherwise `PartialMatch`. `NoData` is never `Matched`.
pub fn overall_status(statuses: &[PlatformStatus]) -> PlatformStatus {
    if !statuses.is_empty() && statuses.iter().all(|s| *s == PlatformStatus::Matched) {
        return PlatformStatus::Matched;
    }
    if statuses.contains(&PlatformStatus::Failed) {
        return PlatformStatus::Failed;
    }
    if statuses.contains(&PlatformStatus::MajorDiscrepancy) {
        return PlatformStatus::MajorDiscrepancy;
    }
    PlatformStatus::PartialMatch
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformBreakdown {
    pub platform: Platform,
    pub run_id: ReconciliationRunId,
    pub status: PlatformStatus,
    pub placeholder: bool,
    pub transactions: u64,
    pub gross_minor: i64,
    pub fee_minor: i64,
    pub net_minor: i64,
    /// Share of combined gross revenue.
    pub revenue_share: Percentage,
    pub counts: ReconciliationCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub currency: Currency,
    pub status: PlatformStatus,
    pub transactions: u64,
    pub gross_minor: i64,
    pub fee_minor: i64,
    pub net_minor: i64,
    pub unresolved_discrepancies: usize,
    pub platforms: Vec<PlatformBreakdown>,
}

impl DailyReport {
    pub fn platform(&self, platform: Platform) -> Option<&PlatformBreakdown> {
        self.platforms.iter().find(|p| p.platform == platform)
    }

    /// Platforms reported as zero-filled placeholders.
    pub fn placeholders(&self) -> impl Iterator<Item = Platform> + '_ {
        self.platforms.iter().filter(|p| p.placeholder).map(|p| p.platform)
    }
}

/// Builds the daily report from the latest result of each platform.
///
/// Results for other dates are ignored.
pub fn aggregate(
    date: NaiveDate,
    results: &[ReconciliationResult],
    currency: Currency,
    share_decimal_places: u32,
) -> DailyReport {
    let results: Vec<&ReconciliationResult> = results.iter().filter(|r| r.date() == date).collect();

    let total_gross = saturate_minor(
        results
            .iter()
            .filter(|r| r.summary().currency == currency)
            .map(|r| i128::from(r.summary().gross_minor))
            .sum(),
    );

    let mut report = DailyReport {
        date,
        currency: currency.clone(),
        status: overall_status(&results.iter().map(|r| r.status()).collect::<Vec<_>>()),
        transactions: 0,
        gross_minor: 0,
        fee_minor: 0,
        net_minor: 0,
        unresolved_discrepancies: 0,
        platforms: Vec::with_capacity(results.len()),
    };

    let (mut gross_total, mut fee_total, mut net_total) = (0i128, 0i128, 0i128);
    for result in results {
        let summary = result.summary();
        let in_currency = summary.currency == currency;
        let (transactions, gross, fee, net) = if in_currency {
            (summary.transactions, summary.gross_minor, summary.fee_minor, summary.net_minor)
        } else {
            (0, 0, 0, 0)
        };

        report.transactions += transactions;
        gross_total += i128::from(gross);
        fee_total += i128::from(fee);
        net_total += i128::from(net);
        report.unresolved_discrepancies += result.discrepancies().unresolved.len();

        report.platforms.push(PlatformBreakdown {
            platform: result.platform(),
            run_id: result.id(),
            status: result.status(),
            placeholder: result.is_placeholder(),
            transactions,
            gross_minor: gross,
            fee_minor: fee,
            net_minor: net,
            revenue_share: Percentage::from_ratio(gross, total_gross, share_decimal_places),
            counts: result.counts(),
        });
    }

    report.gross_minor = saturate_minor(gross_total);
    report.fee_minor = saturate_minor(fee_total);
    report.net_minor = saturate_minor(net_total);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::reconciliation::matcher::test_support::{day, internal, settlement};
    use crate::domain::reconciliation::{
        analyze, match_records, MatchPolicy, ResolutionPolicy, SettlementBatch, StatusThresholds,
    };

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn matched_run(platform: Platform, amounts: &[i64]) -> ReconciliationResult {
        let settlements: Vec<_> = amounts
            .iter()
            .enumerate()
            .map(|(n, a)| settlement(&format!("{}-{}", platform, n), *a, "P1", day(15)))
            .collect();
        let internals: Vec<_> = amounts
            .iter()
            .enumerate()
            .map(|(n, a)| internal(&format!("{}-{}", platform, n), *a, "P1", day(15)))
            .collect();
        let batch = SettlementBatch {
            records: settlements.clone(),
            skipped: Vec::new(),
        };
        let outcome = match_records(settlements, internals, &MatchPolicy::default());
        let report = analyze(&outcome, &ResolutionPolicy::default(), Timestamp::now());
        ReconciliationResult::completed(
            day(15),
            platform,
            usd(),
            batch,
            outcome,
            report,
            &StatusThresholds::default(),
            None,
            Timestamp::now(),
        )
    }

    // ════════════════════════════════════════════════════════════════════
    // Overall status precedence
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn failure_dominates_success() {
        assert_eq!(
            overall_status(&[PlatformStatus::Matched, PlatformStatus::Failed]),
            PlatformStatus::Failed
        );
    }

    #[test]
    fn all_matched_is_matched() {
        assert_eq!(
            overall_status(&[PlatformStatus::Matched, PlatformStatus::Matched]),
            PlatformStatus::Matched
        );
    }

    #[test]
    fn one_partial_is_partial() {
        assert_eq!(
            overall_status(&[PlatformStatus::Matched, PlatformStatus::PartialMatch]),
            PlatformStatus::PartialMatch
        );
    }

    #[test]
    fn failed_outranks_major() {
        assert_eq!(
            overall_status(&[PlatformStatus::MajorDiscrepancy, PlatformStatus::Failed]),
            PlatformStatus::Failed
        );
        assert_eq!(
            overall_status(&[PlatformStatus::MajorDiscrepancy, PlatformStatus::PartialMatch]),
            PlatformStatus::MajorDiscrepancy
        );
    }

    #[test]
    fn no_data_is_never_matched() {
        assert_eq!(
            overall_status(&[PlatformStatus::Matched, PlatformStatus::NoData]),
            PlatformStatus::PartialMatch
        );
        assert_eq!(overall_status(&[]), PlatformStatus::PartialMatch);
    }

    // ════════════════════════════════════════════════════════════════════
    // Aggregation
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn totals_and_shares_are_combined() {
        let google = matched_run(Platform::GooglePlay, &[1000, 1000]);
        let apple = matched_run(Platform::AppStore, &[1000]);

        let report = aggregate(day(15), &[google, apple], usd(), 2);

        assert_eq!(report.status, PlatformStatus::Matched);
        assert_eq!(report.transactions, 3);
        assert_eq!(report.gross_minor, 3000);
        assert_eq!(report.platform(Platform::GooglePlay).unwrap().revenue_share.scaled(), 6667);
        assert_eq!(report.platform(Platform::AppStore).unwrap().revenue_share.scaled(), 3333);
    }

    #[test]
    fn placeholder_contributes_zero_and_is_flagged() {
        let google = matched_run(Platform::GooglePlay, &[999]);
        let apple = ReconciliationResult::no_data(
            day(15),
            Platform::AppStore,
            usd(),
            None,
            Timestamp::now(),
        );

        let report = aggregate(day(15), &[google, apple], usd(), 2);

        assert_eq!(report.status, PlatformStatus::PartialMatch);
        assert_eq!(report.gross_minor, 999);
        assert_eq!(report.placeholders().collect::<Vec<_>>(), vec![Platform::AppStore]);
        let apple = report.platform(Platform::AppStore).unwrap();
        assert_eq!(apple.revenue_share, Percentage::zero(2));
        assert_eq!(apple.gross_minor, 0);
    }

    #[test]
    fn other_dates_are_ignored() {
        let google = matched_run(Platform::GooglePlay, &[999]);
        let report = aggregate(day(16), &[google], usd(), 2);
        assert!(report.platforms.is_empty());
        assert_eq!(report.gross_minor, 0);
    }
}
