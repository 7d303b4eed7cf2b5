//! Discrepancy analyzer and auto-resolver.
//!
//! Auto-resolution only applies deterministic rules and only annotates a
//! discrepancy. The underlying records are never modified.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, DiscrepancyId, Timestamp};

use super::presentation::resolution_description;
use super::{MatchKind, MatchOutcome, ReconciliationMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    MissingInternalEvent,
    MissingSettlementRecord,
    AmountMismatch,
    DuplicateCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: DiscrepancyId,
    pub settlement_ref: Option<String>,
    pub event_ref: Option<String>,
    pub kind: DiscrepancyKind,
    /// Settlement minus internal, minor units.
    pub amount_delta: i64,
    pub currency: Currency,
    pub detected_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    RoundingDifference,
    DuplicateSettlementExport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDiscrepancy {
    pub discrepancy: Discrepancy,
    pub method: ResolutionMethod,
    pub description: String,
}

/// Thresholds for auto-resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionPolicy {
    pub rounding_tolerance_minor: i64,
    /// Relative tolerance in basis points of the settlement gross.
    pub rounding_tolerance_bps: i64,
    /// Pattern matches below this confidence are never auto-resolved.
    pub safe_confidence: f64,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            rounding_tolerance_minor: 5,
            rounding_tolerance_bps: 50,
            safe_confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyReport {
    pub resolved: Vec<ResolvedDiscrepancy>,
    pub unresolved: Vec<Discrepancy>,
}

impl DiscrepancyReport {
    pub fn total(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }

    /// Sum of absolute unresolved deltas.
    pub fn unresolved_amount(&self) -> i64 {
        self.unresolved
            .iter()
            .fold(0i64, |total, d| total.saturating_add(d.amount_delta.saturating_abs()))
    }
}

/// Classifies the residue of a match run.
pub fn analyze(
    outcome: &MatchOutcome,
    policy: &ResolutionPolicy,
    detected_at: Timestamp,
) -> DiscrepancyReport {
    let mut report = DiscrepancyReport::default();
    let exact_refs = outcome.exact_refs();

    for settlement in &outcome.unmatched_settlements {
        let key = (settlement.transaction_ref.as_str(), settlement.is_refund());
        let consumed = exact_refs.contains(&key);
        let discrepancy = Discrepancy {
            id: DiscrepancyId::new(),
            settlement_ref: Some(settlement.transaction_ref.clone()),
            event_ref: None,
            kind: if consumed {
                DiscrepancyKind::DuplicateCandidate
            } else {
                DiscrepancyKind::MissingInternalEvent
            },
            amount_delta: settlement.gross_amount.minor_units(),
            currency: settlement.currency().clone(),
            detected_at,
        };
        if consumed {
            report.resolve(discrepancy, ResolutionMethod::DuplicateSettlementExport);
        } else {
            report.unresolved.push(discrepancy);
        }
    }

    for record in &outcome.unmatched_events {
        report.unresolved.push(Discrepancy {
            id: DiscrepancyId::new(),
            settlement_ref: None,
            event_ref: Some(record.event_ref.clone()),
            kind: DiscrepancyKind::MissingSettlementRecord,
            amount_delta: record.amount.minor_units().saturating_neg(),
            currency: record.amount.currency().clone(),
            detected_at,
        });
    }

    for m in &outcome.matches {
        let below_safe = m.kind == MatchKind::Pattern
            && m.confidence.map(|c| c < policy.safe_confidence).unwrap_or(true);
        let mismatched = m.amount_delta != 0 || !m.same_currency;

        let kind = match (mismatched, below_safe) {
            (true, _) => DiscrepancyKind::AmountMismatch,
            (false, true) => DiscrepancyKind::DuplicateCandidate,
            (false, false) => continue,
        };
        let discrepancy = Discrepancy {
            id: DiscrepancyId::new(),
            settlement_ref: Some(m.settlement.transaction_ref.clone()),
            event_ref: Some(m.internal.event_ref.clone()),
            kind,
            amount_delta: m.amount_delta,
            currency: m.settlement.currency().clone(),
            detected_at,
        };

        if kind == DiscrepancyKind::AmountMismatch && !below_safe && is_rounding(m, policy) {
            report.resolve(discrepancy, ResolutionMethod::RoundingDifference);
        } else {
            report.unresolved.push(discrepancy);
        }
    }

    report
}

fn is_rounding(m: &ReconciliationMatch, policy: &ResolutionPolicy) -> bool {
    if !m.same_currency {
        return false;
    }
    let delta = i128::from(m.amount_delta.unsigned_abs());
    let gross = i128::from(m.settlement.gross_amount.minor_units().unsigned_abs());
    delta <= i128::from(policy.rounding_tolerance_minor)
        || delta * 10_000 <= gross * i128::from(policy.rounding_tolerance_bps)
}

impl DiscrepancyReport {
    fn resolve(&mut self, discrepancy: Discrepancy, method: ResolutionMethod) {
        self.resolved.push(ResolvedDiscrepancy {
            discrepancy,
            method,
            description: resolution_description(method).to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reconciliation::matcher::test_support::{day, internal, settlement};
    use crate::domain::lifecycle::EventKind;
    use crate::domain::reconciliation::{match_records, MatchPolicy};

    fn run(
        settlements: Vec<crate::domain::reconciliation::SettlementRecord>,
        internals: Vec<crate::domain::reconciliation::InternalRecord>,
    ) -> DiscrepancyReport {
        let outcome = match_records(settlements, internals, &MatchPolicy::default());
        analyze(&outcome, &ResolutionPolicy::default(), Timestamp::now())
    }

    #[test]
    fn exact_match_with_equal_amounts_has_no_discrepancy() {
        let report = run(
            vec![settlement("T1", 999, "P1", day(15))],
            vec![internal("T1", 999, "P1", day(15))],
        );
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn pattern_match_one_cent_off_is_rounding() {
        let report = run(
            vec![settlement("T2", 999, "P1", day(15))],
            vec![internal("T2-ALT", 998, "P1", day(15))],
        );
        assert!(report.unresolved.is_empty());
        assert_eq!(report.resolved.len(), 1);
        let resolved = &report.resolved[0];
        assert_eq!(resolved.discrepancy.kind, DiscrepancyKind::AmountMismatch);
        assert_eq!(resolved.method, ResolutionMethod::RoundingDifference);
        assert_eq!(resolved.discrepancy.amount_delta, 1);
        assert!(!resolved.description.is_empty());
    }

    #[test]
    fn large_exact_mismatch_stays_unresolved() {
        let report = run(
            vec![settlement("T1", 1999, "P1", day(15))],
            vec![internal("T1", 999, "P1", day(15))],
        );
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].kind, DiscrepancyKind::AmountMismatch);
        assert_eq!(report.unresolved[0].amount_delta, 1000);
    }

    #[test]
    fn relative_tolerance_covers_large_amounts() {
        // 40 cents on 100.00 is 40 bps, inside 50 bps.
        let report = run(
            vec![settlement("T1", 10_000, "P1", day(15))],
            vec![internal("T1", 9_960, "P1", day(15))],
        );
        assert_eq!(report.resolved.len(), 1);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn repeated_settlement_export_is_duplicate() {
        let report = run(
            vec![
                settlement("T1", 999, "P1", day(15)),
                settlement("T1", 999, "P9", day(15)),
            ],
            vec![internal("T1", 999, "P1", day(15))],
        );
        assert!(report.unresolved.is_empty());
        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.resolved[0].discrepancy.kind, DiscrepancyKind::DuplicateCandidate);
        assert_eq!(report.resolved[0].method, ResolutionMethod::DuplicateSettlementExport);
    }

    #[test]
    fn refund_sharing_a_charge_ref_is_not_a_duplicate() {
        let mut refund = settlement("T1", -999, "P1", day(15));
        refund.event_kind = EventKind::Refund;

        let report = run(
            vec![settlement("T1", 999, "P1", day(15)), refund],
            vec![internal("T1", 999, "P1", day(15))],
        );

        assert!(report.resolved.is_empty());
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].kind, DiscrepancyKind::MissingInternalEvent);
        assert_eq!(report.unresolved[0].amount_delta, -999);
    }

    #[test]
    fn singletons_are_missing_records() {
        let report = run(
            vec![settlement("S1", 500, "P1", day(15))],
            vec![internal("E1", 700, "P2", day(15))],
        );
        let kinds: Vec<_> = report.unresolved.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiscrepancyKind::MissingInternalEvent));
        assert!(kinds.contains(&DiscrepancyKind::MissingSettlementRecord));
        assert_eq!(report.unresolved_amount(), 1200);
    }

    #[test]
    fn low_confidence_pattern_match_is_flagged_for_review() {
        // One day of skew gives 0.8 confidence: accepted, but below the safe band.
        let report = run(
            vec![settlement("S", 999, "P1", day(15))],
            vec![internal("E", 999, "P1", day(14))],
        );
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].kind, DiscrepancyKind::DuplicateCandidate);
    }
}
