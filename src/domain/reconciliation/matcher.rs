//! Two-phase reconciliation matcher.
//!
//! Phase one pairs records by transaction ref. Phase two scores the remainder
//! by product, amount closeness and date closeness. Exact pairs are removed
//! before scoring so a fuzzy candidate can never claim a record that has a
//! perfect counterpart.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use serde::{Deserialize, Serialize};

use super::{InternalRecord, SettlementRecord};

/// Scoring knobs for the pattern phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPolicy {
    pub amount_tolerance_minor: i64,
    pub max_date_skew_days: i64,
    pub min_confidence: f64,
    pub amount_weight: f64,
    pub date_weight: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            amount_tolerance_minor: 10,
            max_date_skew_days: 1,
            min_confidence: 0.7,
            amount_weight: 0.6,
            date_weight: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Pattern,
}

/// A settlement record paired with an internal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationMatch {
    pub settlement: SettlementRecord,
    pub internal: InternalRecord,
    pub kind: MatchKind,
    /// Pattern matches only.
    pub confidence: Option<f64>,
    /// `settlement.gross - internal.amount` in minor units.
    pub amount_delta: i64,
    pub same_currency: bool,
}

/// Every input record lands in exactly one of the three buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matches: Vec<ReconciliationMatch>,
    pub unmatched_settlements: Vec<SettlementRecord>,
    pub unmatched_events: Vec<InternalRecord>,
}

impl MatchOutcome {
    /// `(transaction_ref, is_refund)` keys consumed by exact matches.
    pub fn exact_refs(&self) -> HashSet<(&str, bool)> {
        self.matches
            .iter()
            .filter(|m| m.kind == MatchKind::Exact)
            .map(|m| (m.settlement.transaction_ref.as_str(), m.settlement.is_refund()))
            .collect()
    }

    /// Drops unmatched internal records that occurred on another day.
    ///
    /// Neighbouring days are loaded as match candidates only; when left
    /// unmatched they are reported by their own day's run.
    pub fn retain_unmatched_events_on(&mut self, date: NaiveDate) {
        self.unmatched_events.retain(|r| r.occurred_at.date() == date);
    }
}

/// Matches settlements against internal records.
pub fn match_records(
    settlements: Vec<SettlementRecord>,
    internal: Vec<InternalRecord>,
    policy: &MatchPolicy,
) -> MatchOutcome {
    let mut settlement_slots: Vec<Option<SettlementRecord>> =
        settlements.into_iter().map(Some).collect();
    let mut internal_slots: Vec<Option<InternalRecord>> =
        internal.into_iter().map(Some).collect();
    let mut matches = Vec::new();

    // Phase 1: exact transaction ref. Internal candidates per key are kept in
    // occurrence order so the earliest unconsumed record wins.
    let mut by_ref: HashMap<(String, bool), Vec<usize>> = HashMap::new();
    let mut internal_order: Vec<usize> = (0..internal_slots.len()).collect();
    internal_order.sort_by_key(|&i| internal_slots[i].as_ref().map(|r| r.occurred_at));
    for i in internal_order {
        if let Some(Some(tx)) = internal_slots[i].as_ref().map(|r| r.transaction_ref.clone()) {
            let refund = internal_slots[i].as_ref().map(|r| r.is_refund()).unwrap_or(false);
            by_ref.entry((tx, refund)).or_default().push(i);
        }
    }

    for s_idx in 0..settlement_slots.len() {
        let key = match settlement_slots[s_idx].as_ref() {
            Some(s) => (s.transaction_ref.clone(), s.is_refund()),
            None => continue,
        };
        let Some(candidates) = by_ref.get_mut(&key) else { continue };
        let Some(pos) = candidates.iter().position(|&i| internal_slots[i].is_some()) else {
            continue;
        };
        let i_idx = candidates.remove(pos);

        if let (Some(settlement), Some(record)) =
            (settlement_slots[s_idx].take(), internal_slots[i_idx].take())
        {
            matches.push(pair(settlement, record, MatchKind::Exact, None));
        }
    }

    // Phase 2: score every remaining candidate pair, then accept greedily by
    // confidence. Ties go to the earliest internal record.
    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    for (s_idx, settlement) in settlement_slots.iter().enumerate() {
        let Some(settlement) = settlement else { continue };
        for (i_idx, record) in internal_slots.iter().enumerate() {
            let Some(record) = record else { continue };
            if let Some(confidence) = pattern_confidence(settlement, record, policy) {
                if confidence >= policy.min_confidence {
                    candidates.push((confidence, s_idx, i_idx));
                }
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let at = |i: usize| internal_slots[i].as_ref().map(|r| r.occurred_at);
                at(a.2).cmp(&at(b.2))
            })
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    for (confidence, s_idx, i_idx) in candidates {
        if settlement_slots[s_idx].is_none() || internal_slots[i_idx].is_none() {
            continue;
        }
        if let (Some(settlement), Some(record)) =
            (settlement_slots[s_idx].take(), internal_slots[i_idx].take())
        {
            matches.push(pair(settlement, record, MatchKind::Pattern, Some(confidence)));
        }
    }

    MatchOutcome {
        matches,
        unmatched_settlements: settlement_slots.into_iter().flatten().collect(),
        unmatched_events: internal_slots.into_iter().flatten().collect(),
    }
}

/// Confidence in `[0, 1]` for a candidate pair, or `None` when the pair is not
/// eligible (different product, currency or direction, or outside tolerance).
pub fn pattern_confidence(
    settlement: &SettlementRecord,
    record: &InternalRecord,
    policy: &MatchPolicy,
) -> Option<f64> {
    let product_matches = matches!(
        (&settlement.product_ref, &record.product_ref),
        (Some(a), Some(b)) if a == b
    );
    if !product_matches {
        return None;
    }
    if settlement.is_refund() != record.is_refund() {
        return None;
    }

    let delta = settlement.gross_amount.delta(&record.amount)?.saturating_abs();
    if delta > policy.amount_tolerance_minor {
        return None;
    }

    let day_diff = (settlement.settlement_date - record.occurred_at.date()).num_days().abs();
    if day_diff > policy.max_date_skew_days {
        return None;
    }

    let scale = settlement
        .gross_amount
        .minor_units()
        .abs()
        .max(record.amount.minor_units().abs());
    let amount_score = if scale == 0 {
        1.0
    } else {
        1.0 - delta as f64 / scale as f64
    };
    let date_score = 1.0 - day_diff as f64 / (policy.max_date_skew_days + 1) as f64;

    let confidence = amount_score * policy.amount_weight + date_score * policy.date_weight;
    Some(confidence.clamp(0.0, 1.0))
}

fn pair(
    settlement: SettlementRecord,
    internal: InternalRecord,
    kind: MatchKind,
    confidence: Option<f64>,
) -> ReconciliationMatch {
    let same_currency = settlement.gross_amount.same_currency(&internal.amount);
    let amount_delta = settlement
        .gross_amount
        .minor_units()
        .saturating_sub(internal.amount.minor_units());
    ReconciliationMatch {
        settlement,
        internal,
        kind,
        confidence,
        amount_delta,
        same_currency,
    }
}
