//! English descriptions for reconciliation statuses and discrepancy types.
//!
//! Core types carry only tagged variants. Anything user-facing looks them up here.

use super::{DiscrepancyKind, MatchKind, PlatformStatus, ResolutionMethod};

pub fn status_label(status: PlatformStatus) -> &'static str {
    match status {
        PlatformStatus::Matched => "All settlement records reconciled",
        PlatformStatus::PartialMatch => "Minor unresolved differences",
        PlatformStatus::MajorDiscrepancy => "Significant unresolved differences",
        PlatformStatus::Failed => "Reconciliation could not be completed",
        PlatformStatus::NoData => "Settlement data not yet available",
    }
}

pub fn discrepancy_description(kind: DiscrepancyKind) -> &'static str {
    match kind {
        DiscrepancyKind::AmountMismatch => "Settled amount differs from the recorded amount",
        DiscrepancyKind::MissingInternalEvent => "Settlement record has no matching internal event",
        DiscrepancyKind::MissingSettlementRecord => {
            "Internal event has no matching settlement record"
        }
        DiscrepancyKind::DuplicateCandidate => "Record may duplicate another record",
    }
}

pub fn resolution_description(method: ResolutionMethod) -> &'static str {
    match method {
        ResolutionMethod::RoundingDifference => "Within rounding tolerance",
        ResolutionMethod::DuplicateSettlementExport => "Repeated row in the settlement export",
    }
}

pub fn match_kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Exact => "Transaction reference",
        MatchKind::Pattern => "Amount and date pattern",
    }
}
