//! Internally recorded charges and refunds, as seen by the matcher.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, Timestamp};
use crate::domain::lifecycle::{EventKind, LifecycleEvent, Payment, PaymentStatus};

/// One internally recorded money movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalRecord {
    /// Payment id or event id this record came from.
    pub event_ref: String,
    pub transaction_ref: Option<String>,
    pub product_ref: Option<String>,
    pub kind: EventKind,
    pub amount: Money,
    pub occurred_at: Timestamp,
}

impl InternalRecord {
    pub fn is_refund(&self) -> bool {
        self.kind == EventKind::Refund
    }
}

/// Builds internal records from payments and events of one `(date, platform)`.
///
/// Settled payments (`Success` or `Refunded`) are the primary source. Charge
/// and refund events carrying an amount contribute a record only when no
/// payment already covers their transaction ref.
pub fn internal_records(payments: &[Payment], events: &[LifecycleEvent]) -> Vec<InternalRecord> {
    let mut records: Vec<InternalRecord> = payments
        .iter()
        .filter(|p| matches!(p.status(), PaymentStatus::Success | PaymentStatus::Refunded))
        .map(|p| InternalRecord {
            event_ref: p.id().to_string(),
            transaction_ref: Some(p.transaction_ref().to_string()),
            product_ref: p.product_ref().map(str::to_string),
            kind: EventKind::Purchase,
            amount: p.amount().clone(),
            occurred_at: p.payment_at(),
        })
        .collect();

    let covered: HashSet<&str> = payments.iter().map(|p| p.transaction_ref()).collect();

    for event in events {
        let Some(amount) = event.amount() else { continue };
        if !(event.kind().is_charge() || event.kind() == EventKind::Refund) {
            continue;
        }
        if event.kind().is_charge() {
            if let Some(tx) = event.transaction_ref() {
                if covered.contains(tx) {
                    continue;
                }
            }
        }
        let amount = if event.kind() == EventKind::Refund && amount.is_positive() {
            Money::new(-amount.minor_units(), amount.currency().clone())
        } else {
            amount.clone()
        };
        records.push(InternalRecord {
            event_ref: event.id().to_string(),
            transaction_ref: event.transaction_ref().map(str::to_string),
            product_ref: event.product_ref().map(str::to_string),
            kind: if event.kind() == EventKind::Refund {
                EventKind::Refund
            } else {
                EventKind::Purchase
            },
            amount,
            occurred_at: event.occurred_at(),
        });
    }

    records.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.event_ref.cmp(&b.event_ref))
    });
    records
}
