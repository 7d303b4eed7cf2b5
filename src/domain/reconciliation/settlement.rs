//! Settlement collector.
//!
//! Normalizes raw settlement export rows into [`SettlementRecord`]s. Shape
//! validation only: a bad row is skipped and counted, never fatal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::foundation::{
    parse_minor_units, Currency, Money, Platform, SettlementRecordId, ValidationError,
};
use crate::domain::lifecycle::EventKind;

/// A settlement row as supplied by the platform export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettlementRow {
    pub transaction_ref: Option<String>,
    pub product_ref: Option<String>,
    pub event_kind: Option<String>,
    /// `YYYY-MM-DD`. Defaults to the requested date for single-day fetches.
    pub settlement_date: Option<String>,
    /// Decimal string or JSON number in major units.
    pub gross_amount: Option<Value>,
    pub platform_fee: Option<Value>,
    pub net_amount: Option<Value>,
    pub currency: Option<String>,
}

/// A validated settlement record. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: SettlementRecordId,
    pub platform: Platform,
    pub settlement_date: NaiveDate,
    pub transaction_ref: String,
    pub product_ref: Option<String>,
    pub event_kind: EventKind,
    pub gross_amount: Money,
    pub platform_fee: Money,
    pub net_amount: Money,
}

impl SettlementRecord {
    pub fn currency(&self) -> &Currency {
        self.gross_amount.currency()
    }

    pub fn is_refund(&self) -> bool {
        self.event_kind == EventKind::Refund
    }
}

/// A row that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// Zero-based position in the supplied rows.
    pub index: usize,
    pub reason: String,
}

/// Output of the collector for one `(platform, date range)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettlementBatch {
    pub records: Vec<SettlementRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Normalizes rows for `platform` with settlement dates in `from..=to`.
pub fn collect(
    platform: Platform,
    from: NaiveDate,
    to: NaiveDate,
    rows: Vec<RawSettlementRow>,
) -> SettlementBatch {
    let mut batch = SettlementBatch::default();

    for (index, row) in rows.into_iter().enumerate() {
        match normalize_row(platform, from, to, row) {
            Ok(record) => batch.records.push(record),
            Err(err) => {
                warn!(%platform, index, error = %err, "Skipping invalid settlement row");
                batch.skipped.push(SkippedRow {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }

    batch
}

fn normalize_row(
    platform: Platform,
    from: NaiveDate,
    to: NaiveDate,
    row: RawSettlementRow,
) -> Result<SettlementRecord, ValidationError> {
    let transaction_ref = row
        .transaction_ref
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ValidationError::empty_field("transaction_ref"))?;

    let gross = row
        .gross_amount
        .as_ref()
        .filter(|v| !v.is_null())
        .ok_or_else(|| ValidationError::empty_field("gross_amount"))
        .and_then(|v| amount_value("gross_amount", v))?;

    let currency = Currency::new(row.currency.as_deref().unwrap_or(""))?;

    let fee = match row.platform_fee.as_ref().filter(|v| !v.is_null()) {
        Some(v) => amount_value("platform_fee", v)?,
        None => 0,
    };
    let net = match row.net_amount.as_ref().filter(|v| !v.is_null()) {
        Some(v) => amount_value("net_amount", v)?,
        None => gross.checked_sub(fee).ok_or_else(|| {
            ValidationError::invalid_format("net_amount", "gross minus fee is out of range")
        })?,
    };

    let settlement_date = match row.settlement_date.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            ValidationError::invalid_format("settlement_date", format!("'{}' is not YYYY-MM-DD", s))
        })?,
        _ if from == to => from,
        _ => return Err(ValidationError::empty_field("settlement_date")),
    };
    if settlement_date < from || settlement_date > to {
        return Err(ValidationError::invalid_format(
            "settlement_date",
            format!("{} is outside {}..={}", settlement_date, from, to),
        ));
    }

    let event_kind = match row.event_kind.as_deref().map(|k| k.trim().to_ascii_lowercase()) {
        None => EventKind::Purchase,
        Some(kind) => match kind.as_str() {
            "" | "charge" | "sale" => EventKind::Purchase,
            "chargeback" | "refund" | "reversal" => EventKind::Refund,
            other => other.parse()?,
        },
    };

    Ok(SettlementRecord {
        id: SettlementRecordId::new(),
        platform,
        settlement_date,
        transaction_ref,
        product_ref: row.product_ref.filter(|p| !p.trim().is_empty()),
        event_kind,
        gross_amount: Money::new(gross, currency.clone()),
        platform_fee: Money::new(fee, currency.clone()),
        net_amount: Money::new(net, currency),
    })
}

/// Parses an amount given as a decimal string or JSON number.
fn amount_value(field: &str, value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::String(s) => parse_minor_units(field, s),
        Value::Number(n) => parse_minor_units(field, &n.to_string()),
        _ => Err(ValidationError::invalid_format(field, "expected a decimal amount")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn row(value: Value) -> RawSettlementRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_complete_row() {
        let batch = collect(
            Platform::GooglePlay,
            day(),
            day(),
            vec![row(json!({
                "transaction_ref": "T1",
                "product_ref": "P1",
                "event_kind": "renewal",
                "settlement_date": "2024-01-15",
                "gross_amount": "9.99",
                "platform_fee": "1.50",
                "net_amount": "8.49",
                "currency": "usd"
            }))],
        );

        assert!(batch.skipped.is_empty());
        let record = &batch.records[0];
        assert_eq!(record.transaction_ref, "T1");
        assert_eq!(record.event_kind, EventKind::Renewal);
        assert_eq!(record.gross_amount.minor_units(), 999);
        assert_eq!(record.platform_fee.minor_units(), 150);
        assert_eq!(record.net_amount.minor_units(), 849);
        assert_eq!(record.currency().as_str(), "USD");
    }

    #[test]
    fn defaults_fee_net_and_date() {
        let batch = collect(
            Platform::AppStore,
            day(),
            day(),
            vec![row(json!({
                "transaction_ref": "T1",
                "gross_amount": 9.99,
                "platform_fee": 3,
                "currency": "EUR"
            }))],
        );
        let record = &batch.records[0];
        assert_eq!(record.settlement_date, day());
        assert_eq!(record.platform_fee.minor_units(), 300);
        assert_eq!(record.net_amount.minor_units(), 699);
        assert_eq!(record.event_kind, EventKind::Purchase);
    }

    #[test]
    fn skips_rows_missing_ref_or_amount_and_continues() {
        let batch = collect(
            Platform::GooglePlay,
            day(),
            day(),
            vec![
                row(json!({"gross_amount": "1.00", "currency": "USD"})),
                row(json!({"transaction_ref": "T2", "currency": "USD"})),
                row(json!({"transaction_ref": "T3", "gross_amount": "abc", "currency": "USD"})),
                row(json!({"transaction_ref": "T4", "gross_amount": "4.00", "currency": "USD"})),
            ],
        );
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].transaction_ref, "T4");
        let skipped: Vec<usize> = batch.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_dates_outside_range() {
        let batch = collect(
            Platform::GooglePlay,
            day(),
            day(),
            vec![row(json!({
                "transaction_ref": "T1",
                "gross_amount": "1.00",
                "currency": "USD",
                "settlement_date": "2024-01-20"
            }))],
        );
        assert!(batch.records.is_empty());
        assert_eq!(batch.skipped.len(), 1);
    }

    #[test]
    fn chargeback_rows_are_refunds() {
        let batch = collect(
            Platform::GooglePlay,
            day(),
            day(),
            vec![row(json!({
                "transaction_ref": "T1",
                "gross_amount": "-9.99",
                "currency": "USD",
                "event_kind": "Chargeback"
            }))],
        );
        assert_eq!(batch.records[0].event_kind, EventKind::Refund);
        assert!(batch.records[0].is_refund());
        assert_eq!(batch.records[0].gross_amount.minor_units(), -999);
    }

    #[test]
    fn net_overflow_skips_the_row() {
        let batch = collect(
            Platform::GooglePlay,
            day(),
            day(),
            vec![
                row(json!({
                    "transaction_ref": "T1",
                    "gross_amount": "92233720368547758.07",
                    "platform_fee": "-1.00",
                    "currency": "USD"
                })),
                row(json!({"transaction_ref": "T2", "gross_amount": "4.00", "currency": "USD"})),
            ],
        );
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].transaction_ref, "T2");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].index, 0);
        assert!(batch.skipped[0].reason.contains("net_amount"));
    }
}
