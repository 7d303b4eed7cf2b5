//! Money value object.
//!
//! Amounts are held as integer minor units (cents) with an ISO-4217 currency
//! code. Floats never enter the ledger; decimal strings from platform payloads
//! and settlement exports are parsed exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Number of fractional digits in a minor unit.
pub const MINOR_UNIT_DIGITS: u32 = 2;

/// Three-letter uppercase ISO-4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validates and normalizes (uppercases) a currency code.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("expected three-letter ISO-4217 code, got '{}'", code),
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An amount of money in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    pub fn new(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Parses a decimal string such as `"9.99"` or `"-0.5"` into minor units.
    ///
    /// More than two fractional digits is rejected rather than rounded.
    pub fn parse_decimal(
        field: &str,
        value: &str,
        currency: Currency,
    ) -> Result<Self, ValidationError> {
        let minor_units = parse_minor_units(field, value)?;
        Ok(Self::new(minor_units, currency))
    }

    /// Converts Apple-style milliunits (1/1000 of the major unit) to minor units,
    /// rounding half away from zero.
    pub fn from_milliunits(milliunits: i64, currency: Currency) -> Self {
        let scale = 10_i64.pow(3 - MINOR_UNIT_DIGITS);
        let half = scale / 2;
        let minor = if milliunits >= 0 {
            (milliunits + half) / scale
        } else {
            (milliunits - half) / scale
        };
        Self::new(minor, currency)
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    /// Returns true when both amounts share a currency.
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Signed difference `self - other` in minor units, or `None` across
    /// currencies or when the difference does not fit.
    pub fn delta(&self, other: &Money) -> Option<i64> {
        if self.same_currency(other) {
            self.minor_units.checked_sub(other.minor_units)
        } else {
            None
        }
    }

    /// Adds another amount of the same currency.
    pub fn checked_add(&self, other: &Money) -> Option<Money> {
        if !self.same_currency(other) {
            return None;
        }
        self.minor_units
            .checked_add(other.minor_units)
            .map(|sum| Money::new(sum, self.currency.clone()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divisor = 10_i64.pow(MINOR_UNIT_DIGITS);
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            abs / divisor as u64,
            abs % divisor as u64,
            self.currency,
            width = MINOR_UNIT_DIGITS as usize
        )
    }
}

/// Narrows a wide running total to minor units, clamping at the `i64` bounds.
pub fn saturate_minor(total: i128) -> i64 {
    i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
}

/// Parses a decimal amount string into minor units.
pub fn parse_minor_units(field: &str, value: &str) -> Result<i64, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    let invalid =
        || ValidationError::invalid_format(field, format!("'{}' is not a decimal amount", value));

    if (whole.is_empty() && fraction.is_empty())
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > MINOR_UNIT_DIGITS as usize {
        return Err(ValidationError::invalid_format(
            field,
            format!("'{}' has more than {} decimal places", value, MINOR_UNIT_DIGITS),
        ));
    }

    let whole_units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let padded = format!("{:0<width$}", fraction, width = MINOR_UNIT_DIGITS as usize);
    let fraction_units: i64 = padded.parse().map_err(|_| invalid())?;

    let magnitude = whole_units
        .checked_mul(10_i64.pow(MINOR_UNIT_DIGITS))
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or_else(invalid)?;

    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    #[test]
    fn currency_is_normalized_to_uppercase() {
        assert_eq!(Currency::new("eur").unwrap().as_str(), "EUR");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::new("").is_err());
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("U5D").is_err());
    }

    #[test]
    fn parse_decimal_handles_common_shapes() {
        assert_eq!(parse_minor_units("amount", "9.99").unwrap(), 999);
        assert_eq!(parse_minor_units("amount", "9.9").unwrap(), 990);
        assert_eq!(parse_minor_units("amount", "10").unwrap(), 1000);
        assert_eq!(parse_minor_units("amount", ".5").unwrap(), 50);
        assert_eq!(parse_minor_units("amount", "-0.30").unwrap(), -30);
    }

    #[test]
    fn parse_decimal_rejects_excess_precision_and_junk() {
        assert!(parse_minor_units("amount", "9.999").is_err());
        assert!(parse_minor_units("amount", "abc").is_err());
        assert!(parse_minor_units("amount", ".").is_err());
        assert!(parse_minor_units("amount", "").is_err());
    }

    #[test]
    fn milliunits_round_half_away_from_zero() {
        assert_eq!(Money::from_milliunits(9990, usd()).minor_units(), 999);
        assert_eq!(Money::from_milliunits(9995, usd()).minor_units(), 1000);
        assert_eq!(Money::from_milliunits(-9995, usd()).minor_units(), -1000);
    }

    #[test]
    fn delta_is_none_across_currencies() {
        let a = Money::new(999, usd());
        let b = Money::new(998, Currency::new("EUR").unwrap());
        assert_eq!(a.delta(&b), None);
        assert_eq!(a.delta(&Money::new(998, usd())), Some(1));
    }

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Money::new(999, usd()).to_string(), "9.99 USD");
        assert_eq!(Money::new(-5, usd()).to_string(), "-0.05 USD");
    }

    #[test]
    fn money_serializes_currency_as_plain_string() {
        let json = serde_json::to_value(Money::new(999, usd())).unwrap();
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["minor_units"], 999);
    }
}
