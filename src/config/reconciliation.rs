//! Reconciliation configuration

use serde::Deserialize;

use crate::domain::foundation::{Currency, Platform};
use crate::domain::reconciliation::{MatchPolicy, ResolutionPolicy, StatusThresholds};

use super::error::ValidationError;

const WEIGHT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Platforms included in the daily run
    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,

    /// Currency that revenue totals are reported in
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,

    /// Largest amount difference, in minor units, a pattern match may have
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance_minor: i64,

    /// Largest settlement/event day difference a pattern match may have
    #[serde(default = "default_max_date_skew_days")]
    pub max_date_skew_days: i64,

    /// Pattern matches below this confidence are discarded
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Pattern matches below this confidence are never auto-resolved
    #[serde(default = "default_safe_confidence")]
    pub safe_confidence: f64,

    #[serde(default = "default_amount_weight")]
    pub amount_weight: f64,

    #[serde(default = "default_date_weight")]
    pub date_weight: f64,

    /// Absolute rounding tolerance in minor units
    #[serde(default = "default_rounding_tolerance_minor")]
    pub rounding_tolerance_minor: i64,

    /// Relative rounding tolerance in basis points of the gross amount
    #[serde(default = "default_rounding_tolerance_bps")]
    pub rounding_tolerance_bps: i64,

    #[serde(default = "default_major_discrepancy_ratio")]
    pub major_discrepancy_ratio: f64,

    #[serde(default = "default_major_discrepancy_amount")]
    pub major_discrepancy_amount_minor: i64,

    /// Decimal places of revenue share percentages
    #[serde(default = "default_share_decimal_places")]
    pub share_decimal_places: u32,
}

impl ReconciliationConfig {
    pub fn currency(&self) -> Result<Currency, ValidationError> {
        Currency::new(&self.reporting_currency)
            .map_err(|_| ValidationError::InvalidCurrency(self.reporting_currency.clone()))
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            amount_tolerance_minor: self.amount_tolerance_minor,
            max_date_skew_days: self.max_date_skew_days,
            min_confidence: self.min_confidence,
            amount_weight: self.amount_weight,
            date_weight: self.date_weight,
        }
    }

    pub fn resolution_policy(&self) -> ResolutionPolicy {
        ResolutionPolicy {
            rounding_tolerance_minor: self.rounding_tolerance_minor,
            rounding_tolerance_bps: self.rounding_tolerance_bps,
            safe_confidence: self.safe_confidence,
        }
    }

    pub fn status_thresholds(&self) -> StatusThresholds {
        StatusThresholds {
            major_discrepancy_ratio: self.major_discrepancy_ratio,
            major_discrepancy_amount_minor: self.major_discrepancy_amount_minor,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.platforms.is_empty() {
            return Err(ValidationError::NoPlatforms);
        }
        self.currency()?;

        for (name, value) in [
            ("min_confidence", self.min_confidence),
            ("safe_confidence", self.safe_confidence),
            ("amount_weight", self.amount_weight),
            ("date_weight", self.date_weight),
            ("major_discrepancy_ratio", self.major_discrepancy_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::ThresholdOutOfRange(name));
            }
        }
        if (self.amount_weight + self.date_weight - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ValidationError::WeightsDoNotSumToOne);
        }
        if self.min_confidence > self.safe_confidence {
            return Err(ValidationError::ConfidenceBandsInverted);
        }

        for (name, value) in [
            ("amount_tolerance_minor", self.amount_tolerance_minor),
            ("max_date_skew_days", self.max_date_skew_days),
            ("rounding_tolerance_minor", self.rounding_tolerance_minor),
            ("rounding_tolerance_bps", self.rounding_tolerance_bps),
            ("major_discrepancy_amount_minor", self.major_discrepancy_amount_minor),
        ] {
            if value < 0 {
                return Err(ValidationError::NegativeValue(name));
            }
        }
        Ok(())
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            platforms: default_platforms(),
            reporting_currency: default_reporting_currency(),
            amount_tolerance_minor: default_amount_tolerance(),
            max_date_skew_days: default_max_date_skew_days(),
            min_confidence: default_min_confidence(),
            safe_confidence: default_safe_confidence(),
            amount_weight: default_amount_weight(),
            date_weight: default_date_weight(),
            rounding_tolerance_minor: default_rounding_tolerance_minor(),
            rounding_tolerance_bps: default_rounding_tolerance_bps(),
            major_discrepancy_ratio: default_major_discrepancy_ratio(),
            major_discrepancy_amount_minor: default_major_discrepancy_amount(),
            share_decimal_places: default_share_decimal_places(),
        }
    }
}

fn default_platforms() -> Vec<Platform> {
    Platform::ALL.to_vec()
}

fn default_reporting_currency() -> String {
    "USD".to_string()
}

fn default_amount_tolerance() -> i64 {
    10
}

fn default_max_date_skew_days() -> i64 {
    1
}

fn default_min_confidence() -> f64 {
    0.7
}

fn default_safe_confidence() -> f64 {
    0.95
}

fn default_amount_weight() -> f64 {
    0.6
}

fn default_date_weight() -> f64 {
    0.4
}

fn default_rounding_tolerance_minor() -> i64 {
    5
}

fn default_rounding_tolerance_bps() -> i64 {
    50
}

fn default_major_discrepancy_ratio() -> f64 {
    0.1
}

fn default_major_discrepancy_amount() -> i64 {
    10_000
}

fn default_share_decimal_places() -> u32 {
    2
}
