//! Percentage value object with a fixed number of decimal places.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A percentage rounded half-up to a fixed number of decimal places.
///
/// Stored as a scaled integer so equal shares compare equal regardless of
/// floating-point noise. `12.35%` at two decimals is `{ scaled: 1235, decimals: 2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Percentage {
    scaled: i64,
    decimals: u32,
}

impl Percentage {
    /// Zero percent at the given precision.
    pub fn zero(decimals: u32) -> Self {
        Self {
            scaled: 0,
            decimals,
        }
    }

    /// Computes `numerator / denominator * 100`, rounded half-up.
    ///
    /// A zero or negative denominator yields zero.
    pub fn from_ratio(numerator: i64, denominator: i64, decimals: u32) -> Self {
        if denominator <= 0 {
            return Self::zero(decimals);
        }
        let factor = 100_i128 * 10_i128.pow(decimals);
        let num = i128::from(numerator) * factor;
        let den = i128::from(denominator);
        // Half-up on the magnitude, sign re-applied afterwards.
        let magnitude = (num.abs() * 2 + den) / (den * 2);
        let scaled = if num < 0 { -magnitude } else { magnitude };
        Self {
            scaled: scaled as i64,
            decimals,
        }
    }

    /// Scaled integer representation.
    pub fn scaled(&self) -> i64 {
        self.scaled
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Value as a float, for presentation only.
    pub fn value(&self) -> f64 {
        self.scaled as f64 / 10_f64.powi(self.decimals as i32)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}%", self.decimals as usize, self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up() {
        // 1/8 = 12.5% -> 13% at zero decimals
        assert_eq!(Percentage::from_ratio(1, 8, 0).scaled(), 13);
        // 1/3 = 33.333..% -> 33.33%
        assert_eq!(Percentage::from_ratio(1, 3, 2).scaled(), 3333);
        // 2/3 = 66.666..% -> 66.67%
        assert_eq!(Percentage::from_ratio(2, 3, 2).scaled(), 6667);
        // 0.125% exactly at two decimals rounds to 0.13
        assert_eq!(Percentage::from_ratio(1, 800, 2).scaled(), 13);
    }

    #[test]
    fn zero_denominator_is_zero() {
        assert_eq!(Percentage::from_ratio(5, 0, 2), Percentage::zero(2));
    }

    #[test]
    fn full_share_is_one_hundred() {
        let pct = Percentage::from_ratio(999, 999, 2);
        assert_eq!(pct.scaled(), 10_000);
        assert_eq!(pct.to_string(), "100.00%");
    }

    #[test]
    fn value_matches_scaled() {
        let pct = Percentage::from_ratio(1, 3, 2);
        assert!((pct.value() - 33.33).abs() < 1e-9);
    }
}
