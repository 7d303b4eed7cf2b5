//! Refund workflow configuration

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct RefundConfig {
    /// Requests at or below this amount (minor units) skip manual approval
    #[serde(default = "default_auto_approve_max")]
    pub auto_approve_max_minor: i64,
}

impl RefundConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.auto_approve_max_minor < 0 {
            return Err(ValidationError::NegativeValue("auto_approve_max_minor"));
        }
        Ok(())
    }
}

impl Default for RefundConfig {
    fn default() -> Self {
        Self {
            auto_approve_max_minor: default_auto_approve_max(),
        }
    }
}

fn default_auto_approve_max() -> i64 {
    5_000
}
