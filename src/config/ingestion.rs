//! Notification ingestion configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::notification::NormalizerSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// How long admitted natural keys are remembered
    #[serde(default = "default_retention_days")]
    pub idempotency_retention_days: u32,

    /// Attempts on optimistic-concurrency conflicts before giving up
    #[serde(default = "default_max_transition_retries")]
    pub max_transition_retries: u32,

    /// PEM-encoded EC public key for App Store signed payloads
    #[serde(default)]
    pub apple_verification_key_pem: Option<String>,

    /// Expected App Store bundle id; unchecked when absent
    #[serde(default)]
    pub apple_bundle_id: Option<String>,

    /// Expected Google Play package name; unchecked when absent
    #[serde(default)]
    pub google_package_name: Option<String>,
}

impl IngestionConfig {
    pub fn normalizer_settings(&self) -> NormalizerSettings {
        NormalizerSettings {
            google_package_name: self.google_package_name.clone(),
            apple_bundle_id: self.apple_bundle_id.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(pem) = &self.apple_verification_key_pem {
            if !pem.contains("BEGIN PUBLIC KEY") && !pem.contains("BEGIN CERTIFICATE") {
                return Err(ValidationError::InvalidVerificationKey(
                    "expected a PEM public key or certificate".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            idempotency_retention_days: default_retention_days(),
            max_transition_retries: default_max_transition_retries(),
            apple_verification_key_pem: None,
            apple_bundle_id: None,
            google_package_name: None,
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

fn default_max_transition_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_defaults() {
        let config = IngestionConfig::default();
        assert_eq!(config.idempotency_retention_days, 30);
        assert_eq!(config.max_transition_retries, 3);
        assert!(config.apple_verification_key_pem.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_identity_checks_carry_into_normalizer() {
        let config = IngestionConfig {
            google_package_name: Some("com.example.app".to_string()),
            ..Default::default()
        };
        let settings = config.normalizer_settings();
        assert_eq!(settings.google_package_name.as_deref(), Some("com.example.app"));
        assert!(settings.apple_bundle_id.is_none());
    }

    #[test]
    fn test_garbage_key_rejected() {
        let config = IngestionConfig {
            apple_verification_key_pem: Some("not a key".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidVerificationKey(_))
        ));
    }
}
