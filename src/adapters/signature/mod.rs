//! Signature verifiers for signed platform notifications.

mod deny_all;
mod jws_verifier;

use std::sync::Arc;

pub use deny_all::DenyAllVerifier;
pub use jws_verifier::JwsVerifier;

use crate::config::IngestionConfig;
use crate::domain::foundation::DomainError;
use crate::ports::SignatureVerifier;

/// Verifier for the configured App Store key, or one that rejects everything
/// when no key is set.
pub fn verifier_from_config(
    config: &IngestionConfig,
) -> Result<Arc<dyn SignatureVerifier>, DomainError> {
    match &config.apple_verification_key_pem {
        Some(pem) => Ok(Arc::new(JwsVerifier::from_ec_pem(pem.as_bytes())?)),
        None => Ok(Arc::new(DenyAllVerifier)),
    }
}
