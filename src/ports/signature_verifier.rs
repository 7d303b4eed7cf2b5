//! Signature verifier port for signed notification envelopes.
//!
//! Contract is fail-closed: anything the verifier cannot positively verify
//! must be rejected.

use thiserror::Error;

use crate::domain::notification::JwsHeader;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signature rejected: {reason}")]
pub struct SignatureRejected {
    pub reason: String,
}

impl SignatureRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub trait SignatureVerifier: Send + Sync {
    /// Verifies `signature` (base64url) over `signing_input` (`header.payload`).
    fn verify(
        &self,
        header: &JwsHeader,
        signing_input: &[u8],
        signature: &str,
    ) -> Result<(), SignatureRejected>;
}
