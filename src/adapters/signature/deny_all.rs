//! Verifier used when no verification key is configured.

use crate::domain::notification::JwsHeader;
use crate::ports::{SignatureRejected, SignatureVerifier};

/// Rejects every signature, so unverifiable envelopes never reach the core.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllVerifier;

impl SignatureVerifier for DenyAllVerifier {
    fn verify(
        &self,
        _header: &JwsHeader,
        _signing_input: &[u8],
        _signature: &str,
    ) -> Result<(), SignatureRejected> {
        Err(SignatureRejected::new("no verification key configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_everything() {
        let header = JwsHeader {
            alg: "ES256".to_string(),
            kid: None,
            x5c: None,
        };
        assert!(DenyAllVerifier.verify(&header, b"a.b", "sig").is_err());
    }
}
