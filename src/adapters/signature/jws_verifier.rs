//! JWS signature verification with a configured key.
//!
//! The key decides which algorithms are acceptable. A header naming any other
//! algorithm, including `none`, is rejected before the signature is checked.

use std::str::FromStr;

use jsonwebtoken::{crypto, Algorithm, DecodingKey};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::notification::JwsHeader;
use crate::ports::{SignatureRejected, SignatureVerifier};

pub struct JwsVerifier {
    key: DecodingKey,
    allowed: Vec<Algorithm>,
}

impl JwsVerifier {
    /// Verifier for ECDSA signatures (App Store uses ES256).
    pub fn from_ec_pem(pem: &[u8]) -> Result<Self, DomainError> {
        let key = DecodingKey::from_ec_pem(pem).map_err(|e| {
            DomainError::new(ErrorCode::ValidationFailed, format!("Invalid EC public key: {}", e))
        })?;
        Ok(Self {
            key,
            allowed: vec![Algorithm::ES256, Algorithm::ES384],
        })
    }

    /// Verifier for HMAC signatures, for local environments and tests.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            allowed: vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
        }
    }
}

impl SignatureVerifier for JwsVerifier {
    fn verify(
        &self,
        header: &JwsHeader,
        signing_input: &[u8],
        signature: &str,
    ) -> Result<(), SignatureRejected> {
        let algorithm = Algorithm::from_str(&header.alg).map_err(|_| {
            SignatureRejected::new(format!("unsupported algorithm '{}'", header.alg))
        })?;
        if !self.allowed.contains(&algorithm) {
            return Err(SignatureRejected::new(format!(
                "algorithm '{}' not accepted for this key",
                header.alg
            )));
        }

        match crypto::verify(signature, signing_input, &self.key, algorithm) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SignatureRejected::new("signature mismatch")),
            Err(e) => Err(SignatureRejected::new(format!("signature check failed: {}", e))),
        }
    }
}

impl std::fmt::Debug for JwsVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwsVerifier")
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}
