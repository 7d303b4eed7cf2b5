//! Compact JWS decoding with delegated signature verification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::SignatureVerifier;

use super::ParseError;

/// Protected header of a compact JWS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
    /// Certificate chain, leaf first, standard base64 DER.
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
}

/// Splits, verifies and decodes a compact JWS, returning its JSON payload.
///
/// Fails closed: any verifier rejection is a [`ParseError::SignatureRejected`].
pub fn decode_verified(
    token: &str,
    field: &str,
    verifier: &dyn SignatureVerifier,
) -> Result<Value, ParseError> {
    let mut parts = token.trim().split('.');
    let segments = (parts.next(), parts.next(), parts.next(), parts.next());
    let (header_b64, payload_b64, signature) = match segments {
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
            (h, p, s)
        }
        _ => {
            return Err(ParseError::InvalidEnvelope(format!(
                "{} is not a compact JWS",
                field
            )))
        }
    };

    let header_field = format!("{}.header", field);
    let header: JwsHeader = serde_json::from_slice(&decode_segment(header_b64, &header_field)?)
        .map_err(|e| ParseError::InvalidJson {
            field: header_field,
            reason: e.to_string(),
        })?;

    let signing_input = format!("{}.{}", header_b64, payload_b64);
    verifier
        .verify(&header, signing_input.as_bytes(), signature)
        .map_err(|rejection| ParseError::SignatureRejected(rejection.reason))?;

    let payload_field = format!("{}.payload", field);
    serde_json::from_slice(&decode_segment(payload_b64, &payload_field)?).map_err(|e| {
        ParseError::InvalidJson {
            field: payload_field,
            reason: e.to_string(),
        }
    })
}

fn decode_segment(segment: &str, field: &str) -> Result<Vec<u8>, ParseError> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| ParseError::InvalidBase64 {
            field: field.to_string(),
            reason: e.to_string(),
        })
}


#[cfg(test)]
mod tests {
    use super::test_support::{unsigned_token, FixedSignatureVerifier};
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_payload_after_verification() {
        let token = unsigned_token(&json!({"hello": "world"}), "valid");
        let payload = decode_verified(&token, "signedPayload", &FixedSignatureVerifier).unwrap();
        assert_eq!(payload["hello"], "world");
    }

    #[test]
    fn rejected_signature_fails_closed() {
        let token = unsigned_token(&json!({"hello": "world"}), "forged");
        assert!(matches!(
            decode_verified(&token, "signedPayload", &FixedSignatureVerifier),
            Err(ParseError::SignatureRejected(_))
        ));
    }

    #[test]
    fn wrong_segment_count_is_invalid_envelope() {
        assert!(matches!(
            decode_verified("a.b", "signedPayload", &FixedSignatureVerifier),
            Err(ParseError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            decode_verified("a.b.c.d", "signedPayload", &FixedSignatureVerifier),
            Err(ParseError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn bad_header_encoding_is_reported() {
        assert!(matches!(
            decode_verified("!!!.e30.valid", "signedPayload", &FixedSignatureVerifier),
            Err(ParseError::InvalidBase64 { .. })
        ));
    }
}
