//! Errors from decoding inbound platform notifications.
//!
//! Every variant means the payload is rejected. Callers still acknowledge
//! receipt so the platform does not redeliver a payload that can never parse.

use thiserror::Error;

/// Malformed or untrusted inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Field '{field}' is not valid base64: {reason}")]
    InvalidBase64 { field: String, reason: String },

    #[error("Field '{field}' is not valid JSON: {reason}")]
    InvalidJson { field: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field '{field}' is invalid: {reason}")]
    InvalidField { field: String, reason: String },

    /// Signature could not be verified. Never accepted.
    #[error("Signature rejected: {0}")]
    SignatureRejected(String),

    #[error("Notification for {actual} does not match configured {expected}")]
    ApplicationMismatch { expected: String, actual: String },
}

impl ParseError {
    pub fn missing(field: impl Into<String>) -> Self {
        ParseError::MissingField(field.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::InvalidEnvelope(_) => "invalid_envelope",
            ParseError::InvalidBase64 { .. } => "invalid_base64",
            ParseError::InvalidJson { .. } => "invalid_json",
            ParseError::MissingField(_) => "missing_field",
            ParseError::InvalidField { .. } => "invalid_field",
            ParseError::SignatureRejected(_) => "signature_rejected",
            ParseError::ApplicationMismatch { .. } => "application_mismatch",
        }
    }
}

impl From<crate::domain::foundation::ValidationError> for ParseError {
    fn from(err: crate::domain::foundation::ValidationError) -> Self {
        ParseError::invalid(err.field().to_string(), err.to_string())
    }
}
