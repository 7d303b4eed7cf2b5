//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("{0} must be between 0 and 1")]
    ThresholdOutOfRange(&'static str),

    #[error("Confidence weights must sum to 1")]
    WeightsDoNotSumToOne,

    #[error("min_confidence must not exceed safe_confidence")]
    ConfidenceBandsInverted,

    #[error("{0} must not be negative")]
    NegativeValue(&'static str),

    #[error("At least one platform must be reconciled")]
    NoPlatforms,

    #[error("Invalid Apple verification key: {0}")]
    InvalidVerificationKey(String),
}
