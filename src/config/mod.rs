//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `SUBSCRIPTION_RECON`
//! prefix and `__` between nested keys. Every section has defaults, so an
//! empty environment yields a working in-memory configuration.
//!
//! # Example
//!
//! ```no_run
//! use subscription_reconciler::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod ingestion;
mod logging;
mod reconciliation;
mod redis;
mod refunds;
mod settlement;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ingestion::IngestionConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use reconciliation::ReconciliationConfig;
pub use redis::RedisConfig;
pub use refunds::RefundConfig;
pub use settlement::SettlementConfig;

use serde::Deserialize;

const ENV_PREFIX: &str = "SUBSCRIPTION_RECON";

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub refunds: RefundConfig,

    #[serde(default)]
    pub settlement: SettlementConfig,

    /// PostgreSQL; in-memory stores are used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Redis; in-memory key store and run lock are used when absent
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SUBSCRIPTION_RECON` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Parses `RECONCILIATION__PLATFORMS` as a comma-separated list
    ///
    /// # Environment Variable Format
    ///
    /// - `SUBSCRIPTION_RECON__LOGGING__LEVEL=debug` -> `logging.level = "debug"`
    /// - `SUBSCRIPTION_RECON__RECONCILIATION__PLATFORMS=google_play,app_store`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("reconciliation.platforms"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.logging.validate()?;
        self.ingestion.validate()?;
        self.reconciliation.validate()?;
        self.refunds.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        Ok(())
    }
}
