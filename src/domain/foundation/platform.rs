//! Payment platform identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// A store platform that sends lifecycle notifications and settlement exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Google Play: Pub/Sub real-time developer notifications.
    GooglePlay,
    /// Apple App Store: server-to-server notifications, JWS-signed.
    AppStore,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::GooglePlay, Platform::AppStore];

    /// Stable lowercase tag used in keys, paths and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GooglePlay => "google_play",
            Platform::AppStore => "app_store",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google_play" | "google" | "android" => Ok(Platform::GooglePlay),
            "app_store" | "apple" | "ios" => Ok(Platform::AppStore),
            other => Err(ValidationError::invalid_format(
                "platform",
                format!("unknown platform '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_aliases() {
        assert_eq!("google_play".parse::<Platform>().unwrap(), Platform::GooglePlay);
        assert_eq!("Apple".parse::<Platform>().unwrap(), Platform::AppStore);
        assert!("windows".parse::<Platform>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&Platform::AppStore).unwrap(),
            "\"app_store\""
        );
    }

    #[test]
    fn display_matches_as_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.to_string(), platform.as_str());
        }
    }
}
