//! Settlement export configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Where platform settlement exports are dropped.
///
/// Files are read from `<export_dir>/<platform>/<YYYY-MM-DD>.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettlementConfig {
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}
