//! File-drop settlement source.
//!
//! Platform exports are expected at `<root>/<platform>/<YYYY-MM-DD>.json`,
//! each holding a JSON array of settlement rows. A day without a file has not
//! been published yet.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::config::SettlementConfig;
use crate::domain::foundation::Platform;
use crate::domain::reconciliation::RawSettlementRow;
use crate::ports::{PlatformError, SettlementFetch, SettlementSource};

#[derive(Debug, Clone)]
pub struct FileSettlementSource {
    root: PathBuf,
}

impl FileSettlementSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source rooted at the configured export directory, if one is set.
    pub fn from_config(config: &SettlementConfig) -> Option<Self> {
        config.export_dir.as_ref().map(Self::new)
    }

    /// Location of the export for one platform and day.
    pub fn path_for(&self, platform: Platform, date: NaiveDate) -> PathBuf {
        self.root
            .join(platform.as_str())
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    async fn read_day(path: &Path) -> Result<Option<Vec<RawSettlementRow>>, PlatformError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PlatformError::Service(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PlatformError::InvalidResponse(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl SettlementSource for FileSettlementSource {
    async fn fetch_settlement(
        &self,
        platform: Platform,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SettlementFetch, PlatformError> {
        let mut found = false;
        let mut rows = Vec::new();

        for date in from.iter_days().take_while(|d| *d <= to) {
            let path = self.path_for(platform, date);
            if let Some(day_rows) = Self::read_day(&path).await? {
                debug!(%platform, %date, rows = day_rows.len(), "Read settlement export");
                found = true;
                rows.extend(day_rows);
            }
        }

        if found {
            Ok(SettlementFetch::Rows(rows))
        } else {
            Ok(SettlementFetch::NoDataAvailable)
        }
    }
}
