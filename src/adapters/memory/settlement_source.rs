//! Settlement source serving rows registered in memory.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::Platform;
use crate::domain::reconciliation::RawSettlementRow;
use crate::ports::{PlatformError, SettlementFetch, SettlementSource};

#[derive(Default)]
struct SourceState {
    rows: HashMap<(Platform, NaiveDate), Vec<RawSettlementRow>>,
    failures: HashMap<Platform, PlatformError>,
}

/// Days with no registered rows report `NoDataAvailable`. A registered empty
/// day reports an empty row set.
#[derive(Default)]
pub struct StaticSettlementSource {
    state: Mutex<SourceState>,
}

impl StaticSettlementSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_rows(&self, platform: Platform, date: NaiveDate, rows: Vec<RawSettlementRow>) {
        self.state().rows.insert((platform, date), rows);
    }

    /// Every fetch for `platform` fails until cleared.
    pub fn fail_platform(&self, platform: Platform, error: PlatformError) {
        self.state().failures.insert(platform, error);
    }

    pub fn clear_failure(&self, platform: Platform) {
        self.state().failures.remove(&platform);
    }
}

#[async_trait]
impl SettlementSource for StaticSettlementSource {
    async fn fetch_settlement(
        &self,
        platform: Platform,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SettlementFetch, PlatformError> {
        let state = self.state();
        if let Some(err) = state.failures.get(&platform) {
            return Err(err.clone());
        }

        let mut found = false;
        let mut rows = Vec::new();
        for date in from.iter_days().take_while(|d| *d <= to) {
            if let Some(day_rows) = state.rows.get(&(platform, date)) {
                found = true;
                rows.extend(day_rows.iter().cloned());
            }
        }

        if found {
            Ok(SettlementFetch::Rows(rows))
        } else {
            Ok(SettlementFetch::NoDataAvailable)
        }
    }
}
