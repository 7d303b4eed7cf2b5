//! Settlement source port - supplies raw settlement rows per platform.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::Platform;
use crate::domain::reconciliation::RawSettlementRow;

use super::PlatformError;

/// Outcome of a settlement fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementFetch {
    Rows(Vec<RawSettlementRow>),
    /// Platform has not published settlement data for the range yet.
    NoDataAvailable,
}

#[async_trait]
pub trait SettlementSource: Send + Sync {
    /// Fetches rows for settlement dates `from..=to`.
    async fn fetch_settlement(
        &self,
        platform: Platform,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SettlementFetch, PlatformError>;
}
