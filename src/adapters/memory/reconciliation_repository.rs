//! In-memory append-only reconciliation result store.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, ErrorCode, Platform, ReconciliationRunId};
use crate::domain::reconciliation::ReconciliationResult;
use crate::ports::ReconciliationRepository;

#[derive(Debug, Default)]
pub struct InMemoryReconciliationRepository {
    runs: DashMap<ReconciliationRunId, (NaiveDate, Platform)>,
    history: DashMap<(NaiveDate, Platform), Vec<ReconciliationResult>>,
}

impl InMemoryReconciliationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReconciliationRepository for InMemoryReconciliationRepository {
    async fn save(&self, result: &ReconciliationResult) -> Result<(), DomainError> {
        let key = (result.date(), result.platform());
        match self.runs.entry(result.id()) {
            Entry::Occupied(_) => Err(DomainError::new(
                ErrorCode::AlreadyExists,
                format!("Reconciliation run {} already stored", result.id()),
            )),
            Entry::Vacant(slot) => {
                self.history.entry(key).or_default().push(result.clone());
                slot.insert(key);
                Ok(())
            }
        }
    }

    async fn find_by_id(
        &self,
        id: &ReconciliationRunId,
    ) -> Result<Option<ReconciliationResult>, DomainError> {
        let Some(key) = self.runs.get(id).map(|k| *k.value()) else {
            return Ok(None);
        };
        Ok(self
            .history
            .get(&key)
            .and_then(|runs| runs.iter().find(|r| r.id() == *id).cloned()))
    }

    async fn find_latest(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Option<ReconciliationResult>, DomainError> {
        Ok(self
            .history
            .get(&(date, platform))
            .and_then(|runs| runs.last().cloned()))
    }

    async fn find_history(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<Vec<ReconciliationResult>, DomainError> {
        Ok(self
            .history
            .get(&(date, platform))
            .map(|runs| runs.value().clone())
            .unwrap_or_default())
    }

    async fn find_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReconciliationResult>, DomainError> {
        let mut latest: Vec<_> = self
            .history
            .iter()
            .filter(|entry| {
                let (date, _) = *entry.key();
                date >= from && date <= to
            })
            .filter_map(|entry| entry.value().last().cloned())
            .collect();
        latest.sort_by_key(|r| (r.date(), r.platform()));
        Ok(latest)
    }
}
