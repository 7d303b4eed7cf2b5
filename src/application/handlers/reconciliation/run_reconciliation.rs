//! RunReconciliationHandler - Daily settlement reconciliation per platform.
//!
//! One run per `(date, platform)`: collect settlement rows, load internal
//! payments and events for the same UTC day, match, analyze discrepancies and
//! append the result. A re-run appends a new result that supersedes the
//! previous one.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ReconciliationConfig, ValidationError as ConfigValidationError};
use crate::domain::foundation::{Currency, DomainError, Platform, ReconciliationRunId, Timestamp};
use crate::domain::reconciliation::{
    aggregate, analyze, collect, internal_records, match_records, DailyReport, MatchPolicy,
    ReconciliationResult, ResolutionPolicy, StatusThresholds,
};
use crate::ports::{
    LifecycleEventRepository, PaymentRepository, ReconciliationRepository, ReconciliationRunLock,
    SettlementFetch, SettlementSource,
};

/// Policies and platform list for reconciliation runs.
#[derive(Debug, Clone)]
pub struct ReconciliationSettings {
    pub platforms: Vec<Platform>,
    pub reporting_currency: Currency,
    pub match_policy: MatchPolicy,
    pub resolution_policy: ResolutionPolicy,
    pub thresholds: StatusThresholds,
    pub share_decimal_places: u32,
}

impl ReconciliationSettings {
    pub fn from_config(config: &ReconciliationConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        Ok(Self {
            platforms: config.platforms.clone(),
            reporting_currency: config.currency()?,
            match_policy: config.match_policy(),
            resolution_policy: config.resolution_policy(),
            thresholds: config.status_thresholds(),
            share_decimal_places: config.share_decimal_places,
        })
    }
}

/// Command to reconcile one platform for one day.
#[derive(Debug, Clone, Copy)]
pub struct RunReconciliationCommand {
    pub date: NaiveDate,
    pub platform: Platform,
}

/// Command to reconcile every configured platform for one day.
#[derive(Debug, Clone, Copy)]
pub struct RunDailyReconciliationCommand {
    pub date: NaiveDate,
}

/// Result of a daily run.
#[derive(Debug, Clone)]
pub struct DailyReconciliationResult {
    pub report: DailyReport,
    /// Stored results, one per platform that ran.
    pub results: Vec<ReconciliationResult>,
    /// Platforms whose run could not complete.
    pub errors: Vec<(Platform, ReconciliationRunError)>,
}

/// Errors that prevent a run from producing a stored result.
///
/// Collaborator failures inside a run are not errors here; they produce a
/// stored result with status `Failed`.
#[derive(Debug, Clone, Error)]
pub enum ReconciliationRunError {
    #[error("Reconciliation for {platform} on {date} is already running")]
    RunInProgress { date: NaiveDate, platform: Platform },

    #[error("Storage error: {0}")]
    Storage(#[from] DomainError),
}

impl ReconciliationRunError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconciliationRunError::RunInProgress { .. } => true,
            ReconciliationRunError::Storage(err) => err.is_retryable(),
        }
    }
}

/// Handler for reconciliation runs.
pub struct RunReconciliationHandler {
    source: Arc<dyn SettlementSource>,
    payments: Arc<dyn PaymentRepository>,
    events: Arc<dyn LifecycleEventRepository>,
    results: Arc<dyn ReconciliationRepository>,
    lock: Arc<dyn ReconciliationRunLock>,
    settings: ReconciliationSettings,
}

impl RunReconciliationHandler {
    pub fn new(
        source: Arc<dyn SettlementSource>,
        payments: Arc<dyn PaymentRepository>,
        events: Arc<dyn LifecycleEventRepository>,
        results: Arc<dyn ReconciliationRepository>,
        lock: Arc<dyn ReconciliationRunLock>,
        settings: ReconciliationSettings,
    ) -> Self {
        Self {
            source,
            payments,
            events,
            results,
            lock,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: RunReconciliationCommand,
    ) -> Result<ReconciliationResult, ReconciliationRunError> {
        let RunReconciliationCommand { date, platform } = cmd;

        let lease = self
            .lock
            .try_acquire(date, platform)
            .await?
            .ok_or(ReconciliationRunError::RunInProgress { date, platform })?;

        let outcome = self.run_locked(date, platform).await;

        if let Err(err) = self.lock.release(&lease).await {
            warn!(%platform, %date, error = %err, "Failed to release reconciliation lock");
        }
        outcome
    }

    /// Runs every configured platform concurrently and aggregates the results.
    ///
    /// A platform whose run errors out is reported as `Failed` in the
    /// aggregate without a stored result.
    pub async fn handle_daily(
        &self,
        cmd: RunDailyReconciliationCommand,
    ) -> DailyReconciliationResult {
        let runs = self.settings.platforms.iter().map(|&platform| async move {
            (
                platform,
                self.handle(RunReconciliationCommand {
                    date: cmd.date,
                    platform,
                })
                .await,
            )
        });

        let mut results = Vec::new();
        let mut errors = Vec::new();
        let mut for_report = Vec::new();
        for (platform, outcome) in join_all(runs).await {
            match outcome {
                Ok(result) => {
                    for_report.push(result.clone());
                    results.push(result);
                }
                Err(err) => {
                    warn!(
                        %platform,
                        date = %cmd.date,
                        error = %err,
                        "Reconciliation run did not complete"
                    );
                    for_report.push(ReconciliationResult::failed(
                        cmd.date,
                        platform,
                        self.settings.reporting_currency.clone(),
                        err.to_string(),
                        None,
                        Timestamp::now(),
                    ));
                    errors.push((platform, err));
                }
            }
        }

        let report = aggregate(
            cmd.date,
            &for_report,
            self.settings.reporting_currency.clone(),
            self.settings.share_decimal_places,
        );
        info!(
            date = %cmd.date,
            status = report.status.as_str(),
            transactions = report.transactions,
            gross_minor = report.gross_minor,
            unresolved = report.unresolved_discrepancies,
            "Daily reconciliation report"
        );

        DailyReconciliationResult {
            report,
            results,
            errors,
        }
    }

    async fn run_locked(
        &self,
        date: NaiveDate,
        platform: Platform,
    ) -> Result<ReconciliationResult, ReconciliationRunError> {
        let supersedes = self.results.find_latest(date, platform).await?.map(|r| r.id());
        let result = self.reconcile(date, platform, supersedes).await;
        self.results.save(&result).await?;

        let counts = result.counts();
        info!(
            %platform,
            %date,
            run_id = %result.id(),
            status = result.status().as_str(),
            placeholder = result.is_placeholder(),
            settlement_records = counts.settlement_records,
            internal_records = counts.internal_records,
            skipped_rows = counts.skipped_rows,
            exact_matches = counts.exact_matches,
            pattern_matches = counts.pattern_matches,
            resolved = counts.resolved,
            unresolved = counts.unresolved,
            "Reconciliation run finished"
        );
        Ok(result)
    }

    async fn reconcile(
        &self,
        date: NaiveDate,
        platform: Platform,
        supersedes: Option<ReconciliationRunId>,
    ) -> ReconciliationResult {
        let currency = self.settings.reporting_currency.clone();
        let now = Timestamp::now();

        let rows = match self.source.fetch_settlement(platform, date, date).await {
            Ok(SettlementFetch::Rows(rows)) => rows,
            Ok(SettlementFetch::NoDataAvailable) => {
                info!(%platform, %date, "No settlement data published");
                return ReconciliationResult::no_data(date, platform, currency, supersedes, now);
            }
            Err(err) => {
                warn!(
                    %platform,
                    %date,
                    error = %err,
                    retryable = err.is_retryable(),
                    "Settlement fetch failed"
                );
                return ReconciliationResult::failed(
                    date,
                    platform,
                    currency,
                    err.to_string(),
                    supersedes,
                    now,
                );
            }
        };

        let batch = collect(platform, date, date, rows);

        // Neighbouring days within the allowed skew are match candidates too.
        let skew = Days::new(self.settings.match_policy.max_date_skew_days.max(0).unsigned_abs());
        let from = Timestamp::start_of(date.checked_sub_days(skew).unwrap_or(NaiveDate::MIN));
        let to = date
            .checked_add_days(skew)
            .and_then(|last| last.succ_opt())
            .map(Timestamp::start_of)
            .unwrap_or_else(|| Timestamp::start_of(NaiveDate::MAX));
        let loaded = async {
            let payments = self.payments.find_by_date_range(platform, from, to).await?;
            let events = self.events.find_by_date_range(platform, from, to).await?;
            Ok::<_, DomainError>(internal_records(&payments, &events))
        };
        let internal = match loaded.await {
            Ok(internal) => internal,
            Err(err) => {
                warn!(%platform, %date, error = %err, "Loading internal records failed");
                return ReconciliationResult::failed(
                    date,
                    platform,
                    currency,
                    err.to_string(),
                    supersedes,
                    now,
                );
            }
        };

        let mut outcome =
            match_records(batch.records.clone(), internal, &self.settings.match_policy);
        outcome.retain_unmatched_events_on(date);
        let discrepancies = analyze(&outcome, &self.settings.resolution_policy, now);

        ReconciliationResult::completed(
            date,
            platform,
            currency,
            batch,
            outcome,
            discrepancies,
            &self.settings.thresholds,
            supersedes,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryLifecycleEventRepository, InMemoryPaymentRepository,
        InMemoryReconciliationRepository, InMemoryRunLock, StaticSettlementSource,
    };
    use crate::domain::lifecycle::payment::test_support::new_payment;
    use crate::domain::lifecycle::Payment;
    use crate::domain::reconciliation::{DiscrepancyKind, PlatformStatus, RawSettlementRow};
    use crate::ports::PlatformError;
    use serde_json::json;

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        source: Arc<StaticSettlementSource>,
        payments: Arc<InMemoryPaymentRepository>,
        results: Arc<InMemoryReconciliationRepository>,
        lock: Arc<InMemoryRunLock>,
        handler: RunReconciliationHandler,
    }

    fn fixture() -> Fixture {
        let source = Arc::new(StaticSettlementSource::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let events = Arc::new(InMemoryLifecycleEventRepository::new());
        let results = Arc::new(InMemoryReconciliationRepository::new());
        let lock = Arc::new(InMemoryRunLock::new());
        let settings =
            ReconciliationSettings::from_config(&ReconciliationConfig::default()).unwrap();

        let handler = RunReconciliationHandler::new(
            source.clone(),
            payments.clone(),
            events,
            results.clone(),
            lock.clone(),
            settings,
        );
        Fixture {
            source,
            payments,
            results,
            lock,
            handler,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn row(tx: &str, gross: &str) -> RawSettlementRow {
        RawSettlementRow {
            transaction_ref: Some(tx.to_string()),
            product_ref: Some("P1".to_string()),
            event_kind: Some("purchase".to_string()),
            settlement_date: Some("2024-01-01".to_string()),
            gross_amount: Some(json!(gross)),
            platform_fee: Some(json!("0.00")),
            net_amount: Some(json!(gross)),
            currency: Some("USD".to_string()),
        }
    }

    async fn seed_payment(f: &Fixture, tx: &str, minor: i64) {
        seed_payment_at(f, tx, minor, Timestamp::start_of(day())).await;
    }

    async fn seed_payment_at(f: &Fixture, tx: &str, minor: i64, at: Timestamp) {
        let mut new = new_payment(tx, minor);
        new.payment_at = at;
        let payment = Payment::succeeded(new).unwrap();
        f.payments.save(&payment).await.unwrap();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Single-platform runs
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn exact_match_run_is_matched() {
        let f = fixture();
        seed_payment(&f, "T1", 999).await;
        f.source.set_rows(Platform::GooglePlay, day(), vec![row("T1", "9.99")]);

        let result = f
            .handler
            .handle(RunReconciliationCommand { date: day(), platform: Platform::GooglePlay })
            .await
            .unwrap();

        assert_eq!(result.status(), PlatformStatus::Matched);
        assert_eq!(result.counts().exact_matches, 1);
        assert!(result.discrepancies().unresolved.is_empty());
        assert!(!f.lock.is_held(day(), Platform::GooglePlay));
    }

    #[tokio::test]
    async fn payment_just_before_midnight_matches_next_day_settlement() {
        let f = fixture();
        seed_payment_at(&f, "T9-ALT", 999, Timestamp::start_of(day()).plus_secs(-60)).await;
        f.source.set_rows(Platform::GooglePlay, day(), vec![row("T9", "9.99")]);

        let result = f
            .handler
            .handle(RunReconciliationCommand { date: day(), platform: Platform::GooglePlay })
            .await
            .unwrap();

        assert_eq!(result.counts().pattern_matches, 1);
        assert!(result.unmatched_settlements().is_empty());
        assert_eq!(result.matched()[0].internal.transaction_ref.as_deref(), Some("T9-ALT"));
        assert!(!result
            .discrepancies()
            .unresolved
            .iter()
            .any(|d| d.kind == DiscrepancyKind::MissingInternalEvent));
    }

    #[tokio::test]
    async fn unmatched_payment_from_neighbouring_day_is_left_to_its_own_run() {
        let f = fixture();
        seed_payment(&f, "T1", 999).await;
        seed_payment_at(&f, "T7", 4_999, Timestamp::start_of(day()).plus_secs(-3_600)).await;
        f.source.set_rows(Platform::GooglePlay, day(), vec![row("T1", "9.99")]);

        let result = f
            .handler
            .handle(RunReconciliationCommand { date: day(), platform: Platform::GooglePlay })
            .await
            .unwrap();

        assert!(result.unmatched_events().is_empty());
        assert_eq!(result.counts().internal_records, 1);
        assert_eq!(result.status(), PlatformStatus::Matched);
    }

    #[tokio::test]
    async fn missing_data_yields_placeholder() {
        let f = fixture();

        let result = f
            .handler
            .handle(RunReconciliationCommand { date: day(), platform: Platform::AppStore })
            .await
            .unwrap();

        assert_eq!(result.status(), PlatformStatus::NoData);
        assert!(result.is_placeholder());
        assert_eq!(result.summary().gross_minor, 0);
    }

    #[tokio::test]
    async fn source_failure_is_stored_as_failed() {
        let f = fixture();
        f.source
            .fail_platform(
                Platform::GooglePlay,
                PlatformError::Service("export unavailable".into()),
            );

        let result = f
            .handler
            .handle(RunReconciliationCommand { date: day(), platform: Platform::GooglePlay })
            .await
            .unwrap();

        assert_eq!(result.status(), PlatformStatus::Failed);
        assert!(result.failure().unwrap().contains("export unavailable"));
        assert!(f.results.find_latest(day(), Platform::GooglePlay).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rerun_supersedes_previous_result() {
        let f = fixture();
        f.source.set_rows(Platform::GooglePlay, day(), vec![row("T1", "9.99")]);
        let cmd = RunReconciliationCommand { date: day(), platform: Platform::GooglePlay };

        let first = f.handler.handle(cmd).await.unwrap();
        seed_payment(&f, "T1", 999).await;
        let second = f.handler.handle(cmd).await.unwrap();

        assert_eq!(first.status(), PlatformStatus::MajorDiscrepancy);
        assert_eq!(second.status(), PlatformStatus::Matched);
        assert_eq!(second.supersedes(), Some(first.id()));

        let history = f.results.find_history(day(), Platform::GooglePlay).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(
            f.results.find_latest(day(), Platform::GooglePlay).await.unwrap().map(|r| r.id()),
            Some(second.id())
        );
    }

    #[tokio::test]
    async fn concurrent_run_for_same_key_is_rejected() {
        let f = fixture();
        let lease = f.lock.try_acquire(day(), Platform::GooglePlay).await.unwrap().unwrap();

        let err = f
            .handler
            .handle(RunReconciliationCommand { date: day(), platform: Platform::GooglePlay })
            .await
            .unwrap_err();
        assert!(matches!(err, ReconciliationRunError::RunInProgress { .. }));
        assert!(err.is_retryable());

        // A different platform is unaffected.
        f.handler
            .handle(RunReconciliationCommand { date: day(), platform: Platform::AppStore })
            .await
            .unwrap();

        f.lock.release(&lease).await.unwrap();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Daily fan-out
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn daily_run_aggregates_every_platform() {
        let f = fixture();
        seed_payment(&f, "T1", 999).await;
        f.source.set_rows(Platform::GooglePlay, day(), vec![row("T1", "9.99")]);

        let daily = f.handler.handle_daily(RunDailyReconciliationCommand { date: day() }).await;

        assert!(daily.errors.is_empty());
        assert_eq!(daily.results.len(), 2);
        assert_eq!(daily.report.platforms.len(), 2);
        assert_eq!(daily.report.gross_minor, 999);
        assert_eq!(daily.report.placeholders().collect::<Vec<_>>(), vec![Platform::AppStore]);
        // NoData never counts as matched.
        assert_eq!(daily.report.status, PlatformStatus::PartialMatch);
    }

    #[tokio::test]
    async fn daily_run_reports_locked_platform_as_failed() {
        let f = fixture();
        let _lease = f.lock.try_acquire(day(), Platform::AppStore).await.unwrap().unwrap();

        let daily = f.handler.handle_daily(RunDailyReconciliationCommand { date: day() }).await;

        assert_eq!(daily.errors.len(), 1);
        assert_eq!(daily.errors[0].0, Platform::AppStore);
        assert_eq!(daily.report.status, PlatformStatus::Failed);
    }
}
