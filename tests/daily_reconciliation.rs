//! Integration tests for the daily reconciliation run.
//!
//! Wires the run handler to in-memory repositories and a static settlement
//! source, then checks per-platform results and the cross-platform report.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use subscription_reconciler::adapters::memory::{
    InMemoryLifecycleEventRepository, InMemoryPaymentRepository, InMemoryReconciliationRepository,
    InMemoryRunLock, StaticSettlementSource,
};
use subscription_reconciler::application::{
    ReconciliationSettings, RunDailyReconciliationCommand, RunReconciliationCommand,
    RunReconciliationHandler,
};
use subscription_reconciler::config::ReconciliationConfig;
use subscription_reconciler::domain::foundation::{Currency, Money, Platform, Timestamp};
use subscription_reconciler::domain::lifecycle::{NewPayment, Payment};
use subscription_reconciler::domain::reconciliation::{
    DiscrepancyKind, MatchKind, PlatformStatus, RawSettlementRow, ResolutionMethod,
};
use subscription_reconciler::ports::{PaymentRepository, PlatformError, ReconciliationRepository};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    source: Arc<StaticSettlementSource>,
    payments: Arc<InMemoryPaymentRepository>,
    results: Arc<InMemoryReconciliationRepository>,
    handler: RunReconciliationHandler,
}

fn harness() -> Harness {
    let source = Arc::new(StaticSettlementSource::new());
    let payments = Arc::new(InMemoryPaymentRepository::new());
    let results = Arc::new(InMemoryReconciliationRepository::new());
    let settings = ReconciliationSettings::from_config(&ReconciliationConfig::default()).unwrap();

    let handler = RunReconciliationHandler::new(
        source.clone(),
        payments.clone(),
        Arc::new(InMemoryLifecycleEventRepository::new()),
        results.clone(),
        Arc::new(InMemoryRunLock::new()),
        settings,
    );
    Harness {
        source,
        payments,
        results,
        handler,
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn row(tx: Option<&str>, gross: &str) -> RawSettlementRow {
    RawSettlementRow {
        transaction_ref: tx.map(str::to_string),
        product_ref: Some("P1".to_string()),
        event_kind: Some("purchase".to_string()),
        settlement_date: Some("2024-03-15".to_string()),
        gross_amount: Some(json!(gross)),
        platform_fee: None,
        net_amount: None,
        currency: Some("USD".to_string()),
    }
}

async fn record_payment(h: &Harness, platform: Platform, tx: &str, minor: i64) {
    let payment = Payment::succeeded(NewPayment {
        subscription_id: None,
        platform,
        order_ref: None,
        transaction_ref: tx.to_string(),
        product_ref: Some("P1".to_string()),
        amount: Money::new(minor, Currency::new("USD").unwrap()),
        payment_at: Timestamp::start_of(day()),
    })
    .unwrap();
    h.payments.save(&payment).await.unwrap();
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn exact_and_pattern_matches_reconcile_cleanly() {
    let h = harness();
    record_payment(&h, Platform::GooglePlay, "T1", 999).await;
    record_payment(&h, Platform::GooglePlay, "T2-ALT", 998).await;
    h.source.set_rows(
        Platform::GooglePlay,
        day(),
        vec![row(Some("T1"), "9.99"), row(Some("T2"), "9.99")],
    );

    let result = h
        .handler
        .handle(RunReconciliationCommand {
            date: day(),
            platform: Platform::GooglePlay,
        })
        .await
        .unwrap();

    let exact = result
        .matched()
        .iter()
        .find(|m| m.settlement.transaction_ref == "T1")
        .unwrap();
    assert_eq!(exact.kind, MatchKind::Exact);
    assert!(exact.confidence.is_none());

    let pattern = result
        .matched()
        .iter()
        .find(|m| m.settlement.transaction_ref == "T2")
        .unwrap();
    assert_eq!(pattern.kind, MatchKind::Pattern);
    assert!(pattern.confidence.unwrap() >= 0.7);

    let resolved = &result.discrepancies().resolved;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].discrepancy.kind, DiscrepancyKind::AmountMismatch);
    assert_eq!(resolved[0].discrepancy.amount_delta, 1);
    assert_eq!(resolved[0].method, ResolutionMethod::RoundingDifference);
    assert!(result.discrepancies().unresolved.is_empty());
    assert_eq!(result.status(), PlatformStatus::Matched);
}

#[tokio::test]
async fn malformed_rows_are_skipped_and_counted() {
    let h = harness();
    record_payment(&h, Platform::GooglePlay, "T1", 999).await;
    h.source.set_rows(
        Platform::GooglePlay,
        day(),
        vec![row(Some("T1"), "9.99"), row(None, "4.99"), row(Some("T3"), "not-money")],
    );

    let result = h
        .handler
        .handle(RunReconciliationCommand {
            date: day(),
            platform: Platform::GooglePlay,
        })
        .await
        .unwrap();

    assert_eq!(result.counts().skipped_rows, 2);
    assert_eq!(result.counts().exact_matches, 1);
    assert_eq!(result.status(), PlatformStatus::Matched);
}

#[tokio::test]
async fn daily_report_combines_platforms() {
    let h = harness();
    record_payment(&h, Platform::GooglePlay, "T1", 999).await;
    record_payment(&h, Platform::GooglePlay, "T2", 999).await;
    record_payment(&h, Platform::AppStore, "A1", 999).await;
    h.source.set_rows(
        Platform::GooglePlay,
        day(),
        vec![row(Some("T1"), "9.99"), row(Some("T2"), "9.99")],
    );
    h.source.set_rows(Platform::AppStore, day(), vec![row(Some("A1"), "9.99")]);

    let daily = h
        .handler
        .handle_daily(RunDailyReconciliationCommand { date: day() })
        .await;

    assert!(daily.errors.is_empty());
    assert_eq!(daily.report.status, PlatformStatus::Matched);
    assert_eq!(daily.report.transactions, 3);
    assert_eq!(daily.report.gross_minor, 2997);

    let google = daily.report.platform(Platform::GooglePlay).unwrap();
    let apple = daily.report.platform(Platform::AppStore).unwrap();
    assert_eq!(google.revenue_share.to_string(), "66.67%");
    assert_eq!(apple.revenue_share.to_string(), "33.33%");
}

#[tokio::test]
async fn single_failure_dominates_the_day() {
    let h = harness();
    record_payment(&h, Platform::GooglePlay, "T1", 999).await;
    h.source.set_rows(Platform::GooglePlay, day(), vec![row(Some("T1"), "9.99")]);
    h.source.fail_platform(Platform::AppStore, PlatformError::Timeout("report download".into()));

    let daily = h
        .handler
        .handle_daily(RunDailyReconciliationCommand { date: day() })
        .await;

    let status_of = |platform| daily.report.platform(platform).unwrap().status;
    assert_eq!(status_of(Platform::GooglePlay), PlatformStatus::Matched);
    assert_eq!(status_of(Platform::AppStore), PlatformStatus::Failed);
    assert_eq!(daily.report.status, PlatformStatus::Failed);

    // The failed run is stored and can be superseded by a later re-run.
    h.source.clear_failure(Platform::AppStore);
    let rerun = h
        .handler
        .handle(RunReconciliationCommand {
            date: day(),
            platform: Platform::AppStore,
        })
        .await
        .unwrap();
    assert_eq!(rerun.status(), PlatformStatus::NoData);
    assert!(rerun.supersedes().is_some());
    assert_eq!(h.results.find_history(day(), Platform::AppStore).await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_platform_data_is_a_flagged_placeholder() {
    let h = harness();
    record_payment(&h, Platform::GooglePlay, "T1", 999).await;
    h.source.set_rows(Platform::GooglePlay, day(), vec![row(Some("T1"), "9.99")]);

    let daily = h
        .handler
        .handle_daily(RunDailyReconciliationCommand { date: day() })
        .await;

    let apple = daily.report.platform(Platform::AppStore).unwrap();
    assert!(apple.placeholder);
    assert_eq!(apple.status, PlatformStatus::NoData);
    assert_eq!(apple.gross_minor, 0);
    assert_eq!(apple.transactions, 0);
    assert_eq!(daily.report.gross_minor, 999);
    assert_eq!(daily.report.status, PlatformStatus::PartialMatch);
}

#[tokio::test]
async fn missing_internal_payment_is_unresolved() {
    let h = harness();
    h.source.set_rows(Platform::GooglePlay, day(), vec![row(Some("T9"), "19.99")]);

    let result = h
        .handler
        .handle(RunReconciliationCommand {
            date: day(),
            platform: Platform::GooglePlay,
        })
        .await
        .unwrap();

    assert_eq!(result.unmatched_settlements().len(), 1);
    let unresolved = &result.discrepancies().unresolved;
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].kind, DiscrepancyKind::MissingInternalEvent);
    assert_eq!(unresolved[0].amount_delta, 1999);
    assert_eq!(result.status(), PlatformStatus::MajorDiscrepancy);
}
