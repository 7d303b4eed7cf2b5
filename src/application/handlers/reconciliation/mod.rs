//! Reconciliation handlers.
//!
//! Runs settlement reconciliation for a single `(date, platform)` or fans out
//! across every configured platform and aggregates the day.

mod run_reconciliation;

pub use run_reconciliation::{
    DailyReconciliationResult, ReconciliationRunError, ReconciliationSettings,
    RunDailyReconciliationCommand, RunReconciliationCommand, RunReconciliationHandler,
};
