//! Monthly scheduling of the billing reconciler.
//!
//! A background task wakes up periodically and runs the reconciler once per
//! calendar month. The last month it reconciled is stored in the
//! `system_state` table so restarts don't trigger another run in the same
//! month. The marker is only written when every student was reconciled, so a
//! partially failed month is retried on the next tick.

use crate::{
    core::{
        billing::{ReconcileSummary, SerialReconciler},
        period::{self, BillingMonth},
    },
    entities::{SystemState, system_state},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Set, prelude::*};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

const LAST_RECONCILED_MONTH_KEY: &str = "last_reconciled_month";

/// Retrieves the last month the scheduler reconciled.
///
/// # Returns
/// * `Ok(Some(month))` - A run was recorded
/// * `Ok(None)` - No run recorded yet
pub async fn get_last_reconciled_month<C>(db: &C) -> Result<Option<BillingMonth>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_RECONCILED_MONTH_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => BillingMonth::from_key(&s.value)
            .map(Some)
            .ok_or_else(|| Error::Config {
                message: format!("Failed to parse last reconciled month: {}", s.value),
            }),
        None => Ok(None),
    }
}

/// Records `month` as the last reconciled month.
pub async fn set_last_reconciled_month<C>(db: &C, month: BillingMonth) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_RECONCILED_MONTH_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(month.to_key());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(LAST_RECONCILED_MONTH_KEY.to_string()),
            value: Set(month.to_key()),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }

    Ok(())
}

/// Whether the month containing `today` still needs a scheduled run.
pub async fn is_reconciliation_due(db: &DatabaseConnection, today: NaiveDate) -> Result<bool> {
    let last = get_last_reconciled_month(db).await?;
    Ok(last != Some(BillingMonth::containing(today)))
}

/// Runs the reconciler for `today`'s month if the scheduler hasn't done so yet.
///
/// # Returns
/// * `Ok(Some(summary))` - A run happened
/// * `Ok(None)` - Already reconciled this month
pub async fn run_if_due(
    db: &DatabaseConnection,
    reconciler: &SerialReconciler,
    today: NaiveDate,
) -> Result<Option<ReconcileSummary>> {
    if !is_reconciliation_due(db, today).await? {
        return Ok(None);
    }

    let summary = reconciler.reconcile(db, today).await?;
    if summary.failed == 0 {
        set_last_reconciled_month(db, summary.month).await?;
    }
    Ok(Some(summary))
}

/// Spawns the background task that calls [`run_if_due`] every `interval`.
///
/// Errors are logged and the task keeps going.
pub fn spawn_monthly_scheduler(
    db: DatabaseConnection,
    reconciler: SerialReconciler,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "Monthly billing scheduler started");
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match run_if_due(&db, &reconciler, period::today()).await {
                Ok(Some(summary)) => info!(%summary, "Scheduled billing run complete"),
                Ok(None) => {}
                Err(e) => error!("Scheduled billing run failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::payment, test_utils::*};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_no_previous_run_is_due() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(get_last_reconciled_month(&db).await?.is_none());
        assert!(is_reconciliation_due(&db, date(2024, 3, 1)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_set_updates_existing_marker() -> Result<()> {
        let db = setup_test_db().await?;

        set_last_reconciled_month(&db, BillingMonth::new(2024, 1).unwrap()).await?;
        set_last_reconciled_month(&db, BillingMonth::new(2024, 2).unwrap()).await?;

        assert_eq!(
            get_last_reconciled_month(&db).await?,
            BillingMonth::new(2024, 2)
        );
        let count = SystemState::find()
            .filter(system_state::Column::Key.eq(LAST_RECONCILED_MONTH_KEY))
            .count(&db)
            .await?;
        assert_eq!(count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_run_if_due_runs_once_per_month() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Scheduled", group.id).await?;
        let reconciler = SerialReconciler::new();

        let first = run_if_due(&db, &reconciler, date(2024, 3, 1)).await?;
        assert_eq!(first.unwrap().students_processed, 1);
        assert!(!is_reconciliation_due(&db, date(2024, 3, 31)).await?);

        let again = run_if_due(&db, &reconciler, date(2024, 3, 2)).await?;
        assert!(again.is_none());

        // A new month is due again
        assert!(is_reconciliation_due(&db, date(2024, 4, 1)).await?);
        run_if_due(&db, &reconciler, date(2024, 4, 1)).await?;

        let payments = payment::get_payments_for_student(&db, s.id).await?;
        assert_eq!(payments.len(), 2);
        assert!(payments.iter().all(|p| p.amount == dec!(40)));

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_run_is_not_recorded() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Flaky", group.id).await?;
        db.execute_unprepared(&format!(
            "CREATE TRIGGER flaky BEFORE INSERT ON payments \
             WHEN NEW.student_id = {} BEGIN SELECT RAISE(ABORT, 'offline'); END;",
            s.id
        ))
        .await?;
        let reconciler = SerialReconciler::new();

        let summary = run_if_due(&db, &reconciler, date(2024, 3, 1)).await?.unwrap();
        assert_eq!(summary.failed, 1);
        assert!(is_reconciliation_due(&db, date(2024, 3, 2)).await?);

        db.execute_unprepared("DROP TRIGGER flaky;").await?;
        let retried = run_if_due(&db, &reconciler, date(2024, 3, 2)).await?.unwrap();
        assert_eq!(retried.failed, 0);
        assert!(!is_reconciliation_due(&db, date(2024, 3, 3)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_marker_is_reported() -> Result<()> {
        let db = setup_test_db().await?;
        system_state::ActiveModel {
            key: Set(LAST_RECONCILED_MONTH_KEY.to_string()),
            value: Set("not-a-month".to_string()),
            updated_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let result = get_last_reconciled_month(&db).await;
        assert!(matches!(result.unwrap_err(), Error::Config { .. }));

        Ok(())
    }
}
