//! Monthly billing reconciliation.
//!
//! For every active student, compares the tuition owed for a calendar month
//! with the sum of payments already due in that month and posts the
//! difference as a new unpaid payment. Partial and advance payments are topped
//! up rather than duplicated, over-payments are left alone as credit, and
//! running the reconciler again after it converged does nothing.
//!
//! Each student is reconciled in its own database transaction. A failure for
//! one student is logged and counted, and the run moves on to the next one.
//! The reconciler only ever adds payments; it never edits or removes them.

use crate::{
    core::{payment, period::BillingMonth, student},
    entities::{PaymentMethod, student as student_entity},
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use std::{fmt, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// What reconciliation did for one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentOutcome {
    /// Nothing was due yet; a payment for the full tuition was created
    Charged {
        /// Id of the created payment
        payment_id: i64,
        /// Amount posted
        amount: Decimal,
    },
    /// Part of the tuition was already posted; the shortfall was created
    ToppedUp {
        /// Id of the created payment
        payment_id: i64,
        /// Amount posted (the shortfall)
        amount: Decimal,
        /// Amount that was already posted for the month
        already_posted: Decimal,
    },
    /// The month is already covered (exactly or in advance)
    Covered {
        /// Amount already posted for the month
        posted: Decimal,
    },
    /// The student was deactivated or removed before their turn
    Skipped,
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Billing month that was reconciled
    pub month: BillingMonth,
    /// Number of active students in the snapshot the run iterated over
    pub students_processed: usize,
    /// Students that could not be reconciled and are left for the next run
    pub failed: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} students processed for {}",
            self.students_processed, self.month
        )?;
        if self.failed > 0 {
            write!(f, " ({} failed, will retry on the next run)", self.failed)?;
        }
        Ok(())
    }
}

/// Amount to post so the month's total reaches `tuition`, or `None` when it
/// already does.
///
/// A zero tuition never produces a payment, so scholarship students don't
/// collect a zero-value row on every run.
#[must_use]
pub fn amount_to_post(tuition: Decimal, posted: Decimal) -> Option<Decimal> {
    if posted >= tuition {
        None
    } else {
        Some((tuition - posted).round_dp(2))
    }
}

/// Reconciles one student for `month` using `conn`.
///
/// The student is re-read so the current tuition and active flag are used,
/// not the values from the run's snapshot.
pub async fn reconcile_student<C>(
    conn: &C,
    student_id: i64,
    month: BillingMonth,
) -> Result<StudentOutcome>
where
    C: ConnectionTrait,
{
    let Some(current) = student::get_student_by_id(conn, student_id).await? else {
        return Ok(StudentOutcome::Skipped);
    };
    if !current.is_active {
        return Ok(StudentOutcome::Skipped);
    }

    let posted =
        payment::sum_payment_amounts(conn, student_id, month.first_day(), month.last_day())
            .await?;

    let Some(amount) = amount_to_post(current.tuition, posted) else {
        return Ok(StudentOutcome::Covered { posted });
    };

    let created = payment::create_payment(
        conn,
        student_id,
        month.due_date(),
        amount,
        None,
        PaymentMethod::default(),
    )
    .await?;

    if posted.is_zero() {
        Ok(StudentOutcome::Charged {
            payment_id: created.id,
            amount,
        })
    } else {
        Ok(StudentOutcome::ToppedUp {
            payment_id: created.id,
            amount,
            already_posted: posted,
        })
    }
}

async fn reconcile_in_transaction(
    db: &DatabaseConnection,
    student: &student_entity::Model,
    month: BillingMonth,
) -> Result<StudentOutcome> {
    let txn = db.begin().await?;
    let outcome = reconcile_student(&txn, student.id, month).await?;
    txn.commit().await?;
    Ok(outcome)
}

/// Reconciles every active student for the month containing `reference_date`.
///
/// Safe to run any number of times in the same month: once a student's month
/// is covered, later runs leave it untouched. Not safe to run concurrently
/// with itself; go through [`SerialReconciler`] for that.
#[instrument(skip(db))]
pub async fn reconcile(db: &DatabaseConnection, reference_date: NaiveDate) -> Result<ReconcileSummary> {
    let month = BillingMonth::containing(reference_date);
    let students = student::list_active_students(db).await?;

    let mut failed = 0;
    for current in &students {
        match reconcile_in_transaction(db, current, month).await {
            Ok(outcome) => debug!(student_id = current.id, ?outcome, "Reconciled student"),
            Err(e) => {
                failed += 1;
                warn!(
                    student_id = current.id,
                    error = %e,
                    "Failed to reconcile student, leaving it for the next run"
                );
            }
        }
    }

    let summary = ReconcileSummary {
        month,
        students_processed: students.len(),
        failed,
    };
    info!(%summary, "Billing reconciliation finished");
    Ok(summary)
}

/// Cloneable handle that lets at most one reconciliation run at a time within
/// this process.
///
/// The read-sum-then-insert sequence per student is not atomic, so two
/// overlapping runs could both see an empty month and both charge it.
#[derive(Debug, Clone, Default)]
pub struct SerialReconciler {
    lock: Arc<Mutex<()>>,
}

impl SerialReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs [`reconcile`], waiting for any run already in progress to finish.
    pub async fn reconcile(
        &self,
        db: &DatabaseConnection,
        reference_date: NaiveDate,
    ) -> Result<ReconcileSummary> {
        let _guard = self.lock.lock().await;
        reconcile(db, reference_date).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        entities::{Payment, payment as payment_entity},
        test_utils::*,
    };
    use rust_decimal_macros::dec;
    use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

    fn march() -> BillingMonth {
        BillingMonth::new(2024, 3).unwrap()
    }

    async fn march_payments(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Vec<payment_entity::Model>> {
        let month = march();
        Ok(payment::get_student_payments_due_between(
            db,
            student_id,
            month.first_day(),
            month.last_day(),
        )
        .await?)
    }

    async fn march_total(db: &DatabaseConnection, student_id: i64) -> Result<Decimal> {
        let month = march();
        payment::sum_payment_amounts(db, student_id, month.first_day(), month.last_day()).await
    }

    #[test]
    fn test_amount_to_post() {
        assert_eq!(amount_to_post(dec!(40), Decimal::ZERO), Some(dec!(40)));
        assert_eq!(amount_to_post(dec!(40), dec!(25)), Some(dec!(15)));
        assert_eq!(amount_to_post(dec!(40), dec!(40)), None);
        assert_eq!(amount_to_post(dec!(40), dec!(50)), None);
        assert_eq!(amount_to_post(Decimal::ZERO, Decimal::ZERO), None);
    }

    #[test]
    fn test_summary_display() {
        let summary = ReconcileSummary {
            month: march(),
            students_processed: 12,
            failed: 0,
        };
        assert_eq!(summary.to_string(), "12 students processed for 03/2024");

        let partial = ReconcileSummary {
            failed: 2,
            ..summary
        };
        assert!(partial.to_string().contains("2 failed"));
    }

    #[tokio::test]
    async fn test_student_without_payments_is_charged_full_tuition() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let a = create_test_student(&db, "Student A", group.id).await?;

        let summary = reconcile(&db, date(2024, 3, 15)).await?;
        assert_eq!(summary.students_processed, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.month, march());

        let payments = march_payments(&db, a.id).await?;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].due_date, date(2024, 3, 10));
        assert_eq!(payments[0].amount, dec!(40.00));
        assert!(payments[0].payment_date.is_none());
        assert_eq!(payments[0].method, PaymentMethod::Pix);

        Ok(())
    }

    #[tokio::test]
    async fn test_partial_payment_is_topped_up() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let b = create_test_student(&db, "Student B", group.id).await?;
        create_test_payment(&db, b.id, date(2024, 3, 10), dec!(25.00)).await?;

        reconcile(&db, date(2024, 3, 15)).await?;

        let payments = march_payments(&db, b.id).await?;
        assert_eq!(payments.len(), 2);
        let top_up = payments.iter().find(|p| p.amount == dec!(15.00)).unwrap();
        assert_eq!(top_up.due_date, date(2024, 3, 10));
        assert!(top_up.payment_date.is_none());
        assert_eq!(march_total(&db, b.id).await?, dec!(40.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_overpaid_student_is_left_alone() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let c = create_test_student(&db, "Student C", group.id).await?;
        let advance = create_test_payment(&db, c.id, date(2024, 3, 10), dec!(50.00)).await?;
        payment::mark_payment_paid(&db, advance.id, date(2024, 3, 5), None).await?;

        let outcome = reconcile_student(&db, c.id, march()).await?;
        assert_eq!(
            outcome,
            StudentOutcome::Covered {
                posted: dec!(50.00)
            }
        );

        reconcile(&db, date(2024, 3, 15)).await?;
        assert_eq!(march_payments(&db, c.id).await?.len(), 1);
        assert_eq!(march_total(&db, c.id).await?, dec!(50.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_exact_payment_is_a_no_op() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Exact", group.id).await?;
        create_test_payment(&db, s.id, date(2024, 3, 20), dec!(40.00)).await?;

        reconcile(&db, date(2024, 3, 1)).await?;
        assert_eq!(march_payments(&db, s.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_student_is_never_charged() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let d = create_custom_student(&db, "Student D", group.id, dec!(40), false).await?;
        let partial =
            create_custom_student(&db, "Dangling", group.id, dec!(40), true).await?;
        create_test_payment(&db, partial.id, date(2024, 3, 10), dec!(10)).await?;
        crate::core::student::set_student_active(&db, partial.id, false).await?;

        let summary = reconcile(&db, date(2024, 3, 15)).await?;
        assert_eq!(summary.students_processed, 0);
        assert!(march_payments(&db, d.id).await?.is_empty());
        assert_eq!(march_total(&db, partial.id).await?, dec!(10));

        // Deactivated after the snapshot was taken
        let outcome = reconcile_student(&db, partial.id, march()).await?;
        assert_eq!(outcome, StudentOutcome::Skipped);

        Ok(())
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let a = create_test_student(&db, "Fresh", group.id).await?;
        let b = create_test_student(&db, "Partial", group.id).await?;
        create_test_payment(&db, b.id, date(2024, 3, 10), dec!(25.00)).await?;

        reconcile(&db, date(2024, 3, 15)).await?;
        let after_first = Payment::find().all(&db).await?.len();
        let a_total = march_total(&db, a.id).await?;
        let b_total = march_total(&db, b.id).await?;

        reconcile(&db, date(2024, 3, 28)).await?;
        assert_eq!(Payment::find().all(&db).await?.len(), after_first);
        assert_eq!(march_total(&db, a.id).await?, a_total);
        assert_eq!(march_total(&db, b.id).await?, b_total);
        assert_eq!(b_total, dec!(40.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_manual_payment_between_runs_converges() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Converge", group.id).await?;

        reconcile(&db, date(2024, 3, 2)).await?;
        // Operator lowers the generated charge and records a separate cash payment
        let generated = march_payments(&db, s.id).await?.pop().unwrap();
        let mut lowered: payment_entity::ActiveModel = generated.into();
        lowered.amount = Set(dec!(30));
        lowered.update(&db).await?;
        create_test_payment(&db, s.id, date(2024, 3, 10), dec!(10)).await?;

        let outcome = reconcile_student(&db, s.id, march()).await?;
        assert_eq!(
            outcome,
            StudentOutcome::Covered {
                posted: dec!(40)
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_tuition_increase_mid_month_creates_supplement() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Raise", group.id).await?;

        reconcile(&db, date(2024, 3, 1)).await?;
        crate::core::student::update_student(
            &db,
            s.id,
            crate::core::student::StudentUpdate {
                tuition: Some(dec!(55.00)),
                ..Default::default()
            },
        )
        .await?;

        let outcome = reconcile_student(&db, s.id, march()).await?;
        assert!(matches!(
            outcome,
            StudentOutcome::ToppedUp { amount, already_posted, .. }
                if amount == dec!(15.00) && already_posted == dec!(40.00)
        ));
        assert_eq!(march_total(&db, s.id).await?, dec!(55.00));

        Ok(())
    }

    #[tokio::test]
    async fn test_backfill_uses_the_tenth_of_the_past_month() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Backfill", group.id).await?;

        let summary = reconcile(&db, date(2023, 11, 29)).await?;
        assert_eq!(summary.month, BillingMonth::new(2023, 11).unwrap());

        let payments = Payment::find()
            .filter(payment_entity::Column::StudentId.eq(s.id))
            .all(&db)
            .await?;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].due_date, date(2023, 11, 10));

        Ok(())
    }

    #[tokio::test]
    async fn test_other_months_do_not_count() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Months", group.id).await?;
        create_test_payment(&db, s.id, date(2024, 2, 10), dec!(40)).await?;
        create_test_payment(&db, s.id, date(2024, 4, 1), dec!(40)).await?;

        let outcome = reconcile_student(&db, s.id, march()).await?;
        assert!(matches!(
            outcome,
            StudentOutcome::Charged { amount, .. } if amount == dec!(40)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_failing_student_does_not_abort_the_run() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let alpha = create_test_student(&db, "Alpha", group.id).await?;
        let broken = create_test_student(&db, "Broken", group.id).await?;
        let zulu = create_test_student(&db, "Zulu", group.id).await?;

        // Simulate a storage failure for a single student
        db.execute_unprepared(&format!(
            "CREATE TRIGGER reject_broken BEFORE INSERT ON payments \
             WHEN NEW.student_id = {} BEGIN SELECT RAISE(ABORT, 'disk unavailable'); END;",
            broken.id
        ))
        .await?;

        let summary = reconcile(&db, date(2024, 3, 15)).await?;
        assert_eq!(summary.students_processed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(march_total(&db, alpha.id).await?, dec!(40));
        assert_eq!(march_total(&db, zulu.id).await?, dec!(40));
        assert!(march_payments(&db, broken.id).await?.is_empty());

        // Once storage recovers, a fresh run picks up only the skipped student
        db.execute_unprepared("DROP TRIGGER reject_broken;").await?;
        let retry = reconcile(&db, date(2024, 3, 20)).await?;
        assert_eq!(retry.failed, 0);
        assert_eq!(march_total(&db, broken.id).await?, dec!(40));
        assert_eq!(march_payments(&db, alpha.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_serial_reconciler_prevents_duplicates() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let s = create_test_student(&db, "Racer", group.id).await?;
        let reconciler = SerialReconciler::new();

        let (first, second) = tokio::join!(
            reconciler.reconcile(&db, date(2024, 3, 15)),
            reconciler.reconcile(&db, date(2024, 3, 15)),
        );
        first?;
        second?;

        let payments = march_payments(&db, s.id).await?;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, dec!(40));

        Ok(())
    }
}
