//! Payment business logic - Manual ledger entries, edits and ledger queries.
//!
//! The monthly reconciler creates payments through [`create_payment`] as well,
//! so validation lives in one place. Amounts are non-negative and rounded to
//! cents. Status filters use the same rules as
//! [`crate::core::status::classify`].

use crate::{
    core::{status::PaymentStatus, student},
    entities::{Payment, PaymentMethod, Student, payment, student as student_entity},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Condition, QueryOrder, Set, prelude::*};

/// A payment entered by an operator.
#[derive(Debug, Clone)]
pub struct ManualPayment {
    /// Due date
    pub due_date: NaiveDate,
    /// Amount; the student's current tuition when `None`
    pub amount: Option<Decimal>,
    /// Payment date when recording an already settled payment
    pub payment_date: Option<NaiveDate>,
    /// Settlement method
    pub method: PaymentMethod,
}

/// Partial update of a payment; `payment_date: Some(None)` marks it unpaid again.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    /// New due date
    pub due_date: Option<NaiveDate>,
    /// New payment date
    pub payment_date: Option<Option<NaiveDate>>,
    /// New settlement method
    pub method: Option<PaymentMethod>,
    /// New amount, must not be negative
    pub amount: Option<Decimal>,
}

/// Ledger filter; every field is optional.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    /// Case-insensitive partial match on the student's full name
    pub student_name: Option<String>,
    /// Derived status to keep
    pub status: Option<PaymentStatus>,
}

fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount.round_dp(2))
}

/// Inserts one payment row for a student.
///
/// Works on a plain connection or inside a transaction.
pub async fn create_payment<C>(
    db: &C,
    student_id: i64,
    due_date: NaiveDate,
    amount: Decimal,
    payment_date: Option<NaiveDate>,
    method: PaymentMethod,
) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    let amount = validate_amount(amount)?;

    student::get_student_by_id(db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let model = payment::ActiveModel {
        student_id: Set(student_id),
        due_date: Set(due_date),
        payment_date: Set(payment_date),
        method: Set(method),
        amount: Set(amount),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// Records a payment entered by an operator, defaulting the amount to the
/// student's tuition.
pub async fn record_manual_payment(
    db: &DatabaseConnection,
    student_id: i64,
    entry: ManualPayment,
) -> Result<payment::Model> {
    let amount = match entry.amount {
        Some(amount) => amount,
        None => {
            student::get_student_by_id(db, student_id)
                .await?
                .ok_or(Error::StudentNotFound { id: student_id })?
                .tuition
        }
    };

    create_payment(
        db,
        student_id,
        entry.due_date,
        amount,
        entry.payment_date,
        entry.method,
    )
    .await
}

/// Finds a payment by id.
pub async fn get_payment_by_id(
    db: &DatabaseConnection,
    payment_id: i64,
) -> Result<Option<payment::Model>> {
    Payment::find_by_id(payment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update to a payment.
pub async fn update_payment(
    db: &DatabaseConnection,
    payment_id: i64,
    update: PaymentUpdate,
) -> Result<payment::Model> {
    let existing = get_payment_by_id(db, payment_id)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;

    let mut active_model: payment::ActiveModel = existing.into();
    if let Some(amount) = update.amount {
        active_model.amount = Set(validate_amount(amount)?);
    }
    if let Some(due_date) = update.due_date {
        active_model.due_date = Set(due_date);
    }
    if let Some(payment_date) = update.payment_date {
        active_model.payment_date = Set(payment_date);
    }
    if let Some(method) = update.method {
        active_model.method = Set(method);
    }

    Ok(active_model.update(db).await?)
}

/// Confirms a payment on `paid_on`, optionally changing its method.
pub async fn mark_payment_paid(
    db: &DatabaseConnection,
    payment_id: i64,
    paid_on: NaiveDate,
    method: Option<PaymentMethod>,
) -> Result<payment::Model> {
    update_payment(
        db,
        payment_id,
        PaymentUpdate {
            payment_date: Some(Some(paid_on)),
            method,
            ..Default::default()
        },
    )
    .await
}

/// Deletes a payment for good and returns what was removed.
pub async fn delete_payment(db: &DatabaseConnection, payment_id: i64) -> Result<payment::Model> {
    let existing = get_payment_by_id(db, payment_id)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;

    existing.clone().delete(db).await?;
    tracing::info!(payment_id, student_id = existing.student_id, "Deleted payment");
    Ok(existing)
}

/// All payments of a student, latest due date first.
pub async fn get_payments_for_student(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::StudentId.eq(student_id))
        .order_by_desc(payment::Column::DueDate)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Payments of one student due within `[start, end]` (both inclusive).
pub async fn get_student_payments_due_between<C>(
    db: &C,
    student_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::StudentId.eq(student_id))
        .filter(payment::Column::DueDate.between(start, end))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of a student's payment amounts due within `[start, end]`, paid or not.
/// Zero when there are none.
pub async fn sum_payment_amounts<C>(
    db: &C,
    student_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let payments = get_student_payments_due_between(db, student_id, start, end).await?;
    Ok(payments
        .iter()
        .map(|p| p.amount)
        .sum::<Decimal>()
        .round_dp(2))
}

/// Every payment due within `[start, end]` (both inclusive).
pub async fn get_payments_due_between<C>(
    db: &C,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::DueDate.between(start, end))
        .order_by_asc(payment::Column::DueDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every unpaid payment due before `today`.
pub async fn get_overdue_payments<C>(db: &C, today: NaiveDate) -> Result<Vec<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(status_condition(PaymentStatus::Overdue, today))
        .order_by_asc(payment::Column::DueDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// SQL condition selecting payments with the given derived status.
fn status_condition(wanted: PaymentStatus, today: NaiveDate) -> Condition {
    match wanted {
        PaymentStatus::Paid => Condition::all().add(payment::Column::PaymentDate.is_not_null()),
        PaymentStatus::Pending => Condition::all()
            .add(payment::Column::PaymentDate.is_null())
            .add(payment::Column::DueDate.gte(today)),
        PaymentStatus::Overdue => Condition::all()
            .add(payment::Column::PaymentDate.is_null())
            .add(payment::Column::DueDate.lt(today)),
    }
}

/// Ledger view: payments with their student, latest due date first and then
/// by student name.
pub async fn filter_payments(
    db: &DatabaseConnection,
    filter: &PaymentFilter,
    today: NaiveDate,
) -> Result<Vec<(payment::Model, student_entity::Model)>> {
    let mut query = Payment::find().find_also_related(Student);

    if let Some(name) = filter
        .student_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        query = query.filter(student_entity::Column::FullName.contains(name));
    }
    if let Some(wanted) = filter.status {
        query = query.filter(status_condition(wanted, today));
    }

    let rows = query
        .order_by_desc(payment::Column::DueDate)
        .order_by_asc(student_entity::Column::FullName)
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(p, s)| s.map(|s| (p, s)))
        .collect())
}
