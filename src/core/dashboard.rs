//! Revenue and overdue metrics for a billing month.
//!
//! Every figure is computed from stored payments with the same status rules
//! the ledger uses. Periods are inclusive on both ends.

use crate::{
    core::{payment, period::BillingMonth, status},
    entities::{PaymentMethod, payment as payment_entity},
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::collections::{BTreeMap, BTreeSet};

/// Number of months shown in the revenue history.
pub const HISTORY_MONTHS: usize = 6;

/// Received revenue for one month of the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRevenue {
    /// The month
    pub month: BillingMonth,
    /// Paid payments due in that month
    pub received: Decimal,
}

/// Everything the dashboard shows for one billing month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    /// Month the figures refer to
    pub month: BillingMonth,
    /// Sum of payments due in the month, paid or not
    pub expected: Decimal,
    /// Sum of payments due in the month that have been paid
    pub received: Decimal,
    /// Sum of unpaid payments due in the month whose due date has passed
    pub overdue: Decimal,
    /// Sum of every unpaid payment whose due date has passed, any month
    pub overdue_all_time: Decimal,
    /// Distinct students billed in the month
    pub active_payers: usize,
    /// `received / expected * 100`, `None` when nothing was expected
    pub collection_rate: Option<Decimal>,
    /// Received revenue for the trailing months, oldest first
    pub history: Vec<MonthlyRevenue>,
    /// Paid payments due in the month, counted per method
    pub methods: Vec<(PaymentMethod, usize)>,
}

fn sum_amounts<'a>(payments: impl IntoIterator<Item = &'a payment_entity::Model>) -> Decimal {
    payments
        .into_iter()
        .map(|p| p.amount)
        .sum::<Decimal>()
        .round_dp(2)
}

/// Expected revenue: every payment due in the period, regardless of status.
#[must_use]
pub fn expected_of(payments: &[payment_entity::Model]) -> Decimal {
    sum_amounts(payments)
}

/// Received revenue: payments due in the period that carry a payment date.
#[must_use]
pub fn received_of(payments: &[payment_entity::Model]) -> Decimal {
    sum_amounts(payments.iter().filter(|p| p.is_paid()))
}

/// Overdue total among `payments` as of `today`.
#[must_use]
pub fn overdue_of(payments: &[payment_entity::Model], today: NaiveDate) -> Decimal {
    sum_amounts(
        payments
            .iter()
            .filter(|p| status::status_of(p, today) == status::PaymentStatus::Overdue),
    )
}

/// Distinct students with at least one payment among `payments`.
#[must_use]
pub fn active_payers_of(payments: &[payment_entity::Model]) -> usize {
    payments
        .iter()
        .map(|p| p.student_id)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Paid payments counted per method, in method order.
#[must_use]
pub fn method_breakdown_of(payments: &[payment_entity::Model]) -> Vec<(PaymentMethod, usize)> {
    let mut counts: BTreeMap<u8, (PaymentMethod, usize)> = BTreeMap::new();
    for p in payments.iter().filter(|p| p.is_paid()) {
        let order = match p.method {
            PaymentMethod::Pix => 0,
            PaymentMethod::Cash => 1,
            PaymentMethod::Other => 2,
        };
        counts.entry(order).or_insert((p.method, 0)).1 += 1;
    }
    counts.into_values().collect()
}

/// `received / expected * 100` rounded to one decimal place.
#[must_use]
pub fn collection_rate(received: Decimal, expected: Decimal) -> Option<Decimal> {
    if expected.is_zero() {
        return None;
    }
    Some((received / expected * Decimal::ONE_HUNDRED).round_dp(1))
}

/// Expected revenue for `[start, end]`.
pub async fn expected_revenue<C>(db: &C, start: NaiveDate, end: NaiveDate) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let payments = payment::get_payments_due_between(db, start, end).await?;
    Ok(expected_of(&payments))
}

/// Received revenue for `[start, end]`.
pub async fn received_revenue<C>(db: &C, start: NaiveDate, end: NaiveDate) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let payments = payment::get_payments_due_between(db, start, end).await?;
    Ok(received_of(&payments))
}

/// Overdue total as of `today`, optionally restricted to payments due in a period.
pub async fn overdue_total<C>(
    db: &C,
    today: NaiveDate,
    period: Option<(NaiveDate, NaiveDate)>,
) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let payments = match period {
        Some((start, end)) => payment::get_payments_due_between(db, start, end).await?,
        None => payment::get_overdue_payments(db, today).await?,
    };
    Ok(overdue_of(&payments, today))
}

/// Number of distinct students billed in `[start, end]`. This reflects billing
/// activity, not enrolment.
pub async fn active_payer_count<C>(db: &C, start: NaiveDate, end: NaiveDate) -> Result<usize>
where
    C: ConnectionTrait,
{
    let payments = payment::get_payments_due_between(db, start, end).await?;
    Ok(active_payers_of(&payments))
}

/// Received revenue for the `count` months ending at `month`, oldest first.
pub async fn revenue_history<C>(
    db: &C,
    month: BillingMonth,
    count: usize,
) -> Result<Vec<MonthlyRevenue>>
where
    C: ConnectionTrait,
{
    let mut history = Vec::with_capacity(count);
    for m in month.trailing(count) {
        history.push(MonthlyRevenue {
            month: m,
            received: received_revenue(db, m.first_day(), m.last_day()).await?,
        });
    }
    Ok(history)
}

/// Builds the full dashboard for `month` as seen on `today`.
pub async fn build_dashboard(
    db: &DatabaseConnection,
    month: BillingMonth,
    today: NaiveDate,
) -> Result<DashboardSummary> {
    let payments = payment::get_payments_due_between(db, month.first_day(), month.last_day()).await?;

    let expected = expected_of(&payments);
    let received = received_of(&payments);

    Ok(DashboardSummary {
        month,
        expected,
        received,
        overdue: overdue_of(&payments, today),
        overdue_all_time: overdue_total(db, today, None).await?,
        active_payers: active_payers_of(&payments),
        collection_rate: collection_rate(received, expected),
        history: revenue_history(db, month, HISTORY_MONTHS).await?,
        methods: method_breakdown_of(&payments),
    })
}
