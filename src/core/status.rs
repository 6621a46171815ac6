//! Derived payment status.
//!
//! Status is never stored. Every read path classifies a payment from its
//! payment date, its due date and the evaluation date through [`classify`].

use crate::entities::payment;
use chrono::NaiveDate;
use std::fmt;

/// Status of a payment as seen on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    /// A payment date has been recorded
    Paid,
    /// Unpaid, due today or later
    Pending,
    /// Unpaid, due date already passed
    Overdue,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
        };
        f.write_str(label)
    }
}

/// Classifies a payment. A recorded payment date wins regardless of dates;
/// an unpaid payment due exactly today is still pending.
#[must_use]
pub fn classify(
    payment_date: Option<NaiveDate>,
    due_date: NaiveDate,
    today: NaiveDate,
) -> PaymentStatus {
    match payment_date {
        Some(_) => PaymentStatus::Paid,
        None if due_date < today => PaymentStatus::Overdue,
        None => PaymentStatus::Pending,
    }
}

/// Convenience wrapper over [`classify`] for a stored payment.
#[must_use]
pub fn status_of(payment: &payment::Model, today: NaiveDate) -> PaymentStatus {
    classify(payment.payment_date, payment.due_date, today)
}
