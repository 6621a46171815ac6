//! Report generation and text formatting.
//!
//! This module builds per-student statements and turns payments, ledgers and
//! dashboards into plain text. Nothing here depends on the bot framework, so
//! the same strings can go to logs or chat.

use crate::{
    core::{class_group, dashboard::DashboardSummary, payment, status},
    entities::{payment as payment_entity, student},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::DatabaseConnection;
use std::fmt::Write;

/// A student's account at a glance.
#[derive(Debug, Clone)]
pub struct StudentStatement {
    /// The student being reported on
    pub student: student::Model,
    /// Name of the student's class group
    pub class_group_name: String,
    /// Latest payments, newest due date first
    pub recent_payments: Vec<payment_entity::Model>,
    /// Sum of every unpaid payment
    pub outstanding: Decimal,
    /// Sum of unpaid payments past their due date
    pub overdue: Decimal,
}

/// Builds a statement for one student.
///
/// # Arguments
/// * `db` - Database connection
/// * `student_id` - Student to report on
/// * `payment_limit` - Maximum number of payments to include (default 10)
/// * `today` - Date overdue status is evaluated against
pub async fn generate_student_statement(
    db: &DatabaseConnection,
    student_id: i64,
    payment_limit: Option<u64>,
    today: NaiveDate,
) -> Result<StudentStatement> {
    let student = crate::core::student::get_student_by_id(db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let class_group_name = class_group::get_class_group_by_id(db, student.class_group_id)
        .await?
        .map_or_else(|| "?".to_string(), |g| g.name);

    let all_payments = payment::get_payments_for_student(db, student_id).await?;

    let (outstanding, overdue) = all_payments
        .iter()
        .filter(|p| !p.is_paid())
        .fold((Decimal::ZERO, Decimal::ZERO), |(outstanding, overdue), p| {
            let late = status::status_of(p, today) == status::PaymentStatus::Overdue;
            (
                outstanding + p.amount,
                if late { overdue + p.amount } else { overdue },
            )
        });

    let limit = payment_limit.unwrap_or(10);
    let recent_payments = all_payments.into_iter().take(limit.try_into()?).collect();

    Ok(StudentStatement {
        student,
        class_group_name,
        recent_payments,
        outstanding,
        overdue,
    })
}

/// Formats an amount as Brazilian reais with two decimals, e.g. `R$ 40.00`.
#[must_use]
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-R$ {:.2}", rounded.abs())
    } else {
        format!("R$ {:.2}", rounded.abs())
    }
}

/// Formats a date the way the school writes it, `DD/MM/YYYY`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Generates a text progress bar like `[████████░░] 80.0%`.
///
/// The bar is clamped to 0-100 but the label shows the real value.
#[must_use]
pub fn format_progress_bar(percent: Decimal, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = percent
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0);

    // clamped ∈ [0, 100] and length is small, so the result fits in [0, length]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!(
        "[{}{}] {:.1}%",
        "█".repeat(filled),
        "░".repeat(empty),
        percent
    )
}

/// One line per payment: id, due date, amount, status and method or payment date.
#[must_use]
pub fn format_payment_line(payment: &payment_entity::Model, today: NaiveDate) -> String {
    let state = status::status_of(payment, today);
    let settled = payment.payment_date.map_or_else(String::new, |paid_on| {
        format!(" on {} via {}", format_date(paid_on), payment.method)
    });

    format!(
        "#{} | due {} | {} | {state}{settled}",
        payment.id,
        format_date(payment.due_date),
        format_currency(payment.amount),
    )
}

/// A ledger line: the payment line prefixed with the student's name.
#[must_use]
pub fn format_ledger_line(
    payment: &payment_entity::Model,
    student: &student::Model,
    today: NaiveDate,
) -> String {
    format!("{} | {}", student.full_name, format_payment_line(payment, today))
}

/// Formats the dashboard as a multi-line block.
pub fn format_dashboard(summary: &DashboardSummary) -> Result<String> {
    let mut out = format!("Dashboard - {}\n", summary.month);
    writeln!(out, "  Expected: {}", format_currency(summary.expected))?;
    writeln!(out, "  Received: {}", format_currency(summary.received))?;
    writeln!(out, "  Overdue (month): {}", format_currency(summary.overdue))?;
    writeln!(
        out,
        "  Overdue (all time): {}",
        format_currency(summary.overdue_all_time)
    )?;
    writeln!(out, "  Students billed: {}", summary.active_payers)?;
    match summary.collection_rate {
        Some(rate) => writeln!(out, "  Collected: {}", format_progress_bar(rate, Some(10)))?,
        None => writeln!(out, "  Collected: n/a")?,
    }

    writeln!(out, "\nLast {} months (received)", summary.history.len())?;
    for entry in &summary.history {
        writeln!(out, "  {} {}", entry.month, format_currency(entry.received))?;
    }

    if !summary.methods.is_empty() {
        writeln!(out, "\nPayment methods")?;
        for (method, count) in &summary.methods {
            writeln!(out, "  {method}: {count}")?;
        }
    }

    Ok(out)
}

/// Splits lines into messages of at most `max_len` characters.
///
/// A line longer than `max_len` gets a message of its own.
#[must_use]
pub fn paginate(lines: &[String], max_len: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();

    for line in lines {
        if !current.is_empty() && current.len() + line.len() + 1 > max_len {
            pages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{dashboard::MonthlyRevenue, period::BillingMonth},
        entities::PaymentMethod,
        test_utils::*,
    };
    use rust_decimal_macros::dec;

    fn sample_payment(payment_date: Option<NaiveDate>) -> payment_entity::Model {
        payment_entity::Model {
            id: 7,
            student_id: 1,
            due_date: date(2024, 3, 10),
            payment_date,
            method: PaymentMethod::Cash,
            amount: dec!(40),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(40)), "R$ 40.00");
        assert_eq!(format_currency(dec!(15.5)), "R$ 15.50");
        assert_eq!(format_currency(dec!(-3.2)), "-R$ 3.20");
        assert_eq!(format_currency(Decimal::ZERO), "R$ 0.00");
    }

    #[test]
    fn test_format_progress_bar() {
        assert_eq!(format_progress_bar(dec!(100), Some(10)), "[██████████] 100.0%");
        assert_eq!(format_progress_bar(dec!(50), Some(10)), "[█████░░░░░] 50.0%");
        assert_eq!(format_progress_bar(dec!(120), Some(4)), "[████] 120.0%");
    }

    #[test]
    fn test_format_payment_line() {
        let pending = format_payment_line(&sample_payment(None), date(2024, 3, 1));
        assert_eq!(pending, "#7 | due 10/03/2024 | R$ 40.00 | pending");

        let overdue = format_payment_line(&sample_payment(None), date(2024, 3, 11));
        assert!(overdue.ends_with("| overdue"));

        let paid = format_payment_line(&sample_payment(Some(date(2024, 3, 9))), date(2024, 4, 1));
        assert_eq!(
            paid,
            "#7 | due 10/03/2024 | R$ 40.00 | paid on 09/03/2024 via Cash"
        );
    }

    #[test]
    fn test_paginate() {
        let lines: Vec<String> = ["aaaa", "bbbb", "cccc"].iter().map(ToString::to_string).collect();
        assert_eq!(paginate(&lines, 9), vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(paginate(&lines, 100), vec!["aaaa\nbbbb\ncccc"]);
        assert!(paginate(&[], 10).is_empty());
    }

    #[test]
    fn test_format_dashboard() {
        let summary = DashboardSummary {
            month: BillingMonth::new(2024, 3).unwrap(),
            expected: dec!(80),
            received: dec!(40),
            overdue: dec!(15),
            overdue_all_time: dec!(55),
            active_payers: 2,
            collection_rate: Some(dec!(50.0)),
            history: vec![MonthlyRevenue {
                month: BillingMonth::new(2024, 3).unwrap(),
                received: dec!(40),
            }],
            methods: vec![(PaymentMethod::Pix, 1)],
        };

        let text = format_dashboard(&summary).unwrap();
        assert!(text.starts_with("Dashboard - 03/2024"));
        assert!(text.contains("Expected: R$ 80.00"));
        assert!(text.contains("Overdue (all time): R$ 55.00"));
        assert!(text.contains("Students billed: 2"));
        assert!(text.contains("[█████░░░░░] 50.0%"));
        assert!(text.contains("03/2024 R$ 40.00"));
        assert!(text.contains("Pix: 1"));
    }

    #[tokio::test]
    async fn test_generate_student_statement() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let student = create_test_student(&db, "Rui", group.id).await?;
        create_test_payment(&db, student.id, date(2024, 1, 10), dec!(40)).await?;
        create_test_payment(&db, student.id, date(2024, 2, 10), dec!(40)).await?;
        let paid = create_test_payment(&db, student.id, date(2024, 3, 10), dec!(40)).await?;
        payment::mark_payment_paid(&db, paid.id, date(2024, 3, 1), None).await?;
        create_test_payment(&db, student.id, date(2024, 4, 10), dec!(40)).await?;

        let statement =
            generate_student_statement(&db, student.id, Some(2), date(2024, 3, 15)).await?;

        assert_eq!(statement.class_group_name, group.name);
        assert_eq!(statement.recent_payments.len(), 2);
        assert_eq!(statement.recent_payments[0].due_date, date(2024, 4, 10));
        assert_eq!(statement.outstanding, dec!(120));
        assert_eq!(statement.overdue, dec!(80));

        let missing = generate_student_statement(&db, 999, None, date(2024, 3, 15)).await;
        assert!(matches!(
            missing.unwrap_err(),
            Error::StudentNotFound { id: 999 }
        ));

        Ok(())
    }
}
