//! Parsing of free-text command arguments.
//!
//! Discord has no date or decimal option types, so operators type them. Record
//! arguments arrive as the `Name #id` labels produced by the autocomplete
//! handlers, or as a bare name typed by hand.

use crate::{
    core::{class_group, period::BillingMonth, student},
    entities::{class_group as class_group_entity, student as student_entity},
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::str::FromStr;

/// Builds the `Name #id` label used in autocomplete suggestions.
#[must_use]
pub fn record_label(name: &str, id: i64) -> String {
    format!("{name} #{id}")
}

/// Extracts the id from a `Name #id` label.
#[must_use]
pub fn parse_id_suffix(label: &str) -> Option<i64> {
    let (_, id) = label.trim().rsplit_once('#')?;
    id.trim().parse().ok()
}

/// Parses `DD/MM/YYYY` or `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| Error::Validation {
            field: "date",
            message: format!("'{raw}' is not a date, use DD/MM/YYYY"),
        })
}

/// Parses a currency amount, accepting `,` as the decimal separator and an
/// optional `R$` prefix.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned = raw.trim().trim_start_matches("R$").trim().replace(',', ".");
    let amount = Decimal::from_str(&cleaned).map_err(|_| Error::Validation {
        field: "amount",
        message: format!("'{}' is not a number", raw.trim()),
    })?;
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Optional variant of [`parse_date`].
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(parse_date).transpose()
}

/// Optional variant of [`parse_amount`].
pub fn parse_optional_amount(raw: Option<&str>) -> Result<Option<Decimal>> {
    raw.map(parse_amount).transpose()
}

/// Picks the billing month from optional `year`/`month` options.
///
/// Both missing means the month containing `today`; a month alone is taken in
/// the current year.
pub fn parse_billing_month(
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
) -> Result<BillingMonth> {
    match (year, month) {
        (None, None) => Ok(BillingMonth::containing(today)),
        (Some(_), None) => Err(Error::Validation {
            field: "month",
            message: "a year needs a month as well".to_string(),
        }),
        (year, Some(month)) => {
            let year = year.unwrap_or_else(|| today.year());
            BillingMonth::new(year, month).ok_or_else(|| Error::Validation {
                field: "month",
                message: format!("{month:02}/{year} is not a valid month"),
            })
        }
    }
}

/// Resolves a student argument.
///
/// A `#id` suffix wins; otherwise the name must match exactly one student.
pub async fn resolve_student(db: &DatabaseConnection, arg: &str) -> Result<student_entity::Model> {
    if let Some(id) = parse_id_suffix(arg) {
        return student::get_student_by_id(db, id)
            .await?
            .ok_or(Error::StudentNotFound { id });
    }

    let mut matches = student::find_students_by_exact_name(db, arg).await?;
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(Error::Validation {
            field: "student",
            message: format!("no student named '{}'", arg.trim()),
        }),
        n => Err(Error::Validation {
            field: "student",
            message: format!("{n} students are named '{}', pick one from the list", arg.trim()),
        }),
    }
}

/// Resolves a class group argument, by `#id` suffix or exact name.
pub async fn resolve_class_group(
    db: &DatabaseConnection,
    arg: &str,
) -> Result<class_group_entity::Model> {
    if let Some(id) = parse_id_suffix(arg) {
        return class_group::get_class_group_by_id(db, id)
            .await?
            .ok_or(Error::ClassGroupNotFound { id });
    }

    let wanted = arg.trim();
    class_group::get_all_class_groups(db)
        .await?
        .into_iter()
        .find(|g| g.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| Error::Validation {
            field: "class group",
            message: format!("no class group named '{wanted}'"),
        })
}
