//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{class_group, payment, student},
    entities::{self, PaymentMethod},
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a valid calendar date. Panics on an invalid one.
#[allow(clippy::unwrap_used)]
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Creates an active class group without a description.
pub async fn create_test_class_group(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::class_group::Model> {
    class_group::create_class_group(db, name.to_string(), None).await
}

/// Enrolment data with sensible defaults.
///
/// # Defaults
/// * `birth_date`: 2014-05-01
/// * `guardian_name`, `guardian_contact`: None
/// * `tuition`: [`student::DEFAULT_TUITION`]
#[must_use]
pub fn sample_new_student(name: &str, class_group_id: i64) -> student::NewStudent {
    student::NewStudent {
        full_name: name.to_string(),
        birth_date: date(2014, 5, 1),
        guardian_name: None,
        guardian_contact: None,
        tuition: student::DEFAULT_TUITION,
        class_group_id,
    }
}

/// Enrols an active student paying the default tuition.
pub async fn create_test_student(
    db: &DatabaseConnection,
    name: &str,
    class_group_id: i64,
) -> Result<entities::student::Model> {
    student::create_student(db, sample_new_student(name, class_group_id)).await
}

/// Enrols a student with a custom tuition, optionally deactivating it.
pub async fn create_custom_student(
    db: &DatabaseConnection,
    name: &str,
    class_group_id: i64,
    tuition: Decimal,
    is_active: bool,
) -> Result<entities::student::Model> {
    let new = student::NewStudent {
        tuition,
        ..sample_new_student(name, class_group_id)
    };
    let created = student::create_student(db, new).await?;

    if is_active {
        Ok(created)
    } else {
        student::set_student_active(db, created.id, false).await
    }
}

/// Creates an unpaid Pix payment.
pub async fn create_test_payment(
    db: &DatabaseConnection,
    student_id: i64,
    due_date: NaiveDate,
    amount: Decimal,
) -> Result<entities::payment::Model> {
    payment::create_payment(db, student_id, due_date, amount, None, PaymentMethod::Pix).await
}

/// Sets up a test database with one class group, "Sub-11".
/// Returns (db, `class_group`) for common test scenarios.
pub async fn setup_with_class_group() -> Result<(DatabaseConnection, entities::class_group::Model)> {
    let db = setup_test_db().await?;
    let group = create_test_class_group(&db, "Sub-11").await?;
    Ok((db, group))
}
