//! Student business logic - Enrolment, edits, soft deactivation and removal.
//!
//! Students are normally deactivated rather than deleted. A hard delete also
//! removes every payment the student owns, in the same transaction.

use crate::{
    core::class_group,
    entities::{Payment, Student, payment, student},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Tuition charged when none is given at enrolment.
pub const DEFAULT_TUITION: Decimal = Decimal::from_parts(4000, 0, 0, false, 2);

/// Fields needed to enrol a student.
#[derive(Debug, Clone)]
pub struct NewStudent {
    /// Full name
    pub full_name: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    /// Parent or guardian name
    pub guardian_name: Option<String>,
    /// Guardian phone in any format; stored digits-only
    pub guardian_contact: Option<String>,
    /// Monthly tuition
    pub tuition: Decimal,
    /// Class group to enrol in
    pub class_group_id: i64,
}

/// Partial update of a student; `None` leaves the field untouched and
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct StudentUpdate {
    /// New full name
    pub full_name: Option<String>,
    /// New date of birth
    pub birth_date: Option<NaiveDate>,
    /// New guardian name
    pub guardian_name: Option<Option<String>>,
    /// New guardian phone, normalised like on enrolment
    pub guardian_contact: Option<Option<String>>,
    /// New monthly tuition; billed from the next reconciliation on
    pub tuition: Option<Decimal>,
    /// Class group to move the student to
    pub class_group_id: Option<i64>,
}

/// Strips every non-digit from a phone number. Returns `None` when nothing
/// is left.
#[must_use]
pub fn normalize_contact(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

fn validate_full_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            field: "full_name",
            message: "Student name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_tuition(tuition: Decimal) -> Result<Decimal> {
    if tuition < Decimal::ZERO {
        return Err(Error::InvalidAmount { amount: tuition });
    }
    Ok(tuition.round_dp(2))
}

fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn ensure_class_group_exists(db: &DatabaseConnection, class_group_id: i64) -> Result<()> {
    class_group::get_class_group_by_id(db, class_group_id)
        .await?
        .map(|_| ())
        .ok_or(Error::ClassGroupNotFound { id: class_group_id })
}

/// Enrols a new, active student.
///
/// Rejects an empty name, a negative tuition and an unknown class group.
pub async fn create_student(db: &DatabaseConnection, new: NewStudent) -> Result<student::Model> {
    let full_name = validate_full_name(&new.full_name)?;
    let tuition = validate_tuition(new.tuition)?;
    ensure_class_group_exists(db, new.class_group_id).await?;

    let now = chrono::Utc::now().naive_utc();
    let model = student::ActiveModel {
        full_name: Set(full_name),
        birth_date: Set(new.birth_date),
        guardian_name: Set(clean_text(new.guardian_name)),
        guardian_contact: Set(new.guardian_contact.as_deref().and_then(normalize_contact)),
        tuition: Set(tuition),
        is_active: Set(true),
        class_group_id: Set(new.class_group_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    tracing::info!(student_id = created.id, "Enrolled student");
    Ok(created)
}

/// Applies a partial update to a student.
pub async fn update_student(
    db: &DatabaseConnection,
    student_id: i64,
    update: StudentUpdate,
) -> Result<student::Model> {
    let existing = get_student_by_id(db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let mut active_model: student::ActiveModel = existing.into();
    if let Some(name) = update.full_name {
        active_model.full_name = Set(validate_full_name(&name)?);
    }
    if let Some(birth_date) = update.birth_date {
        active_model.birth_date = Set(birth_date);
    }
    if let Some(guardian_name) = update.guardian_name {
        active_model.guardian_name = Set(clean_text(guardian_name));
    }
    if let Some(contact) = update.guardian_contact {
        active_model.guardian_contact = Set(contact.as_deref().and_then(normalize_contact));
    }
    if let Some(tuition) = update.tuition {
        active_model.tuition = Set(validate_tuition(tuition)?);
    }
    if let Some(class_group_id) = update.class_group_id {
        ensure_class_group_exists(db, class_group_id).await?;
        active_model.class_group_id = Set(class_group_id);
    }
    active_model.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(active_model.update(db).await?)
}

/// Activates or deactivates a student. Payment history is untouched.
pub async fn set_student_active(
    db: &DatabaseConnection,
    student_id: i64,
    is_active: bool,
) -> Result<student::Model> {
    let existing = get_student_by_id(db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let mut active_model: student::ActiveModel = existing.into();
    active_model.is_active = Set(is_active);
    active_model.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(active_model.update(db).await?)
}

/// Permanently deletes a student together with all of their payments.
///
/// Returns the number of payments removed.
pub async fn delete_student(db: &DatabaseConnection, student_id: i64) -> Result<u64> {
    let txn = db.begin().await?;

    let student = get_student_by_id(&txn, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let removed = Payment::delete_many()
        .filter(payment::Column::StudentId.eq(student_id))
        .exec(&txn)
        .await?
        .rows_affected;

    student.delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(student_id, payments_removed = removed, "Deleted student");
    Ok(removed)
}

/// Finds a student by id, active or not.
pub async fn get_student_by_id<C>(db: &C, student_id: i64) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find_by_id(student_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists active students ordered by name. This is the roster the monthly
/// billing run iterates over.
pub async fn list_active_students<C>(db: &C) -> Result<Vec<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find()
        .filter(student::Column::IsActive.eq(true))
        .order_by_asc(student::Column::FullName)
        .order_by_asc(student::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the students enrolled in one class group, active first then by name.
pub async fn list_students_in_class_group(
    db: &DatabaseConnection,
    class_group_id: i64,
) -> Result<Vec<student::Model>> {
    Student::find()
        .filter(student::Column::ClassGroupId.eq(class_group_id))
        .order_by_desc(student::Column::IsActive)
        .order_by_asc(student::Column::FullName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Case-insensitive partial name search across active and inactive students.
pub async fn search_students_by_name(
    db: &DatabaseConnection,
    partial: &str,
    limit: u64,
) -> Result<Vec<student::Model>> {
    use sea_orm::QuerySelect;

    let mut query = Student::find();
    let partial = partial.trim();
    if !partial.is_empty() {
        query = query.filter(student::Column::FullName.contains(partial));
    }

    query
        .order_by_desc(student::Column::IsActive)
        .order_by_asc(student::Column::FullName)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds students whose name equals `name`, ignoring ASCII case.
pub async fn find_students_by_exact_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Vec<student::Model>> {
    let wanted = name.trim();
    let candidates = Student::find()
        .filter(student::Column::FullName.contains(wanted))
        .order_by_asc(student::Column::Id)
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|s| s.full_name.eq_ignore_ascii_case(wanted))
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_default_tuition_is_forty() {
        assert_eq!(DEFAULT_TUITION, dec!(40.00));
        assert_eq!(DEFAULT_TUITION.to_string(), "40.00");
    }

    #[test]
    fn test_normalize_contact() {
        assert_eq!(
            normalize_contact("(11) 98765-4321"),
            Some("11987654321".to_string())
        );
        assert_eq!(normalize_contact("+55 11 9"), Some("55119".to_string()));
        assert_eq!(normalize_contact("n/a"), None);
        assert_eq!(normalize_contact(""), None);
    }

    #[tokio::test]
    async fn test_create_student_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut new = sample_new_student("", 1);
        let result = create_student(&db, new.clone()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "full_name",
                ..
            }
        ));

        new.full_name = "Bruno".to_string();
        new.tuition = dec!(-1.00);
        let result = create_student(&db, new).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount } if amount == dec!(-1.00)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_student_requires_existing_class_group() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_student(&db, sample_new_student("Carla", 77)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ClassGroupNotFound { id: 77 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_student_normalizes_contact() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;

        let mut new = sample_new_student("  Davi Souza ", group.id);
        new.guardian_contact = Some("(21) 99999-0000".to_string());
        new.guardian_name = Some("  ".to_string());
        let student = create_student(&db, new).await?;

        assert_eq!(student.full_name, "Davi Souza");
        assert_eq!(student.guardian_contact.as_deref(), Some("21999990000"));
        assert!(student.guardian_name.is_none());
        assert_eq!(student.tuition, dec!(40.00));
        assert!(student.is_active);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_student_partial() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let other = create_test_class_group(&db, "Sub-13").await?;
        let student = create_test_student(&db, "Eva", group.id).await?;

        let updated = update_student(
            &db,
            student.id,
            StudentUpdate {
                tuition: Some(dec!(55.5)),
                class_group_id: Some(other.id),
                guardian_contact: Some(Some("11 2222-3333".to_string())),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.full_name, "Eva");
        assert_eq!(updated.tuition, dec!(55.50));
        assert_eq!(updated.class_group_id, other.id);
        assert_eq!(updated.guardian_contact.as_deref(), Some("1122223333"));

        let result = update_student(
            &db,
            student.id,
            StudentUpdate {
                class_group_id: Some(999),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ClassGroupNotFound { id: 999 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_deactivated_student_leaves_active_roster() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let ana = create_test_student(&db, "Ana", group.id).await?;
        create_test_student(&db, "Beto", group.id).await?;

        set_student_active(&db, ana.id, false).await?;

        let roster = list_active_students(&db).await?;
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].full_name, "Beto");

        // Still reachable by id and by search
        assert!(get_student_by_id(&db, ana.id).await?.is_some());
        let found = search_students_by_name(&db, "an", 10).await?;
        assert_eq!(found.len(), 1);
        assert!(!found[0].is_active);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_student_cascades_payments() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        let student = create_test_student(&db, "Gil", group.id).await?;
        let keeper = create_test_student(&db, "Hana", group.id).await?;
        create_test_payment(&db, student.id, date(2024, 3, 10), dec!(40)).await?;
        create_test_payment(&db, student.id, date(2024, 4, 10), dec!(40)).await?;
        create_test_payment(&db, keeper.id, date(2024, 3, 10), dec!(40)).await?;

        let removed = delete_student(&db, student.id).await?;
        assert_eq!(removed, 2);
        assert!(get_student_by_id(&db, student.id).await?.is_none());

        let remaining = Payment::find().all(&db).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].student_id, keeper.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_students_by_exact_name_ignores_case() -> Result<()> {
        let (db, group) = setup_with_class_group().await?;
        create_test_student(&db, "Ana Lima", group.id).await?;
        create_test_student(&db, "Ana Lima Costa", group.id).await?;

        let found = find_students_by_exact_name(&db, "ana lima").await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].full_name, "Ana Lima");

        Ok(())
    }
}
