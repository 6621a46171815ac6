//! Class group business logic - Create, edit, list and remove training groups.
//!
//! Removing a group is restricted: it fails with [`Error::ClassGroupInUse`] while
//! any student, active or not, still references it.

use crate::{
    entities::{ClassGroup, Student, class_group, student},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};

/// Partial update of a class group; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ClassGroupUpdate {
    /// New name
    pub name: Option<String>,
    /// New description; `Some(None)` clears it
    pub description: Option<Option<String>>,
    /// New active flag
    pub is_active: Option<bool>,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            field: "name",
            message: "Class group name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Creates a new, active class group.
pub async fn create_class_group(
    db: &DatabaseConnection,
    name: String,
    description: Option<String>,
) -> Result<class_group::Model> {
    let name = validate_name(&name)?;
    let now = chrono::Utc::now().naive_utc();

    let group = class_group::ActiveModel {
        name: Set(name),
        description: Set(clean_description(description)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(group.insert(db).await?)
}

/// Applies a partial update to an existing class group.
pub async fn update_class_group(
    db: &DatabaseConnection,
    class_group_id: i64,
    update: ClassGroupUpdate,
) -> Result<class_group::Model> {
    let existing = get_class_group_by_id(db, class_group_id)
        .await?
        .ok_or(Error::ClassGroupNotFound { id: class_group_id })?;

    let mut active_model: class_group::ActiveModel = existing.into();
    if let Some(name) = update.name {
        active_model.name = Set(validate_name(&name)?);
    }
    if let Some(description) = update.description {
        active_model.description = Set(clean_description(description));
    }
    if let Some(is_active) = update.is_active {
        active_model.is_active = Set(is_active);
    }
    active_model.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(active_model.update(db).await?)
}

/// Finds a class group by id.
pub async fn get_class_group_by_id<C>(db: &C, class_group_id: i64) -> Result<Option<class_group::Model>>
where
    C: ConnectionTrait,
{
    ClassGroup::find_by_id(class_group_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every class group, active or not, ordered by name.
pub async fn get_all_class_groups(db: &DatabaseConnection) -> Result<Vec<class_group::Model>> {
    ClassGroup::find()
        .order_by_asc(class_group::Column::Name)
        .order_by_asc(class_group::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the groups a student may be assigned to: every active group, plus
/// `current` even when it has since been deactivated.
pub async fn get_selectable_class_groups(
    db: &DatabaseConnection,
    current: Option<i64>,
) -> Result<Vec<class_group::Model>> {
    let mut condition = Condition::any().add(class_group::Column::IsActive.eq(true));
    if let Some(current_id) = current {
        condition = condition.add(class_group::Column::Id.eq(current_id));
    }

    ClassGroup::find()
        .filter(condition)
        .order_by_asc(class_group::Column::Name)
        .order_by_asc(class_group::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts the students (active or not) enrolled in a group.
pub async fn count_enrolled_students<C>(db: &C, class_group_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Student::find()
        .filter(student::Column::ClassGroupId.eq(class_group_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Deletes a class group that no student references.
///
/// The check and the delete run in one transaction so nothing changes when
/// the group is still in use.
pub async fn delete_class_group(db: &DatabaseConnection, class_group_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let group = get_class_group_by_id(&txn, class_group_id)
        .await?
        .ok_or(Error::ClassGroupNotFound { id: class_group_id })?;

    let enrolled = count_enrolled_students(&txn, class_group_id).await?;
    if enrolled > 0 {
        return Err(Error::ClassGroupInUse {
            name: group.name,
            enrolled,
        });
    }

    group.delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(class_group_id, "Deleted class group");
    Ok(())
}
