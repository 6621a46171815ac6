//! Class group entity - A training group (turma) students are enrolled in.
//!
//! Groups are sorted by name and can be deactivated, which only hides them from
//! the default picker. A group cannot be deleted while students reference it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Class group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "class_groups")]
pub struct Model {
    /// Unique identifier for the class group
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Sub-9"); not unique
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Inactive groups are hidden from the default picker
    pub is_active: bool,
    /// When the group was created
    pub created_at: DateTime,
    /// When the group was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between `ClassGroup` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One class group has many students
    #[sea_orm(has_many = "super::student::Entity")]
    Students,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
