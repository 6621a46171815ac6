//! Student entity - An enrolled athlete and the tuition they are billed monthly.
//!
//! Students are never hard-deleted in normal operation: `is_active = false`
//! removes them from rosters and from monthly billing while keeping their
//! payment history. The guardian contact is stored digits-only.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Unique identifier for the student
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name, also the default sort key
    pub full_name: String,
    /// Date of birth
    pub birth_date: Date,
    /// Name of the parent or guardian
    pub guardian_name: Option<String>,
    /// Guardian phone number, digits only
    pub guardian_contact: Option<String>,
    /// Monthly tuition charged by the reconciler
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub tuition: Decimal,
    /// Inactive students are skipped by monthly billing
    pub is_active: bool,
    /// Class group the student trains in
    pub class_group_id: i64,
    /// When the student was enrolled
    pub created_at: DateTime,
    /// When the student was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each student belongs to one class group; the group cannot be removed under them
    #[sea_orm(
        belongs_to = "super::class_group::Entity",
        from = "Column::ClassGroupId",
        to = "super::class_group::Column::Id",
        on_delete = "Restrict"
    )]
    ClassGroup,
    /// One student has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::class_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClassGroup.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
