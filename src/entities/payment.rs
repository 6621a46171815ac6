//! Payment entity - One tuition charge (or part of one) owed by a student.
//!
//! There is no stored status column. Whether a payment is paid, pending or
//! overdue is derived from `payment_date`, `due_date` and the current date by
//! [`crate::core::status::classify`]. A student may hold several payments due in
//! the same month (partial payments and top-ups).

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a payment was settled
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentMethod {
    /// Brazilian instant transfer
    #[default]
    #[sea_orm(string_value = "PIX")]
    Pix,
    /// Paid in cash
    #[sea_orm(string_value = "CASH")]
    Cash,
    /// Anything else
    #[sea_orm(string_value = "OTHER")]
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pix => "Pix",
            Self::Cash => "Cash",
            Self::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student this payment belongs to
    pub student_id: i64,
    /// Date the payment is due; determines the billing month it counts towards
    pub due_date: Date,
    /// Date the payment was received, `None` while unpaid
    pub payment_date: Option<Date>,
    /// Settlement method
    pub method: PaymentMethod,
    /// Amount owed
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub amount: Decimal,
    /// When the row was created
    pub created_at: DateTime,
}

impl Model {
    /// A payment is paid as soon as it carries a payment date.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.payment_date.is_some()
    }
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one student and goes away with it
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
