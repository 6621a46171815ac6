//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod class_group;
pub mod payment;
pub mod student;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use class_group::{
    Column as ClassGroupColumn, Entity as ClassGroup, Model as ClassGroupModel,
};
pub use payment::{
    Column as PaymentColumn, Entity as Payment, Model as PaymentModel, PaymentMethod,
};
pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
