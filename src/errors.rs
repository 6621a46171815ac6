//! Unified error type for the whole crate.
//!
//! Every fallible function in `core`, `config` and `bot` returns [`Result`].

use poise::serenity_prelude as serenity;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// All errors produced by the application.
#[derive(Debug, Error)]
pub enum Error {
    /// Any failure reported by the persistence layer
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A record was rejected because one of its fields is invalid
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// Operator-facing explanation
        message: String,
    },

    /// Currency amounts must be non-negative
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// No student with this id
    #[error("Student not found: {id}")]
    StudentNotFound {
        /// Requested id
        id: i64,
    },

    /// No class group with this id
    #[error("Class group not found: {id}")]
    ClassGroupNotFound {
        /// Requested id
        id: i64,
    },

    /// No payment with this id
    #[error("Payment not found: {id}")]
    PaymentNotFound {
        /// Requested id
        id: i64,
    },

    /// A class group cannot be removed while students reference it
    #[error("Class group '{name}' still has {enrolled} enrolled student(s)")]
    ClassGroupInUse {
        /// Name of the class group
        name: String,
        /// Number of students still referencing it
        enrolled: u64,
    },

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Integer conversion error: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// Errors bubbling up from serenity/poise
    #[error("Discord framework error: {0}")]
    Framework(Box<serenity::Error>),
}

impl From<serenity::Error> for Error {
    fn from(value: serenity::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Whether this error comes from bad operator input rather than a
    /// failing dependency.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::InvalidAmount { .. }
                | Self::StudentNotFound { .. }
                | Self::ClassGroupNotFound { .. }
                | Self::PaymentNotFound { .. }
                | Self::ClassGroupInUse { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
