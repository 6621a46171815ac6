//! Core business logic, independent of the chat front end.
//!
//! Every function here takes a database connection and plain values and
//! returns the crate [`Result`](crate::errors::Result), so the same operations
//! back the bot commands, the scheduler and the tests.

/// Monthly billing reconciliation
pub mod billing;
/// Class group management
pub mod class_group;
/// Monthly aggregates for the dashboard
pub mod dashboard;
/// Payment management and queries
pub mod payment;
/// Calendar helpers for billing months
pub mod period;
/// Text formatting and student statements
pub mod report;
/// Reconciliation scheduling and its persisted marker
pub mod schedule;
/// Derived payment status
pub mod status;
/// Student management
pub mod student;
