//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete,
//! and turns free-text command arguments into dates, amounts and records.

/// Autocomplete handlers for student and class group names
pub mod autocomplete;
/// Parsing and lookup of command arguments
pub mod input;
