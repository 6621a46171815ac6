//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Reconciliation and dashboard commands
pub mod billing;

/// Option enums shared by several commands
pub mod choices;

/// Class group management commands
pub mod class_group;

/// General utility commands
pub mod general;

/// Payment management and ledger commands
pub mod payment;

/// Student management commands
pub mod student;

// Export commands
pub use billing::*;
pub use class_group::*;
pub use general::*;
pub use payment::*;
pub use student::*;

use crate::{
    bot::BotData,
    errors::{Error, Result},
};

/// Answers operator mistakes in the channel instead of failing the command.
///
/// Returns `Ok(None)` after replying to a user error, the value on success,
/// and propagates anything else to the framework's error handler.
pub(crate) async fn or_reply<T>(
    ctx: poise::Context<'_, BotData, Error>,
    result: Result<T>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_user_error() => {
            ctx.say(format!("❌ {e}")).await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Sends long listings as several messages.
pub(crate) async fn say_paged(
    ctx: poise::Context<'_, BotData, Error>,
    lines: &[String],
) -> Result<()> {
    for page in crate::core::report::paginate(lines, 1900) {
        ctx.say(page).await?;
    }
    Ok(())
}
