//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Escolinha Help**\n\
        Here is a summary of all available commands.\n\n\
        **Billing**\n\
        • `/reconcile [year] [month]` - Posts the month's tuition for every active student.\n\
        • `/dashboard [year] [month]` - Expected, received and overdue revenue.\n\
        • `/payments [student] [status]` - Lists payments, optionally filtered.\n\n\
        **Management Commands**\n\
        • `/class_manage <subcommand>` - Class groups (add, edit, delete, list).\n\
        • `/student_manage <subcommand>` - Students (add, edit, activate, deactivate, delete, list, info).\n\
        • `/payment_manage <subcommand>` - Payments (add, pay, edit, delete, list).\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        Dates are written DD/MM/YYYY and amounts like 40,00 or 40.00.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
