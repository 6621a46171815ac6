//! Billing Discord commands - `reconcile` and `dashboard`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::input},
        core::{dashboard, period, report},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Posts the month's tuition for every active student.
    ///
    /// Safe to repeat: students whose month is already covered are left alone,
    /// and a raised tuition only adds the difference.
    #[poise::command(slash_command)]
    pub async fn reconcile(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Year (defaults to the current year)"] year: Option<i32>,
        #[description = "Month 1-12 (defaults to the current month)"]
        #[min = 1]
        #[max = 12]
        month: Option<u32>,
    ) -> Result<()> {
        let month = match input::parse_billing_month(year, month, period::today()) {
            Ok(month) => month,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };

        ctx.defer().await?;
        let data = ctx.data();
        let summary = data
            .reconciler
            .reconcile(&data.database, month.first_day())
            .await?;

        let icon = if summary.failed == 0 { "✅" } else { "⚠️" };
        ctx.say(format!("{icon} {summary}")).await?;
        Ok(())
    }

    /// Shows expected, received and overdue revenue for a month.
    #[poise::command(slash_command)]
    pub async fn dashboard(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Year (defaults to the current year)"] year: Option<i32>,
        #[description = "Month 1-12 (defaults to the current month)"]
        #[min = 1]
        #[max = 12]
        month: Option<u32>,
    ) -> Result<()> {
        let today = period::today();
        let month = match input::parse_billing_month(year, month, today) {
            Ok(month) => month,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };

        let summary = dashboard::build_dashboard(&ctx.data().database, month, today).await?;
        let text = report::format_dashboard(&summary)?;

        let embed = serenity::CreateEmbed::default()
            .title(format!("📊 Dashboard {month}"))
            .description(format!("```\n{text}```"))
            .color(0x0058_65F2);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

pub use inner::*;
