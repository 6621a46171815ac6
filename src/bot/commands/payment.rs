//! Payment Discord commands - `payment_manage` and the `payments` ledger.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{
                choices::{MethodChoice, StatusChoice},
                or_reply, say_paged,
            },
            handlers::{autocomplete, input},
        },
        core::{
            payment::{self, ManualPayment, PaymentFilter, PaymentUpdate},
            period::{self, BillingMonth},
            report,
        },
        errors::{Error, Result},
    };

    /// Parent command for managing payments.
    #[poise::command(
        slash_command,
        subcommands(
            "payment_add",
            "payment_pay",
            "payment_edit",
            "payment_delete",
            "payment_list"
        )
    )]
    pub async fn payment_manage(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Payment management command. Available subcommands:\n\
            `/payment_manage add` - Record a payment by hand\n\
            `/payment_manage pay` - Confirm that a payment was received\n\
            `/payment_manage edit` - Correct a payment\n\
            `/payment_manage delete` - Delete a payment\n\
            `/payment_manage list` - Show a student's payments";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Records a payment for a student.
    ///
    /// Without an amount the student's tuition is used; without a due date the
    /// current month's due date is used.
    #[poise::command(slash_command, rename = "add")]
    pub async fn payment_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student"]
        #[autocomplete = "autocomplete::autocomplete_student"]
        student: String,
        #[description = "Amount (defaults to the student's tuition)"] amount: Option<String>,
        #[description = "Due date (DD/MM/YYYY, defaults to this month's due date)"]
        due_date: Option<String>,
        #[description = "Date received, if already paid (DD/MM/YYYY)"] paid_on: Option<String>,
        #[description = "Payment method (defaults to Pix)"] method: Option<MethodChoice>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let today = period::today();

        let result = async {
            let target = input::resolve_student(db, &student).await?;
            let entry = ManualPayment {
                due_date: input::parse_optional_date(due_date.as_deref())?
                    .unwrap_or_else(|| BillingMonth::containing(today).due_date()),
                amount: input::parse_optional_amount(amount.as_deref())?,
                payment_date: input::parse_optional_date(paid_on.as_deref())?,
                method: method.map(Into::into).unwrap_or_default(),
            };
            let created = payment::record_manual_payment(db, target.id, entry).await?;
            Ok::<_, Error>((target.full_name, created))
        }
        .await;

        if let Some((name, created)) = or_reply(ctx, result).await? {
            ctx.say(format!(
                "✅ Payment recorded for {name}:\n`{}`",
                report::format_payment_line(&created, today)
            ))
            .await?;
        }
        Ok(())
    }

    /// Confirms that a payment was received.
    #[poise::command(slash_command, rename = "pay")]
    pub async fn payment_pay(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Payment number (see /payment_manage list)"] payment_id: i64,
        #[description = "Date received (DD/MM/YYYY, defaults to today)"] paid_on: Option<String>,
        #[description = "Payment method (keeps the current one if empty)"] method: Option<
            MethodChoice,
        >,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let today = period::today();

        let result = async {
            let paid_on = input::parse_optional_date(paid_on.as_deref())?.unwrap_or(today);
            payment::mark_payment_paid(db, payment_id, paid_on, method.map(Into::into)).await
        }
        .await;

        if let Some(updated) = or_reply(ctx, result).await? {
            ctx.say(format!(
                "💰 `{}`",
                report::format_payment_line(&updated, today)
            ))
            .await?;
        }
        Ok(())
    }

    /// Corrects a payment. Only the options you fill in are changed.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn payment_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Payment number"] payment_id: i64,
        #[description = "New amount"] amount: Option<String>,
        #[description = "New due date (DD/MM/YYYY)"] due_date: Option<String>,
        #[description = "New payment date ('-' marks it unpaid)"] paid_on: Option<String>,
        #[description = "New payment method"] method: Option<MethodChoice>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let today = period::today();

        let result = async {
            let payment_date = match paid_on.as_deref().map(str::trim) {
                Some("-") => Some(None),
                Some(raw) => Some(Some(input::parse_date(raw)?)),
                None => None,
            };
            let update = PaymentUpdate {
                due_date: input::parse_optional_date(due_date.as_deref())?,
                payment_date,
                method: method.map(Into::into),
                amount: input::parse_optional_amount(amount.as_deref())?,
            };
            payment::update_payment(db, payment_id, update).await
        }
        .await;

        if let Some(updated) = or_reply(ctx, result).await? {
            ctx.say(format!(
                "✅ Updated `{}`",
                report::format_payment_line(&updated, today)
            ))
            .await?;
        }
        Ok(())
    }

    /// Deletes a payment.
    ///
    /// If it was part of a month's tuition, the next billing run posts the
    /// missing amount again.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn payment_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Payment number"] payment_id: i64,
    ) -> Result<()> {
        let result = payment::delete_payment(&ctx.data().database, payment_id).await;

        if let Some(removed) = or_reply(ctx, result).await? {
            ctx.say(format!(
                "🗑️ Deleted `{}`",
                report::format_payment_line(&removed, period::today())
            ))
            .await?;
        }
        Ok(())
    }

    /// Shows every payment of one student, latest first.
    #[poise::command(slash_command, rename = "list")]
    pub async fn payment_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student"]
        #[autocomplete = "autocomplete::autocomplete_student"]
        student: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let today = period::today();

        let result = async {
            let target = input::resolve_student(db, &student).await?;
            let payments = payment::get_payments_for_student(db, target.id).await?;
            Ok::<_, Error>((target, payments))
        }
        .await;
        let Some((target, payments)) = or_reply(ctx, result).await? else {
            return Ok(());
        };

        if payments.is_empty() {
            ctx.say(format!("{} has no payments yet.", target.full_name))
                .await?;
            return Ok(());
        }

        let mut lines = vec![format!("**Payments of {}**", target.full_name)];
        lines.extend(
            payments
                .iter()
                .map(|p| format!("`{}`", report::format_payment_line(p, today))),
        );
        say_paged(ctx, &lines).await
    }

    /// Lists payments across all students, optionally filtered.
    #[poise::command(slash_command)]
    pub async fn payments(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Part of the student's name"] student: Option<String>,
        #[description = "Only payments with this status"] status: Option<StatusChoice>,
    ) -> Result<()> {
        let today = period::today();
        let filter = PaymentFilter {
            student_name: student,
            status: status.map(Into::into),
        };

        let rows = payment::filter_payments(&ctx.data().database, &filter, today).await?;
        if rows.is_empty() {
            ctx.say("No payments match.").await?;
            return Ok(());
        }

        let mut lines = vec![format!("**{} payment(s)**", rows.len())];
        lines.extend(
            rows.iter()
                .map(|(p, s)| format!("`{}`", report::format_ledger_line(p, s, today))),
        );
        say_paged(ctx, &lines).await
    }
}

pub use inner::*;
