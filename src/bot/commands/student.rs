//! Student Discord commands - `student_manage` and its subcommands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{or_reply, say_paged},
            handlers::{autocomplete, input},
        },
        core::{
            period, report,
            student::{self, NewStudent, StudentUpdate},
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// `-` clears an optional text field, anything else replaces it.
    fn clearable(value: Option<String>) -> Option<Option<String>> {
        value.map(|v| if v.trim() == "-" { None } else { Some(v) })
    }

    /// Parent command for managing students.
    #[poise::command(
        slash_command,
        subcommands(
            "student_add",
            "student_edit",
            "student_activate",
            "student_deactivate",
            "student_delete",
            "student_list",
            "student_info"
        )
    )]
    pub async fn student_manage(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Student management command. Available subcommands:\n\
            `/student_manage add` - Enrol a student\n\
            `/student_manage edit` - Change a student's details or tuition\n\
            `/student_manage activate` / `deactivate` - Start or stop monthly billing\n\
            `/student_manage delete` - Delete a student and their payment history\n\
            `/student_manage list` - List students\n\
            `/student_manage info` - Show a student's account";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Enrols a new, active student.
    #[poise::command(slash_command, rename = "add")]
    pub async fn student_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Full name"] name: String,
        #[description = "Date of birth (DD/MM/YYYY)"] birth_date: String,
        #[description = "Class group"]
        #[autocomplete = "autocomplete::autocomplete_active_class_group"]
        class_group: String,
        #[description = "Monthly tuition (defaults to the configured amount)"] tuition: Option<
            String,
        >,
        #[description = "Parent or guardian name"] guardian_name: Option<String>,
        #[description = "Guardian phone"] guardian_contact: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;

        let parsed = async {
            let birth_date = input::parse_date(&birth_date)?;
            let tuition = input::parse_optional_amount(tuition.as_deref())?
                .unwrap_or(data.config.billing.default_tuition);
            let group = input::resolve_class_group(db, &class_group).await?;
            if !group.is_active {
                return Err(Error::Validation {
                    field: "class group",
                    message: format!("'{}' is inactive", group.name),
                });
            }
            student::create_student(
                db,
                NewStudent {
                    full_name: name,
                    birth_date,
                    guardian_name,
                    guardian_contact,
                    tuition,
                    class_group_id: group.id,
                },
            )
            .await
            .map(|s| (s, group.name))
        }
        .await;

        if let Some((created, group_name)) = or_reply(ctx, parsed).await? {
            ctx.say(format!(
                "✅ {} enrolled in {group_name} with tuition **{}**.",
                created.full_name,
                report::format_currency(created.tuition)
            ))
            .await?;
        }
        Ok(())
    }

    /// Edits a student. Only the options you fill in are changed.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn student_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student to edit"]
        #[autocomplete = "autocomplete::autocomplete_student"]
        student: String,
        #[description = "New full name"] name: Option<String>,
        #[description = "New date of birth (DD/MM/YYYY)"] birth_date: Option<String>,
        #[description = "New class group"]
        #[autocomplete = "autocomplete::autocomplete_active_class_group"]
        class_group: Option<String>,
        #[description = "New monthly tuition"] tuition: Option<String>,
        #[description = "New guardian name ('-' clears it)"] guardian_name: Option<String>,
        #[description = "New guardian phone ('-' clears it)"] guardian_contact: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let result = async {
            let target = input::resolve_student(db, &student).await?;
            let class_group_id = match class_group.as_deref() {
                Some(arg) => Some(input::resolve_class_group(db, arg).await?.id),
                None => None,
            };
            let update = StudentUpdate {
                full_name: name,
                birth_date: input::parse_optional_date(birth_date.as_deref())?,
                guardian_name: clearable(guardian_name),
                guardian_contact: clearable(guardian_contact),
                tuition: input::parse_optional_amount(tuition.as_deref())?,
                class_group_id,
            };
            student::update_student(db, target.id, update).await
        }
        .await;

        if let Some(updated) = or_reply(ctx, result).await? {
            ctx.say(format!(
                "✅ {} updated. Tuition: **{}**. Tuition changes apply from the next billing run.",
                updated.full_name,
                report::format_currency(updated.tuition)
            ))
            .await?;
        }
        Ok(())
    }

    async fn set_active(
        ctx: poise::Context<'_, BotData, Error>,
        student: &str,
        is_active: bool,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let result = async {
            let target = input::resolve_student(db, student).await?;
            student::set_student_active(db, target.id, is_active).await
        }
        .await;

        if let Some(updated) = or_reply(ctx, result).await? {
            let message = if is_active {
                format!("✅ {} is active and will be billed monthly.", updated.full_name)
            } else {
                format!(
                    "⏸️ {} is inactive. Payment history is kept; no new months will be billed.",
                    updated.full_name
                )
            };
            ctx.say(message).await?;
        }
        Ok(())
    }

    /// Reactivates a student so monthly billing resumes.
    #[poise::command(slash_command, rename = "activate")]
    pub async fn student_activate(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student to activate"]
        #[autocomplete = "autocomplete::autocomplete_student"]
        student: String,
    ) -> Result<()> {
        set_active(ctx, &student, true).await
    }

    /// Deactivates a student. Existing payments stay untouched.
    #[poise::command(slash_command, rename = "deactivate")]
    pub async fn student_deactivate(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student to deactivate"]
        #[autocomplete = "autocomplete::autocomplete_student"]
        student: String,
    ) -> Result<()> {
        set_active(ctx, &student, false).await
    }

    /// Deletes a student together with every payment they have.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn student_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student to delete"]
        #[autocomplete = "autocomplete::autocomplete_student"]
        student: String,
        #[description = "Confirm that the payment history is deleted too"] confirm: bool,
    ) -> Result<()> {
        if !confirm {
            ctx.say("⚠️ Deleting a student also deletes their payments. Set `confirm` to true, or deactivate the student instead.")
                .await?;
            return Ok(());
        }

        let db = &ctx.data().database;
        let result = async {
            let target = input::resolve_student(db, &student).await?;
            let removed = student::delete_student(db, target.id).await?;
            Ok::<_, Error>((target.full_name, removed))
        }
        .await;

        if let Some((name, removed)) = or_reply(ctx, result).await? {
            ctx.say(format!("🗑️ {name} deleted along with {removed} payment(s)."))
                .await?;
        }
        Ok(())
    }

    /// Lists active students, or everyone in one class group.
    #[poise::command(slash_command, rename = "list")]
    pub async fn student_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only this class group (includes inactive students)"]
        #[autocomplete = "autocomplete::autocomplete_class_group"]
        class_group: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let result = async {
            match class_group.as_deref() {
                Some(arg) => {
                    let group = input::resolve_class_group(db, arg).await?;
                    let students = student::list_students_in_class_group(db, group.id).await?;
                    Ok((format!("**Students in {}**", group.name), students))
                }
                None => Ok::<_, Error>((
                    "**Active students**".to_string(),
                    student::list_active_students(db).await?,
                )),
            }
        }
        .await;

        let Some((header, students)) = or_reply(ctx, result).await? else {
            return Ok(());
        };
        if students.is_empty() {
            ctx.say("No students found.").await?;
            return Ok(());
        }

        let mut lines = vec![header];
        lines.extend(students.iter().map(|s| {
            format!(
                "• {} | {}",
                autocomplete::student_label(s),
                report::format_currency(s.tuition)
            )
        }));
        say_paged(ctx, &lines).await
    }

    /// Shows a student's details, balance and latest payments.
    #[poise::command(slash_command, rename = "info")]
    pub async fn student_info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student to show"]
        #[autocomplete = "autocomplete::autocomplete_student"]
        student: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let today = period::today();

        let result = async {
            let target = input::resolve_student(db, &student).await?;
            report::generate_student_statement(db, target.id, Some(6), today).await
        }
        .await;
        let Some(statement) = or_reply(ctx, result).await? else {
            return Ok(());
        };

        let s = &statement.student;
        let guardian = match (&s.guardian_name, &s.guardian_contact) {
            (Some(name), Some(contact)) => format!("{name} ({contact})"),
            (Some(name), None) => name.clone(),
            (None, Some(contact)) => contact.clone(),
            (None, None) => "Not informed".to_string(),
        };
        let payments = if statement.recent_payments.is_empty() {
            "No payments yet".to_string()
        } else {
            statement
                .recent_payments
                .iter()
                .map(|p| report::format_payment_line(p, today))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let embed = serenity::CreateEmbed::default()
            .title(if s.is_active {
                s.full_name.clone()
            } else {
                format!("{} (inactive)", s.full_name)
            })
            .color(if statement.overdue.is_zero() { 0x0057_F287 } else { 0x00ED_4245 })
            .field("Class group", &statement.class_group_name, true)
            .field("Birth date", report::format_date(s.birth_date), true)
            .field("Tuition", report::format_currency(s.tuition), true)
            .field("Guardian", guardian, false)
            .field("Outstanding", report::format_currency(statement.outstanding), true)
            .field("Overdue", report::format_currency(statement.overdue), true)
            .field("Latest payments", format!("```\n{payments}\n```"), false);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_clearable() {
            assert_eq!(clearable(None), None);
            assert_eq!(clearable(Some(" - ".to_string())), Some(None));
            assert_eq!(
                clearable(Some("Maria".to_string())),
                Some(Some("Maria".to_string()))
            );
        }
    }
}

pub use inner::*;
