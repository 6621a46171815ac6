//! Class group Discord commands - `class_manage` and its subcommands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::or_reply,
            handlers::{autocomplete, input},
        },
        core::class_group::{self, ClassGroupUpdate},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Parent command for managing class groups.
    #[poise::command(
        slash_command,
        subcommands("class_add", "class_edit", "class_delete", "class_list")
    )]
    pub async fn class_manage(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Class group management command. Available subcommands:\n\
            `/class_manage add` - Create a class group\n\
            `/class_manage edit` - Rename, describe or (de)activate a class group\n\
            `/class_manage delete` - Delete a class group without students\n\
            `/class_manage list` - List all class groups";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a new, active class group.
    #[poise::command(slash_command, rename = "add")]
    pub async fn class_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Name (e.g. 'Sub-11')"] name: String,
        #[description = "Optional description"] description: Option<String>,
    ) -> Result<()> {
        let created = class_group::create_class_group(&ctx.data().database, name, description).await;
        if let Some(group) = or_reply(ctx, created).await? {
            ctx.say(format!("✅ Class group '{}' created.", group.name))
                .await?;
        }
        Ok(())
    }

    /// Edits a class group. Only the options you fill in are changed.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn class_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class group to edit"]
        #[autocomplete = "autocomplete::autocomplete_class_group"]
        class_group: String,
        #[description = "New name"] name: Option<String>,
        #[description = "New description (a single '-' clears it)"] description: Option<String>,
        #[description = "Whether new students can join it"] active: Option<bool>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let Some(group) = or_reply(ctx, input::resolve_class_group(db, &class_group).await).await?
        else {
            return Ok(());
        };

        let update = ClassGroupUpdate {
            name,
            description: description.map(|d| if d.trim() == "-" { None } else { Some(d) }),
            is_active: active,
        };

        let updated = class_group::update_class_group(db, group.id, update).await;
        if let Some(updated) = or_reply(ctx, updated).await? {
            let state = if updated.is_active { "active" } else { "inactive" };
            ctx.say(format!("✅ Class group '{}' updated ({state}).", updated.name))
                .await?;
        }
        Ok(())
    }

    /// Deletes a class group. Refused while any student is enrolled in it.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn class_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class group to delete"]
        #[autocomplete = "autocomplete::autocomplete_class_group"]
        class_group: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let result = match input::resolve_class_group(db, &class_group).await {
            Ok(group) => class_group::delete_class_group(db, group.id)
                .await
                .map(|()| group.name),
            Err(e) => Err(e),
        };

        match result {
            Ok(name) => {
                ctx.say(format!("🗑️ Class group '{name}' deleted.")).await?;
            }
            Err(e @ Error::ClassGroupInUse { .. }) => {
                ctx.say(format!(
                    "⚠️ {e}. Move or delete those students first, or deactivate the group instead."
                ))
                .await?;
            }
            Err(e) if e.is_user_error() => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Lists every class group with its enrolment count.
    #[poise::command(slash_command, rename = "list")]
    pub async fn class_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let groups = class_group::get_all_class_groups(db).await?;

        if groups.is_empty() {
            ctx.say("No class groups yet. Use `/class_manage add` to create one!")
                .await?;
            return Ok(());
        }

        let mut embed_fields = Vec::new();
        for group in groups {
            let enrolled = class_group::count_enrolled_students(db, group.id).await?;
            let state = if group.is_active { "" } else { " (inactive)" };
            let field_name = format!("{}{state}", group.name);
            let field_value = format!(
                "{}\n{enrolled} student(s)",
                group.description.as_deref().unwrap_or("No description")
            );
            embed_fields.push((field_name, field_value, false));
        }

        let list_embed = serenity::CreateEmbed::default()
            .title("**Class Groups**")
            .color(0x0058_65F2)
            .fields(embed_fields);

        ctx.send(poise::CreateReply::default().embed(list_embed))
            .await?;
        Ok(())
    }
}

pub use inner::*;
