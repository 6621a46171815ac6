//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions are `Name #id` labels so that students sharing a name stay
//! distinguishable; [`super::input`] reads the id back.

use crate::{
    bot::{BotData, handlers::input::record_label},
    core::{class_group, student},
    entities::{class_group as class_group_entity, student as student_entity},
    errors::Error,
};

/// Discord autocomplete limit
const MAX_SUGGESTIONS: usize = 25;

/// Label for a student, flagging inactive ones.
#[must_use]
pub fn student_label(s: &student_entity::Model) -> String {
    if s.is_active {
        record_label(&s.full_name, s.id)
    } else {
        record_label(&format!("{} (inactive)", s.full_name), s.id)
    }
}

/// Keeps the class groups whose name contains `partial`, ignoring case.
#[must_use]
pub fn matching_class_groups(groups: Vec<class_group_entity::Model>, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    groups
        .into_iter()
        .filter(|g| g.name.to_lowercase().contains(&partial_lower))
        .map(|g| record_label(&g.name, g.id))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Provides autocomplete suggestions for students, active ones first.
pub async fn autocomplete_student(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;

    let Ok(students) = student::search_students_by_name(db, partial, MAX_SUGGESTIONS as u64).await
    else {
        return Vec::new();
    };

    students.iter().map(student_label).collect()
}

/// Provides autocomplete suggestions for class groups that accept students.
pub async fn autocomplete_active_class_group(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;

    let Ok(groups) = class_group::get_selectable_class_groups(db, None).await else {
        return Vec::new();
    };

    matching_class_groups(groups, partial)
}

/// Provides autocomplete suggestions for every class group, active or not.
pub async fn autocomplete_class_group(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;

    let Ok(groups) = class_group::get_all_class_groups(db).await else {
        return Vec::new();
    };

    matching_class_groups(groups, partial)
}
