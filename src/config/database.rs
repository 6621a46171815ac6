//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation. Tables are generated from
//! the entity definitions with `Schema::create_table_from_entity`, so the schema
//! always matches the Rust structs. Creation is idempotent, which lets the
//! application call it on every start.

use crate::entities::{ClassGroup, Payment, Student, SystemState};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/escolinha.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or
/// returns the default local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();

    if let Some(dir) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(dir)?;
    }

    info!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Directory holding the database file, for `sqlite://` URLs that point at one.
fn sqlite_parent_dir(url: &str) -> Option<&str> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    path.rsplit_once('/').map(|(dir, _)| dir).filter(|d| !d.is_empty())
}

/// Creates every table that does not exist yet.
///
/// Order matters: referenced tables come before the tables that point at them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let class_group_table = schema.create_table_from_entity(ClassGroup).if_not_exists().to_owned();
    let student_table = schema.create_table_from_entity(Student).if_not_exists().to_owned();
    let payment_table = schema.create_table_from_entity(Payment).if_not_exists().to_owned();
    let system_state_table = schema.create_table_from_entity(SystemState).if_not_exists().to_owned();

    db.execute(builder.build(&class_group_table)).await?;
    db.execute(builder.build(&student_table)).await?;
    db.execute(builder.build(&payment_table)).await?;
    db.execute(builder.build(&system_state_table)).await?;

    Ok(())
}
