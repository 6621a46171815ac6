//! Application settings loading from config.toml
//!
//! The file is optional: every section has defaults, so a fresh checkout runs
//! without one. Class groups listed here are used to seed an empty database.

use crate::{
    core::{class_group, student::DEFAULT_TUITION},
    entities::ClassGroup,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Environment variable pointing at the config file.
pub const CONFIG_PATH_VAR: &str = "CONFIG_PATH";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Billing defaults and scheduler cadence
    pub billing: BillingSettings,
    /// Class groups to create on first run
    pub class_groups: Vec<ClassGroupConfig>,
}

/// The `[billing]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    /// Tuition given to students enrolled without an explicit amount
    pub default_tuition: Decimal,
    /// How often the scheduler checks whether the month needs reconciling
    pub check_interval_secs: u64,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            default_tuition: DEFAULT_TUITION,
            check_interval_secs: 3600,
        }
    }
}

/// One `[[class_groups]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassGroupConfig {
    /// Name of the class group
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
}

impl AppConfig {
    /// Rejects values the rest of the application can't work with.
    pub fn validate(&self) -> Result<()> {
        if self.billing.default_tuition < Decimal::ZERO {
            return Err(Error::Config {
                message: format!(
                    "billing.default_tuition must not be negative (got {})",
                    self.billing.default_tuition
                ),
            });
        }
        if self.billing.check_interval_secs == 0 {
            return Err(Error::Config {
                message: "billing.check_interval_secs must be at least 1".to_string(),
            });
        }
        if let Some(group) = self.class_groups.iter().find(|g| g.name.trim().is_empty()) {
            return Err(Error::Config {
                message: format!("class group with empty name (description: {:?})", group.description),
            });
        }
        Ok(())
    }
}

/// Loads the application configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value fails [`AppConfig::validate`]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `CONFIG_PATH` (default ./config.toml).
///
/// A missing file yields the defaults; an unreadable or invalid one is an error.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        info!("Loading configuration from {path}");
        load_config(&path)
    } else {
        info!("No configuration file at {path}, using defaults");
        Ok(AppConfig::default())
    }
}

/// Creates the configured class groups when the table is still empty.
///
/// Returns the number of groups created.
pub async fn seed_class_groups(db: &DatabaseConnection, config: &AppConfig) -> Result<usize> {
    if ClassGroup::find().count(db).await? > 0 {
        return Ok(0);
    }

    for group in &config.class_groups {
        class_group::create_class_group(db, group.name.clone(), group.description.clone()).await?;
    }

    info!("Seeded {} class group(s)", config.class_groups.len());
    Ok(config.class_groups.len())
}
