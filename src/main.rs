use dotenvy::dotenv;
use escolinha::{
    bot,
    config::{self, database, settings},
    core::{billing::SerialReconciler, schedule},
    errors::{Error, Result},
};
use std::{env, sync::Arc, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed class groups on first run
    settings::seed_class_groups(&db, &app_config)
        .await
        .inspect_err(|e| error!("Failed to seed class groups: {}", e))?;

    // 6. Start the monthly reconciliation scheduler
    let reconciler = SerialReconciler::new();
    let _scheduler = schedule::spawn_monthly_scheduler(
        db.clone(),
        reconciler.clone(),
        Duration::from_secs(app_config.billing.check_interval_secs),
    );

    // 7. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, Arc::new(app_config), db, reconciler).await
}
