//! warden - IRC ban ledger bot.

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};
use warden::config::Config;
use warden::db::{Database, Persistence};
use warden::irc::commands::BotCommands;
use warden::{http, supervisor, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "warden.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    config.validate(&BotCommands::builtin().known_names())?;

    info!(
        server = %config.irc.server,
        nick = %config.irc.nickname,
        "Starting warden"
    );

    let db = Database::new(&config.database.path)
        .await
        .with_context(|| format!("opening database {}", config.database.path))?;
    let db: Arc<dyn Persistence> = Arc::new(db);
    let config = Arc::new(config);

    let web_config = config.web.clone();
    let web_db = Arc::clone(&db);
    tokio::spawn(async move {
        if let Err(e) = http::serve(&web_config, web_db).await {
            error!(error = %e, "Web API stopped");
        }
    });

    supervisor::run(config, db).await?;
    info!("Shutdown complete");
    Ok(())
}
