//! Binary for the support-desk relay bot.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_engine::JobHandler;
use std::path::Path;
use std::sync::Arc;
use support_bot::{build_components, schema, AlbumCollector, BotConfig};
use teloxide::prelude::*;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "support-bot")]
#[command(about = "Telegram support-desk relay bot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { token } => run(token).await,
    }
}

async fn run(token: Option<String>) -> Result<()> {
    let config = BotConfig::load(token)?;

    ensure_parent_dir(&config.sqlite_path)?;
    ensure_parent_dir(&config.log_file)?;
    desk_core::logger::init_tracing(&config.log_file)?;

    let components = build_components(&config).await?;
    info!("Starting support-desk bot");

    let handler: Arc<dyn JobHandler> = components.engine.clone();
    let scheduler = components.scheduler.clone();
    tokio::spawn(async move {
        scheduler.run(handler).await;
    });

    if let Some(dev_id) = config.dev_id {
        let notice = components
            .bot
            .send_message(ChatId(dev_id), "Support bot started")
            .await;
        if let Err(err) = notice {
            warn!(dev_id, error = %err, "Failed to notify the developer chat");
        }
    }

    let albums = Arc::new(AlbumCollector::new());
    Dispatcher::builder(components.bot, schema())
        .dependencies(dptree::deps![
            components.engine,
            Arc::new(config),
            albums
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
