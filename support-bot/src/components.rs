//! Component factory: builds AppComponents from config. Isolates assembly
//! logic from the runner.

use anyhow::Result;
use desk_core::texts::{Language, TextCatalog};
use relay_engine::{EngineOptions, RelayEngine, ReminderScheduler};
use std::sync::Arc;
use storage::{
    CatalogRepository, JobRepository, SettingsRepository, SqlitePoolManager, TicketRepository,
};
use teloxide::prelude::*;
use tracing::{error, info, instrument};

use crate::config::BotConfig;
use crate::telegram::TelegramTransport;

/// Core dependencies for the dispatcher and the reminder loop.
pub struct AppComponents {
    pub bot: Bot,
    pub engine: Arc<RelayEngine>,
    pub scheduler: ReminderScheduler,
}

/// Initializes storage, the Telegram transport, and the relay engine.
#[instrument(skip(config))]
pub async fn build_components(config: &BotConfig) -> Result<AppComponents> {
    let pool_manager = SqlitePoolManager::new(&config.sqlite_path)
        .await
        .map_err(|e| {
            error!(error = %e, path = %config.sqlite_path, "Failed to open SQLite database");
            anyhow::anyhow!("Failed to open SQLite database: {}", e)
        })?;

    let tickets = TicketRepository::new(pool_manager.clone()).await?;
    let settings = SettingsRepository::new(pool_manager.clone()).await?;
    let quick_replies = CatalogRepository::quick_replies(pool_manager.clone()).await?;
    let faq = CatalogRepository::faq(pool_manager.clone()).await?;
    let jobs = JobRepository::new(pool_manager).await?;

    let bot = Bot::new(config.bot_token.clone());
    let transport = Arc::new(TelegramTransport::new(
        bot.clone(),
        config.group_id,
        config.icon_new.clone(),
        config.icon_active.clone(),
        config.icon_resolved.clone(),
        quick_replies.clone(),
    ));

    let default_language = Language::from_code(&config.default_language).unwrap_or(Language::En);
    let texts = TextCatalog::new(default_language)?;

    let scheduler = ReminderScheduler::new(jobs);
    let engine = Arc::new(RelayEngine::new(
        tickets,
        settings,
        quick_replies,
        faq,
        transport,
        scheduler.clone(),
        texts,
        EngineOptions {
            reminders_enabled: config.reminders_enabled,
            security_filter_enabled: config.security_filter_enabled,
        },
    ));

    info!(
        group_id = config.group_id,
        reminders_enabled = config.reminders_enabled,
        security_filter_enabled = config.security_filter_enabled,
        "Components initialized"
    );

    Ok(AppComponents {
        bot,
        engine,
        scheduler,
    })
}
