use anyhow::{bail, Context, Result};
use std::env;

/// Bot configuration, loaded once from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Staff forum group (supergroup with topics enabled).
    pub group_id: i64,
    /// Optional operator id notified about startup problems.
    pub dev_id: Option<i64>,
    /// Custom emoji ids for the topic status icons; unset icons are skipped.
    pub icon_new: Option<String>,
    pub icon_active: Option<String>,
    pub icon_resolved: Option<String>,
    pub default_language: String,
    pub reminders_enabled: bool,
    pub security_filter_enabled: bool,
    pub sqlite_path: String,
    pub log_file: String,
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

impl BotConfig {
    /// Loads configuration from the environment. A token passed on the
    /// command line takes precedence over `BOT_TOKEN`.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        if bot_token.trim().is_empty() {
            bail!("BOT_TOKEN is empty");
        }

        let group_id: i64 = env::var("BOT_GROUP_ID")
            .context("BOT_GROUP_ID not set")?
            .trim()
            .parse()
            .context("BOT_GROUP_ID is not a number")?;

        let dev_id = match env::var("BOT_DEV_ID") {
            Ok(value) => Some(
                value
                    .trim()
                    .parse::<i64>()
                    .context("BOT_DEV_ID is not a number")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            bot_token,
            group_id,
            dev_id,
            icon_new: env::var("BOT_TOPIC_ICON_NEW").ok().filter(|v| !v.is_empty()),
            icon_active: env::var("BOT_TOPIC_ICON_ACTIVE")
                .ok()
                .filter(|v| !v.is_empty()),
            icon_resolved: env::var("BOT_TOPIC_ICON_RESOLVED")
                .ok()
                .filter(|v| !v.is_empty()),
            default_language: env::var("BOT_DEFAULT_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),
            reminders_enabled: env_flag("BOT_REMINDERS_ENABLED", true),
            security_filter_enabled: env_flag("SECURITY_FILTER_ENABLED", true),
            sqlite_path: env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "./data/support-bot.sqlite3".to_string()),
            log_file: env::var("LOG_FILE")
                .unwrap_or_else(|_| "logs/support-bot.log".to_string()),
        })
    }
}
