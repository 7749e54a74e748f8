//! Telegram support-desk bot: forwards private messages into per-user forum
//! topics and relays staff replies back.

pub mod components;
pub mod config;
pub mod dispatch;
pub mod telegram;

pub use components::{build_components, AppComponents};
pub use config::BotConfig;
pub use dispatch::{schema, AlbumCollector};
pub use telegram::TelegramTransport;
