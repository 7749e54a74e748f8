//! Update routing: teloxide updates in, engine events out.
//!
//! The dispatcher never touches ticket state itself; it converts raw
//! updates into the engine's event types and logs handler failures so one
//! bad update cannot stall the polling loop.

use crate::config::BotConfig;
use desk_core::event::{AdminCommand, CallbackEvent, PrivateMessage, StaffCommand, TopicMessage};
use desk_core::types::UserProfile;
use relay_engine::RelayEngine;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{MessageEntityKind, User};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// How long to wait for the remaining parts of an attachment group before
/// relaying it as one unit.
const ALBUM_SETTLE: Duration = Duration::from_millis(1200);

/// Buffers attachment-group parts so an album is relayed as one event.
///
/// The first part of a group parks the event and waits out the settle
/// delay; later parts merge their ids into it and return nothing.
#[derive(Default)]
pub struct AlbumCollector {
    private: Mutex<HashMap<String, PrivateMessage>>,
    topic: Mutex<HashMap<String, TopicMessage>>,
}

impl AlbumCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn collect_private(
        &self,
        key: String,
        event: PrivateMessage,
    ) -> Option<PrivateMessage> {
        {
            let mut pending = self.private.lock().await;
            if let Some(existing) = pending.get_mut(&key) {
                existing.group_ids.push(event.message_id);
                if existing.text.is_none() {
                    existing.text = event.text;
                }
                existing.has_link_entity |= event.has_link_entity;
                return None;
            }
            pending.insert(key.clone(), event);
        }
        tokio::time::sleep(ALBUM_SETTLE).await;
        let mut done = self.private.lock().await.remove(&key)?;
        done.group_ids.sort_unstable();
        Some(done)
    }

    pub async fn collect_topic(&self, key: String, event: TopicMessage) -> Option<TopicMessage> {
        {
            let mut pending = self.topic.lock().await;
            if let Some(existing) = pending.get_mut(&key) {
                existing.group_ids.push(event.message_id);
                if existing.text.is_none() {
                    existing.text = event.text;
                }
                return None;
            }
            pending.insert(key.clone(), event);
        }
        tokio::time::sleep(ALBUM_SETTLE).await;
        let mut done = self.topic.lock().await.remove(&key)?;
        done.group_ids.sort_unstable();
        Some(done)
    }
}

fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.0 as i64,
        full_name: user.full_name(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}

fn has_link_entity(msg: &Message) -> bool {
    let entities = msg.entities().into_iter().flatten();
    let caption_entities = msg.caption_entities().into_iter().flatten();
    entities.chain(caption_entities).any(|e| {
        matches!(
            e.kind,
            MessageEntityKind::Url | MessageEntityKind::TextLink { .. }
        )
    })
}

fn message_text(msg: &Message) -> Option<String> {
    msg.text().or_else(|| msg.caption()).map(str::to_string)
}

pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_edited_message().endpoint(on_edited_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

async fn on_message(
    msg: Message,
    engine: Arc<RelayEngine>,
    config: Arc<BotConfig>,
    albums: Arc<AlbumCollector>,
) -> anyhow::Result<()> {
    if msg.chat.id.0 == config.group_id {
        handle_group_message(msg, engine, albums).await;
    } else if msg.chat.is_private() {
        handle_private_message(msg, engine, config, albums).await;
    }
    Ok(())
}

async fn handle_group_message(
    msg: Message,
    engine: Arc<RelayEngine>,
    albums: Arc<AlbumCollector>,
) {
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(true) {
        return;
    }
    let Some(thread_id) = msg.thread_id else {
        // General topic; the relay only tracks per-ticket topics.
        return;
    };
    let topic_id = thread_id.0 .0 as i64;
    let text = message_text(&msg);

    if let Some(command) = text.as_deref().and_then(StaffCommand::parse) {
        if let Err(err) = engine.handle_staff_command(topic_id, command).await {
            error!(topic_id, error = %err, "Staff command failed");
        }
        return;
    }

    let event = TopicMessage {
        topic_id,
        message_id: msg.id.0 as i64,
        text,
        group_ids: vec![msg.id.0 as i64],
    };

    let event = match msg.media_group_id() {
        Some(group) => {
            let key = format!("g:{}", group);
            match albums.collect_topic(key, event).await {
                Some(merged) => merged,
                None => return,
            }
        }
        None => event,
    };

    if let Err(err) = engine.handle_topic_message(event).await {
        error!(topic_id, error = %err, "Topic message handling failed");
    }
}

async fn handle_private_message(
    msg: Message,
    engine: Arc<RelayEngine>,
    config: Arc<BotConfig>,
    albums: Arc<AlbumCollector>,
) {
    let Some(from) = msg.from.clone() else {
        return;
    };
    if from.is_bot {
        return;
    }
    let profile = profile_of(&from);

    if msg
        .text()
        .map(|t| t.trim_start().starts_with("/start"))
        .unwrap_or(false)
    {
        if let Err(err) = engine.handle_start(profile).await {
            error!(error = %err, "Start handling failed");
        }
        return;
    }

    // Catalog and override management, reserved for the configured operator.
    if config.dev_id == Some(profile.id) {
        if let Some(command) = msg.text().and_then(AdminCommand::parse) {
            if let Err(err) = engine.handle_admin_command(profile.id, command).await {
                error!(error = %err, "Admin command failed");
            }
            return;
        }
    }

    let event = PrivateMessage {
        profile,
        message_id: msg.id.0 as i64,
        text: message_text(&msg),
        has_link_entity: has_link_entity(&msg),
        group_ids: vec![msg.id.0 as i64],
    };

    let event = match msg.media_group_id() {
        Some(group) => {
            let key = format!("p:{}", group);
            match albums.collect_private(key, event).await {
                Some(merged) => merged,
                None => return,
            }
        }
        None => event,
    };

    if let Err(err) = engine.handle_private_message(event).await {
        error!(error = %err, "Private message handling failed");
    }
}

async fn on_edited_message(
    msg: Message,
    engine: Arc<RelayEngine>,
    config: Arc<BotConfig>,
) -> anyhow::Result<()> {
    if !msg.chat.is_private() || msg.chat.id.0 == config.group_id {
        return Ok(());
    }
    let Some(from) = msg.from.clone() else {
        return Ok(());
    };
    let event = PrivateMessage {
        profile: profile_of(&from),
        message_id: msg.id.0 as i64,
        text: message_text(&msg),
        has_link_entity: has_link_entity(&msg),
        group_ids: vec![msg.id.0 as i64],
    };
    if let Err(err) = engine.handle_private_edited(event).await {
        error!(error = %err, "Edited message handling failed");
    }
    Ok(())
}

async fn on_callback(
    query: CallbackQuery,
    engine: Arc<RelayEngine>,
    config: Arc<BotConfig>,
) -> anyhow::Result<()> {
    let Some(data) = query.data.clone() else {
        return Ok(());
    };

    if data == "faq:open" {
        if let Err(err) = engine
            .handle_faq_open(query.from.id.0 as i64, &query.id)
            .await
        {
            error!(error = %err, "FAQ open failed");
        }
        return Ok(());
    }

    let Some(message) = query.message.as_ref().and_then(|m| m.regular_message()) else {
        debug!("Callback without an accessible message");
        return Ok(());
    };
    if message.chat.id.0 != config.group_id {
        return Ok(());
    }
    let Some(thread_id) = message.thread_id else {
        return Ok(());
    };

    let event = CallbackEvent {
        callback_id: query.id.clone(),
        topic_id: thread_id.0 .0 as i64,
        message_id: message.id.0 as i64,
        data,
    };
    if let Err(err) = engine.handle_callback(event).await {
        error!(error = %err, "Callback handling failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_event(message_id: i64, text: Option<&str>) -> PrivateMessage {
        PrivateMessage {
            profile: UserProfile {
                id: 1,
                full_name: "Alice".to_string(),
                username: None,
                language_code: None,
            },
            message_id,
            text: text.map(str::to_string),
            has_link_entity: false,
            group_ids: vec![message_id],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn album_parts_merge_into_first_event() {
        let collector = Arc::new(AlbumCollector::new());

        let first = {
            let collector = collector.clone();
            tokio::spawn(async move {
                collector
                    .collect_private("p:album1".to_string(), private_event(10, None))
                    .await
            })
        };
        tokio::task::yield_now().await;

        // Second part lands while the first is settling.
        let second = collector
            .collect_private("p:album1".to_string(), private_event(11, Some("caption")))
            .await;
        assert!(second.is_none());

        let merged = first.await.unwrap().expect("first part should flush");
        assert_eq!(merged.group_ids, vec![10, 11]);
        assert_eq!(merged.text.as_deref(), Some("caption"));
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_albums_do_not_mix() {
        let collector = Arc::new(AlbumCollector::new());

        let first = {
            let collector = collector.clone();
            tokio::spawn(async move {
                collector
                    .collect_private("p:a".to_string(), private_event(10, None))
                    .await
            })
        };
        tokio::task::yield_now().await;

        let other = {
            let collector = collector.clone();
            tokio::spawn(async move {
                collector
                    .collect_private("p:b".to_string(), private_event(20, None))
                    .await
            })
        };

        let merged = first.await.unwrap().expect("flush a");
        assert_eq!(merged.group_ids, vec![10]);
        let merged = other.await.unwrap().expect("flush b");
        assert_eq!(merged.group_ids, vec![20]);
    }
}
