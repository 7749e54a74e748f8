//! Forum topic provisioning.
//!
//! One ticket maps to at most one forum topic. `ensure_topic` is called
//! under the engine's per-user lock, so the create path never races with
//! itself for the same user.

use desk_core::error::{DeskError, Result};
use desk_core::security::{sanitize_display_name, SENSITIVE_PLACEHOLDER};
use desk_core::texts::{user_link, TextCatalog, TextKey};
use desk_core::transport::{SupportTransport, TopicIcon};
use desk_core::types::Ticket;
use std::sync::Arc;
use tracing::info;

pub struct TopicProvisioner {
    transport: Arc<dyn SupportTransport>,
    texts: TextCatalog,
}

impl TopicProvisioner {
    pub fn new(transport: Arc<dyn SupportTransport>, texts: TextCatalog) -> Self {
        Self { transport, texts }
    }

    /// Returns the ticket's topic id, creating the topic first if needed.
    ///
    /// A new topic is named after the sanitized display name, marked with
    /// the "new" icon and opened with a pinned header message linking back
    /// to the user. The caller persists the updated ticket.
    pub async fn ensure_topic(&self, ticket: &mut Ticket) -> Result<i64> {
        if let Some(topic_id) = ticket.topic_id {
            return Ok(topic_id);
        }

        let display_name =
            sanitize_display_name(Some(&ticket.full_name), SENSITIVE_PLACEHOLDER);
        let topic_id = self.transport.create_topic(&display_name).await?;
        ticket.topic_id = Some(topic_id);
        info!(user_id = ticket.user_id, topic_id, "Created forum topic");

        if let Err(err) = self
            .transport
            .set_topic_icon(topic_id, TopicIcon::New)
            .await
        {
            if !err.is_ignorable() {
                return Err(DeskError::Transport(err));
            }
        }

        let header = self
            .texts
            .get_for(ticket.language_code.as_deref(), TextKey::UserStartedBot)
            .replace(
                "{name}",
                &user_link(&display_name, ticket.user_id, ticket.username.as_deref()),
            );
        let header_id = self.transport.send_to_topic(topic_id, &header).await?;
        if let Err(err) = self.transport.pin_group_message(header_id, true).await {
            if !err.is_ignorable() {
                // A missing pin permission should not lose the topic.
                tracing::warn!(topic_id, error = %err, "Failed to pin topic header");
            }
        }

        Ok(topic_id)
    }

    /// Drops a stale topic mapping so the next `ensure_topic` re-provisions.
    pub fn invalidate(&self, ticket: &mut Ticket) {
        info!(
            user_id = ticket.user_id,
            topic_id = ?ticket.topic_id,
            "Invalidating stale topic mapping"
        );
        ticket.topic_id = None;
        ticket.operator_replied = false;
    }
}
