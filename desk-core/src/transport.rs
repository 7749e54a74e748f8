//! Outbound messaging abstraction.
//!
//! [`SupportTransport`] is transport-agnostic; `support-bot` implements it
//! via teloxide, tests substitute a recording mock. All methods may fail
//! with a [`TransportError`] whose variants the engine branches on.

use crate::error::TransportError;
use crate::types::Attachment;
use async_trait::async_trait;

/// Status indicator shown as the topic icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicIcon {
    /// New or unanswered ticket.
    New,
    /// Staff has replied since the last reset.
    Active,
    /// Ticket resolved.
    Resolved,
}

/// Inline keyboard attached to an outbound message. The engine only decides
/// which surface to show; rendering button labels is the adapter's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Main control panel for a ticket.
    Panel { user_id: i64, resolved: bool },
    /// Status submenu of the panel.
    StatusMenu { user_id: i64, resolved: bool },
    /// Single delete button cascading to relayed copies.
    DeleteButton { origin_message_id: i64 },
    /// "Open FAQ" suggestion shown to the user.
    FaqSuggestion,
}

/// Outbound side of the relay. Chat routing is baked in at construction:
/// the adapter knows the staff group id, so topic operations only carry the
/// topic id and user operations only the user id.
#[async_trait]
pub trait SupportTransport: Send + Sync {
    /// Sends text into a user's private chat. Returns the new message id.
    async fn send_to_user(&self, user_id: i64, text: &str) -> Result<i64, TransportError>;

    /// Sends text into a user's private chat with an inline keyboard.
    async fn send_to_user_with_markup(
        &self,
        user_id: i64,
        text: &str,
        markup: Markup,
    ) -> Result<i64, TransportError>;

    /// Replies to a message in a user's private chat.
    async fn reply_to_user(
        &self,
        user_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<i64, TransportError>;

    /// Sends a media attachment into a user's private chat.
    async fn send_attachment_to_user(
        &self,
        user_id: i64,
        attachment: &Attachment,
    ) -> Result<i64, TransportError>;

    /// Sends text into a forum topic of the staff group.
    async fn send_to_topic(&self, topic_id: i64, text: &str) -> Result<i64, TransportError>;

    /// Sends text into a topic with an inline keyboard.
    async fn send_to_topic_with_markup(
        &self,
        topic_id: i64,
        text: &str,
        markup: Markup,
    ) -> Result<i64, TransportError>;

    /// Sends a force-reply prompt into a topic (staff reply affordance).
    async fn send_reply_prompt(
        &self,
        topic_id: i64,
        text: &str,
        placeholder: &str,
    ) -> Result<i64, TransportError>;

    /// Replies to a staff message inside the group.
    async fn reply_in_group(
        &self,
        message_id: i64,
        topic_id: i64,
        text: &str,
    ) -> Result<i64, TransportError>;

    /// Forwards a user's private message into its topic.
    async fn forward_to_topic(
        &self,
        topic_id: i64,
        from_user_id: i64,
        message_id: i64,
    ) -> Result<i64, TransportError>;

    /// Copies staff group messages (one or an attachment group) to a user.
    /// Returns the created private-side message ids, in order.
    async fn copy_to_user(
        &self,
        user_id: i64,
        message_ids: &[i64],
    ) -> Result<Vec<i64>, TransportError>;

    /// Edits the text and keyboard of an existing group message.
    async fn edit_group_message(
        &self,
        message_id: i64,
        text: &str,
        markup: Option<Markup>,
    ) -> Result<(), TransportError>;

    /// Replaces only the keyboard of an existing group message.
    async fn edit_group_markup(
        &self,
        message_id: i64,
        markup: Markup,
    ) -> Result<(), TransportError>;

    /// Pins a group message.
    async fn pin_group_message(
        &self,
        message_id: i64,
        disable_notification: bool,
    ) -> Result<(), TransportError>;

    /// Unpins a group message.
    async fn unpin_group_message(&self, message_id: i64) -> Result<(), TransportError>;

    /// Deletes a message from the staff group.
    async fn delete_group_message(&self, message_id: i64) -> Result<(), TransportError>;

    /// Deletes a message from a user's private chat.
    async fn delete_user_message(
        &self,
        user_id: i64,
        message_id: i64,
    ) -> Result<(), TransportError>;

    /// Creates a forum topic in the staff group, returning its id.
    async fn create_topic(&self, name: &str) -> Result<i64, TransportError>;

    /// Sets the status icon of a topic.
    async fn set_topic_icon(&self, topic_id: i64, icon: TopicIcon) -> Result<(), TransportError>;

    /// Answers a callback query; `alert` pops a modal instead of a toast.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError>;
}

impl TransportError {
    /// True for outcomes that should not abort the surrounding flow
    /// (idempotent edits).
    pub fn is_ignorable(&self) -> bool {
        matches!(self, TransportError::NotModified)
    }
}
