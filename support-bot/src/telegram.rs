//! Teloxide-backed implementation of [`SupportTransport`].
//!
//! Chat routing is fixed at construction: the staff group id comes from
//! config, user operations target the user's private chat. Everything sent
//! as text uses HTML parse mode; the engine escapes interpolated values.

use async_trait::async_trait;
use desk_core::error::TransportError;
use desk_core::transport::{Markup, SupportTransport, TopicIcon};
use desk_core::types::Attachment;
use relay_engine::panel;
use storage::CatalogRepository;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId,
    ParseMode, ReplyMarkup, ReplyParameters, Rgb, ThreadId,
};
use teloxide::{ApiError, RequestError};
use tracing::warn;

const TOPIC_ICON_COLOR: u32 = 0x6FB9F0;

fn map_api_error(err: RequestError) -> TransportError {
    match &err {
        RequestError::Api(ApiError::BotBlocked) => TransportError::RecipientBlocked,
        RequestError::Api(ApiError::MessageNotModified) => TransportError::NotModified,
        RequestError::Api(ApiError::Unknown(raw)) => {
            let lowered = raw.to_lowercase();
            if lowered.contains("thread not found") {
                TransportError::TopicMissing
            } else if lowered.contains("bot was blocked") {
                TransportError::RecipientBlocked
            } else if lowered.contains("not modified") {
                TransportError::NotModified
            } else {
                TransportError::Other(raw.clone())
            }
        }
        _ => TransportError::Other(err.to_string()),
    }
}

fn thread(topic_id: i64) -> ThreadId {
    ThreadId(MessageId(topic_id as i32))
}

pub struct TelegramTransport {
    bot: Bot,
    group_id: ChatId,
    icon_new: Option<String>,
    icon_active: Option<String>,
    icon_resolved: Option<String>,
    quick_replies: CatalogRepository,
}

impl TelegramTransport {
    pub fn new(
        bot: Bot,
        group_id: i64,
        icon_new: Option<String>,
        icon_active: Option<String>,
        icon_resolved: Option<String>,
        quick_replies: CatalogRepository,
    ) -> Self {
        Self {
            bot,
            group_id: ChatId(group_id),
            icon_new,
            icon_active,
            icon_resolved,
            quick_replies,
        }
    }

    fn icon_emoji(&self, icon: TopicIcon) -> Option<&str> {
        match icon {
            TopicIcon::New => self.icon_new.as_deref(),
            TopicIcon::Active => self.icon_active.as_deref(),
            TopicIcon::Resolved => self.icon_resolved.as_deref(),
        }
    }

    async fn render_markup(&self, markup: &Markup) -> InlineKeyboardMarkup {
        match markup {
            Markup::Panel { user_id, resolved } => {
                let status_label = if *resolved {
                    "✅ Status: resolved"
                } else {
                    "🟢 Status: open"
                };
                let mut rows = vec![
                    vec![
                        InlineKeyboardButton::callback(
                            "✍️ Reply",
                            panel::callback_data("reply", *user_id),
                        ),
                        InlineKeyboardButton::callback(
                            "⏰ Postpone",
                            panel::callback_data("postpone", *user_id),
                        ),
                    ],
                    vec![
                        InlineKeyboardButton::callback(
                            status_label,
                            panel::callback_data("status", *user_id),
                        ),
                        InlineKeyboardButton::callback(
                            "ℹ️ Info",
                            panel::callback_data("info", *user_id),
                        ),
                    ],
                ];
                match self.quick_replies.list().await {
                    Ok(items) => {
                        for item in items.iter().take(6) {
                            rows.push(vec![InlineKeyboardButton::callback(
                                format!("⚡ {}", item.title),
                                panel::quick_send_data(*user_id, &item.id),
                            )]);
                        }
                    }
                    Err(err) => warn!(error = %err, "Failed to list quick replies for panel"),
                }
                InlineKeyboardMarkup::new(rows)
            }
            Markup::StatusMenu { user_id, .. } => InlineKeyboardMarkup::new(vec![
                vec![InlineKeyboardButton::callback(
                    "🟢 Open",
                    format!("{}:status_set:{}:open", panel::PANEL_NAMESPACE, user_id),
                )],
                vec![InlineKeyboardButton::callback(
                    "✅ Resolved",
                    format!("{}:status_set:{}:resolved", panel::PANEL_NAMESPACE, user_id),
                )],
                vec![InlineKeyboardButton::callback(
                    "⬅️ Back",
                    panel::callback_data("back", *user_id),
                )],
            ]),
            Markup::DeleteButton { origin_message_id } => {
                InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                    "🗑 Delete for user",
                    panel::delete_cascade_data(*origin_message_id),
                )]])
            }
            Markup::FaqSuggestion => {
                InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                    "📚 Open FAQ",
                    "faq:open".to_string(),
                )]])
            }
        }
    }
}

#[async_trait]
impl SupportTransport for TelegramTransport {
    async fn send_to_user(&self, user_id: i64, text: &str) -> Result<i64, TransportError> {
        let mut req = self.bot.send_message(ChatId(user_id), text);
        req.parse_mode = Some(ParseMode::Html);
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn send_to_user_with_markup(
        &self,
        user_id: i64,
        text: &str,
        markup: Markup,
    ) -> Result<i64, TransportError> {
        let keyboard = self.render_markup(&markup).await;
        let mut req = self.bot.send_message(ChatId(user_id), text);
        req.parse_mode = Some(ParseMode::Html);
        req.reply_markup = Some(ReplyMarkup::InlineKeyboard(keyboard));
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn reply_to_user(
        &self,
        user_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<i64, TransportError> {
        let mut req = self.bot.send_message(ChatId(user_id), text);
        req.parse_mode = Some(ParseMode::Html);
        req.reply_parameters = Some(ReplyParameters::new(MessageId(message_id as i32)));
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn send_attachment_to_user(
        &self,
        user_id: i64,
        attachment: &Attachment,
    ) -> Result<i64, TransportError> {
        let chat = ChatId(user_id);
        let file = InputFile::file_id(attachment.file_id.clone());
        let caption = attachment.caption.clone();

        let msg = match attachment.kind.as_str() {
            "photo" => {
                let mut req = self.bot.send_photo(chat, file);
                req.caption = caption;
                req.await
            }
            "video" => {
                let mut req = self.bot.send_video(chat, file);
                req.caption = caption;
                req.await
            }
            "animation" => {
                let mut req = self.bot.send_animation(chat, file);
                req.caption = caption;
                req.await
            }
            "audio" => {
                let mut req = self.bot.send_audio(chat, file);
                req.caption = caption;
                req.await
            }
            "voice" => {
                let mut req = self.bot.send_voice(chat, file);
                req.caption = caption;
                req.await
            }
            "video_note" => self.bot.send_video_note(chat, file).await,
            _ => {
                let mut req = self.bot.send_document(chat, file);
                req.caption = caption;
                req.await
            }
        }
        .map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn send_to_topic(&self, topic_id: i64, text: &str) -> Result<i64, TransportError> {
        let mut req = self.bot.send_message(self.group_id, text);
        req.parse_mode = Some(ParseMode::Html);
        req.message_thread_id = Some(thread(topic_id));
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn send_to_topic_with_markup(
        &self,
        topic_id: i64,
        text: &str,
        markup: Markup,
    ) -> Result<i64, TransportError> {
        let keyboard = self.render_markup(&markup).await;
        let mut req = self.bot.send_message(self.group_id, text);
        req.parse_mode = Some(ParseMode::Html);
        req.message_thread_id = Some(thread(topic_id));
        req.reply_markup = Some(ReplyMarkup::InlineKeyboard(keyboard));
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn send_reply_prompt(
        &self,
        topic_id: i64,
        text: &str,
        placeholder: &str,
    ) -> Result<i64, TransportError> {
        let mut force_reply = ForceReply::new();
        force_reply.input_field_placeholder = Some(placeholder.to_string());

        let mut req = self.bot.send_message(self.group_id, text);
        req.parse_mode = Some(ParseMode::Html);
        req.message_thread_id = Some(thread(topic_id));
        req.reply_markup = Some(ReplyMarkup::ForceReply(force_reply));
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn reply_in_group(
        &self,
        message_id: i64,
        topic_id: i64,
        text: &str,
    ) -> Result<i64, TransportError> {
        let mut req = self.bot.send_message(self.group_id, text);
        req.parse_mode = Some(ParseMode::Html);
        req.message_thread_id = Some(thread(topic_id));
        req.reply_parameters = Some(ReplyParameters::new(MessageId(message_id as i32)));
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn forward_to_topic(
        &self,
        topic_id: i64,
        from_user_id: i64,
        message_id: i64,
    ) -> Result<i64, TransportError> {
        let mut req = self.bot.forward_message(
            self.group_id,
            ChatId(from_user_id),
            MessageId(message_id as i32),
        );
        req.message_thread_id = Some(thread(topic_id));
        let msg = req.await.map_err(map_api_error)?;
        Ok(msg.id.0 as i64)
    }

    async fn copy_to_user(
        &self,
        user_id: i64,
        message_ids: &[i64],
    ) -> Result<Vec<i64>, TransportError> {
        let mut copies = Vec::with_capacity(message_ids.len());
        for &message_id in message_ids {
            let copy = self
                .bot
                .copy_message(
                    ChatId(user_id),
                    self.group_id,
                    MessageId(message_id as i32),
                )
                .await
                .map_err(map_api_error)?;
            copies.push(copy.0 as i64);
        }
        Ok(copies)
    }

    async fn edit_group_message(
        &self,
        message_id: i64,
        text: &str,
        markup: Option<Markup>,
    ) -> Result<(), TransportError> {
        let keyboard = match markup {
            Some(markup) => Some(self.render_markup(&markup).await),
            None => None,
        };
        let mut req =
            self.bot
                .edit_message_text(self.group_id, MessageId(message_id as i32), text);
        req.parse_mode = Some(ParseMode::Html);
        req.reply_markup = keyboard;
        req.await.map_err(map_api_error)?;
        Ok(())
    }

    async fn edit_group_markup(
        &self,
        message_id: i64,
        markup: Markup,
    ) -> Result<(), TransportError> {
        let keyboard = self.render_markup(&markup).await;
        let mut req = self
            .bot
            .edit_message_reply_markup(self.group_id, MessageId(message_id as i32));
        req.reply_markup = Some(keyboard);
        req.await.map_err(map_api_error)?;
        Ok(())
    }

    async fn pin_group_message(
        &self,
        message_id: i64,
        disable_notification: bool,
    ) -> Result<(), TransportError> {
        let mut req = self
            .bot
            .pin_chat_message(self.group_id, MessageId(message_id as i32));
        req.disable_notification = Some(disable_notification);
        req.await.map_err(map_api_error)?;
        Ok(())
    }

    async fn unpin_group_message(&self, message_id: i64) -> Result<(), TransportError> {
        let mut req = self.bot.unpin_chat_message(self.group_id);
        req.message_id = Some(MessageId(message_id as i32));
        req.await.map_err(map_api_error)?;
        Ok(())
    }

    async fn delete_group_message(&self, message_id: i64) -> Result<(), TransportError> {
        self.bot
            .delete_message(self.group_id, MessageId(message_id as i32))
            .await
            .map_err(map_api_error)?;
        Ok(())
    }

    async fn delete_user_message(
        &self,
        user_id: i64,
        message_id: i64,
    ) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(user_id), MessageId(message_id as i32))
            .await
            .map_err(map_api_error)?;
        Ok(())
    }

    async fn create_topic(&self, name: &str) -> Result<i64, TransportError> {
        let topic = self
            .bot
            .create_forum_topic(
                self.group_id,
                name.to_string(),
                Rgb::from_u32(TOPIC_ICON_COLOR),
                self.icon_new.clone().unwrap_or_default(),
            )
            .await
            .map_err(map_api_error)?;
        Ok(topic.thread_id.0 .0 as i64)
    }

    async fn set_topic_icon(&self, topic_id: i64, icon: TopicIcon) -> Result<(), TransportError> {
        let Some(emoji_id) = self.icon_emoji(icon) else {
            return Ok(());
        };
        let mut req = self.bot.edit_forum_topic(self.group_id, thread(topic_id));
        req.icon_custom_emoji_id = Some(emoji_id.to_string());
        req.await.map_err(map_api_error)?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError> {
        let mut req = self.bot.answer_callback_query(callback_id.to_string());
        req.text = text.map(|t| t.to_string());
        req.show_alert = Some(alert);
        req.await.map_err(map_api_error)?;
        Ok(())
    }
}
