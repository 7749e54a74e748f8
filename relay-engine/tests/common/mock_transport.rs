//! Mock implementation of [`desk_core::transport::SupportTransport`] for
//! integration tests.
//!
//! Records every outbound call so tests can assert on what the engine sent
//! where, and returns incrementing message ids. Failure injection covers
//! the paths the engine branches on: a stale topic on forward and a
//! blocked recipient on copy.

use async_trait::async_trait;
use desk_core::error::TransportError;
use desk_core::transport::{Markup, SupportTransport, TopicIcon};
use desk_core::types::Attachment;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)] // not every test asserts on every field
pub enum Call {
    SendToUser { user_id: i64, text: String },
    SendToUserMarkup { user_id: i64, text: String, markup: Markup },
    ReplyToUser { user_id: i64, message_id: i64, text: String },
    AttachmentToUser { user_id: i64, file_id: String },
    SendToTopic { topic_id: i64, text: String },
    SendToTopicMarkup { topic_id: i64, text: String, markup: Markup },
    ReplyPrompt { topic_id: i64, text: String },
    ReplyInGroup { message_id: i64, topic_id: i64, text: String },
    ForwardToTopic { topic_id: i64, from_user_id: i64, message_id: i64 },
    CopyToUser { user_id: i64, message_ids: Vec<i64> },
    EditGroupMessage { message_id: i64, text: String },
    EditGroupMarkup { message_id: i64, markup: Markup },
    Pin { message_id: i64 },
    Unpin { message_id: i64 },
    DeleteGroup { message_id: i64 },
    DeleteUser { user_id: i64, message_id: i64 },
    CreateTopic { name: String },
    SetTopicIcon { topic_id: i64, icon: TopicIcon },
    AnswerCallback { text: Option<String>, alert: bool },
}

/// Recording transport. Message ids start at 1000, topic ids at 100.
#[derive(Default)]
pub struct MockTransport {
    next_message_id: AtomicI64,
    next_topic_id: AtomicI64,
    calls: Mutex<Vec<Call>>,
    /// Error returned (once) by the next `forward_to_topic` call.
    fail_forward_once: Mutex<Option<TransportError>>,
    /// Error returned by every `copy_to_user` / `send_to_user` call.
    fail_user_delivery: Mutex<Option<ErrorKind>>,
}

#[derive(Debug, Clone, Copy)]
enum ErrorKind {
    Blocked,
    Other,
}

impl ErrorKind {
    fn to_error(self) -> TransportError {
        match self {
            ErrorKind::Blocked => TransportError::RecipientBlocked,
            ErrorKind::Other => TransportError::Other("boom".to_string()),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI64::new(1000),
            next_topic_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub fn fail_next_forward_with_missing_topic(&self) {
        *self.fail_forward_once.lock().unwrap() = Some(TransportError::TopicMissing);
    }

    pub fn block_user_delivery(&self) {
        *self.fail_user_delivery.lock().unwrap() = Some(ErrorKind::Blocked);
    }

    pub fn break_user_delivery(&self) {
        *self.fail_user_delivery.lock().unwrap() = Some(ErrorKind::Other);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    /// Texts of every plain `send_to_topic` call, in order.
    pub fn topic_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::SendToTopic { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of every plain `send_to_user` call, in order.
    pub fn user_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::SendToUser { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_icon(&self, for_topic: i64) -> Option<TopicIcon> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|c| match c {
                Call::SetTopicIcon { topic_id, icon } if *topic_id == for_topic => Some(*icon),
                _ => None,
            })
    }

    fn record(&self, call: Call) -> i64 {
        self.calls.lock().unwrap().push(call);
        self.next_message_id.fetch_add(1, Ordering::SeqCst)
    }

    fn user_delivery_error(&self) -> Option<TransportError> {
        self.fail_user_delivery
            .lock()
            .unwrap()
            .map(ErrorKind::to_error)
    }
}

#[async_trait]
impl SupportTransport for MockTransport {
    async fn send_to_user(&self, user_id: i64, text: &str) -> Result<i64, TransportError> {
        if let Some(err) = self.user_delivery_error() {
            return Err(err);
        }
        Ok(self.record(Call::SendToUser {
            user_id,
            text: text.to_string(),
        }))
    }

    async fn send_to_user_with_markup(
        &self,
        user_id: i64,
        text: &str,
        markup: Markup,
    ) -> Result<i64, TransportError> {
        if let Some(err) = self.user_delivery_error() {
            return Err(err);
        }
        Ok(self.record(Call::SendToUserMarkup {
            user_id,
            text: text.to_string(),
            markup,
        }))
    }

    async fn reply_to_user(
        &self,
        user_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<i64, TransportError> {
        Ok(self.record(Call::ReplyToUser {
            user_id,
            message_id,
            text: text.to_string(),
        }))
    }

    async fn send_attachment_to_user(
        &self,
        user_id: i64,
        attachment: &Attachment,
    ) -> Result<i64, TransportError> {
        if let Some(err) = self.user_delivery_error() {
            return Err(err);
        }
        Ok(self.record(Call::AttachmentToUser {
            user_id,
            file_id: attachment.file_id.clone(),
        }))
    }

    async fn send_to_topic(&self, topic_id: i64, text: &str) -> Result<i64, TransportError> {
        Ok(self.record(Call::SendToTopic {
            topic_id,
            text: text.to_string(),
        }))
    }

    async fn send_to_topic_with_markup(
        &self,
        topic_id: i64,
        text: &str,
        markup: Markup,
    ) -> Result<i64, TransportError> {
        Ok(self.record(Call::SendToTopicMarkup {
            topic_id,
            text: text.to_string(),
            markup,
        }))
    }

    async fn send_reply_prompt(
        &self,
        topic_id: i64,
        text: &str,
        _placeholder: &str,
    ) -> Result<i64, TransportError> {
        Ok(self.record(Call::ReplyPrompt {
            topic_id,
            text: text.to_string(),
        }))
    }

    async fn reply_in_group(
        &self,
        message_id: i64,
        topic_id: i64,
        text: &str,
    ) -> Result<i64, TransportError> {
        Ok(self.record(Call::ReplyInGroup {
            message_id,
            topic_id,
            text: text.to_string(),
        }))
    }

    async fn forward_to_topic(
        &self,
        topic_id: i64,
        from_user_id: i64,
        message_id: i64,
    ) -> Result<i64, TransportError> {
        if let Some(err) = self.fail_forward_once.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.record(Call::ForwardToTopic {
            topic_id,
            from_user_id,
            message_id,
        }))
    }

    async fn copy_to_user(
        &self,
        user_id: i64,
        message_ids: &[i64],
    ) -> Result<Vec<i64>, TransportError> {
        if let Some(err) = self.user_delivery_error() {
            return Err(err);
        }
        let first = self.record(Call::CopyToUser {
            user_id,
            message_ids: message_ids.to_vec(),
        });
        let mut ids = vec![first];
        for _ in 1..message_ids.len() {
            ids.push(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        }
        Ok(ids)
    }

    async fn edit_group_message(
        &self,
        message_id: i64,
        text: &str,
        _markup: Option<Markup>,
    ) -> Result<(), TransportError> {
        self.record(Call::EditGroupMessage {
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn edit_group_markup(
        &self,
        message_id: i64,
        markup: Markup,
    ) -> Result<(), TransportError> {
        self.record(Call::EditGroupMarkup { message_id, markup });
        Ok(())
    }

    async fn pin_group_message(
        &self,
        message_id: i64,
        _disable_notification: bool,
    ) -> Result<(), TransportError> {
        self.record(Call::Pin { message_id });
        Ok(())
    }

    async fn unpin_group_message(&self, message_id: i64) -> Result<(), TransportError> {
        self.record(Call::Unpin { message_id });
        Ok(())
    }

    async fn delete_group_message(&self, message_id: i64) -> Result<(), TransportError> {
        self.record(Call::DeleteGroup { message_id });
        Ok(())
    }

    async fn delete_user_message(
        &self,
        user_id: i64,
        message_id: i64,
    ) -> Result<(), TransportError> {
        self.record(Call::DeleteUser {
            user_id,
            message_id,
        });
        Ok(())
    }

    async fn create_topic(&self, name: &str) -> Result<i64, TransportError> {
        self.record(Call::CreateTopic {
            name: name.to_string(),
        });
        Ok(self.next_topic_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn set_topic_icon(
        &self,
        topic_id: i64,
        icon: TopicIcon,
    ) -> Result<(), TransportError> {
        self.record(Call::SetTopicIcon { topic_id, icon });
        Ok(())
    }

    async fn answer_callback(
        &self,
        _callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError> {
        self.record(Call::AnswerCallback {
            text: text.map(|t| t.to_string()),
            alert,
        });
        Ok(())
    }
}
