//! Core domain types: ticket record, lifecycle status, user profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a support ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "resolved" => TicketStatus::Resolved,
            _ => TicketStatus::Open,
        }
    }
}

/// Live sender identity attached to every inbound private event.
/// Denormalized into the ticket on each message so the staff side always
/// sees the current name/handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub full_name: String,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

/// Persistent per-user support conversation record. One per user identity,
/// never hard-deleted. `topic_id` maps to at most one ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub user_id: i64,
    pub full_name: String,
    pub username: Option<String>,
    /// Forum topic backing this ticket; None until the first relay.
    pub topic_id: Option<i64>,
    pub status: TicketStatus,
    /// True while the latest user message has not been answered by staff.
    pub awaiting_reply: bool,
    /// True once staff replied since the topic indicator was last reset.
    pub operator_replied: bool,
    pub is_banned: bool,
    pub silent_mode: bool,
    /// Pinned marker message id while silent mode is on.
    pub silent_marker_id: Option<i64>,
    pub language_code: Option<String>,
    pub last_user_message_at: Option<DateTime<Utc>>,
    /// Latest rendered control-panel message, for idempotent updates.
    pub panel_message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Creates a fresh open ticket for the given profile.
    pub fn new(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.id,
            full_name: profile.full_name.clone(),
            username: profile.username.clone(),
            topic_id: None,
            status: TicketStatus::Open,
            awaiting_reply: false,
            operator_replied: false,
            is_banned: false,
            silent_mode: false,
            silent_marker_id: None,
            language_code: profile.language_code.clone(),
            last_user_message_at: None,
            panel_message_id: None,
            created_at: Utc::now(),
        }
    }

    /// Refreshes the denormalized profile fields from the live sender.
    pub fn refresh_profile(&mut self, profile: &UserProfile) {
        self.full_name = profile.full_name.clone();
        self.username = profile.username.clone();
        if profile.language_code.is_some() {
            self.language_code = profile.language_code.clone();
        }
    }
}

/// A stored media attachment reference (catalog items, canned replies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Media kind: "photo", "video", "document", "animation", "audio",
    /// "voice", "video_note".
    pub kind: String,
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: 42,
            full_name: "Alice".to_string(),
            username: Some("alice".to_string()),
            language_code: Some("en".to_string()),
        }
    }

    #[test]
    fn new_ticket_starts_open_and_unanswered() {
        let ticket = Ticket::new(&profile());
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(!ticket.awaiting_reply);
        assert!(!ticket.is_banned);
        assert!(ticket.topic_id.is_none());
    }

    #[test]
    fn refresh_profile_keeps_language_when_absent() {
        let mut ticket = Ticket::new(&profile());
        let mut updated = profile();
        updated.full_name = "Alice B".to_string();
        updated.language_code = None;
        ticket.refresh_profile(&updated);
        assert_eq!(ticket.full_name, "Alice B");
        assert_eq!(ticket.language_code.as_deref(), Some("en"));
    }

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!(TicketStatus::from_str("open"), TicketStatus::Open);
        assert_eq!(TicketStatus::from_str("resolved"), TicketStatus::Resolved);
        assert_eq!(TicketStatus::Open.as_str(), "open");
        assert_eq!(TicketStatus::Resolved.as_str(), "resolved");
    }
}
