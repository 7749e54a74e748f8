//! Inbound event surface consumed by the relay engine.
//!
//! The transport layer (teloxide dispatch in `support-bot`) converts raw
//! updates into these shapes; the engine never touches transport types.

use crate::types::UserProfile;

/// A message sent to the bot in a private chat.
#[derive(Debug, Clone)]
pub struct PrivateMessage {
    pub profile: UserProfile,
    pub message_id: i64,
    /// Text or caption, when present.
    pub text: Option<String>,
    /// True when structured entities contain a url/text_link.
    pub has_link_entity: bool,
    /// All message ids belonging to the same attachment group, in order.
    /// A plain message carries just its own id.
    pub group_ids: Vec<i64>,
}

impl PrivateMessage {
    pub fn text_content(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// A staff message posted inside a tracked forum topic.
#[derive(Debug, Clone)]
pub struct TopicMessage {
    pub topic_id: i64,
    pub message_id: i64,
    pub text: Option<String>,
    /// Attachment-group ids, same convention as [`PrivateMessage::group_ids`].
    pub group_ids: Vec<i64>,
}

impl TopicMessage {
    /// Commands are handled separately and never relayed to the user.
    pub fn is_command(&self) -> bool {
        self.text
            .as_deref()
            .map(|t| t.trim_start().starts_with('/'))
            .unwrap_or(false)
    }
}

/// Staff command issued inside a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffCommand {
    Resolve,
    ResolveQuiet,
    Reopen,
    Silent,
    Ban,
    Information,
}

impl StaffCommand {
    /// Parses `/resolve`, `/resolve@BotName` and friends.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.trim().split_whitespace().next()?;
        let name = first.strip_prefix('/')?.split('@').next()?;
        match name {
            "resolve" => Some(StaffCommand::Resolve),
            "resolvequiet" => Some(StaffCommand::ResolveQuiet),
            "reopen" => Some(StaffCommand::Reopen),
            "silent" => Some(StaffCommand::Silent),
            "ban" => Some(StaffCommand::Ban),
            "information" => Some(StaffCommand::Information),
            _ => None,
        }
    }
}

/// A catalog or text-override command issued by the operator in the
/// bot's private chat.
///
/// Arguments are carried raw; the engine validates them and answers with
/// a usage prompt instead of silently dropping a malformed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    QuickList,
    QuickAdd { body: String },
    QuickDelete { id: String },
    FaqList,
    FaqAdd { body: String },
    FaqDelete { id: String },
    SetGreeting { args: String },
    SetResolved { args: String },
    ResetGreeting { code: String },
    ResetResolved { code: String },
}

impl AdminCommand {
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        let name = head.strip_prefix('/')?.split('@').next()?;
        let rest = rest.to_string();
        match name {
            "quick" => Some(AdminCommand::QuickList),
            "quickadd" => Some(AdminCommand::QuickAdd { body: rest }),
            "quickdel" => Some(AdminCommand::QuickDelete { id: rest }),
            "faq" => Some(AdminCommand::FaqList),
            "faqadd" => Some(AdminCommand::FaqAdd { body: rest }),
            "faqdel" => Some(AdminCommand::FaqDelete { id: rest }),
            "setgreeting" => Some(AdminCommand::SetGreeting { args: rest }),
            "setresolved" => Some(AdminCommand::SetResolved { args: rest }),
            "resetgreeting" => Some(AdminCommand::ResetGreeting { code: rest }),
            "resetresolved" => Some(AdminCommand::ResetResolved { code: rest }),
            _ => None,
        }
    }
}

/// A callback button press inside a tracked topic.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub callback_id: String,
    pub topic_id: i64,
    /// Message the pressed keyboard is attached to.
    pub message_id: i64,
    pub data: String,
}
