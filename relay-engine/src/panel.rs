//! Ticket control panel: text rendering, callback-data parsing and the
//! idempotent refresh of the panel message.
//!
//! All panel buttons carry callback data in the `support_panel:` namespace;
//! the delete-cascade button uses `delmsg:`. Rendering of button labels
//! lives in the transport adapter.

use desk_core::error::Result;
use desk_core::security::{sanitize_display_name, SENSITIVE_PLACEHOLDER};
use desk_core::texts::{hbold, TextCatalog, TextKey};
use desk_core::transport::{Markup, SupportTransport};
use desk_core::types::{Ticket, TicketStatus};

pub const PANEL_NAMESPACE: &str = "support_panel";

/// A parsed panel button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    Reply { user_id: i64 },
    Postpone { user_id: i64 },
    StatusMenu { user_id: i64 },
    SetStatus { user_id: i64, resolved: bool },
    Back { user_id: i64 },
    Info { user_id: i64 },
    QuickSend { user_id: i64, item_id: String },
    DeleteCascade { origin_message_id: i64 },
}

impl PanelAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix("delmsg:") {
            return Some(PanelAction::DeleteCascade {
                origin_message_id: rest.parse().ok()?,
            });
        }

        let rest = data.strip_prefix("support_panel:")?;
        let mut parts = rest.splitn(3, ':');
        let verb = parts.next()?;
        let user_id: i64 = parts.next()?.parse().ok()?;
        match verb {
            "reply" => Some(PanelAction::Reply { user_id }),
            "postpone" => Some(PanelAction::Postpone { user_id }),
            "status" => Some(PanelAction::StatusMenu { user_id }),
            "status_set" => {
                let resolved = match parts.next()? {
                    "resolved" => true,
                    "open" => false,
                    _ => return None,
                };
                Some(PanelAction::SetStatus { user_id, resolved })
            }
            "back" => Some(PanelAction::Back { user_id }),
            "info" => Some(PanelAction::Info { user_id }),
            "quick" => Some(PanelAction::QuickSend {
                user_id,
                item_id: parts.next()?.to_string(),
            }),
            _ => None,
        }
    }
}

/// Builds the callback-data string for a panel button. The adapter uses
/// these when rendering [`Markup::Panel`] and friends.
pub fn callback_data(verb: &str, user_id: i64) -> String {
    format!("{PANEL_NAMESPACE}:{verb}:{user_id}")
}

pub fn quick_send_data(user_id: i64, item_id: &str) -> String {
    format!("{PANEL_NAMESPACE}:quick:{user_id}:{item_id}")
}

pub fn delete_cascade_data(origin_message_id: i64) -> String {
    format!("delmsg:{origin_message_id}")
}

/// Renders the panel body: sanitized bold name plus a status line.
pub fn panel_text(texts: &TextCatalog, ticket: &Ticket) -> String {
    let language = texts.resolve(ticket.language_code.as_deref());
    let status_key = match ticket.status {
        TicketStatus::Open => TextKey::TicketStatusOpen,
        TicketStatus::Resolved => TextKey::TicketStatusResolved,
    };
    let name = sanitize_display_name(Some(&ticket.full_name), SENSITIVE_PLACEHOLDER);
    texts
        .get(language, TextKey::SupportPanelPrompt)
        .replace("{full_name}", &hbold(&name))
        .replace("{status}", texts.get(language, status_key))
}

/// Applies new text and keyboard to an existing panel message.
///
/// An unchanged-content error falls back to a markup-only refresh, so
/// repeated presses converge instead of failing.
pub async fn refresh_panel(
    transport: &dyn SupportTransport,
    message_id: i64,
    text: &str,
    markup: Markup,
) -> Result<()> {
    match transport
        .edit_group_message(message_id, text, Some(markup.clone()))
        .await
    {
        Ok(()) => Ok(()),
        Err(err) if err.is_ignorable() => {
            match transport.edit_group_markup(message_id, markup).await {
                Ok(()) => Ok(()),
                Err(err) if err.is_ignorable() => Ok(()),
                Err(err) => Err(err.into()),
            }
        }
        Err(err) => Err(err.into()),
    }
}
