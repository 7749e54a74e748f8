//! Catalog entry model shared by quick replies and FAQ.
//!
//! Persisted as a JSON payload column plus a monotonic `sort_order`.

use desk_core::types::Attachment;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl CatalogItem {
    /// Creates a new item with a generated UUID.
    pub fn new(title: String, text: Option<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            text,
            attachments,
        }
    }

    /// An item must carry either text or at least one attachment.
    pub fn has_content(&self) -> bool {
        self.text.as_deref().map(|t| !t.is_empty()).unwrap_or(false)
            || !self.attachments.is_empty()
    }
}
