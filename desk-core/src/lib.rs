//! Transport-agnostic core of the support relay.
//!
//! ## Modules
//!
//! - [`error`] – error taxonomy (`DeskError`, `TransportError`)
//! - [`types`] – Ticket, TicketStatus, UserProfile, Attachment
//! - [`event`] – inbound event surface consumed by the relay engine
//! - [`transport`] – `SupportTransport` trait for outbound delivery
//! - [`security`] – suspicion analyzer + display-name sanitizer
//! - [`texts`] – typed, load-validated message-text catalog
//! - [`logger`] – tracing initialization

pub mod error;
pub mod event;
pub mod logger;
pub mod security;
pub mod texts;
pub mod transport;
pub mod types;

pub use error::{DeskError, Result, TransportError};
pub use event::{CallbackEvent, PrivateMessage, StaffCommand, TopicMessage};
pub use logger::init_tracing;
pub use security::{analyze_user_message, sanitize_display_name, Suspicion};
pub use texts::{Language, TextCatalog, TextKey};
pub use transport::{Markup, SupportTransport, TopicIcon};
pub use types::{Attachment, Ticket, TicketStatus, UserProfile};
