//! Relay engine crate: ticket lifecycle and message relay logic.
//!
//! ## Modules
//!
//! - [`engine`] – RelayEngine, the transition handlers
//! - [`topics`] – TopicProvisioner (forum topic per ticket)
//! - [`panel`] – control panel rendering and callback parsing
//! - [`reminders`] – ReminderScheduler, durable delayed jobs
//! - [`locks`] – per-user serialization

pub mod engine;
pub mod locks;
pub mod panel;
pub mod reminders;
pub mod topics;

pub use engine::{EngineOptions, RelayEngine};
pub use panel::PanelAction;
pub use reminders::{JobHandler, JobPayload, ReminderScheduler};
pub use topics::TopicProvisioner;
