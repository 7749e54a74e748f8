//! Storage crate: SQLite persistence for the support relay.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – CatalogItem, ReminderJob
//! - [`ticket_repo`] – TicketRepository (tickets + message links)
//! - [`settings_repo`] – SettingsRepository (operator text overrides)
//! - [`catalog_repo`] – CatalogRepository (quick replies, FAQ)
//! - [`job_repo`] – JobRepository (durable delayed jobs)
//! - [`sqlite_pool`] – SqlitePoolManager

mod catalog_repo;
mod error;
mod job_repo;
mod models;
mod settings_repo;
mod sqlite_pool;
mod ticket_repo;

#[cfg(test)]
mod catalog_repo_test;
#[cfg(test)]
mod ticket_repo_test;

pub use catalog_repo::CatalogRepository;
pub use error::StorageError;
pub use job_repo::JobRepository;
pub use models::{CatalogItem, ReminderJob};
pub use settings_repo::SettingsRepository;
pub use sqlite_pool::SqlitePoolManager;
pub use ticket_repo::TicketRepository;
