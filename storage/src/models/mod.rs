mod catalog_item;
mod reminder_job;

pub use catalog_item::CatalogItem;
pub use reminder_job::ReminderJob;
