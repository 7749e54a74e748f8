//! Durable scheduler job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One delayed job: fires once at `run_at`, replace-on-reschedule by id.
/// `payload` is an opaque JSON document interpreted by the registered
/// handler, so jobs can be re-resolved after a restart without holding any
/// live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReminderJob {
    pub job_id: String,
    pub run_at: DateTime<Utc>,
    pub payload: String,
}
