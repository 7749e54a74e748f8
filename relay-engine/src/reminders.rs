//! Durable delayed jobs: support reminders and topic icon restores.
//!
//! Jobs live in SQLite, so a pending reminder survives a restart. The tick
//! loop claims due jobs (delete first, then handle, at-least-once) and
//! hands each payload to the registered [`JobHandler`]; the handler
//! re-checks live ticket state, so a job that outlived its reason is a
//! silent no-op.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use desk_core::error::{DeskError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{JobRepository, ReminderJob, StorageError};
use tracing::{debug, error, info};

/// Delay before nudging staff about an unanswered ticket.
pub const REMINDER_DELAY_SECONDS: i64 = 5 * 60;
/// Delay before re-applying a topic icon after a lifecycle change.
pub const ICON_RESTORE_DELAY_SECONDS: i64 = 3;

const KIND_SUPPORT_REMINDER: &str = "support_reminder";
const KIND_ICON_RESTORE: &str = "icon_restore";

/// Self-contained job document; everything needed to act after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub kind: String,
    pub user_id: i64,
    pub topic_id: i64,
}

impl JobPayload {
    pub fn is_support_reminder(&self) -> bool {
        self.kind == KIND_SUPPORT_REMINDER
    }

    pub fn is_icon_restore(&self) -> bool {
        self.kind == KIND_ICON_RESTORE
    }
}

/// Consumer of fired jobs. Implemented by the relay engine.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle_job(&self, payload: JobPayload) -> Result<()>;
}

#[derive(Clone)]
pub struct ReminderScheduler {
    jobs: JobRepository,
}

fn reminder_job_id(user_id: i64) -> String {
    format!("ticket_reminder_{user_id}")
}

fn icon_restore_job_id(user_id: i64) -> String {
    format!("icon_restore_{user_id}")
}

fn storage_err(err: StorageError) -> DeskError {
    DeskError::Scheduler(err.to_string())
}

impl ReminderScheduler {
    pub fn new(jobs: JobRepository) -> Self {
        Self { jobs }
    }

    /// Schedules (or reschedules) the support reminder for a user.
    pub async fn schedule_support_reminder(&self, user_id: i64, topic_id: i64) -> Result<()> {
        self.schedule(
            reminder_job_id(user_id),
            KIND_SUPPORT_REMINDER,
            user_id,
            topic_id,
            REMINDER_DELAY_SECONDS,
        )
        .await
    }

    /// Schedules the short-delay icon re-apply for a topic.
    pub async fn schedule_icon_restore(&self, user_id: i64, topic_id: i64) -> Result<()> {
        self.schedule(
            icon_restore_job_id(user_id),
            KIND_ICON_RESTORE,
            user_id,
            topic_id,
            ICON_RESTORE_DELAY_SECONDS,
        )
        .await
    }

    /// Drops a pending reminder; absent ids are fine.
    pub async fn cancel_support_reminder(&self, user_id: i64) -> Result<()> {
        self.jobs
            .cancel(&reminder_job_id(user_id))
            .await
            .map_err(storage_err)
    }

    async fn schedule(
        &self,
        job_id: String,
        kind: &str,
        user_id: i64,
        topic_id: i64,
        delay_seconds: i64,
    ) -> Result<()> {
        let payload = JobPayload {
            kind: kind.to_string(),
            user_id,
            topic_id,
        };
        let job = ReminderJob {
            job_id,
            run_at: Utc::now() + Duration::seconds(delay_seconds),
            payload: serde_json::to_string(&payload)
                .map_err(|e| DeskError::Scheduler(e.to_string()))?,
        };
        debug!(job_id = %job.job_id, run_at = %job.run_at, "Scheduling job");
        self.jobs.schedule(&job).await.map_err(storage_err)
    }

    /// Claims and handles every due job once.
    ///
    /// Each job is deleted before its handler runs; a handler failure is
    /// logged and the loop continues with the next job.
    pub async fn run_due_jobs(&self, handler: &Arc<dyn JobHandler>) -> Result<()> {
        let due = self.jobs.due(Utc::now()).await.map_err(storage_err)?;
        for job in due {
            self.jobs.cancel(&job.job_id).await.map_err(storage_err)?;
            let payload: JobPayload = match serde_json::from_str(&job.payload) {
                Ok(payload) => payload,
                Err(err) => {
                    error!(job_id = %job.job_id, error = %err, "Discarding malformed job payload");
                    continue;
                }
            };
            if let Err(err) = handler.handle_job(payload).await {
                error!(job_id = %job.job_id, error = %err, "Job handler failed");
            }
        }
        Ok(())
    }

    /// Background polling loop; never returns.
    pub async fn run(&self, handler: Arc<dyn JobHandler>) {
        info!("Reminder scheduler started");
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tick.tick().await;
            if let Err(err) = self.run_due_jobs(&handler).await {
                error!(error = %err, "Scheduler tick failed");
            }
        }
    }
}
