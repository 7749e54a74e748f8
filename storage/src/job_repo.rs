//! Durable delayed-job store backing the reminder scheduler.
//!
//! Jobs are keyed by a caller-chosen id so a reschedule replaces the
//! pending run instead of stacking a second one. The scheduler polls
//! `due` and deletes each job after handling it.

use crate::error::StorageError;
use crate::models::ReminderJob;
use crate::sqlite_pool::SqlitePoolManager;
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct JobRepository {
    pool_manager: SqlitePoolManager,
}

impl JobRepository {
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reminder_jobs (
                job_id TEXT PRIMARY KEY,
                run_at TEXT NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
        )
        .execute(pool_manager.pool())
        .await?;
        Ok(Self { pool_manager })
    }

    /// Schedules a job, replacing any pending job with the same id.
    pub async fn schedule(&self, job: &ReminderJob) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO reminder_jobs (job_id, run_at, payload)
            VALUES (?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                run_at = excluded.run_at,
                payload = excluded.payload
            "#,
        )
        .bind(&job.job_id)
        .bind(job.run_at)
        .bind(&job.payload)
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }

    /// Removes a pending job. Cancelling an absent id is not an error.
    pub async fn cancel(&self, job_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM reminder_jobs WHERE job_id = ?")
            .bind(job_id)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(())
    }

    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ReminderJob>, StorageError> {
        let jobs: Vec<ReminderJob> = sqlx::query_as(
            "SELECT job_id, run_at, payload FROM reminder_jobs WHERE run_at <= ? ORDER BY run_at",
        )
        .bind(now)
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(jobs)
    }
}
