//! Ticket directory: persistence for tickets and relayed-message links.
//!
//! Owns the bidirectional user/topic index. Tickets are upserted whole
//! (read-modify-write under the engine's per-user lock) and never deleted.

use crate::error::StorageError;
use crate::sqlite_pool::SqlitePoolManager;
use chrono::{DateTime, Utc};
use desk_core::types::{Ticket, TicketStatus};
use tracing::info;

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    user_id: i64,
    full_name: String,
    username: Option<String>,
    topic_id: Option<i64>,
    status: String,
    awaiting_reply: bool,
    operator_replied: bool,
    is_banned: bool,
    silent_mode: bool,
    silent_marker_id: Option<i64>,
    language_code: Option<String>,
    last_user_message_at: Option<DateTime<Utc>>,
    panel_message_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            user_id: row.user_id,
            full_name: row.full_name,
            username: row.username,
            topic_id: row.topic_id,
            status: TicketStatus::from_str(&row.status),
            awaiting_reply: row.awaiting_reply,
            operator_replied: row.operator_replied,
            is_banned: row.is_banned,
            silent_mode: row.silent_mode,
            silent_marker_id: row.silent_marker_id,
            language_code: row.language_code,
            last_user_message_at: row.last_user_message_at,
            panel_message_id: row.panel_message_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct TicketRepository {
    pool_manager: SqlitePoolManager,
}

impl TicketRepository {
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                user_id INTEGER PRIMARY KEY,
                full_name TEXT NOT NULL,
                username TEXT,
                topic_id INTEGER,
                status TEXT NOT NULL,
                awaiting_reply INTEGER NOT NULL DEFAULT 0,
                operator_replied INTEGER NOT NULL DEFAULT 0,
                is_banned INTEGER NOT NULL DEFAULT 0,
                silent_mode INTEGER NOT NULL DEFAULT 0,
                silent_marker_id INTEGER,
                language_code TEXT,
                last_user_message_at TEXT,
                panel_message_id INTEGER,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tickets_topic_id ON tickets(topic_id)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tickets_is_banned ON tickets(is_banned)")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_links (
                topic_message_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                user_message_id INTEGER NOT NULL,
                PRIMARY KEY (topic_message_id, user_message_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<Ticket>, StorageError> {
        let row: Option<TicketRow> =
            sqlx::query_as("SELECT * FROM tickets WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        Ok(row.map(Ticket::from))
    }

    pub async fn get_by_topic(&self, topic_id: i64) -> Result<Option<Ticket>, StorageError> {
        let row: Option<TicketRow> =
            sqlx::query_as("SELECT * FROM tickets WHERE topic_id = ? LIMIT 1")
                .bind(topic_id)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        Ok(row.map(Ticket::from))
    }

    /// Writes the whole ticket, inserting or replacing by user id.
    pub async fn upsert(&self, ticket: &Ticket) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO tickets (
                user_id, full_name, username, topic_id, status,
                awaiting_reply, operator_replied, is_banned,
                silent_mode, silent_marker_id, language_code,
                last_user_message_at, panel_message_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                full_name = excluded.full_name,
                username = excluded.username,
                topic_id = excluded.topic_id,
                status = excluded.status,
                awaiting_reply = excluded.awaiting_reply,
                operator_replied = excluded.operator_replied,
                is_banned = excluded.is_banned,
                silent_mode = excluded.silent_mode,
                silent_marker_id = excluded.silent_marker_id,
                language_code = excluded.language_code,
                last_user_message_at = excluded.last_user_message_at,
                panel_message_id = excluded.panel_message_id,
                created_at = excluded.created_at
            "#,
        )
        .bind(ticket.user_id)
        .bind(&ticket.full_name)
        .bind(&ticket.username)
        .bind(ticket.topic_id)
        .bind(ticket.status.as_str())
        .bind(ticket.awaiting_reply)
        .bind(ticket.operator_replied)
        .bind(ticket.is_banned)
        .bind(ticket.silent_mode)
        .bind(ticket.silent_marker_id)
        .bind(&ticket.language_code)
        .bind(ticket.last_user_message_at)
        .bind(ticket.panel_message_id)
        .bind(ticket.created_at)
        .execute(self.pool_manager.pool())
        .await?;

        info!(user_id = ticket.user_id, "Ticket upserted");
        Ok(())
    }

    pub async fn all_user_ids(&self) -> Result<Vec<i64>, StorageError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT user_id FROM tickets")
            .fetch_all(self.pool_manager.pool())
            .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub async fn banned(&self) -> Result<Vec<Ticket>, StorageError> {
        let rows: Vec<TicketRow> =
            sqlx::query_as("SELECT * FROM tickets WHERE is_banned = 1")
                .fetch_all(self.pool_manager.pool())
                .await?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    /// Records one relayed copy, so a staff delete can cascade to it later.
    pub async fn add_message_link(
        &self,
        topic_message_id: i64,
        user_id: i64,
        user_message_id: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO message_links (topic_message_id, user_id, user_message_id)
            VALUES (?, ?, ?)
            ON CONFLICT(topic_message_id, user_message_id) DO NOTHING
            "#,
        )
        .bind(topic_message_id)
        .bind(user_id)
        .bind(user_message_id)
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }

    pub async fn get_message_links(
        &self,
        topic_message_id: i64,
    ) -> Result<Vec<i64>, StorageError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT user_message_id FROM message_links WHERE topic_message_id = ? ORDER BY user_message_id",
        )
        .bind(topic_message_id)
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub async fn delete_message_links(&self, topic_message_id: i64) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM message_links WHERE topic_message_id = ?")
            .bind(topic_message_id)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(())
    }
}
