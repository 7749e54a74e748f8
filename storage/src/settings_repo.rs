//! Key-value settings store.
//!
//! Holds operator-editable text overrides. Greeting and resolution notices
//! are stored under language-prefixed keys (`greeting:en`, `resolved:ru`)
//! so each language can be overridden independently.

use crate::error::StorageError;
use crate::sqlite_pool::SqlitePoolManager;
use desk_core::texts::Language;

#[derive(Clone)]
pub struct SettingsRepository {
    pool_manager: SqlitePoolManager,
}

impl SettingsRepository {
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool_manager.pool())
        .await?;
        Ok(Self { pool_manager })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(())
    }

    pub async fn greeting(&self, language: Language) -> Result<Option<String>, StorageError> {
        self.get(&format!("greeting:{}", language.code())).await
    }

    pub async fn set_greeting(&self, language: Language, text: &str) -> Result<(), StorageError> {
        self.set(&format!("greeting:{}", language.code()), text).await
    }

    pub async fn clear_greeting(&self, language: Language) -> Result<(), StorageError> {
        self.delete(&format!("greeting:{}", language.code())).await
    }

    pub async fn resolved_notice(&self, language: Language) -> Result<Option<String>, StorageError> {
        self.get(&format!("resolved:{}", language.code())).await
    }

    pub async fn set_resolved_notice(
        &self,
        language: Language,
        text: &str,
    ) -> Result<(), StorageError> {
        self.set(&format!("resolved:{}", language.code()), text).await
    }

    pub async fn clear_resolved_notice(&self, language: Language) -> Result<(), StorageError> {
        self.delete(&format!("resolved:{}", language.code())).await
    }
}
