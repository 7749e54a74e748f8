//! Ordered catalogs of prepared content: quick replies and FAQ entries.
//!
//! Both catalogs share one table, discriminated by a `catalog` column.
//! Items keep their insertion order via a monotonic `sort_order`; the item
//! body (text plus attachments) is stored as a JSON payload so media lists
//! survive round trips without a join table.

use crate::error::StorageError;
use crate::models::CatalogItem;
use crate::sqlite_pool::SqlitePoolManager;
use desk_core::types::Attachment;
use tracing::info;

#[derive(Clone)]
pub struct CatalogRepository {
    pool_manager: SqlitePoolManager,
    catalog: &'static str,
}

impl CatalogRepository {
    pub async fn quick_replies(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        Self::new(pool_manager, "quick_replies").await
    }

    pub async fn faq(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        Self::new(pool_manager, "faq").await
    }

    async fn new(
        pool_manager: SqlitePoolManager,
        catalog: &'static str,
    ) -> Result<Self, StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_items (
                id TEXT NOT NULL,
                catalog TEXT NOT NULL,
                title TEXT NOT NULL,
                payload TEXT NOT NULL,
                sort_order INTEGER NOT NULL,
                PRIMARY KEY (catalog, id)
            )
            "#,
        )
        .execute(pool_manager.pool())
        .await?;
        Ok(Self {
            pool_manager,
            catalog,
        })
    }

    pub async fn list(&self) -> Result<Vec<CatalogItem>, StorageError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT payload FROM catalog_items WHERE catalog = ? ORDER BY sort_order",
        )
        .bind(self.catalog)
        .fetch_all(self.pool_manager.pool())
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (payload,) in rows {
            items.push(serde_json::from_str(&payload)?);
        }
        Ok(items)
    }

    pub async fn has_items(&self) -> Result<bool, StorageError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM catalog_items WHERE catalog = ?")
                .bind(self.catalog)
                .fetch_one(self.pool_manager.pool())
                .await?;
        Ok(row.0 > 0)
    }

    pub async fn get(&self, id: &str) -> Result<Option<CatalogItem>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT payload FROM catalog_items WHERE catalog = ? AND id = ?",
        )
        .bind(self.catalog)
        .bind(id)
        .fetch_optional(self.pool_manager.pool())
        .await?;
        match row {
            Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Appends a new item at the end of the catalog.
    pub async fn add(
        &self,
        title: &str,
        text: Option<String>,
        attachments: Vec<Attachment>,
    ) -> Result<CatalogItem, StorageError> {
        if title.trim().is_empty() {
            return Err(StorageError::Validation("item title is empty".into()));
        }
        let item = CatalogItem::new(title.trim().to_string(), text, attachments);
        if !item.has_content() {
            return Err(StorageError::Validation(
                "item needs text or at least one attachment".into(),
            ));
        }

        let payload = serde_json::to_string(&item)?;
        sqlx::query(
            r#"
            INSERT INTO catalog_items (id, catalog, title, payload, sort_order)
            VALUES (
                ?, ?, ?, ?,
                (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM catalog_items WHERE catalog = ?)
            )
            "#,
        )
        .bind(&item.id)
        .bind(self.catalog)
        .bind(&item.title)
        .bind(&payload)
        .bind(self.catalog)
        .execute(self.pool_manager.pool())
        .await?;

        info!(catalog = self.catalog, id = %item.id, "Catalog item added");
        Ok(item)
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<(), StorageError> {
        if title.trim().is_empty() {
            return Err(StorageError::Validation("item title is empty".into()));
        }
        let mut item = self
            .get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("catalog item {id}")))?;
        item.title = title.trim().to_string();
        self.store(&item).await
    }

    pub async fn update_content(
        &self,
        id: &str,
        text: Option<String>,
        attachments: Vec<Attachment>,
    ) -> Result<(), StorageError> {
        let mut item = self
            .get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("catalog item {id}")))?;
        item.text = text;
        item.attachments = attachments;
        if !item.has_content() {
            return Err(StorageError::Validation(
                "item needs text or at least one attachment".into(),
            ));
        }
        self.store(&item).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM catalog_items WHERE catalog = ? AND id = ?")
            .bind(self.catalog)
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("catalog item {id}")));
        }
        info!(catalog = self.catalog, id, "Catalog item deleted");
        Ok(())
    }

    async fn store(&self, item: &CatalogItem) -> Result<(), StorageError> {
        let payload = serde_json::to_string(item)?;
        sqlx::query(
            "UPDATE catalog_items SET title = ?, payload = ? WHERE catalog = ? AND id = ?",
        )
        .bind(&item.title)
        .bind(&payload)
        .bind(self.catalog)
        .bind(&item.id)
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }
}
