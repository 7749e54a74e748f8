//! Unit tests for CatalogRepository.
//!
//! Covers insertion order, validation, the two catalog namespaces and
//! content updates.

use crate::catalog_repo::CatalogRepository;
use crate::error::StorageError;
use crate::sqlite_pool::SqlitePoolManager;
use desk_core::types::Attachment;

async fn pool() -> SqlitePoolManager {
    SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create pool")
}

fn photo(file_id: &str) -> Attachment {
    Attachment {
        kind: "photo".to_string(),
        file_id: file_id.to_string(),
        caption: None,
    }
}

#[tokio::test]
async fn test_list_preserves_insertion_order() {
    let repo = CatalogRepository::quick_replies(pool().await)
        .await
        .expect("Failed to create repository");

    repo.add("Shipping", Some("Ships in 3 days".into()), vec![])
        .await
        .unwrap();
    repo.add("Refunds", Some("30-day window".into()), vec![])
        .await
        .unwrap();
    repo.add("Hours", Some("9 to 5".into()), vec![])
        .await
        .unwrap();

    let titles: Vec<String> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.title)
        .collect();
    assert_eq!(titles, vec!["Shipping", "Refunds", "Hours"]);
}

#[tokio::test]
async fn test_empty_title_rejected() {
    let repo = CatalogRepository::faq(pool().await)
        .await
        .expect("Failed to create repository");

    let err = repo.add("   ", Some("text".into()), vec![]).await;
    assert!(matches!(err, Err(StorageError::Validation(_))));
    assert!(!repo.has_items().await.unwrap());
}

#[tokio::test]
async fn test_item_without_content_rejected() {
    let repo = CatalogRepository::faq(pool().await)
        .await
        .expect("Failed to create repository");

    let err = repo.add("Empty", None, vec![]).await;
    assert!(matches!(err, Err(StorageError::Validation(_))));

    // An attachment alone is enough.
    repo.add("Map", None, vec![photo("file-1")]).await.unwrap();
    assert!(repo.has_items().await.unwrap());
}

#[tokio::test]
async fn test_catalogs_are_separate_namespaces() {
    let pool = pool().await;
    let quick = CatalogRepository::quick_replies(pool.clone())
        .await
        .expect("Failed to create repository");
    let faq = CatalogRepository::faq(pool)
        .await
        .expect("Failed to create repository");

    quick
        .add("Greeting", Some("Hi there".into()), vec![])
        .await
        .unwrap();

    assert!(quick.has_items().await.unwrap());
    assert!(!faq.has_items().await.unwrap());
}

#[tokio::test]
async fn test_rename_and_update_content() {
    let repo = CatalogRepository::quick_replies(pool().await)
        .await
        .expect("Failed to create repository");

    let item = repo
        .add("Drafts", Some("v1".into()), vec![])
        .await
        .unwrap();

    repo.rename(&item.id, "Final").await.unwrap();
    repo.update_content(&item.id, Some("v2".into()), vec![photo("file-2")])
        .await
        .unwrap();

    let stored = repo.get(&item.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Final");
    assert_eq!(stored.text.as_deref(), Some("v2"));
    assert_eq!(stored.attachments.len(), 1);
}

#[tokio::test]
async fn test_delete_missing_item() {
    let repo = CatalogRepository::quick_replies(pool().await)
        .await
        .expect("Failed to create repository");

    let item = repo.add("Gone", Some("bye".into()), vec![]).await.unwrap();
    repo.delete(&item.id).await.unwrap();

    let err = repo.delete(&item.id).await;
    assert!(matches!(err, Err(StorageError::NotFound(_))));
}
