//! Unit tests for TicketRepository.
//!
//! Covers lookup by user and topic, the upsert write path and the
//! relayed-message link index.

use crate::sqlite_pool::SqlitePoolManager;
use crate::ticket_repo::TicketRepository;
use desk_core::types::{Ticket, TicketStatus, UserProfile};

async fn repo() -> TicketRepository {
    let pool = SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    TicketRepository::new(pool)
        .await
        .expect("Failed to create repository")
}

fn profile(user_id: i64, name: &str) -> UserProfile {
    UserProfile {
        id: user_id,
        full_name: name.to_string(),
        username: Some("someone".to_string()),
        language_code: Some("en".to_string()),
    }
}

#[tokio::test]
async fn test_get_missing_ticket_returns_none() {
    let repo = repo().await;
    let found = repo.get(404).await.expect("Failed to query");
    assert!(found.is_none());
}

#[tokio::test]
async fn test_upsert_then_get() {
    let repo = repo().await;
    let mut ticket = Ticket::new(&profile(123, "Alice"));
    ticket.topic_id = Some(77);
    repo.upsert(&ticket).await.expect("Failed to upsert");

    let found = repo.get(123).await.expect("Failed to query").unwrap();
    assert_eq!(found.user_id, 123);
    assert_eq!(found.full_name, "Alice");
    assert_eq!(found.topic_id, Some(77));
    assert_eq!(found.status, TicketStatus::Open);
    assert!(!found.is_banned);
}

#[tokio::test]
async fn test_upsert_updates_existing_row() {
    let repo = repo().await;
    let mut ticket = Ticket::new(&profile(123, "Alice"));
    repo.upsert(&ticket).await.expect("Failed to upsert");

    ticket.status = TicketStatus::Resolved;
    ticket.silent_mode = true;
    ticket.silent_marker_id = Some(900);
    repo.upsert(&ticket).await.expect("Failed to upsert");

    let found = repo.get(123).await.expect("Failed to query").unwrap();
    assert_eq!(found.status, TicketStatus::Resolved);
    assert!(found.silent_mode);
    assert_eq!(found.silent_marker_id, Some(900));
}

#[tokio::test]
async fn test_get_by_topic() {
    let repo = repo().await;
    let mut ticket = Ticket::new(&profile(55, "Bob"));
    ticket.topic_id = Some(12);
    repo.upsert(&ticket).await.expect("Failed to upsert");

    let found = repo
        .get_by_topic(12)
        .await
        .expect("Failed to query")
        .unwrap();
    assert_eq!(found.user_id, 55);

    let missing = repo.get_by_topic(99).await.expect("Failed to query");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_banned_filter() {
    let repo = repo().await;
    let mut banned = Ticket::new(&profile(1, "Mallory"));
    banned.is_banned = true;
    repo.upsert(&banned).await.expect("Failed to upsert");
    repo.upsert(&Ticket::new(&profile(2, "Alice")))
        .await
        .expect("Failed to upsert");

    let listed = repo.banned().await.expect("Failed to query");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_id, 1);

    let ids = repo.all_user_ids().await.expect("Failed to query");
    assert_eq!(ids.len(), 2);
}

#[tokio::test]
async fn test_message_links_cascade() {
    let repo = repo().await;

    // One staff message copied as an album of three user-side messages.
    repo.add_message_link(500, 123, 1001).await.unwrap();
    repo.add_message_link(500, 123, 1002).await.unwrap();
    repo.add_message_link(500, 123, 1003).await.unwrap();
    // Duplicate insert is a no-op.
    repo.add_message_link(500, 123, 1001).await.unwrap();

    let links = repo.get_message_links(500).await.unwrap();
    assert_eq!(links, vec![1001, 1002, 1003]);

    repo.delete_message_links(500).await.unwrap();
    assert!(repo.get_message_links(500).await.unwrap().is_empty());
}
