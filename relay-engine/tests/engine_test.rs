//! Integration tests for the relay engine against an in-memory SQLite
//! store and a recording mock transport.

mod common;

use chrono::{Duration, Utc};
use common::mock_transport::{Call, MockTransport};
use desk_core::event::{AdminCommand, CallbackEvent, PrivateMessage, StaffCommand, TopicMessage};
use desk_core::texts::{Language, TextCatalog};
use desk_core::transport::{Markup, SupportTransport, TopicIcon};
use desk_core::types::{TicketStatus, UserProfile};
use relay_engine::{EngineOptions, JobHandler, JobPayload, RelayEngine, ReminderScheduler};
use std::sync::Arc;
use storage::{
    CatalogRepository, JobRepository, SettingsRepository, SqlitePoolManager, TicketRepository,
};

struct Harness {
    engine: Arc<RelayEngine>,
    transport: Arc<MockTransport>,
    tickets: TicketRepository,
    jobs: JobRepository,
    quick_replies: CatalogRepository,
}

async fn harness() -> Harness {
    let pool = SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    let tickets = TicketRepository::new(pool.clone())
        .await
        .expect("Failed to create ticket repo");
    let settings = SettingsRepository::new(pool.clone())
        .await
        .expect("Failed to create settings repo");
    let quick_replies = CatalogRepository::quick_replies(pool.clone())
        .await
        .expect("Failed to create quick replies");
    let faq = CatalogRepository::faq(pool.clone())
        .await
        .expect("Failed to create faq");
    let jobs = JobRepository::new(pool).await.expect("Failed to create jobs");

    let transport = Arc::new(MockTransport::new());
    let dyn_transport: Arc<dyn SupportTransport> = transport.clone();
    let engine = Arc::new(RelayEngine::new(
        tickets.clone(),
        settings,
        quick_replies.clone(),
        faq,
        dyn_transport,
        ReminderScheduler::new(jobs.clone()),
        TextCatalog::new(Language::En).expect("Failed to build texts"),
        EngineOptions::default(),
    ));

    Harness {
        engine,
        transport,
        tickets,
        jobs,
        quick_replies,
    }
}

fn profile(id: i64, name: &str) -> UserProfile {
    UserProfile {
        id,
        full_name: name.to_string(),
        username: Some("customer".to_string()),
        language_code: Some("en".to_string()),
    }
}

fn private(user: &UserProfile, message_id: i64, text: &str) -> PrivateMessage {
    PrivateMessage {
        profile: user.clone(),
        message_id,
        text: Some(text.to_string()),
        has_link_entity: false,
        group_ids: vec![message_id],
    }
}

fn staff_message(topic_id: i64, message_id: i64, text: &str) -> TopicMessage {
    TopicMessage {
        topic_id,
        message_id,
        text: Some(text.to_string()),
        group_ids: vec![message_id],
    }
}

/// Jobs that would fire within the next ten minutes.
async fn pending_jobs(h: &Harness) -> usize {
    h.jobs
        .due(Utc::now() + Duration::minutes(10))
        .await
        .expect("Failed to query jobs")
        .len()
}

#[tokio::test]
async fn first_message_creates_topic_and_schedules_reminder() {
    let h = harness().await;
    let user = profile(42, "Alice");

    h.engine
        .handle_private_message(private(&user, 1, "My order is late"))
        .await
        .expect("handle failed");

    let ticket = h.tickets.get(42).await.unwrap().expect("ticket missing");
    assert_eq!(ticket.status, TicketStatus::Open);
    assert!(ticket.awaiting_reply);
    let topic_id = ticket.topic_id.expect("no topic provisioned");

    assert_eq!(h.transport.count(|c| matches!(c, Call::CreateTopic { .. })), 1);
    assert_eq!(
        h.transport
            .count(|c| matches!(c, Call::ForwardToTopic { topic_id: t, .. } if *t == topic_id)),
        1
    );
    assert_eq!(h.transport.last_icon(topic_id), Some(TopicIcon::New));
    // Greeting went out to the user.
    assert!(!h.transport.user_texts().is_empty());
    // One reminder pending.
    assert_eq!(pending_jobs(&h).await, 1);
}

#[tokio::test]
async fn repeat_message_reuses_topic() {
    let h = harness().await;
    let user = profile(42, "Alice");

    h.engine
        .handle_private_message(private(&user, 1, "first"))
        .await
        .unwrap();
    h.engine
        .handle_private_message(private(&user, 2, "second"))
        .await
        .unwrap();

    assert_eq!(h.transport.count(|c| matches!(c, Call::CreateTopic { .. })), 1);
    assert_eq!(
        h.transport.count(|c| matches!(c, Call::ForwardToTopic { .. })),
        2
    );
}

#[tokio::test]
async fn banned_user_message_is_dropped() {
    let h = harness().await;
    let user = profile(42, "Alice");
    let mut ticket = desk_core::types::Ticket::new(&user);
    ticket.is_banned = true;
    h.tickets.upsert(&ticket).await.unwrap();

    h.engine
        .handle_private_message(private(&user, 1, "let me in"))
        .await
        .unwrap();

    assert!(h.transport.calls().is_empty());
    assert_eq!(pending_jobs(&h).await, 0);
}

#[tokio::test]
async fn invite_link_in_name_auto_bans() {
    let h = harness().await;
    let user = profile(66, "Promo tg://join now");

    h.engine
        .handle_private_message(private(&user, 1, "hello"))
        .await
        .unwrap();

    let ticket = h.tickets.get(66).await.unwrap().expect("ticket missing");
    assert!(ticket.is_banned);
    assert!(ticket.topic_id.is_none());
    // The user got the block notice; nothing was relayed.
    assert_eq!(h.transport.count(|c| matches!(c, Call::CreateTopic { .. })), 0);
    assert_eq!(
        h.transport.count(|c| matches!(c, Call::ForwardToTopic { .. })),
        0
    );
    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains("blocked")));
}

#[tokio::test]
async fn auto_block_clears_waiting_state() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    assert!(h.tickets.get(42).await.unwrap().unwrap().awaiting_reply);

    h.engine
        .handle_private_message(private(&user, 2, "join t.me/+promo"))
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(ticket.is_banned);
    assert!(!ticket.awaiting_reply);
}

#[tokio::test]
async fn stale_topic_is_healed_with_one_retry() {
    let h = harness().await;
    let user = profile(42, "Alice");

    h.engine
        .handle_private_message(private(&user, 1, "first"))
        .await
        .unwrap();
    let old_topic = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.transport.fail_next_forward_with_missing_topic();
    h.engine
        .handle_private_message(private(&user, 2, "second"))
        .await
        .unwrap();

    let new_topic = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    assert_ne!(old_topic, new_topic);
    assert_eq!(h.transport.count(|c| matches!(c, Call::CreateTopic { .. })), 2);
    assert_eq!(
        h.transport
            .count(|c| matches!(c, Call::ForwardToTopic { topic_id, .. } if *topic_id == new_topic)),
        1
    );
}

#[tokio::test]
async fn staff_reply_relays_and_clears_waiting_state() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "On it"))
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(!ticket.awaiting_reply);
    assert!(ticket.operator_replied);
    assert_eq!(h.transport.last_icon(topic_id), Some(TopicIcon::Active));
    // Reply copied, confirmation with the delete button posted, reminder gone.
    assert_eq!(h.transport.count(|c| matches!(c, Call::CopyToUser { .. })), 1);
    assert_eq!(
        h.transport.count(|c| matches!(
            c,
            Call::SendToTopicMarkup {
                markup: Markup::DeleteButton { origin_message_id: 500 },
                ..
            }
        )),
        1
    );
    assert_eq!(pending_jobs(&h).await, 0);
    assert!(!h.tickets.get_message_links(500).await.unwrap().is_empty());
}

#[tokio::test]
async fn staff_commands_are_not_relayed() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "/resolve"))
        .await
        .unwrap();

    assert_eq!(h.transport.count(|c| matches!(c, Call::CopyToUser { .. })), 0);
}

#[tokio::test]
async fn blocked_recipient_gets_distinct_notice() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.transport.block_user_delivery();
    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "hello?"))
        .await
        .unwrap();

    assert_eq!(
        h.transport.count(|c| matches!(
            c,
            Call::ReplyInGroup { text, .. } if text.contains("blocked")
        )),
        1
    );
    // The operator answered even if delivery failed.
    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(!ticket.awaiting_reply);
}

#[tokio::test]
async fn transient_failure_keeps_waiting_state() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.transport.break_user_delivery();
    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "hello?"))
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(ticket.awaiting_reply);
    assert!(!ticket.operator_replied);
    assert_eq!(
        h.transport.count(|c| matches!(c, Call::ReplyInGroup { .. })),
        1
    );
}

#[tokio::test]
async fn silent_mode_suppresses_staff_replies() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.engine
        .handle_staff_command(topic_id, StaffCommand::Silent)
        .await
        .unwrap();
    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(ticket.silent_mode);
    let marker = ticket.silent_marker_id.expect("marker not pinned");
    assert_eq!(
        h.transport
            .count(|c| matches!(c, Call::Pin { message_id } if *message_id == marker)),
        1
    );

    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "invisible"))
        .await
        .unwrap();
    assert_eq!(h.transport.count(|c| matches!(c, Call::CopyToUser { .. })), 0);

    h.engine
        .handle_staff_command(topic_id, StaffCommand::Silent)
        .await
        .unwrap();
    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(!ticket.silent_mode);
    assert!(ticket.silent_marker_id.is_none());
    assert_eq!(
        h.transport
            .count(|c| matches!(c, Call::Unpin { message_id } if *message_id == marker)),
        1
    );
}

#[tokio::test]
async fn resolve_notifies_user_and_cancels_reminder() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    assert_eq!(pending_jobs(&h).await, 1);

    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);
    assert!(!ticket.awaiting_reply);
    assert_eq!(h.transport.last_icon(topic_id), Some(TopicIcon::Resolved));
    assert_eq!(pending_jobs(&h).await, 0);
    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains("resolved")));
}

#[tokio::test]
async fn resolve_clears_operator_replied_for_the_next_contact() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "fixed"))
        .await
        .unwrap();
    assert!(h.tickets.get(42).await.unwrap().unwrap().operator_replied);

    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(!ticket.operator_replied);
    assert!(!ticket.awaiting_reply);

    // The next message counts as a fresh contact again.
    h.engine
        .handle_private_message(private(&user, 2, "it broke again"))
        .await
        .unwrap();
    assert_eq!(h.transport.last_icon(topic_id), Some(TopicIcon::New));
}

#[tokio::test]
async fn reopen_command_resets_flags_and_cancels_reminder() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "done"))
        .await
        .unwrap();
    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();
    // Postpone leaves a pending reminder behind before the reopen.
    h.engine
        .handle_callback(CallbackEvent {
            callback_id: "cb5".to_string(),
            topic_id,
            message_id: 601,
            data: "support_panel:postpone:42".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(pending_jobs(&h).await, 1);

    h.engine
        .handle_staff_command(topic_id, StaffCommand::Reopen)
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Open);
    assert!(!ticket.awaiting_reply);
    assert!(!ticket.operator_replied);
    assert_eq!(pending_jobs(&h).await, 0);
    assert_eq!(h.transport.last_icon(topic_id), Some(TopicIcon::New));
}

#[tokio::test]
async fn resolve_quiet_skips_the_user_notice() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    let texts_before = h.transport.user_texts().len();

    h.engine
        .handle_staff_command(topic_id, StaffCommand::ResolveQuiet)
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);
    assert_eq!(h.transport.user_texts().len(), texts_before);
}

#[tokio::test]
async fn gratitude_on_resolved_ticket_does_not_reopen() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();

    h.engine
        .handle_private_message(private(&user, 2, "Спасибо!"))
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);
    assert!(!ticket.awaiting_reply);
    assert_eq!(pending_jobs(&h).await, 0);
}

#[tokio::test]
async fn message_on_resolved_ticket_reopens() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();

    h.engine
        .handle_private_message(private(&user, 2, "it broke again"))
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Open);
    assert!(ticket.awaiting_reply);
    // Reminder plus the short-delay icon re-apply.
    assert_eq!(pending_jobs(&h).await, 2);
}

#[tokio::test]
async fn fired_reminder_posts_into_topic_when_still_waiting() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.engine
        .handle_job(JobPayload {
            kind: "support_reminder".to_string(),
            user_id: 42,
            topic_id,
        })
        .await
        .unwrap();

    assert!(h
        .transport
        .topic_texts()
        .iter()
        .any(|t| t.contains("waiting")));
}

#[tokio::test]
async fn fired_reminder_after_resolve_is_a_noop() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();

    h.engine
        .handle_job(JobPayload {
            kind: "support_reminder".to_string(),
            user_id: 42,
            topic_id,
        })
        .await
        .unwrap();

    assert!(!h
        .transport
        .topic_texts()
        .iter()
        .any(|t| t.contains("waiting")));
}

#[tokio::test]
async fn ban_command_toggles_and_silences_reminders() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    h.engine
        .handle_staff_command(topic_id, StaffCommand::Ban)
        .await
        .unwrap();
    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(ticket.is_banned);
    assert_eq!(pending_jobs(&h).await, 0);

    h.engine
        .handle_staff_command(topic_id, StaffCommand::Ban)
        .await
        .unwrap();
    assert!(!h.tickets.get(42).await.unwrap().unwrap().is_banned);
}

#[tokio::test]
async fn delete_cascade_removes_all_copies() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "oops, wrong chat"))
        .await
        .unwrap();
    let copies = h.tickets.get_message_links(500).await.unwrap();
    assert!(!copies.is_empty());

    h.engine
        .handle_callback(CallbackEvent {
            callback_id: "cb1".to_string(),
            topic_id,
            message_id: 600,
            data: "delmsg:500".to_string(),
        })
        .await
        .unwrap();

    for copy_id in copies {
        assert_eq!(
            h.transport
                .count(|c| matches!(c, Call::DeleteUser { message_id, .. } if *message_id == copy_id)),
            1
        );
    }
    assert!(h.tickets.get_message_links(500).await.unwrap().is_empty());
    assert_eq!(
        h.transport
            .count(|c| matches!(c, Call::DeleteGroup { message_id } if *message_id == 500)),
        1
    );
}

#[tokio::test]
async fn postpone_callback_restores_waiting_state() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_topic_message(staff_message(topic_id, 500, "done?"))
        .await
        .unwrap();
    assert_eq!(pending_jobs(&h).await, 0);

    h.engine
        .handle_callback(CallbackEvent {
            callback_id: "cb2".to_string(),
            topic_id,
            message_id: 601,
            data: "support_panel:postpone:42".to_string(),
        })
        .await
        .unwrap();

    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(ticket.awaiting_reply);
    assert_eq!(ticket.panel_message_id, Some(601));
    assert_eq!(pending_jobs(&h).await, 1);
}

#[tokio::test]
async fn callback_for_unknown_user_answers_alert_without_mutation() {
    let h = harness().await;

    h.engine
        .handle_callback(CallbackEvent {
            callback_id: "cb3".to_string(),
            topic_id: 1,
            message_id: 602,
            data: "support_panel:reply:9999".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        h.transport
            .count(|c| matches!(c, Call::AnswerCallback { alert: true, .. })),
        1
    );
    assert!(h.tickets.get(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn quick_reply_is_sent_and_clears_waiting() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();

    let item = h
        .quick_replies
        .add("Shipping", Some("Ships in 3 days".to_string()), vec![])
        .await
        .unwrap();

    h.engine
        .handle_callback(CallbackEvent {
            callback_id: "cb4".to_string(),
            topic_id,
            message_id: 603,
            data: format!("support_panel:quick:42:{}", item.id),
        })
        .await
        .unwrap();

    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains("Ships in 3 days")));
    let ticket = h.tickets.get(42).await.unwrap().unwrap();
    assert!(!ticket.awaiting_reply);
    assert!(ticket.operator_replied);
    assert_eq!(pending_jobs(&h).await, 0);
}

#[tokio::test]
async fn admin_manages_quick_reply_catalog() {
    let h = harness().await;

    h.engine
        .handle_admin_command(
            9,
            AdminCommand::QuickAdd {
                body: "Shipping | Ships in 3 days".to_string(),
            },
        )
        .await
        .unwrap();

    let items = h.quick_replies.list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Shipping");
    assert_eq!(items[0].text.as_deref(), Some("Ships in 3 days"));
    // The confirmation carries the generated id for later /quickdel.
    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains(&items[0].id)));

    h.engine
        .handle_admin_command(9, AdminCommand::QuickList)
        .await
        .unwrap();
    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains("Shipping")));

    h.engine
        .handle_admin_command(
            9,
            AdminCommand::QuickDelete {
                id: items[0].id.clone(),
            },
        )
        .await
        .unwrap();
    assert!(h.quick_replies.list().await.unwrap().is_empty());

    // Deleting again reports the miss instead of failing.
    h.engine
        .handle_admin_command(
            9,
            AdminCommand::QuickDelete {
                id: items[0].id.clone(),
            },
        )
        .await
        .unwrap();
    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains("No catalog item")));
}

#[tokio::test]
async fn admin_add_without_content_gets_usage_prompt() {
    let h = harness().await;

    h.engine
        .handle_admin_command(
            9,
            AdminCommand::QuickAdd {
                body: "Only a title".to_string(),
            },
        )
        .await
        .unwrap();
    h.engine
        .handle_admin_command(
            9,
            AdminCommand::QuickAdd {
                body: " | text without a title".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(h.quick_replies.list().await.unwrap().is_empty());
    assert_eq!(
        h.transport
            .user_texts()
            .iter()
            .filter(|t| t.contains("Format:"))
            .count(),
        2
    );
}

#[tokio::test]
async fn admin_override_changes_resolution_notice() {
    let h = harness().await;
    h.engine
        .handle_admin_command(
            9,
            AdminCommand::SetResolved {
                args: "en All sorted now.".to_string(),
            },
        )
        .await
        .unwrap();

    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let topic_id = h.tickets.get(42).await.unwrap().unwrap().topic_id.unwrap();
    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();
    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains("All sorted now.")));

    h.engine
        .handle_admin_command(
            9,
            AdminCommand::ResetResolved {
                code: "en".to_string(),
            },
        )
        .await
        .unwrap();
    h.engine
        .handle_private_message(private(&user, 2, "one more thing"))
        .await
        .unwrap();
    h.engine
        .handle_staff_command(topic_id, StaffCommand::Resolve)
        .await
        .unwrap();
    assert!(h
        .transport
        .user_texts()
        .iter()
        .any(|t| t.contains("has been resolved")));
}

#[tokio::test]
async fn edited_message_gets_notice_only() {
    let h = harness().await;
    let user = profile(42, "Alice");
    h.engine
        .handle_private_message(private(&user, 1, "help"))
        .await
        .unwrap();
    let before = h.tickets.get(42).await.unwrap().unwrap();

    h.engine
        .handle_private_edited(private(&user, 1, "help edited"))
        .await
        .unwrap();

    assert_eq!(
        h.transport.count(|c| matches!(c, Call::ReplyToUser { .. })),
        1
    );
    let after = h.tickets.get(42).await.unwrap().unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.awaiting_reply, before.awaiting_reply);
}
