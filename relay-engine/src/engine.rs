//! The relay engine: every ticket state transition lives here.
//!
//! The engine is transport-agnostic; it talks to Telegram only through the
//! [`SupportTransport`] trait and persists through the storage repositories.
//! All handlers take the per-user lock before reading the ticket, so a
//! burst of updates for one user applies strictly in order.

use crate::locks::UserLocks;
use crate::panel::{self, PanelAction};
use crate::reminders::{JobHandler, JobPayload, ReminderScheduler};
use crate::topics::TopicProvisioner;
use async_trait::async_trait;
use chrono::Utc;
use desk_core::error::{DeskError, Result, TransportError};
use desk_core::event::{AdminCommand, CallbackEvent, PrivateMessage, StaffCommand, TopicMessage};
use desk_core::security::{
    analyze_user_message, sanitize_display_name, Suspicion, SENSITIVE_PLACEHOLDER,
};
use desk_core::texts::{html_escape, user_link, Language, TextCatalog, TextKey};
use desk_core::transport::{Markup, SupportTransport, TopicIcon};
use desk_core::types::{Ticket, TicketStatus, UserProfile};
use std::sync::Arc;
use storage::{
    CatalogRepository, SettingsRepository, StorageError, TicketRepository,
};
use tracing::{debug, info, instrument, warn};

/// Messages a user may send on a resolved ticket without reopening it.
/// Matched exactly after normalization; deliberately not broadened to
/// substring search so "thanks, one more thing" still reopens.
const GRATITUDE_PHRASES: &[&str] = &[
    "спасибо",
    "спасибо большое",
    "большое спасибо",
    "благодарю",
    "спс",
    "thanks",
    "thank you",
    "thanks a lot",
    "thank you very much",
    "thx",
    "ty",
];

fn normalize_gratitude(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_space = true;
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

fn is_gratitude(text: &str) -> bool {
    let normalized = normalize_gratitude(text);
    !normalized.is_empty() && GRATITUDE_PHRASES.contains(&normalized.as_str())
}

fn storage_err(err: StorageError) -> DeskError {
    DeskError::Storage(err.to_string())
}

/// Which operator-editable text a settings command targets.
#[derive(Debug, Clone, Copy)]
enum Override {
    Greeting,
    Resolved,
}

/// Feature switches resolved from configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub reminders_enabled: bool,
    pub security_filter_enabled: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            reminders_enabled: true,
            security_filter_enabled: true,
        }
    }
}

pub struct RelayEngine {
    tickets: TicketRepository,
    settings: SettingsRepository,
    quick_replies: CatalogRepository,
    faq: CatalogRepository,
    transport: Arc<dyn SupportTransport>,
    provisioner: TopicProvisioner,
    scheduler: ReminderScheduler,
    texts: TextCatalog,
    locks: UserLocks,
    options: EngineOptions,
}

impl RelayEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tickets: TicketRepository,
        settings: SettingsRepository,
        quick_replies: CatalogRepository,
        faq: CatalogRepository,
        transport: Arc<dyn SupportTransport>,
        scheduler: ReminderScheduler,
        texts: TextCatalog,
        options: EngineOptions,
    ) -> Self {
        let provisioner = TopicProvisioner::new(transport.clone(), texts);
        Self {
            tickets,
            settings,
            quick_replies,
            faq,
            transport,
            provisioner,
            scheduler,
            texts,
            locks: UserLocks::new(),
            options,
        }
    }

    fn language_of(&self, ticket: &Ticket) -> Language {
        self.texts.resolve(ticket.language_code.as_deref())
    }

    fn display_name(ticket: &Ticket) -> String {
        sanitize_display_name(Some(&ticket.full_name), SENSITIVE_PLACEHOLDER)
    }

    /// Display name safe to splice into HTML-mode message templates.
    fn escaped_name(ticket: &Ticket) -> String {
        html_escape(&Self::display_name(ticket))
    }

    fn linked_name(ticket: &Ticket) -> String {
        user_link(
            &Self::display_name(ticket),
            ticket.user_id,
            ticket.username.as_deref(),
        )
    }

    async fn load_or_create(&self, profile: &UserProfile) -> Result<Ticket> {
        match self.tickets.get(profile.id).await.map_err(storage_err)? {
            Some(mut ticket) => {
                ticket.refresh_profile(profile);
                Ok(ticket)
            }
            None => Ok(Ticket::new(profile)),
        }
    }

    /// `/start` in the private chat: greet in the user's language.
    #[instrument(skip(self, profile), fields(user_id = profile.id))]
    pub async fn handle_start(&self, profile: UserProfile) -> Result<()> {
        let _guard = self.locks.acquire(profile.id).await;
        let ticket = self.load_or_create(&profile).await?;
        if ticket.is_banned {
            return Ok(());
        }
        self.tickets.upsert(&ticket).await.map_err(storage_err)?;
        self.send_greeting(&ticket).await;
        Ok(())
    }

    async fn send_greeting(&self, ticket: &Ticket) {
        let language = self.language_of(ticket);
        let greeting = match self.settings.greeting(language).await {
            Ok(Some(custom)) => custom,
            Ok(None) => self
                .texts
                .get(language, TextKey::MainMenu)
                .replace("{full_name}", &Self::escaped_name(ticket)),
            Err(err) => {
                warn!(error = %err, "Failed to read greeting override");
                self.texts
                    .get(language, TextKey::MainMenu)
                    .replace("{full_name}", &Self::escaped_name(ticket))
            }
        };
        if let Err(err) = self.transport.send_to_user(ticket.user_id, &greeting).await {
            debug!(user_id = ticket.user_id, error = %err, "Greeting not delivered");
            return;
        }
        self.suggest_faq(ticket).await;
    }

    async fn suggest_faq(&self, ticket: &Ticket) {
        match self.faq.has_items().await {
            Ok(true) => {
                let language = self.language_of(ticket);
                let text = self.texts.get(language, TextKey::FaqSuggestion);
                if let Err(err) = self
                    .transport
                    .send_to_user_with_markup(ticket.user_id, text, Markup::FaqSuggestion)
                    .await
                {
                    debug!(user_id = ticket.user_id, error = %err, "FAQ suggestion not delivered");
                }
            }
            Ok(false) => {}
            Err(err) => warn!(error = %err, "Failed to check FAQ catalog"),
        }
    }

    /// A message in the user's private chat.
    #[instrument(skip(self, msg), fields(user_id = msg.profile.id))]
    pub async fn handle_private_message(&self, msg: PrivateMessage) -> Result<()> {
        let _guard = self.locks.acquire(msg.profile.id).await;
        let mut ticket = self.load_or_create(&msg.profile).await?;

        if ticket.is_banned {
            debug!(user_id = ticket.user_id, "Dropping message from banned user");
            return Ok(());
        }

        if self.options.security_filter_enabled {
            let suspicion = analyze_user_message(
                &ticket.full_name,
                ticket.username.as_deref(),
                msg.text.as_deref(),
                msg.has_link_entity,
            );
            if suspicion.should_block() {
                return self.auto_block(ticket, &suspicion).await;
            }
        }

        let was_resolved = ticket.status == TicketStatus::Resolved;
        let first_contact = ticket.topic_id.is_none();

        // A bare "thanks" on a resolved ticket must not reopen it.
        if was_resolved && is_gratitude(msg.text_content()) {
            if let Some(topic_id) = ticket.topic_id {
                if let Err(err) = self
                    .transport
                    .forward_to_topic(topic_id, ticket.user_id, msg.message_id)
                    .await
                {
                    debug!(topic_id, error = %err, "Gratitude forward failed");
                }
            }
            ticket.awaiting_reply = false;
            self.tickets.upsert(&ticket).await.map_err(storage_err)?;
            return Ok(());
        }

        if was_resolved {
            ticket.operator_replied = false;
        }

        let topic_id = self.relay_private(&mut ticket, &msg).await?;

        ticket.status = TicketStatus::Open;
        ticket.awaiting_reply = true;
        ticket.last_user_message_at = Some(Utc::now());

        if !ticket.operator_replied {
            self.apply_icon(topic_id, TopicIcon::New).await;
            self.repost_panel(&mut ticket).await;
        }

        self.tickets.upsert(&ticket).await.map_err(storage_err)?;

        if self.options.reminders_enabled {
            self.scheduler
                .schedule_support_reminder(ticket.user_id, topic_id)
                .await?;
        }
        if was_resolved {
            // Telegram sometimes clobbers the icon edit right after the
            // reopen; a short-delay re-apply settles it.
            self.scheduler
                .schedule_icon_restore(ticket.user_id, topic_id)
                .await?;
        }

        if first_contact {
            self.send_greeting(&ticket).await;
        } else if was_resolved {
            let language = self.language_of(&ticket);
            let text = self.texts.get(language, TextKey::MessageSent);
            if let Err(err) = self.transport.send_to_user(ticket.user_id, text).await {
                debug!(user_id = ticket.user_id, error = %err, "Reopen confirmation not delivered");
            }
        }

        Ok(())
    }

    /// Relays the message (or its whole attachment group) into the topic,
    /// healing a stale topic mapping with exactly one retry.
    async fn relay_private(&self, ticket: &mut Ticket, msg: &PrivateMessage) -> Result<i64> {
        let topic_id = self.provisioner.ensure_topic(ticket).await?;
        self.tickets.upsert(ticket).await.map_err(storage_err)?;

        match self.forward_group(topic_id, ticket.user_id, msg).await {
            Ok(()) => Ok(topic_id),
            Err(TransportError::TopicMissing) => {
                self.provisioner.invalidate(ticket);
                let topic_id = self.provisioner.ensure_topic(ticket).await?;
                self.tickets.upsert(ticket).await.map_err(storage_err)?;
                self.forward_group(topic_id, ticket.user_id, msg)
                    .await
                    .map_err(DeskError::Transport)?;
                Ok(topic_id)
            }
            Err(err) => Err(DeskError::Transport(err)),
        }
    }

    async fn forward_group(
        &self,
        topic_id: i64,
        user_id: i64,
        msg: &PrivateMessage,
    ) -> std::result::Result<(), TransportError> {
        let ids: &[i64] = if msg.group_ids.is_empty() {
            std::slice::from_ref(&msg.message_id)
        } else {
            &msg.group_ids
        };
        for &message_id in ids {
            self.transport
                .forward_to_topic(topic_id, user_id, message_id)
                .await?;
        }
        Ok(())
    }

    async fn auto_block(&self, mut ticket: Ticket, suspicion: &Suspicion) -> Result<()> {
        warn!(
            user_id = ticket.user_id,
            reasons = %suspicion.reason_line(),
            "Auto-blocking suspicious user"
        );
        ticket.is_banned = true;
        ticket.awaiting_reply = false;
        self.tickets.upsert(&ticket).await.map_err(storage_err)?;
        self.scheduler
            .cancel_support_reminder(ticket.user_id)
            .await?;

        let language = self.language_of(&ticket);
        let notice = self
            .texts
            .get(language, TextKey::AutoBlockedNotice)
            .replace("{reason}", &suspicion.reason_line());
        if let Err(err) = self.transport.send_to_user(ticket.user_id, &notice).await {
            debug!(user_id = ticket.user_id, error = %err, "Auto-block notice not delivered");
        }

        if let Some(topic_id) = ticket.topic_id {
            let alert = self
                .texts
                .get(self.texts.default_language(), TextKey::AutoBlockedAlert)
                .replace("{user}", &Self::linked_name(&ticket))
                .replace("{reason}", &suspicion.reason_line());
            if let Err(err) = self.transport.send_to_topic(topic_id, &alert).await {
                warn!(topic_id, error = %err, "Auto-block alert not delivered");
            }
        }
        Ok(())
    }

    /// An edit in the private chat: edits are never re-relayed.
    #[instrument(skip(self, msg), fields(user_id = msg.profile.id))]
    pub async fn handle_private_edited(&self, msg: PrivateMessage) -> Result<()> {
        let _guard = self.locks.acquire(msg.profile.id).await;
        let ticket = self.load_or_create(&msg.profile).await?;
        if ticket.is_banned {
            return Ok(());
        }
        let language = self.language_of(&ticket);
        let text = self.texts.get(language, TextKey::MessageEdited);
        if let Err(err) = self
            .transport
            .reply_to_user(ticket.user_id, msg.message_id, text)
            .await
        {
            debug!(user_id = ticket.user_id, error = %err, "Edit notice not delivered");
        }
        Ok(())
    }

    /// A staff message posted inside a tracked topic.
    #[instrument(skip(self, msg), fields(topic_id = msg.topic_id))]
    pub async fn handle_topic_message(&self, msg: TopicMessage) -> Result<()> {
        if msg.is_command() {
            return Ok(());
        }
        let Some(found) = self
            .tickets
            .get_by_topic(msg.topic_id)
            .await
            .map_err(storage_err)?
        else {
            debug!(topic_id = msg.topic_id, "Message in untracked topic");
            return Ok(());
        };

        let _guard = self.locks.acquire(found.user_id).await;
        let Some(mut ticket) = self.tickets.get(found.user_id).await.map_err(storage_err)?
        else {
            return Ok(());
        };

        if ticket.silent_mode {
            debug!(user_id = ticket.user_id, "Silent mode: reply suppressed");
            return Ok(());
        }

        let language = self.language_of(&ticket);
        let ids: Vec<i64> = if msg.group_ids.is_empty() {
            vec![msg.message_id]
        } else {
            msg.group_ids.clone()
        };

        match self.transport.copy_to_user(ticket.user_id, &ids).await {
            Ok(copies) => {
                for copy_id in &copies {
                    self.tickets
                        .add_message_link(msg.message_id, ticket.user_id, *copy_id)
                        .await
                        .map_err(storage_err)?;
                }
                let confirmation = self.texts.get(language, TextKey::MessageSentToUser);
                if let Err(err) = self
                    .transport
                    .send_to_topic_with_markup(
                        msg.topic_id,
                        confirmation,
                        Markup::DeleteButton {
                            origin_message_id: msg.message_id,
                        },
                    )
                    .await
                {
                    debug!(topic_id = msg.topic_id, error = %err, "Delivery confirmation failed");
                }
                self.mark_operator_replied(&mut ticket, msg.topic_id).await?;
            }
            Err(TransportError::RecipientBlocked) => {
                let text = self.texts.get(language, TextKey::BlockedByUser);
                if let Err(err) = self
                    .transport
                    .reply_in_group(msg.message_id, msg.topic_id, text)
                    .await
                {
                    debug!(topic_id = msg.topic_id, error = %err, "Blocked notice failed");
                }
                // The operator did answer; the ticket is no longer waiting.
                self.mark_operator_replied(&mut ticket, msg.topic_id).await?;
            }
            Err(err) => {
                warn!(user_id = ticket.user_id, error = %err, "Relay to user failed");
                let text = self.texts.get(language, TextKey::MessageNotSent);
                if let Err(err) = self
                    .transport
                    .reply_in_group(msg.message_id, msg.topic_id, text)
                    .await
                {
                    debug!(topic_id = msg.topic_id, error = %err, "Failure notice failed");
                }
            }
        }
        Ok(())
    }

    async fn mark_operator_replied(&self, ticket: &mut Ticket, topic_id: i64) -> Result<()> {
        if !ticket.operator_replied {
            ticket.operator_replied = true;
            self.apply_icon(topic_id, TopicIcon::Active).await;
        }
        ticket.awaiting_reply = false;
        self.tickets.upsert(ticket).await.map_err(storage_err)?;
        self.scheduler
            .cancel_support_reminder(ticket.user_id)
            .await?;
        Ok(())
    }

    /// A `/command` issued inside a tracked topic.
    #[instrument(skip(self))]
    pub async fn handle_staff_command(
        &self,
        topic_id: i64,
        command: StaffCommand,
    ) -> Result<()> {
        let Some(found) = self
            .tickets
            .get_by_topic(topic_id)
            .await
            .map_err(storage_err)?
        else {
            debug!(topic_id, "Command in untracked topic");
            return Ok(());
        };

        let _guard = self.locks.acquire(found.user_id).await;
        let Some(mut ticket) = self.tickets.get(found.user_id).await.map_err(storage_err)?
        else {
            return Ok(());
        };

        match command {
            StaffCommand::Resolve => self.resolve_ticket(&mut ticket, true).await,
            StaffCommand::ResolveQuiet => self.resolve_ticket(&mut ticket, false).await,
            StaffCommand::Reopen => self.reopen_ticket(&mut ticket).await,
            StaffCommand::Silent => self.toggle_silent(&mut ticket).await,
            StaffCommand::Ban => self.toggle_ban(&mut ticket).await,
            StaffCommand::Information => self.send_information(&ticket).await,
        }
    }

    async fn resolve_ticket(&self, ticket: &mut Ticket, notify_user: bool) -> Result<()> {
        ticket.status = TicketStatus::Resolved;
        ticket.awaiting_reply = false;
        // Cleared so the next user message counts as a fresh contact:
        // "new" icon plus a reposted panel.
        ticket.operator_replied = false;
        self.tickets.upsert(ticket).await.map_err(storage_err)?;
        self.scheduler
            .cancel_support_reminder(ticket.user_id)
            .await?;
        info!(user_id = ticket.user_id, notify_user, "Ticket resolved");

        if let Some(topic_id) = ticket.topic_id {
            self.apply_icon(topic_id, TopicIcon::Resolved).await;
            let text = self
                .texts
                .get(self.texts.default_language(), TextKey::TicketResolved);
            if let Err(err) = self.transport.send_to_topic(topic_id, text).await {
                debug!(topic_id, error = %err, "Resolve notice failed");
            }
        }

        if notify_user {
            let language = self.language_of(ticket);
            let notice = match self.settings.resolved_notice(language).await {
                Ok(Some(custom)) => custom,
                _ => self
                    .texts
                    .get(language, TextKey::TicketResolvedUser)
                    .replace("{full_name}", &Self::escaped_name(ticket)),
            };
            if let Err(err) = self.transport.send_to_user(ticket.user_id, &notice).await {
                debug!(user_id = ticket.user_id, error = %err, "Resolution notice not delivered");
            }
        }
        Ok(())
    }

    async fn reopen_ticket(&self, ticket: &mut Ticket) -> Result<()> {
        ticket.status = TicketStatus::Open;
        ticket.awaiting_reply = false;
        ticket.operator_replied = false;
        self.tickets.upsert(ticket).await.map_err(storage_err)?;
        self.scheduler
            .cancel_support_reminder(ticket.user_id)
            .await?;
        info!(user_id = ticket.user_id, "Ticket reopened");

        if let Some(topic_id) = ticket.topic_id {
            self.apply_icon(topic_id, TopicIcon::New).await;
            let text = self
                .texts
                .get(self.texts.default_language(), TextKey::TicketReopened);
            if let Err(err) = self.transport.send_to_topic(topic_id, text).await {
                debug!(topic_id, error = %err, "Reopen notice failed");
            }
        }
        Ok(())
    }

    async fn toggle_silent(&self, ticket: &mut Ticket) -> Result<()> {
        let Some(topic_id) = ticket.topic_id else {
            return Ok(());
        };
        let language = self.texts.default_language();

        if ticket.silent_mode {
            ticket.silent_mode = false;
            if let Some(marker_id) = ticket.silent_marker_id.take() {
                if let Err(err) = self.transport.unpin_group_message(marker_id).await {
                    debug!(marker_id, error = %err, "Silent marker unpin failed");
                }
                if let Err(err) = self.transport.delete_group_message(marker_id).await {
                    debug!(marker_id, error = %err, "Silent marker delete failed");
                }
            }
            self.tickets.upsert(ticket).await.map_err(storage_err)?;
            let text = self.texts.get(language, TextKey::SilentModeDisabled);
            if let Err(err) = self.transport.send_to_topic(topic_id, text).await {
                debug!(topic_id, error = %err, "Silent-off notice failed");
            }
        } else {
            ticket.silent_mode = true;
            let text = self.texts.get(language, TextKey::SilentModeEnabled);
            let marker_id = self.transport.send_to_topic(topic_id, text).await?;
            if let Err(err) = self.transport.pin_group_message(marker_id, true).await {
                debug!(marker_id, error = %err, "Silent marker pin failed");
            }
            ticket.silent_marker_id = Some(marker_id);
            self.tickets.upsert(ticket).await.map_err(storage_err)?;
        }
        info!(user_id = ticket.user_id, silent = ticket.silent_mode, "Silent mode toggled");
        Ok(())
    }

    async fn toggle_ban(&self, ticket: &mut Ticket) -> Result<()> {
        ticket.is_banned = !ticket.is_banned;
        self.tickets.upsert(ticket).await.map_err(storage_err)?;
        if ticket.is_banned {
            self.scheduler
                .cancel_support_reminder(ticket.user_id)
                .await?;
        }
        info!(user_id = ticket.user_id, banned = ticket.is_banned, "Ban toggled");

        if let Some(topic_id) = ticket.topic_id {
            let key = if ticket.is_banned {
                TextKey::UserBlocked
            } else {
                TextKey::UserUnblocked
            };
            let text = self.texts.get(self.texts.default_language(), key);
            if let Err(err) = self.transport.send_to_topic(topic_id, text).await {
                debug!(topic_id, error = %err, "Ban notice failed");
            }
        }
        Ok(())
    }

    fn information_text(&self, ticket: &Ticket) -> String {
        let language = self.texts.default_language();
        let status_key = match ticket.status {
            TicketStatus::Open => TextKey::TicketStatusOpen,
            TicketStatus::Resolved => TextKey::TicketStatusResolved,
        };
        self.texts
            .get(language, TextKey::UserInformation)
            .replace("{full_name}", &Self::escaped_name(ticket))
            .replace("{id}", &ticket.user_id.to_string())
            .replace(
                "{username}",
                &html_escape(ticket.username.as_deref().unwrap_or("-")),
            )
            .replace("{status}", self.texts.get(language, status_key))
            .replace(
                "{created_at}",
                &ticket.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            )
    }

    async fn send_information(&self, ticket: &Ticket) -> Result<()> {
        if let Some(topic_id) = ticket.topic_id {
            self.transport
                .send_to_topic(topic_id, &self.information_text(ticket))
                .await?;
        }
        Ok(())
    }

    /// A catalog or text-override command from the operator's private
    /// chat. Replies go back to the same chat; malformed arguments get a
    /// usage prompt instead of being relayed like a user message.
    #[instrument(skip(self, command), fields(user_id = operator_id))]
    pub async fn handle_admin_command(
        &self,
        operator_id: i64,
        command: AdminCommand,
    ) -> Result<()> {
        match command {
            AdminCommand::QuickList => {
                self.send_catalog_list(operator_id, &self.quick_replies).await
            }
            AdminCommand::FaqList => self.send_catalog_list(operator_id, &self.faq).await,
            AdminCommand::QuickAdd { body } => {
                self.catalog_add(operator_id, &self.quick_replies, &body).await
            }
            AdminCommand::FaqAdd { body } => {
                self.catalog_add(operator_id, &self.faq, &body).await
            }
            AdminCommand::QuickDelete { id } => {
                self.catalog_delete(operator_id, &self.quick_replies, &id).await
            }
            AdminCommand::FaqDelete { id } => {
                self.catalog_delete(operator_id, &self.faq, &id).await
            }
            AdminCommand::SetGreeting { args } => {
                self.set_override(operator_id, Override::Greeting, &args).await
            }
            AdminCommand::SetResolved { args } => {
                self.set_override(operator_id, Override::Resolved, &args).await
            }
            AdminCommand::ResetGreeting { code } => {
                self.clear_override(operator_id, Override::Greeting, &code).await
            }
            AdminCommand::ResetResolved { code } => {
                self.clear_override(operator_id, Override::Resolved, &code).await
            }
        }
    }

    async fn notify_operator(&self, operator_id: i64, text: &str) -> Result<()> {
        if let Err(err) = self.transport.send_to_user(operator_id, text).await {
            debug!(operator_id, error = %err, "Admin notice not delivered");
        }
        Ok(())
    }

    async fn send_catalog_list(
        &self,
        operator_id: i64,
        catalog: &CatalogRepository,
    ) -> Result<()> {
        let language = self.texts.default_language();
        let items = catalog.list().await.map_err(storage_err)?;
        if items.is_empty() {
            let text = self.texts.get(language, TextKey::CatalogEmpty);
            return self.notify_operator(operator_id, text).await;
        }
        let mut body = self
            .texts
            .get(language, TextKey::AdminCatalogHeader)
            .to_string();
        for item in &items {
            body.push_str(&format!(
                "\n• {} — <code>{}</code>",
                html_escape(&item.title),
                item.id
            ));
        }
        self.notify_operator(operator_id, &body).await
    }

    async fn catalog_add(
        &self,
        operator_id: i64,
        catalog: &CatalogRepository,
        body: &str,
    ) -> Result<()> {
        let language = self.texts.default_language();
        let usage = self.texts.get(language, TextKey::AdminCatalogUsage);
        let Some((title, text)) = body.split_once('|') else {
            return self.notify_operator(operator_id, usage).await;
        };
        let (title, text) = (title.trim(), text.trim());
        if title.is_empty() || text.is_empty() {
            return self.notify_operator(operator_id, usage).await;
        }

        match catalog.add(title, Some(text.to_string()), Vec::new()).await {
            Ok(item) => {
                info!(id = %item.id, "Catalog item added by operator");
                let saved = self
                    .texts
                    .get(language, TextKey::AdminItemSaved)
                    .replace("{title}", &html_escape(&item.title))
                    .replace("{id}", &item.id);
                self.notify_operator(operator_id, &saved).await
            }
            Err(StorageError::Validation(_)) => self.notify_operator(operator_id, usage).await,
            Err(err) => Err(storage_err(err)),
        }
    }

    async fn catalog_delete(
        &self,
        operator_id: i64,
        catalog: &CatalogRepository,
        id: &str,
    ) -> Result<()> {
        let language = self.texts.default_language();
        let id = id.trim();
        if id.is_empty() {
            let text = self.texts.get(language, TextKey::AdminCatalogUsage);
            return self.notify_operator(operator_id, text).await;
        }
        match catalog.delete(id).await {
            Ok(()) => {
                let text = self.texts.get(language, TextKey::AdminItemDeleted);
                self.notify_operator(operator_id, text).await
            }
            Err(StorageError::NotFound(_)) => {
                let text = self.texts.get(language, TextKey::AdminItemMissing);
                self.notify_operator(operator_id, text).await
            }
            Err(err) => Err(storage_err(err)),
        }
    }

    async fn set_override(
        &self,
        operator_id: i64,
        kind: Override,
        args: &str,
    ) -> Result<()> {
        let language = self.texts.default_language();
        let usage = self.texts.get(language, TextKey::AdminOverrideUsage);
        let Some((code, text)) = args.split_once(char::is_whitespace) else {
            return self.notify_operator(operator_id, usage).await;
        };
        let text = text.trim();
        let Some(target) = Language::from_code(code) else {
            return self.notify_operator(operator_id, usage).await;
        };
        if text.is_empty() {
            return self.notify_operator(operator_id, usage).await;
        }

        match kind {
            Override::Greeting => self.settings.set_greeting(target, text).await,
            Override::Resolved => self.settings.set_resolved_notice(target, text).await,
        }
        .map_err(storage_err)?;
        let saved = self.texts.get(language, TextKey::AdminOverrideSaved);
        self.notify_operator(operator_id, saved).await
    }

    async fn clear_override(
        &self,
        operator_id: i64,
        kind: Override,
        code: &str,
    ) -> Result<()> {
        let language = self.texts.default_language();
        let Some(target) = Language::from_code(code.trim()) else {
            let text = self.texts.get(language, TextKey::AdminOverrideUsage);
            return self.notify_operator(operator_id, text).await;
        };
        match kind {
            Override::Greeting => self.settings.clear_greeting(target).await,
            Override::Resolved => self.settings.clear_resolved_notice(target).await,
        }
        .map_err(storage_err)?;
        let text = self.texts.get(language, TextKey::AdminOverrideCleared);
        self.notify_operator(operator_id, text).await
    }

    /// A panel (or delete-cascade) button press inside a topic.
    #[instrument(skip(self, event), fields(topic_id = event.topic_id, data = %event.data))]
    pub async fn handle_callback(&self, event: CallbackEvent) -> Result<()> {
        let Some(action) = PanelAction::parse(&event.data) else {
            debug!(data = %event.data, "Unknown callback data");
            self.answer(&event.callback_id, None, false).await;
            return Ok(());
        };

        if let PanelAction::DeleteCascade { origin_message_id } = action {
            return self.delete_cascade(&event, origin_message_id).await;
        }

        let user_id = match action {
            PanelAction::Reply { user_id }
            | PanelAction::Postpone { user_id }
            | PanelAction::StatusMenu { user_id }
            | PanelAction::SetStatus { user_id, .. }
            | PanelAction::Back { user_id }
            | PanelAction::Info { user_id }
            | PanelAction::QuickSend { user_id, .. } => user_id,
            PanelAction::DeleteCascade { .. } => unreachable!(),
        };

        let _guard = self.locks.acquire(user_id).await;
        let Some(mut ticket) = self.tickets.get(user_id).await.map_err(storage_err)? else {
            let text = self
                .texts
                .get(self.texts.default_language(), TextKey::UserNotFound);
            self.answer(&event.callback_id, Some(text), true).await;
            return Ok(());
        };
        let language = self.texts.default_language();

        match action {
            PanelAction::Reply { .. } => {
                let prompt = self
                    .texts
                    .get(language, TextKey::SupportPanelReplyPrompt)
                    .replace("{full_name}", &Self::escaped_name(&ticket));
                let placeholder = self
                    .texts
                    .get(language, TextKey::SupportPanelReplyPlaceholder);
                if let Err(err) = self
                    .transport
                    .send_reply_prompt(event.topic_id, &prompt, placeholder)
                    .await
                {
                    debug!(topic_id = event.topic_id, error = %err, "Reply prompt failed");
                }
                let hint = self.texts.get(language, TextKey::SupportPanelReplyHint);
                self.answer(&event.callback_id, Some(hint), false).await;
            }
            PanelAction::Postpone { .. } => {
                ticket.awaiting_reply = true;
                if self.options.reminders_enabled {
                    if let Some(topic_id) = ticket.topic_id {
                        self.scheduler
                            .schedule_support_reminder(ticket.user_id, topic_id)
                            .await?;
                    }
                }
                let text = self.texts.get(language, TextKey::SupportPanelPostponed);
                self.answer(&event.callback_id, Some(text), false).await;
            }
            PanelAction::StatusMenu { .. } => {
                let markup = Markup::StatusMenu {
                    user_id,
                    resolved: ticket.status == TicketStatus::Resolved,
                };
                if let Err(err) = self
                    .transport
                    .edit_group_markup(event.message_id, markup)
                    .await
                {
                    if !err.is_ignorable() {
                        debug!(error = %err, "Status menu swap failed");
                    }
                }
                self.answer(&event.callback_id, None, false).await;
            }
            PanelAction::SetStatus { resolved, .. } => {
                if resolved {
                    self.resolve_ticket(&mut ticket, true).await?;
                } else {
                    self.reopen_ticket(&mut ticket).await?;
                }
                let markup = Markup::Panel { user_id, resolved };
                let text = panel::panel_text(&self.texts, &ticket);
                if let Err(err) =
                    panel::refresh_panel(self.transport.as_ref(), event.message_id, &text, markup)
                        .await
                {
                    debug!(error = %err, "Panel refresh failed");
                }
                let answer = self
                    .texts
                    .get(language, TextKey::SupportPanelStatusChanged);
                self.answer(&event.callback_id, Some(answer), false).await;
            }
            PanelAction::Back { .. } => {
                let markup = Markup::Panel {
                    user_id,
                    resolved: ticket.status == TicketStatus::Resolved,
                };
                if let Err(err) = self
                    .transport
                    .edit_group_markup(event.message_id, markup)
                    .await
                {
                    if !err.is_ignorable() {
                        debug!(error = %err, "Panel back swap failed");
                    }
                }
                self.answer(&event.callback_id, None, false).await;
            }
            PanelAction::Info { .. } => {
                let info = self.information_text(&ticket);
                self.answer(&event.callback_id, Some(&info), true).await;
            }
            PanelAction::QuickSend { ref item_id, .. } => {
                self.quick_send(&mut ticket, &event, item_id).await?;
            }
            PanelAction::DeleteCascade { .. } => unreachable!(),
        }

        ticket.panel_message_id = Some(event.message_id);
        self.tickets.upsert(&ticket).await.map_err(storage_err)?;
        Ok(())
    }

    async fn quick_send(
        &self,
        ticket: &mut Ticket,
        event: &CallbackEvent,
        item_id: &str,
    ) -> Result<()> {
        let language = self.texts.default_language();
        let Some(item) = self.quick_replies.get(item_id).await.map_err(storage_err)?
        else {
            let text = self.texts.get(language, TextKey::UserNotFound);
            self.answer(&event.callback_id, Some(text), true).await;
            return Ok(());
        };

        let mut delivery: std::result::Result<(), TransportError> = Ok(());
        if let Some(text) = item.text.as_deref().filter(|t| !t.is_empty()) {
            delivery = self
                .transport
                .send_to_user(ticket.user_id, text)
                .await
                .map(|_| ());
        }
        if delivery.is_ok() {
            for attachment in &item.attachments {
                if let Err(err) = self
                    .transport
                    .send_attachment_to_user(ticket.user_id, attachment)
                    .await
                {
                    delivery = Err(err);
                    break;
                }
            }
        }

        match delivery {
            Ok(()) => {
                if !ticket.operator_replied {
                    ticket.operator_replied = true;
                    if let Some(topic_id) = ticket.topic_id {
                        self.apply_icon(topic_id, TopicIcon::Active).await;
                    }
                }
                ticket.awaiting_reply = false;
                self.tickets.upsert(ticket).await.map_err(storage_err)?;
                self.scheduler
                    .cancel_support_reminder(ticket.user_id)
                    .await?;
                let text = self.texts.get(language, TextKey::QuickReplySent);
                if let Some(topic_id) = ticket.topic_id {
                    if let Err(err) = self.transport.send_to_topic(topic_id, text).await {
                        debug!(topic_id, error = %err, "Quick-reply confirmation failed");
                    }
                }
                self.answer(&event.callback_id, Some(text), false).await;
            }
            Err(TransportError::RecipientBlocked) => {
                let text = self.texts.get(language, TextKey::BlockedByUser);
                self.answer(&event.callback_id, Some(text), true).await;
            }
            Err(err) => {
                warn!(user_id = ticket.user_id, error = %err, "Quick reply failed");
                let text = self.texts.get(language, TextKey::MessageNotSent);
                self.answer(&event.callback_id, Some(text), true).await;
            }
        }
        Ok(())
    }

    async fn delete_cascade(&self, event: &CallbackEvent, origin_message_id: i64) -> Result<()> {
        let Some(found) = self
            .tickets
            .get_by_topic(event.topic_id)
            .await
            .map_err(storage_err)?
        else {
            let text = self
                .texts
                .get(self.texts.default_language(), TextKey::UserNotFound);
            self.answer(&event.callback_id, Some(text), true).await;
            return Ok(());
        };

        let _guard = self.locks.acquire(found.user_id).await;
        let links = self
            .tickets
            .get_message_links(origin_message_id)
            .await
            .map_err(storage_err)?;
        for copy_id in links {
            if let Err(err) = self
                .transport
                .delete_user_message(found.user_id, copy_id)
                .await
            {
                debug!(copy_id, error = %err, "User-side delete failed");
            }
        }
        self.tickets
            .delete_message_links(origin_message_id)
            .await
            .map_err(storage_err)?;

        if let Err(err) = self.transport.delete_group_message(origin_message_id).await {
            debug!(origin_message_id, error = %err, "Origin delete failed");
        }
        if event.message_id != origin_message_id {
            if let Err(err) = self.transport.delete_group_message(event.message_id).await {
                debug!(message_id = event.message_id, error = %err, "Confirmation delete failed");
            }
        }
        info!(origin_message_id, "Relayed message deleted everywhere");
        self.answer(&event.callback_id, None, false).await;
        Ok(())
    }

    /// "Open FAQ" pressed in the private chat.
    #[instrument(skip(self, callback_id))]
    pub async fn handle_faq_open(&self, user_id: i64, callback_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(user_id).await;
        let language = match self.tickets.get(user_id).await.map_err(storage_err)? {
            Some(ticket) => self.language_of(&ticket),
            None => self.texts.default_language(),
        };

        let items = self.faq.list().await.map_err(storage_err)?;
        if items.is_empty() {
            let text = self.texts.get(language, TextKey::CatalogEmpty);
            self.answer(callback_id, Some(text), true).await;
            return Ok(());
        }

        let mut body = self.texts.get(language, TextKey::FaqHeader).to_string();
        for item in &items {
            body.push_str("\n\n");
            body.push_str(&desk_core::texts::hbold(&item.title));
            if let Some(text) = item.text.as_deref().filter(|t| !t.is_empty()) {
                body.push('\n');
                body.push_str(text);
            }
        }
        self.transport.send_to_user(user_id, &body).await?;
        self.answer(callback_id, None, false).await;
        Ok(())
    }

    async fn repost_panel(&self, ticket: &mut Ticket) {
        let Some(topic_id) = ticket.topic_id else {
            return;
        };
        if let Some(old_panel) = ticket.panel_message_id.take() {
            if let Err(err) = self.transport.delete_group_message(old_panel).await {
                debug!(old_panel, error = %err, "Stale panel delete failed");
            }
        }
        let markup = Markup::Panel {
            user_id: ticket.user_id,
            resolved: ticket.status == TicketStatus::Resolved,
        };
        let text = panel::panel_text(&self.texts, ticket);
        match self
            .transport
            .send_to_topic_with_markup(topic_id, &text, markup)
            .await
        {
            Ok(panel_id) => ticket.panel_message_id = Some(panel_id),
            Err(err) => warn!(topic_id, error = %err, "Panel post failed"),
        }
    }

    async fn apply_icon(&self, topic_id: i64, icon: TopicIcon) {
        if let Err(err) = self.transport.set_topic_icon(topic_id, icon).await {
            if !err.is_ignorable() {
                debug!(topic_id, error = %err, "Icon update failed");
            }
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>, alert: bool) {
        if let Err(err) = self.transport.answer_callback(callback_id, text, alert).await {
            debug!(error = %err, "Callback answer failed");
        }
    }
}

#[async_trait]
impl JobHandler for RelayEngine {
    /// Fired jobs re-check live state; anything stale is a silent no-op.
    async fn handle_job(&self, payload: JobPayload) -> Result<()> {
        let _guard = self.locks.acquire(payload.user_id).await;
        let Some(ticket) = self.tickets.get(payload.user_id).await.map_err(storage_err)?
        else {
            return Ok(());
        };

        if payload.is_support_reminder() {
            let still_waiting = ticket.status == TicketStatus::Open
                && ticket.awaiting_reply
                && !ticket.is_banned;
            if !still_waiting {
                debug!(user_id = ticket.user_id, "Stale reminder, skipping");
                return Ok(());
            }
            if let Some(topic_id) = ticket.topic_id {
                let text = self
                    .texts
                    .get(self.texts.default_language(), TextKey::SupportReminder)
                    .replace("{user}", &Self::linked_name(&ticket));
                if let Err(err) = self.transport.send_to_topic(topic_id, &text).await {
                    warn!(topic_id, error = %err, "Reminder post failed");
                }
            }
        } else if payload.is_icon_restore() {
            if let Some(topic_id) = ticket.topic_id {
                let icon = match (ticket.status, ticket.operator_replied) {
                    (TicketStatus::Resolved, _) => TopicIcon::Resolved,
                    (TicketStatus::Open, true) => TopicIcon::Active,
                    (TicketStatus::Open, false) => TopicIcon::New,
                };
                self.apply_icon(topic_id, icon).await;
            }
        } else {
            debug!(kind = %payload.kind, "Unknown job kind");
        }
        Ok(())
    }
}
