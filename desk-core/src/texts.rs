//! Typed message-text catalog.
//!
//! Language code maps to a fixed [`TextKey`] set; every key must have a
//! template for every built-in language, checked once at construction.
//! Templates use `{name}`-style placeholders filled by the caller.

use crate::error::{DeskError, Result};
use serde::{Deserialize, Serialize};

/// Languages shipped with the bot. Unknown codes fall back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    En,
    Ru,
}

impl Language {
    pub const ALL: &'static [Language] = &[Language::En, Language::Ru];

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.to_ascii_lowercase();
        if code.starts_with("ru") {
            Some(Language::Ru)
        } else if code.starts_with("en") {
            Some(Language::En)
        } else {
            None
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

/// Every user- or staff-facing template the relay core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKey {
    MainMenu,
    MessageSent,
    MessageEdited,
    MessageSentToUser,
    BlockedByUser,
    MessageNotSent,
    UserStartedBot,
    TicketResolved,
    TicketReopened,
    TicketResolvedUser,
    TicketStatusOpen,
    TicketStatusResolved,
    SilentModeEnabled,
    SilentModeDisabled,
    UserBlocked,
    UserUnblocked,
    UserInformation,
    SupportReminder,
    AutoBlockedNotice,
    AutoBlockedAlert,
    SupportPanelPrompt,
    SupportPanelReplyPrompt,
    SupportPanelReplyPlaceholder,
    SupportPanelReplyHint,
    SupportPanelPostponed,
    SupportPanelStatusChanged,
    FaqSuggestion,
    FaqHeader,
    CatalogEmpty,
    QuickReplySent,
    UserNotFound,
    AdminCatalogHeader,
    AdminCatalogUsage,
    AdminItemSaved,
    AdminItemDeleted,
    AdminItemMissing,
    AdminOverrideUsage,
    AdminOverrideSaved,
    AdminOverrideCleared,
}

impl TextKey {
    pub const ALL: &'static [TextKey] = &[
        TextKey::MainMenu,
        TextKey::MessageSent,
        TextKey::MessageEdited,
        TextKey::MessageSentToUser,
        TextKey::BlockedByUser,
        TextKey::MessageNotSent,
        TextKey::UserStartedBot,
        TextKey::TicketResolved,
        TextKey::TicketReopened,
        TextKey::TicketResolvedUser,
        TextKey::TicketStatusOpen,
        TextKey::TicketStatusResolved,
        TextKey::SilentModeEnabled,
        TextKey::SilentModeDisabled,
        TextKey::UserBlocked,
        TextKey::UserUnblocked,
        TextKey::UserInformation,
        TextKey::SupportReminder,
        TextKey::AutoBlockedNotice,
        TextKey::AutoBlockedAlert,
        TextKey::SupportPanelPrompt,
        TextKey::SupportPanelReplyPrompt,
        TextKey::SupportPanelReplyPlaceholder,
        TextKey::SupportPanelReplyHint,
        TextKey::SupportPanelPostponed,
        TextKey::SupportPanelStatusChanged,
        TextKey::FaqSuggestion,
        TextKey::FaqHeader,
        TextKey::CatalogEmpty,
        TextKey::QuickReplySent,
        TextKey::UserNotFound,
        TextKey::AdminCatalogHeader,
        TextKey::AdminCatalogUsage,
        TextKey::AdminItemSaved,
        TextKey::AdminItemDeleted,
        TextKey::AdminItemMissing,
        TextKey::AdminOverrideUsage,
        TextKey::AdminOverrideSaved,
        TextKey::AdminOverrideCleared,
    ];
}

fn template(language: Language, key: TextKey) -> &'static str {
    use Language::*;
    use TextKey::*;
    match (language, key) {
        (En, MainMenu) => "👋 Hi, {full_name}! Describe your question and we will reply here.",
        (En, MessageSent) => "✅ Message delivered to support.",
        (En, MessageEdited) => "✏️ Edits are not forwarded. Send a new message instead.",
        (En, MessageSentToUser) => "✅ Delivered to the user.",
        (En, BlockedByUser) => "🚫 Not delivered: the user has blocked the bot.",
        (En, MessageNotSent) => "⚠️ Not delivered: delivery failed.",
        (En, UserStartedBot) => "{name} started the bot.",
        (En, TicketResolved) => "✅ Ticket marked as resolved.",
        (En, TicketReopened) => "📨 Ticket reopened.",
        (En, TicketResolvedUser) => {
            "{full_name}, your request has been resolved. Write again any time if something else comes up."
        }
        (En, TicketStatusOpen) => "🟢 open",
        (En, TicketStatusResolved) => "✅ resolved",
        (En, SilentModeEnabled) => "🔇 Silent mode enabled. Messages from the user are not relayed.",
        (En, SilentModeDisabled) => "🔊 Silent mode disabled.",
        (En, UserBlocked) => "🚫 User blocked.",
        (En, UserUnblocked) => "✅ User unblocked.",
        (En, UserInformation) => {
            "👤 {full_name}\nid: {id}\nusername: {username}\nstatus: {status}\ncreated: {created_at}"
        }
        (En, SupportReminder) => "⏰ {user} is still waiting for a reply.",
        (En, AutoBlockedNotice) => "🚫 Your message was blocked by the spam filter.\nReason: {reason}",
        (En, AutoBlockedAlert) => "🚨 {user} was blocked automatically.\nReason: {reason}",
        (En, SupportPanelPrompt) => "🎛 {full_name}\nTicket status: {status}",
        (En, SupportPanelReplyPrompt) => "✍️ Reply to {full_name}:",
        (En, SupportPanelReplyPlaceholder) => "Type your reply…",
        (En, SupportPanelReplyHint) => "Send your reply as a message in this topic.",
        (En, SupportPanelPostponed) => "⏰ Reminder set, the ticket is marked as waiting.",
        (En, SupportPanelStatusChanged) => "Status updated.",
        (En, FaqSuggestion) => "While you wait, the FAQ may already have an answer.",
        (En, FaqHeader) => "📚 Frequently asked questions",
        (En, CatalogEmpty) => "The list is empty.",
        (En, QuickReplySent) => "⚡ Quick reply sent to the user.",
        (En, UserNotFound) => "User not found.",
        (En, AdminCatalogHeader) => "📋 Catalog items:",
        (En, AdminCatalogUsage) => {
            "Format: /quickadd Title | Text (or /faqadd). Title and text must not be empty."
        }
        (En, AdminItemSaved) => "✅ Saved: {title}\nid: {id}",
        (En, AdminItemDeleted) => "🗑 Item deleted.",
        (En, AdminItemMissing) => "No catalog item with that id.",
        (En, AdminOverrideUsage) => {
            "Format: /setgreeting en Text, /setresolved ru Text, /resetgreeting en, /resetresolved ru."
        }
        (En, AdminOverrideSaved) => "✅ Override saved.",
        (En, AdminOverrideCleared) => "✅ Override cleared.",

        (Ru, MainMenu) => "👋 Привет, {full_name}! Опишите вопрос, и мы ответим прямо здесь.",
        (Ru, MessageSent) => "✅ Сообщение передано в поддержку.",
        (Ru, MessageEdited) => "✏️ Изменения не пересылаются. Отправьте новое сообщение.",
        (Ru, MessageSentToUser) => "✅ Доставлено пользователю.",
        (Ru, BlockedByUser) => "🚫 Не доставлено: пользователь заблокировал бота.",
        (Ru, MessageNotSent) => "⚠️ Не доставлено: ошибка отправки.",
        (Ru, UserStartedBot) => "{name} запустил(а) бота.",
        (Ru, TicketResolved) => "✅ Тикет закрыт.",
        (Ru, TicketReopened) => "📨 Тикет снова открыт.",
        (Ru, TicketResolvedUser) => {
            "{full_name}, ваш вопрос решён. Если появится что-то ещё — напишите нам снова."
        }
        (Ru, TicketStatusOpen) => "🟢 открыт",
        (Ru, TicketStatusResolved) => "✅ решён",
        (Ru, SilentModeEnabled) => "🔇 Тихий режим включён. Сообщения пользователя не пересылаются.",
        (Ru, SilentModeDisabled) => "🔊 Тихий режим выключен.",
        (Ru, UserBlocked) => "🚫 Пользователь заблокирован.",
        (Ru, UserUnblocked) => "✅ Пользователь разблокирован.",
        (Ru, UserInformation) => {
            "👤 {full_name}\nid: {id}\nusername: {username}\nстатус: {status}\nсоздан: {created_at}"
        }
        (Ru, SupportReminder) => "⏰ {user} всё ещё ждёт ответа.",
        (Ru, AutoBlockedNotice) => "🚫 Ваше сообщение заблокировано спам-фильтром.\nПричина: {reason}",
        (Ru, AutoBlockedAlert) => "🚨 {user} заблокирован автоматически.\nПричина: {reason}",
        (Ru, SupportPanelPrompt) => "🎛 {full_name}\nСтатус тикета: {status}",
        (Ru, SupportPanelReplyPrompt) => "✍️ Ответ для {full_name}:",
        (Ru, SupportPanelReplyPlaceholder) => "Введите ответ…",
        (Ru, SupportPanelReplyHint) => "Отправьте ответ сообщением в этом топике.",
        (Ru, SupportPanelPostponed) => "⏰ Напоминание установлено, тикет помечен как ожидающий.",
        (Ru, SupportPanelStatusChanged) => "Статус обновлён.",
        (Ru, FaqSuggestion) => "Пока ждёте ответа — возможно, он уже есть в FAQ.",
        (Ru, FaqHeader) => "📚 Часто задаваемые вопросы",
        (Ru, CatalogEmpty) => "Список пуст.",
        (Ru, QuickReplySent) => "⚡ Быстрый ответ отправлен пользователю.",
        (Ru, UserNotFound) => "Пользователь не найден.",
        (Ru, AdminCatalogHeader) => "📋 Элементы каталога:",
        (Ru, AdminCatalogUsage) => {
            "Формат: /quickadd Заголовок | Текст (или /faqadd). Заголовок и текст не могут быть пустыми."
        }
        (Ru, AdminItemSaved) => "✅ Сохранено: {title}\nid: {id}",
        (Ru, AdminItemDeleted) => "🗑 Элемент удалён.",
        (Ru, AdminItemMissing) => "Элемент каталога с таким id не найден.",
        (Ru, AdminOverrideUsage) => {
            "Формат: /setgreeting en Текст, /setresolved ru Текст, /resetgreeting en, /resetresolved ru."
        }
        (Ru, AdminOverrideSaved) => "✅ Переопределение сохранено.",
        (Ru, AdminOverrideCleared) => "✅ Переопределение сброшено.",
    }
}

/// Immutable catalog handed to the engine at construction.
#[derive(Debug, Clone, Copy)]
pub struct TextCatalog {
    default_language: Language,
}

impl TextCatalog {
    /// Builds the catalog, verifying every key renders non-empty for every
    /// built-in language.
    pub fn new(default_language: Language) -> Result<Self> {
        for &language in Language::ALL {
            for &key in TextKey::ALL {
                if template(language, key).is_empty() {
                    return Err(DeskError::Config(format!(
                        "empty template for {:?}/{:?}",
                        language, key
                    )));
                }
            }
        }
        Ok(Self { default_language })
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Resolves a raw language code, falling back to the default.
    pub fn resolve(&self, code: Option<&str>) -> Language {
        code.and_then(Language::from_code)
            .unwrap_or(self.default_language)
    }

    pub fn get(&self, language: Language, key: TextKey) -> &'static str {
        template(language, key)
    }

    /// Convenience: resolve the code, then fetch.
    pub fn get_for(&self, code: Option<&str>, key: TextKey) -> &'static str {
        self.get(self.resolve(code), key)
    }
}

/// Escapes text for HTML parse mode.
pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn hbold(value: &str) -> String {
    format!("<b>{}</b>", html_escape(value))
}

/// HTML link to a user profile; prefers the public handle when present.
pub fn user_link(display_name: &str, user_id: i64, username: Option<&str>) -> String {
    let url = match username {
        Some(handle) if !handle.is_empty() && handle != "-" => {
            format!("https://t.me/{}", handle.trim_start_matches('@'))
        }
        _ => format!("tg://user?id={user_id}"),
    };
    format!("<a href=\"{}\">{}</a>", url, html_escape(display_name))
}
