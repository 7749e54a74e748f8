//! Spam/impersonation analysis and display-name sanitizing.
//!
//! `analyze_user_message` is pure and deterministic: it classifies a
//! message into `high` and `medium` suspicion reasons. The caller owns any
//! ban side effect. `sanitize_display_name` strips link forms and mentions
//! from user-controlled names before they are interpolated into outgoing
//! text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

pub const SENSITIVE_PLACEHOLDER: &str = "[filtered]";

/// Maximum length of a sanitized display name, in characters.
const MAX_NAME_LEN: usize = 64;

/// Punctuation runs tolerated between letters of an obfuscated spelling.
const SEPARATOR_CHARS: &str =
    " ._-/\\|•●‧·﹒٫＿‿⁃–—~`'\"()[]{}<>:,;!?*+=“”«»‹›";

/// Visually-confusable characters mapped to their Latin base. Applied after
/// NFKC + lowercase, so only lowercase keys matter.
const HOMOGLYPHS: &[(char, char)] = &[
    ('а', 'a'),
    ('à', 'a'),
    ('á', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('å', 'a'),
    ('ɑ', 'a'),
    ('е', 'e'),
    ('ё', 'e'),
    ('ę', 'e'),
    ('є', 'e'),
    ('ӏ', 'l'),
    ('ⅼ', 'l'),
    ('ı', 'i'),
    ('і', 'i'),
    ('ї', 'i'),
    ('１', '1'),
    ('ᛕ', 'k'),
    ('к', 'k'),
    ('ｍ', 'm'),
    ('м', 'm'),
    ('о', 'o'),
    ('ο', 'o'),
    ('ө', 'o'),
    ('р', 'p'),
    ('ᴘ', 'p'),
    ('с', 'c'),
    ('ş', 's'),
    ('ѕ', 's'),
    ('ṡ', 's'),
    ('т', 't'),
    ('ᴛ', 't'),
    ('у', 'y'),
    ('ў', 'y'),
    ('ӳ', 'y'),
    ('г', 'r'),
    ('ɢ', 'g'),
    ('ԛ', 'q'),
    ('п', 'n'),
    ('ԋ', 'b'),
    ('ь', 'b'),
    ('ъ', 'b'),
];

/// Impersonation/moderation-themed keywords scanned in collapsed text.
const SERVICE_KEYWORDS: &[&str] = &[
    "telegram",
    "teleqram",
    "telegrarn",
    "teiegram",
    "teieqram",
    "support",
    "service",
    "notification",
    "system",
    "security",
    "safety",
    "moderation",
    "review",
    "compliance",
    "abuse",
    "spam",
    "report",
    "helpdesk",
    "admin",
    "official",
    "botfather",
    "телеграм",
    "служебн",
    "уведомлен",
    "поддержк",
    "безопасн",
    "модерац",
    "жалоб",
    "абуз",
];

static HOMOGLYPH_TABLE: Lazy<HashMap<char, char>> =
    Lazy::new(|| HOMOGLYPHS.iter().copied().collect());

fn separator_class() -> String {
    let escaped: String = SEPARATOR_CHARS
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    format!(r"[{}\s]", escaped)
}

static INVITE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\bt\.me/\+").unwrap(), "t.me/+ invite link"),
        (Regex::new(r"\bt\.me/joinchat").unwrap(), "t.me/joinchat link"),
        (Regex::new(r"\bjoinchat\b").unwrap(), "joinchat keyword"),
        (Regex::new(r"\btg://").unwrap(), "tg:// protocol link"),
        (Regex::new(r"\btelegram\.me\b").unwrap(), "telegram.me domain"),
    ]
});

static GENERIC_TME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bt\.me/").unwrap());
static OBF_TME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bt[\s._\-/|]*me\b").unwrap());
static OBF_TELEGRAM: Lazy<Regex> = Lazy::new(|| {
    let sep = separator_class();
    Regex::new(&format!("te{sep}*le{sep}*gram")).unwrap()
});
static COLLAPSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9@а-яё]+").unwrap());

static SENSITIVE_SANITIZERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let sep = separator_class();
    vec![
        Regex::new(r"(?i)https?://\S+").unwrap(),
        Regex::new(r"(?i)\btg://\S*").unwrap(),
        Regex::new(r"(?i)\bt\s*[.\-]?\s*me\S*").unwrap(),
        Regex::new(r"(?i)\bjoinchat\b").unwrap(),
        Regex::new(&format!("(?i)te{sep}*le{sep}*gram")).unwrap(),
    ]
});

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("{}+", separator_class())).unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Classification result. `high` reasons are strong signals on their own;
/// `medium` reasons only block in pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suspicion {
    pub high: Vec<String>,
    pub medium: Vec<String>,
}

impl Suspicion {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn triggered(&self) -> bool {
        !self.high.is_empty() || !self.medium.is_empty()
    }

    /// One strong signal, or two weak ones. A single weak signal never
    /// auto-bans. The `>= 2` threshold is a policy knob carried over
    /// unchanged from the original deployment.
    pub fn should_block(&self) -> bool {
        !self.high.is_empty() || self.medium.len() >= 2
    }

    pub fn reasons(&self) -> Vec<String> {
        self.high.iter().chain(self.medium.iter()).cloned().collect()
    }

    pub fn reason_line(&self) -> String {
        self.reasons().join("; ")
    }
}

/// NFKC fold, lowercase, homoglyph substitution.
pub fn normalize_text(value: &str) -> String {
    let folded: String = value.nfkc().collect::<String>().to_lowercase();
    folded
        .chars()
        .map(|c| *HOMOGLYPH_TABLE.get(&c).unwrap_or(&c))
        .collect()
}

/// Drops everything except latin/cyrillic letters, digits and `@`.
pub fn collapse_text(value: &str) -> String {
    COLLAPSE.replace_all(value, "").into_owned()
}

fn process_field(value: &str, source: &str, high: &mut Vec<String>, medium: &mut Vec<String>) {
    let normalized = normalize_text(value);
    let collapsed = collapse_text(&normalized);

    // Only t.me and related patterns matter here; other URLs are allowed.
    for (pattern, description) in INVITE_PATTERNS.iter() {
        if pattern.is_match(&normalized) {
            high.push(format!("{source}: {description}"));
        }
    }
    if OBF_TME.is_match(&normalized) {
        high.push(format!("{source}: obfuscated t.me"));
    }
    if OBF_TELEGRAM.is_match(&normalized) {
        high.push(format!("{source}: obfuscated telegram"));
    }
    if GENERIC_TME.is_match(&normalized) {
        high.push(format!("{source}: t.me link"));
    }

    let name_field = source == "username" || source == "full_name";
    for keyword in SERVICE_KEYWORDS {
        if collapsed.contains(keyword) {
            let bucket: &mut Vec<String> = if name_field { &mut *high } else { &mut *medium };
            bucket.push(format!("{source}: service keyword \"{keyword}\""));
        }
    }
    if source == "full_name" && value.contains('@') {
        medium.push("full_name: @ mention in name".to_string());
    }
}

/// Classifies an inbound user message plus sender identity.
/// Pure: same inputs always yield the same result; no I/O.
pub fn analyze_user_message(
    full_name: &str,
    username: Option<&str>,
    message_text: Option<&str>,
    entities_contain_link: bool,
) -> Suspicion {
    let mut high = Vec::new();
    let mut medium = Vec::new();

    if !full_name.is_empty() {
        process_field(full_name, "full_name", &mut high, &mut medium);
    }
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        process_field(username, "username", &mut high, &mut medium);
    }
    if let Some(text) = message_text.filter(|t| !t.is_empty()) {
        process_field(text, "text", &mut high, &mut medium);
    }
    if entities_contain_link {
        medium.push("text: link entity detected".to_string());
    }

    Suspicion { high, medium }
}

/// Strips link forms, obfuscated telegram spellings and `@` mentions from a
/// free-text display name. Falls back to `placeholder` when nothing
/// survives; truncates to [`MAX_NAME_LEN`] characters.
pub fn sanitize_display_name(value: Option<&str>, placeholder: &str) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return placeholder.to_string();
    };

    let mut sanitized = value.to_string();
    for pattern in SENSITIVE_SANITIZERS.iter() {
        sanitized = pattern.replace_all(&sanitized, " ").into_owned();
    }
    sanitized = sanitized.replace('@', " ");
    sanitized = SEPARATOR_RUN.replace_all(&sanitized, " ").into_owned();
    sanitized = WHITESPACE_RUN
        .replace_all(&sanitized, " ")
        .trim()
        .to_string();

    if sanitized.is_empty() {
        return placeholder.to_string();
    }

    sanitized.chars().take(MAX_NAME_LEN).collect()
}
