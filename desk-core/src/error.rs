use thiserror::Error;

/// Errors surfaced by the relay core.
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome classes of an outbound messaging call. The engine branches on
/// these: stale topic references are healed and retried, blocked recipients
/// get a distinct staff-facing status line, idempotent edits are ignored,
/// everything else is reported generically.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The recipient has blocked the bot; delivery is impossible.
    #[error("recipient blocked the bot")]
    RecipientBlocked,

    /// The target forum topic no longer exists (deleted or never created).
    #[error("message thread not found")]
    TopicMissing,

    /// An edit produced no change; safe to ignore.
    #[error("message is not modified")]
    NotModified,

    /// Any other API failure (rate limit, timeout, malformed request).
    #[error("telegram api error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DeskError>;
