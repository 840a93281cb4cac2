//! Core domain types for conversations and messages.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ChatError;
use super::ids::{ConversationId, MessageId, UserId};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human on the other side of the screen.
    User,
    /// The coaching assistant.
    Assistant,
}

impl Role {
    /// Wire representation, as stored and sent to the relay.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(ChatError::InvalidRole(other.to_string())),
        }
    }
}

/// Which of the two chat modes a conversation belongs to.
///
/// `Daily` is the guided morning check-in (one per user per calendar day);
/// `Rewire` is a free-form reframing thread (created per topic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// Daily guided coaching conversation.
    Daily,
    /// Free-form thought-reframing conversation.
    Rewire,
}

impl ConversationKind {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Rewire => "rewire",
        }
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "rewire" => Ok(Self::Rewire),
            other => Err(ChatError::InvalidKind(other.to_string())),
        }
    }
}

/// One message in a conversation.
///
/// Assistant messages start life as an empty placeholder and grow by
/// append-only concatenation while a stream is in flight; they are only
/// persisted once finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, client-generated at creation.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at: i64,
}

impl Message {
    /// Create a user message with the given content.
    #[must_use]
    pub fn user(content: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            created_at: now_ms,
        }
    }

    /// Create an assistant message with the given content.
    #[must_use]
    pub fn assistant(content: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: content.into(),
            created_at: now_ms,
        }
    }
}

/// Conversation metadata as stored and listed (messages loaded separately).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMeta {
    /// Unique identifier.
    pub id: ConversationId,
    /// Owning user.
    pub user_id: UserId,
    /// Daily or rewire.
    pub kind: ConversationKind,
    /// Display title (fixed for daily, derived from the first user message
    /// for rewire).
    pub title: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at: i64,
    /// Last activity timestamp in milliseconds since Unix epoch.
    pub updated_at: i64,
}

/// One incremental event from a streaming session.
///
/// A session channel yields zero or more `Delta`s followed by exactly one
/// terminal `Done` or `Failed`; termination is enforced by the type rather
/// than by caller discipline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One sanitized text fragment, in strict arrival order.
    Delta(String),
    /// The stream ended normally.
    Done,
    /// The stream failed before natural termination.
    Failed(String),
}

/// Current wall-clock time in milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
