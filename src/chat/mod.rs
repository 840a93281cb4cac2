//! Streaming chat core for the UPLIFT wellness app.
//!
//! This module owns the client side of the streaming relay pipeline:
//! - SSE frame decoding with carry-over across chunk boundaries
//! - markdown sanitization of streamed fragments
//! - the streaming session against the relay endpoint
//! - owned conversation state with explicit turn operations
//! - `SQLite` persistence of conversations, messages, and generated content

pub mod content;
pub mod conversation;
pub mod error;
pub mod ids;
pub mod prompts;
pub mod sanitize;
pub mod session;
pub mod sse;
pub mod store;
pub mod turn;
pub mod types;

pub use content::{Affirmation, ContentKind, ContentStore, Wisdom};
pub use conversation::Conversation;
pub use error::{ChatError, ChatResult};
pub use ids::{ConversationId, MessageId, UserId};
pub use prompts::system_prompt;
pub use sanitize::strip_markdown;
pub use session::ChatSession;
pub use sse::SseDecoder;
pub use store::{ConversationStore, SqliteConversationStore};
pub use types::{ConversationKind, ConversationMeta, Message, Role, StreamEvent};
