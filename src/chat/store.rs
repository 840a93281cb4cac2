//! SQLite-backed conversation and message store.
//!
//! An append-only message log per conversation, read back in ascending
//! creation order. Daily conversations have lookup-or-create semantics
//! scoped to the user's calendar day; rewire conversations are created
//! freely, one per topic thread.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::error::ChatResult;
use super::ids::{ConversationId, MessageId, UserId};
use super::types::{ConversationKind, ConversationMeta, Message, Role, now_ms};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opening assistant message for a fresh daily conversation.
pub const DAILY_OPENING: &str = "Good morning! What is your intention for today?";

/// Opening assistant message for a fresh rewire conversation.
pub const REWIRE_OPENING: &str = "I'm glad you are here! What is on your mind right now?";

/// Trait for conversation and message storage.
pub trait ConversationStore: Send + Sync {
    /// Look up the user's daily conversation for `date`, creating it (with
    /// its opening assistant message persisted) if none exists yet.
    fn load_or_create_daily(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreFuture<'_, ChatResult<ConversationMeta>>;

    /// Create a new rewire conversation with its opening assistant message.
    fn create_rewire(&self, user_id: UserId) -> StoreFuture<'_, ChatResult<ConversationMeta>>;

    /// Get a conversation by ID.
    fn get(&self, id: ConversationId) -> StoreFuture<'_, ChatResult<Option<ConversationMeta>>>;

    /// List a user's conversations of one kind, most recently active first.
    fn list_for_user(
        &self,
        user_id: UserId,
        kind: ConversationKind,
    ) -> StoreFuture<'_, ChatResult<Vec<ConversationMeta>>>;

    /// Load a conversation's messages in ascending creation order.
    fn messages(&self, id: ConversationId) -> StoreFuture<'_, ChatResult<Vec<Message>>>;

    /// Persist one finalized message and touch the conversation's
    /// `updated_at`. Never called with partial in-progress content.
    fn append_message(
        &self,
        conversation_id: ConversationId,
        message: &Message,
    ) -> StoreFuture<'_, ChatResult<()>>;

    /// Update a conversation's display title.
    fn update_title(&self, id: ConversationId, title: &str) -> StoreFuture<'_, ChatResult<()>>;
}

/// Start and end of a calendar day as millisecond Unix timestamps.
///
/// The returned range is half-open: `[start, end)`.
#[must_use]
pub fn day_bounds_ms(date: NaiveDate) -> (i64, i64) {
    let start = date.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp_millis());
    let end = start + 86_400_000;
    (start, end)
}

/// SQLite implementation of [`ConversationStore`].
pub struct SqliteConversationStore {
    conn: Arc<Connection>,
}

impl SqliteConversationStore {
    /// Initialize the store and create tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>) -> ChatResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS conversations (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    title TEXT NOT NULL DEFAULT '',
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_conversations_user_kind
                    ON conversations (user_id, kind, created_at);
                CREATE TABLE IF NOT EXISTS messages (
                    id TEXT PRIMARY KEY,
                    conversation_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_messages_conversation
                    ON messages (conversation_id, created_at);",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Insert a conversation row plus its opening assistant message in one
    /// transaction.
    async fn create_with_opening(
        &self,
        user_id: UserId,
        kind: ConversationKind,
        title: String,
        opening: &'static str,
        now: i64,
    ) -> ChatResult<ConversationMeta> {
        let meta = ConversationMeta {
            id: ConversationId::new(),
            user_id,
            kind,
            title,
            created_at: now,
            updated_at: now,
        };

        let row = meta.clone();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO conversations (id, user_id, kind, title, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        row.id,
                        row.user_id,
                        row.kind.as_str(),
                        row.title,
                        row.created_at,
                        row.updated_at
                    ],
                )?;
                tx.execute(
                    "INSERT INTO messages (id, conversation_id, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        MessageId::new(),
                        row.id,
                        Role::Assistant.as_str(),
                        opening,
                        row.created_at
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(meta)
    }
}

/// Map one conversation row to its metadata struct.
fn meta_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationMeta> {
    let kind: String = row.get(2)?;
    Ok(ConversationMeta {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: ConversationKind::from_str(&kind).map_err(|_| {
            rusqlite::Error::InvalidColumnType(2, "kind".to_string(), rusqlite::types::Type::Text)
        })?,
        title: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl ConversationStore for SqliteConversationStore {
    fn load_or_create_daily(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreFuture<'_, ChatResult<ConversationMeta>> {
        Box::pin(async move {
            let (day_start, day_end) = day_bounds_ms(date);
            let existing = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, user_id, kind, title, created_at, updated_at
                         FROM conversations
                         WHERE user_id = ?1 AND kind = 'daily'
                           AND created_at >= ?2 AND created_at < ?3
                         ORDER BY created_at ASC
                         LIMIT 1",
                    )?;
                    let row = stmt
                        .query_row(rusqlite::params![user_id, day_start, day_end], meta_from_row)
                        .optional()?;
                    Ok(row)
                })
                .await?;

            if let Some(meta) = existing {
                return Ok(meta);
            }

            tracing::debug!(user = %user_id, %date, "creating daily conversation");
            // Clamp into the requested day so the lookup above always finds
            // the row again, whatever the caller's clock skew.
            self.create_with_opening(
                user_id,
                ConversationKind::Daily,
                "Daily check-in".to_string(),
                DAILY_OPENING,
                now_ms().clamp(day_start, day_end - 1),
            )
            .await
        })
    }

    fn create_rewire(&self, user_id: UserId) -> StoreFuture<'_, ChatResult<ConversationMeta>> {
        Box::pin(async move {
            self.create_with_opening(
                user_id,
                ConversationKind::Rewire,
                String::new(),
                REWIRE_OPENING,
                now_ms(),
            )
            .await
        })
    }

    fn get(&self, id: ConversationId) -> StoreFuture<'_, ChatResult<Option<ConversationMeta>>> {
        Box::pin(async move {
            let row = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, user_id, kind, title, created_at, updated_at
                         FROM conversations WHERE id = ?1",
                    )?;
                    let row = stmt
                        .query_row(rusqlite::params![id], meta_from_row)
                        .optional()?;
                    Ok(row)
                })
                .await?;
            Ok(row)
        })
    }

    fn list_for_user(
        &self,
        user_id: UserId,
        kind: ConversationKind,
    ) -> StoreFuture<'_, ChatResult<Vec<ConversationMeta>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, user_id, kind, title, created_at, updated_at
                         FROM conversations
                         WHERE user_id = ?1 AND kind = ?2
                         ORDER BY updated_at DESC
                         LIMIT 100",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![user_id, kind.as_str()], meta_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(rows)
        })
    }

    fn messages(&self, id: ConversationId) -> StoreFuture<'_, ChatResult<Vec<Message>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, role, content, created_at
                         FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY created_at ASC, id ASC",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![id], |row| {
                            let role: String = row.get(1)?;
                            Ok(Message {
                                id: row.get(0)?,
                                role: Role::from_str(&role).map_err(|_| {
                                    rusqlite::Error::InvalidColumnType(
                                        1,
                                        "role".to_string(),
                                        rusqlite::types::Type::Text,
                                    )
                                })?,
                                content: row.get(2)?,
                                created_at: row.get(3)?,
                            })
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(rows)
        })
    }

    fn append_message(
        &self,
        conversation_id: ConversationId,
        message: &Message,
    ) -> StoreFuture<'_, ChatResult<()>> {
        let message = message.clone();
        Box::pin(async move {
            self.conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute(
                        "INSERT INTO messages (id, conversation_id, role, content, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![
                            message.id,
                            conversation_id,
                            message.role.as_str(),
                            message.content,
                            message.created_at
                        ],
                    )?;
                    tx.execute(
                        "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                        rusqlite::params![message.created_at, conversation_id],
                    )?;
                    tx.commit()?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn update_title(&self, id: ConversationId, title: &str) -> StoreFuture<'_, ChatResult<()>> {
        let title = title.to_string();
        Box::pin(async move {
            self.conn
                .call(move |conn| {
                    conn.execute(
                        "UPDATE conversations SET title = ?1 WHERE id = ?2",
                        rusqlite::params![title, id],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}
