//! Generated-content records: daily wisdom snippets and affirmations.
//!
//! These are produced by the non-streaming content generation endpoint and
//! read back by the home-screen cards.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::error::{ChatError, ChatResult};
use super::ids::UserId;
use super::types::now_ms;

/// Which kind of content to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Short daily wisdom snippet with a title.
    Wisdom,
    /// Present-tense personal affirmation.
    Affirmation,
}

impl FromStr for ContentKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wisdom" => Ok(Self::Wisdom),
            "affirmation" => Ok(Self::Affirmation),
            other => Err(ChatError::InvalidKind(other.to_string())),
        }
    }
}

impl ContentKind {
    /// System prompt steering the generation.
    #[must_use]
    pub const fn system_prompt(self) -> &'static str {
        match self {
            Self::Wisdom => {
                "You are a wise mentor sharing daily insights. Generate a short, \
                 inspiring piece of wisdom (2-3 sentences) that helps people live \
                 more intentionally and joyfully."
            }
            Self::Affirmation => {
                "You are a supportive coach creating personalized affirmations. \
                 Generate a powerful, present-tense affirmation that builds \
                 confidence and positive self-belief."
            }
        }
    }

    /// User prompt sent alongside the system prompt.
    #[must_use]
    pub const fn user_prompt(self) -> &'static str {
        match self {
            Self::Wisdom => {
                "Generate a daily wisdom message with a short title (2-3 words) \
                 and content (2-3 sentences)."
            }
            Self::Affirmation => {
                "Generate a personal affirmation (1-2 sentences, starting with \
                 'I am' or 'I have')."
            }
        }
    }
}

/// A stored daily wisdom record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wisdom {
    /// Record identifier.
    pub id: Uuid,
    /// Short title parsed from the first line of the completion.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Fixed category tag.
    pub category: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at: i64,
}

/// A stored affirmation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affirmation {
    /// Record identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: UserId,
    /// Affirmation text.
    pub text: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at: i64,
}

/// Split a wisdom completion into `(title, body)`.
///
/// The first non-empty line is the title, with any `Title:` label, header
/// marks, and bold/italic markers removed; the remaining lines are joined
/// into the body.
#[must_use]
pub fn parse_wisdom(completion: &str) -> (String, String) {
    let mut lines = completion.lines().filter(|line| !line.trim().is_empty());

    let first = lines.next().unwrap_or_default().replace(['*', '_'], "");
    let title = first
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_start_matches("Title:")
        .trim_start_matches("title:")
        .trim()
        .to_string();

    let body = lines.collect::<Vec<_>>().join(" ").trim().to_string();
    (title, body)
}

/// SQLite store for generated content.
pub struct ContentStore {
    conn: Arc<Connection>,
}

impl ContentStore {
    /// Initialize the store and create tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>) -> ChatResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS daily_wisdom (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    category TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS affirmations (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    text TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Insert a wisdom record parsed from an upstream completion.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_wisdom(&self, title: String, content: String) -> ChatResult<Wisdom> {
        let record = Wisdom {
            id: Uuid::new_v4(),
            title,
            content,
            category: "mindfulness".to_string(),
            created_at: now_ms(),
        };

        let row = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO daily_wisdom (id, title, content, category, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        row.id.to_string(),
                        row.title,
                        row.content,
                        row.category,
                        row.created_at
                    ],
                )?;
                Ok(())
            })
            .await?;

        Ok(record)
    }

    /// Insert an affirmation record for a user.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_affirmation(&self, user_id: UserId, text: String) -> ChatResult<Affirmation> {
        let record = Affirmation {
            id: Uuid::new_v4(),
            user_id,
            text,
            created_at: now_ms(),
        };

        let row = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO affirmations (id, user_id, text, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![row.id.to_string(), row.user_id, row.text, row.created_at],
                )?;
                Ok(())
            })
            .await?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("wisdom".parse::<ContentKind>().unwrap(), ContentKind::Wisdom);
        assert_eq!("affirmation".parse::<ContentKind>().unwrap(), ContentKind::Affirmation);
        assert!("quote".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_parse_wisdom_strips_title_markers() {
        let completion = "**Title: Quiet Strength**\n\nStillness is not absence. It is where you gather yourself.";
        let (title, body) = parse_wisdom(completion);
        assert_eq!(title, "Quiet Strength");
        assert_eq!(body, "Stillness is not absence. It is where you gather yourself.");
    }

    #[test]
    fn test_parse_wisdom_header_style() {
        let (title, body) = parse_wisdom("# Begin Again\nEvery morning is a reset.\nUse it.");
        assert_eq!(title, "Begin Again");
        assert_eq!(body, "Every morning is a reset. Use it.");
    }

    #[tokio::test]
    async fn test_insert_and_shapes() {
        let conn = Arc::new(Connection::open_in_memory().await.unwrap());
        let store = ContentStore::new(conn).await.unwrap();

        let wisdom = store
            .insert_wisdom("Soft Focus".to_string(), "Let attention rest lightly.".to_string())
            .await
            .unwrap();
        assert_eq!(wisdom.category, "mindfulness");

        let affirmation = store
            .insert_affirmation(UserId::new(), "I am grounded and capable.".to_string())
            .await
            .unwrap();
        assert_eq!(affirmation.text, "I am grounded and capable.");
    }
}
