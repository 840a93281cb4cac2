//! Error types for the chat core.

use thiserror::Error;

/// Errors that can occur across the chat pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The relay or upstream returned a non-success status.
    #[error("relay returned status {status}: {body}")]
    RelayStatus {
        /// HTTP status code.
        status: u16,
        /// Response body text, kept for diagnostics.
        body: String,
    },

    /// The response had no body to stream.
    #[error("response had no streamable body")]
    MissingBody,

    /// Bearer credential missing or empty.
    #[error("missing bearer credential")]
    MissingCredential,

    /// Credential rejected by the identity provider.
    #[error("unauthorized")]
    Unauthorized,

    /// A second send was attempted while an assistant turn is outstanding.
    #[error("a turn is already in progress for this conversation")]
    TurnInProgress,

    /// No assistant turn is outstanding for the requested operation.
    #[error("no turn in progress")]
    NoTurnInProgress,

    /// Request payload failed validation.
    #[error("{0}")]
    Validation(String),

    /// Unknown message role string.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Unknown conversation kind string.
    #[error("invalid conversation type: {0}")]
    InvalidKind(String),

    /// The upstream completion response had an unexpected shape.
    #[error("unexpected upstream response: {0}")]
    UpstreamShape(String),

    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
