//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::chat::content::ContentStore;
use crate::chat::error::{ChatError, ChatResult};

use super::auth::{AuthVerifier, HttpAuthVerifier};
use super::upstream::{UpstreamClient, UpstreamConfig};

/// Default path of the generated-content database.
const DEFAULT_DB_PATH: &str = "uplift.db";

/// Shared application state.
///
/// Stateless across requests apart from the shared HTTP client pool and
/// the content database handle; concurrent requests need no further
/// synchronization.
pub struct AppState {
    /// Session credential verifier.
    pub verifier: Arc<dyn AuthVerifier>,
    /// Upstream LLM provider client.
    pub upstream: UpstreamClient,
    /// Store for generated wisdom/affirmation records.
    pub content: ContentStore,
}

impl AppState {
    /// Create application state from environment configuration.
    ///
    /// Reads `UPLIFT_AUTH_URL` for the identity provider, the upstream
    /// variables (see [`UpstreamConfig::from_env`]), and `UPLIFT_DB_PATH`
    /// for the content database.
    ///
    /// # Errors
    /// Returns an error if configuration is invalid or the database cannot
    /// be opened.
    pub async fn new() -> ChatResult<Arc<Self>> {
        let client = reqwest::Client::new();

        let auth_url = std::env::var("UPLIFT_AUTH_URL")
            .map_err(|_| ChatError::Validation("UPLIFT_AUTH_URL is not configured".to_string()))?;
        let verifier: Arc<dyn AuthVerifier> =
            Arc::new(HttpAuthVerifier::new(client.clone(), &auth_url)?);

        let upstream = UpstreamClient::new(client, UpstreamConfig::from_env()?);

        let db_path =
            std::env::var("UPLIFT_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let conn = Arc::new(Connection::open(db_path).await?);
        let content = ContentStore::new(conn).await?;

        Ok(Arc::new(Self {
            verifier,
            upstream,
            content,
        }))
    }
}
