//! Bearer credential verification against the external identity provider.
//!
//! The relay performs authentication only: any authenticated user may use
//! either conversation kind. Authorization beyond "valid session or not"
//! is out of scope.

use async_trait::async_trait;
use serde::Deserialize;

use crate::chat::error::{ChatError, ChatResult};
use crate::chat::ids::UserId;

/// Outcome of extracting a bearer token from an `Authorization` header.
#[derive(Debug, PartialEq, Eq)]
pub enum BearerToken {
    /// Header present with a non-empty token.
    Present(String),
    /// Header absent entirely.
    Missing,
}

/// Extract the bearer token from an optional `Authorization` header value.
///
/// A missing header is distinguished from an invalid one so the relay can
/// answer with the matching error message.
#[must_use]
pub fn extract_bearer(header: Option<&str>) -> BearerToken {
    match header {
        None => BearerToken::Missing,
        Some(value) => {
            let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
            if token.is_empty() {
                BearerToken::Missing
            } else {
                BearerToken::Present(token.to_string())
            }
        }
    }
}

/// Verifies a session credential and resolves the calling user.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    /// Verify `token`, returning the authenticated user's identifier.
    ///
    /// # Errors
    /// `ChatError::Unauthorized` if the credential is invalid or expired.
    async fn verify(&self, token: &str) -> ChatResult<UserId>;
}

/// Identity-provider user payload; only the id matters here.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: UserId,
}

/// Verifier that calls the external identity provider over HTTP.
pub struct HttpAuthVerifier {
    client: reqwest::Client,
    user_endpoint: String,
}

impl HttpAuthVerifier {
    /// Create a verifier for the provider rooted at `auth_url`.
    ///
    /// # Errors
    /// Returns an error if `auth_url` is not a valid URL.
    pub fn new(client: reqwest::Client, auth_url: &str) -> ChatResult<Self> {
        url::Url::parse(auth_url)?;
        Ok(Self {
            client,
            user_endpoint: format!("{}/auth/v1/user", auth_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl AuthVerifier for HttpAuthVerifier {
    async fn verify(&self, token: &str) -> ChatResult<UserId> {
        let response = self
            .client
            .get(&self.user_endpoint)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "credential rejected by identity provider");
            return Err(ChatError::Unauthorized);
        }

        let user: ProviderUser = response.json().await.map_err(|_| ChatError::Unauthorized)?;
        Ok(user.id)
    }
}

/// Verifier mapping one fixed token to one fixed user. Used in tests and
/// local development without an identity provider.
pub struct StaticTokenVerifier {
    token: String,
    user_id: UserId,
}

impl StaticTokenVerifier {
    /// Create a verifier accepting exactly `token`.
    #[must_use]
    pub fn new(token: impl Into<String>, user_id: UserId) -> Self {
        Self {
            token: token.into(),
            user_id,
        }
    }
}

#[async_trait]
impl AuthVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> ChatResult<UserId> {
        if token == self.token {
            Ok(self.user_id)
        } else {
            Err(ChatError::Unauthorized)
        }
    }
}
