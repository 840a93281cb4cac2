//! Streaming session: one request/response cycle against the relay.
//!
//! Builds the outbound payload, attaches the bearer credential, opens the
//! HTTP stream, drives the SSE decoder, sanitizes each fragment, and emits
//! typed [`StreamEvent`]s over a channel. The session never mutates
//! conversation state and never writes to storage; the caller applies
//! deltas and persists the finished turn.

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::error::{ChatError, ChatResult};
use super::sanitize::strip_markdown;
use super::sse::SseDecoder;
use super::types::{ConversationKind, Message, Role, StreamEvent};

/// Outbound message shape for the relay request body.
#[derive(Debug, Serialize)]
struct OutboundMessage {
    role: Role,
    content: String,
}

/// Relay request body.
#[derive(Debug, Serialize)]
struct RelayRequest {
    messages: Vec<OutboundMessage>,
    #[serde(rename = "type")]
    kind: ConversationKind,
}

/// Client for the relay's streaming chat endpoint.
///
/// Cheap to clone; the inner `reqwest::Client` is shared.
#[derive(Debug, Clone)]
pub struct ChatSession {
    client: reqwest::Client,
    relay_url: String,
}

impl ChatSession {
    /// Create a session client for the given relay endpoint URL.
    #[must_use]
    pub fn new(client: reqwest::Client, relay_url: impl Into<String>) -> Self {
        Self {
            client,
            relay_url: relay_url.into(),
        }
    }

    /// Start one streaming turn.
    ///
    /// Returns a receiver yielding zero or more `Delta` events in strict
    /// arrival order, followed by exactly one terminal `Done` or `Failed`.
    /// Invalid input (empty credential, empty message list, empty message
    /// content) fails fast with a terminal `Failed` before any network call.
    /// No retry happens at this layer; resending is a user decision.
    #[must_use]
    pub fn send(
        &self,
        bearer: &str,
        kind: ConversationKind,
        messages: &[Message],
    ) -> UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Err(e) = validate_input(bearer, messages) {
            let _ = tx.send(StreamEvent::Failed(e.to_string()));
            return rx;
        }

        let body = RelayRequest {
            messages: messages
                .iter()
                .map(|m| OutboundMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            kind,
        };

        let client = self.client.clone();
        let url = self.relay_url.clone();
        let bearer = bearer.to_string();

        tokio::spawn(async move {
            match run_stream(&client, &url, &bearer, body, &tx).await {
                Ok(()) => {
                    let _ = tx.send(StreamEvent::Done);
                }
                Err(e) => {
                    tracing::warn!("streaming session failed: {e}");
                    let _ = tx.send(StreamEvent::Failed(e.to_string()));
                }
            }
        });

        rx
    }
}

/// Pre-flight checks performed before any network call.
fn validate_input(bearer: &str, messages: &[Message]) -> ChatResult<()> {
    if bearer.trim().is_empty() {
        return Err(ChatError::MissingCredential);
    }
    if messages.is_empty() {
        return Err(ChatError::Validation("messages must not be empty".to_string()));
    }
    if messages.iter().any(|m| m.content.is_empty()) {
        return Err(ChatError::Validation(
            "message content must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Drive the HTTP stream to completion, emitting sanitized deltas.
async fn run_stream(
    client: &reqwest::Client,
    url: &str,
    bearer: &str,
    body: RelayRequest,
    tx: &UnboundedSender<StreamEvent>,
) -> ChatResult<()> {
    let response = client
        .post(url)
        .bearer_auth(bearer)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        // Keep the body text for diagnostics.
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::RelayStatus {
            status: status.as_u16(),
            body,
        });
    }

    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for fragment in decoder.feed(&chunk) {
            let cleaned = strip_markdown(&fragment);
            if tx.send(StreamEvent::Delta(cleaned)).is_err() {
                // Receiver dropped; stop reading.
                tracing::debug!("stream receiver dropped, abandoning read loop");
                return Ok(());
            }
        }
    }

    Ok(())
}
