//! HTTP route handlers for the UPLIFT relay API.

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};

use crate::chat::content::{ContentKind, parse_wisdom};
use crate::chat::ids::UserId;
use crate::chat::prompts::system_prompt;
use crate::chat::types::ConversationKind;

use super::auth::{BearerToken, extract_bearer};
use super::state::AppState;

/// Maximum accepted length of one message's content, in characters.
const MAX_CONTENT_CHARS: usize = 10_000;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(relay_chat))
        .route("/api/generate", post(generate_content))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "uplift-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Build a JSON error response.
fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Authenticate the request, answering per the missing/invalid split.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserId, Response> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = match extract_bearer(header) {
        BearerToken::Present(token) => token,
        BearerToken::Missing => {
            return Err(error_json(
                StatusCode::UNAUTHORIZED,
                "Missing authorization header",
            ));
        }
    };

    state
        .verifier
        .verify(&token)
        .await
        .map_err(|_| error_json(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

/// Validate the relay request body.
///
/// Returns the cleaned outbound message array and the conversation kind, or
/// a specific message per violated rule.
fn validate_chat_request(body: &Value) -> Result<(Vec<Value>, ConversationKind), String> {
    let messages = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| "Messages must be an array".to_string())?;

    if messages.is_empty() {
        return Err("Messages array cannot be empty".to_string());
    }

    let mut outbound = Vec::with_capacity(messages.len());
    for message in messages {
        let role = message
            .get("role")
            .and_then(Value::as_str)
            .ok_or_else(|| "Message role is required".to_string())?;

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| "Message content is required".to_string())?;

        if content.is_empty() {
            return Err("Message content cannot be empty".to_string());
        }

        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(format!(
                "Message content exceeds maximum length of {MAX_CONTENT_CHARS} characters"
            ));
        }

        outbound.push(json!({ "role": role, "content": content }));
    }

    let kind = body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("daily");
    let kind =
        ConversationKind::from_str(kind).map_err(|_| "Invalid conversation type".to_string())?;

    Ok((outbound, kind))
}

/// Relay a chat request to the upstream provider, streaming the SSE
/// response body back unmodified.
///
/// Per-request states: received → authenticating → validating → forwarding
/// → streaming or failed. No retries at this layer.
async fn relay_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user_id = match authenticate(&state, &headers).await {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let (messages, kind) = match validate_chat_request(&body) {
        Ok(validated) => validated,
        Err(message) => return error_json(StatusCode::BAD_REQUEST, &message),
    };

    tracing::debug!(user = %user_id, kind = %kind, count = messages.len(), "forwarding chat request");

    let upstream = match state
        .upstream
        .stream_messages(system_prompt(kind), &messages)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("upstream request failed: {e}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate response");
        }
    };

    let status = upstream.status();
    if !status.is_success() {
        // Preserve the upstream status for the caller's diagnostics.
        tracing::error!(status = %status, "upstream returned error status");
        let mirrored = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        return error_json(mirrored, "Failed to generate response");
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|e| {
            tracing::error!("failed to build streaming response: {e}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })
}

/// Generate one wisdom snippet or affirmation, persist it, and return the
/// created record.
async fn generate_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let kind = match body
        .get("type")
        .and_then(Value::as_str)
        .map(ContentKind::from_str)
    {
        Some(Ok(kind)) => kind,
        _ => {
            return error_json(
                StatusCode::BAD_REQUEST,
                "Invalid type. Must be \"wisdom\" or \"affirmation\"",
            );
        }
    };

    let user_id = match authenticate(&state, &headers).await {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let completion = match state
        .upstream
        .complete(kind.system_prompt(), kind.user_prompt())
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("content generation failed: {e}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate content");
        }
    };

    let stored = match kind {
        ContentKind::Wisdom => {
            let (title, content) = parse_wisdom(&completion);
            state
                .content
                .insert_wisdom(title, content)
                .await
                .map(|record| Json(record).into_response())
        }
        ContentKind::Affirmation => state
            .content
            .insert_affirmation(user_id, completion)
            .await
            .map(|record| Json(record).into_response()),
    };

    stored.unwrap_or_else(|e| {
        tracing::error!("failed to persist generated content: {e}");
        error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store content")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::auth::StaticTokenVerifier;
    use crate::server::upstream::{UpstreamClient, UpstreamConfig};
    use axum::body::to_bytes;
    use axum::http::Request;
    use tokio_rusqlite::Connection;
    use tower::ServiceExt;

    const TEST_TOKEN: &str = "test-token";

    async fn router_with_upstream(base_url: String) -> Router {
        let config = UpstreamConfig {
            base_url,
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
        };
        let conn = Arc::new(Connection::open_in_memory().await.unwrap());
        let state = Arc::new(AppState {
            verifier: Arc::new(StaticTokenVerifier::new(TEST_TOKEN, UserId::new())),
            upstream: UpstreamClient::new(reqwest::Client::new(), config),
            content: crate::chat::content::ContentStore::new(conn).await.unwrap(),
        });
        create_router(state)
    }

    async fn test_router() -> Router {
        // Port 1 refuses connections; only reached by paths under test that
        // should never get that far.
        router_with_upstream("http://127.0.0.1:1".to_string()).await
    }

    /// Spin up a throwaway upstream answering `/v1/messages` with a fixed
    /// status and body, returning its base URL.
    async fn mock_upstream(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route(
            "/v1/messages",
            post(move || async move { (status, body) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn chat_request(auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = auth {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn error_of(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        (status, body["error"].as_str().unwrap_or_default().to_string())
    }

    fn valid_body() -> Value {
        json!({ "messages": [{ "role": "user", "content": "hello" }], "type": "daily" })
    }

    #[tokio::test]
    async fn test_missing_auth_header() {
        let app = test_router().await;
        let response = app.oneshot(chat_request(None, valid_body())).await.unwrap();

        let (status, error) = error_of(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error, "Missing authorization header");
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let app = test_router().await;
        let response = app
            .oneshot(chat_request(Some("wrong"), valid_body()))
            .await
            .unwrap();

        let (status, error) = error_of(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error, "Unauthorized");
    }

    #[tokio::test]
    async fn test_empty_messages_array() {
        let app = test_router().await;
        let body = json!({ "messages": [], "type": "daily" });
        let response = app
            .oneshot(chat_request(Some(TEST_TOKEN), body))
            .await
            .unwrap();

        let (status, error) = error_of(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "Messages array cannot be empty");
    }

    #[tokio::test]
    async fn test_content_over_length_ceiling() {
        let app = test_router().await;
        let long = "x".repeat(MAX_CONTENT_CHARS + 1);
        let body = json!({ "messages": [{ "role": "user", "content": long }], "type": "daily" });
        let response = app
            .oneshot(chat_request(Some(TEST_TOKEN), body))
            .await
            .unwrap();

        let (status, error) = error_of(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.contains("maximum length"));
    }

    #[tokio::test]
    async fn test_invalid_conversation_type() {
        let app = test_router().await;
        let body = json!({ "messages": [{ "role": "user", "content": "hi" }], "type": "weekly" });
        let response = app
            .oneshot(chat_request(Some(TEST_TOKEN), body))
            .await
            .unwrap();

        let (status, error) = error_of(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "Invalid conversation type");
    }

    #[tokio::test]
    async fn test_upstream_error_status_mirrored() {
        let overloaded = StatusCode::from_u16(529).unwrap();
        let base_url = mock_upstream(overloaded, r#"{"type":"error"}"#).await;
        let app = router_with_upstream(base_url).await;
        let response = app
            .oneshot(chat_request(Some(TEST_TOKEN), valid_body()))
            .await
            .unwrap();

        let (status, error) = error_of(response).await;
        assert_eq!(status, overloaded);
        assert_eq!(error, "Failed to generate response");
    }

    #[tokio::test]
    async fn test_relay_passes_stream_body_through() {
        let payload = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"hi\"}}\n\ndata: [DONE]\n\n";
        let base_url = mock_upstream(StatusCode::OK, payload).await;
        let app = router_with_upstream(base_url).await;
        let response = app
            .oneshot(chat_request(Some(TEST_TOKEN), valid_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "no-cache");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), payload.as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_generate_type() {
        let app = test_router().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {TEST_TOKEN}"))
            .body(Body::from(json!({ "type": "quote" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let (status, _) = error_of(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            validate_chat_request(&json!({ "messages": "nope" })).unwrap_err(),
            "Messages must be an array"
        );
        assert_eq!(
            validate_chat_request(&json!({ "messages": [{ "content": "hi" }] })).unwrap_err(),
            "Message role is required"
        );
        assert_eq!(
            validate_chat_request(&json!({ "messages": [{ "role": "user" }] })).unwrap_err(),
            "Message content is required"
        );
        assert_eq!(
            validate_chat_request(&json!({ "messages": [{ "role": "user", "content": "" }] }))
                .unwrap_err(),
            "Message content cannot be empty"
        );
    }

    #[test]
    fn test_validation_defaults_to_daily() {
        let (messages, kind) =
            validate_chat_request(&json!({ "messages": [{ "role": "user", "content": "hi" }] }))
                .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(kind, ConversationKind::Daily);
    }
}
