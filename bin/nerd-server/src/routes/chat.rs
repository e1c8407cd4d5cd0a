//! Chat relay route.
//!
//! Normalizes the widget's history, makes one non-streaming call to the
//! model runtime and returns its answer unchanged.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use nerd_core::{ChatMessage, RelayRequest};
use tracing::warn;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::routes::parse_json_body;
use crate::schemas::ErrorResponse;
use crate::schemas::chat::{ChatRequest, ChatResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(chat), components(schemas(ChatRequest, ChatResponse, ErrorResponse)))]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", post(chat))
}

/// Relay a conversation to the model (`POST /api/chat`).
///
/// Image parts are inlined as base64 before the call; images that cannot
/// be resolved are dropped unless the server runs with
/// `NERD_IMAGE_FAILURE=fail`.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "messages missing or malformed", body = ErrorResponse),
        (status = 500, description = "Model runtime failure", body = ErrorResponse),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ServerError> {
    let req: ChatRequest = parse_json_body(&body)?;

    if !req.messages.is_array() {
        warn!("chat request without a messages array");
        return Err(ServerError::BadRequest("messages array required".into()));
    }
    let messages: Vec<ChatMessage> = serde_json::from_value(req.messages)
        .map_err(|e| ServerError::BadRequest(format!("invalid message: {e}")))?;

    let reply = state
        .relay
        .chat(RelayRequest {
            messages,
            tools: req.tools,
            model: req.model,
        })
        .await
        .map_err(|e| ServerError::from_relay(e, state.relay.provider().endpoint()))?;

    let response = ChatResponse::try_from(reply)
        .map_err(|e| ServerError::Internal(format!("failed to encode reply: {e}")))?;
    Ok(Json(response))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{send, test_app, test_app_failing};

    #[tokio::test]
    async fn non_list_messages_are_rejected_without_backend_call() {
        for messages in [json!("hello"), json!({ "role": "user" }), json!(null)] {
            let (app, provider) = test_app();
            let (status, body) =
                send(app, Method::POST, "/api/chat", Some(json!({ "messages": messages }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "messages array required");
            assert_eq!(provider.calls(), 0);
        }
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let (app, provider) = test_app();
        let (status, _) = send(app, Method::POST, "/api/chat", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_message_is_rejected() {
        let (app, provider) = test_app();
        let (status, body) = send(
            app,
            Method::POST,
            "/api/chat",
            Some(json!({ "messages": [{ "role": "narrator", "content": "x" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid message"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn reply_is_relayed() {
        let (app, provider) = test_app();
        let (status, body) = send(
            app,
            Method::POST,
            "/api/chat",
            Some(json!({
                "messages": [
                    { "role": "system", "content": [{ "type": "text", "text": "be brief" }] },
                    { "role": "user", "content": "hello" }
                ],
                "model": "llama3.2"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["done"], true);
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["message"]["role"], "assistant");
        assert_eq!(body["message"]["content"], "echo: hello");
        assert!(body["created_at"].is_string());

        let sent = provider.last_request().unwrap();
        assert_eq!(sent.messages.len(), 2);
        assert_eq!(sent.messages[0].content, "be brief");
        assert!(!sent.stream);
    }

    #[tokio::test]
    async fn uploaded_image_reaches_the_provider() {
        let (app, provider) = test_app();
        let (_, uploaded) = send(
            app.clone(),
            Method::POST,
            "/api/upload-image",
            Some(json!({ "image": "data:image/png;base64,iVBORw0KGgo=" })),
        )
        .await;
        let url = uploaded["url"].as_str().unwrap().to_owned();

        let (status, _) = send(
            app,
            Method::POST,
            "/api/chat",
            Some(json!({ "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": "a" },
                    { "type": "image", "url": url },
                    { "type": "text", "text": "b" }
                ]
            }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let sent = provider.last_request().unwrap();
        assert_eq!(sent.messages[0].content, "ab");
        assert_eq!(sent.messages[0].images, Some(vec!["iVBORw0KGgo=".to_owned()]));
    }

    #[tokio::test]
    async fn missing_image_is_dropped_and_chat_succeeds() {
        let (app, provider) = test_app();
        let (status, _) = send(
            app,
            Method::POST,
            "/api/chat",
            Some(json!({ "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": "a" },
                    { "type": "image", "url": "/api/images/expired-long-ago" },
                    { "type": "text", "text": "b" }
                ]
            }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let sent = provider.last_request().unwrap();
        assert_eq!(sent.messages[0].content, "ab");
        assert_eq!(sent.messages[0].images, None);
    }

    #[tokio::test]
    async fn incomplete_parts_degrade_instead_of_failing() {
        let parts = [
            json!({ "type": "text", "text": null }),
            json!({ "type": "image" }),
            json!({ "type": "image", "url": null }),
        ];
        for part in parts {
            let (app, provider) = test_app();
            let (status, _) = send(
                app,
                Method::POST,
                "/api/chat",
                Some(json!({ "messages": [{
                    "role": "user",
                    "content": [{ "type": "text", "text": "hi" }, part]
                }] })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);

            let sent = provider.last_request().unwrap();
            assert_eq!(sent.messages[0].content, "hi");
            assert_eq!(sent.messages[0].images, None);
        }
    }

    #[tokio::test]
    async fn backend_failure_is_500_with_hint() {
        let (app, provider) = test_app_failing();
        let (status, body) = send(
            app,
            Method::POST,
            "/api/chat",
            Some(json!({ "messages": [{ "role": "user", "content": "hi" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("connection refused"));
        assert!(error.contains("Make sure Ollama is running"));
        assert_eq!(provider.calls(), 1);
    }
}
