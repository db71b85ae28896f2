//! HTTP request handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use super::relay::{spawn_relay, RelayTarget};
use super::server::AppState;
use super::types::{ensure_system_message, StreamRequest};
use crate::error::{Error, Result};

/// Handle POST /v1/chat/completions
///
/// The body is parsed by hand rather than through the `Json` extractor so
/// that every malformed payload is a 400, regardless of Content-Type.
pub async fn chat_completions(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: StreamRequest =
        serde_json::from_slice(&body).map_err(|e| Error::InvalidPayload(e.to_string()))?;

    let StreamRequest {
        mut messages,
        model,
        ..
    } = request;

    let model = model.filter(|m| !m.is_empty()).ok_or(Error::MissingModel)?;
    let entry = state.registry.lookup(&model)?;

    ensure_system_message(&mut messages, &state.config.relay.system_prompt);

    tracing::info!(
        model = %model,
        messages = messages.len(),
        "Received chat completion request"
    );

    let upstream = StreamRequest::upstream(messages, &state.config.relay);
    let target = RelayTarget {
        model,
        endpoint: entry.endpoint.clone(),
    };
    let body = spawn_relay(state.http_client.clone(), target, upstream);

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}

/// Handle GET /v1/models - display metadata keyed by model identifier
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.listing())
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chat-relay"
    }))
}
