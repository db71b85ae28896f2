//! Error types for chat-relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for chat-relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chat-relay.
///
/// The first three variants are client errors and are reported before any
/// streaming starts. The upstream variants happen inside the relay task,
/// after the response headers are committed, so they only reach the logs.
/// Configuration problems are `ConfigError`s and stop the process at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),

    #[error("No model selected")]
    MissingModel,

    #[error("Model not found: '{model}'")]
    UnknownModel { model: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    #[error("Upstream read failed: {0}")]
    UpstreamRead(String),

    #[error("Client disconnected")]
    ClientDisconnected,
}

impl Error {
    /// HTTP status this error maps to when it can still be reported.
    ///
    /// Only the client errors become responses. The relay variants appear in
    /// the relay's log lines along with this status.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidPayload(_) | Error::MissingModel | Error::UnknownModel { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::UpstreamUnreachable(_) | Error::UpstreamRead(_) => StatusCode::BAD_GATEWAY,
            Error::ClientDisconnected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        // OpenAI-compatible error format
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": "chat_relay_error",
                "code": status.as_u16()
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_bad_request() {
        assert_eq!(
            Error::InvalidPayload("eof".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::MissingModel.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::UnknownModel {
                model: "nope".to_string()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_relay_errors_map_to_gateway_status() {
        assert_eq!(
            Error::UpstreamRead("reset".to_string()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::ClientDisconnected.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_model_message() {
        let err = Error::UnknownModel {
            model: "unknown".to_string(),
        };
        assert_eq!(err.to_string(), "Model not found: 'unknown'");
    }

    #[tokio::test]
    async fn test_error_response_body_shape() {
        let response = Error::MissingModel.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["message"], "No model selected");
        assert_eq!(json["error"]["type"], "chat_relay_error");
        assert_eq!(json["error"]["code"], 400);
    }
}
