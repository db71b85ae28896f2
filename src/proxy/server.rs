//! HTTP server setup and configuration.

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::Config;
use crate::registry::ModelRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub http_client: Client,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build state from a validated config.
    ///
    /// The HTTP client has no timeouts: a stalled upstream holds its relay
    /// task until the connection drops.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let registry = ModelRegistry::new(&config.models);
        let http_client = Client::builder().build()?;

        Ok(Self {
            registry: Arc::new(registry),
            http_client,
            config: Arc::new(config),
        })
    }
}

/// Wildcard CORS. Any origin may call the proxy; restrict before exposing
/// it beyond a trusted network.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // OpenAI-compatible endpoints
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        .route("/health", get(handlers::health))
        // State and middleware
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

/// Run the HTTP server until Ctrl-C.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();
    let state = AppState::new(config)?;

    let models = state.registry.ids().collect::<Vec<_>>().join(", ");
    tracing::info!(models = %models, "Available models");

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting chat-relay proxy server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
