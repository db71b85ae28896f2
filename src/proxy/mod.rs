//! HTTP proxy server module.
//!
//! This module provides the OpenAI-compatible HTTP API that accepts chat
//! requests and relays the upstream's streamed reply back to the caller.

mod handlers;
pub mod relay;
mod server;
pub mod stream;
pub mod types;

pub use relay::{relay_lines, spawn_relay, LineSink, RelayStats, RelayTarget};
pub use server::{create_router, run_server, AppState};
pub use stream::{classify_line, LineAction, LineBuffer, DONE_SENTINEL};
pub use types::{ensure_system_message, ChatMessage, Role, StreamRequest, StreamResponse};
