//! chat-relay - streaming reverse proxy for chat completion backends
//!
//! This library provides the core functionality for the chat-relay proxy,
//! including configuration, the model registry, and the streaming relay.

pub mod config;
pub mod error;
pub mod proxy;
pub mod registry;

pub use config::Config;
pub use error::{Error, Result};
