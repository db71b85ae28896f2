//! OpenAI-compatible request and stream chunk types.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::RelayConfig;

/// Deserialize `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Chat completion request, both as received and as sent upstream.
///
/// Missing or `null` fields take their zero value, so `{"model":"x"}` is a
/// valid payload with no messages.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ChatMessage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_tokens: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temperature: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl StreamRequest {
    /// Build the upstream body for `messages`.
    ///
    /// Token limit and temperature come from the relay settings, never from
    /// the client. The model field is left out.
    pub fn upstream(messages: Vec<ChatMessage>, relay: &RelayConfig) -> Self {
        Self {
            messages,
            max_tokens: i64::from(relay.max_tokens),
            temperature: relay.temperature,
            stream: true,
            model: None,
        }
    }
}

/// Prepend a system message unless the conversation already starts with one.
pub fn ensure_system_message(messages: &mut Vec<ChatMessage>, system_prompt: &str) {
    let has_system = messages
        .first()
        .is_some_and(|m| m.role == Role::System);

    if !has_system {
        messages.insert(0, ChatMessage::system(system_prompt));
    }
}

/// One parsed `data:` payload from an upstream stream.
///
/// Every field is optional and `null` is read as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub model: Option<String>,
}

/// A streaming choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: Delta,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta content in a streaming choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl StreamResponse {
    /// Parse a chunk payload. A bare `null` yields an empty chunk.
    pub fn parse(payload: &[u8]) -> serde_json::Result<Self> {
        Ok(serde_json::from_slice::<Option<Self>>(payload)?.unwrap_or_default())
    }

    /// Whether the first choice carries non-empty content.
    pub fn has_content(&self) -> bool {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .is_some_and(|content| !content.is_empty())
    }
}
