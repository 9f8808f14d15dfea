//! Ollama `/api/chat` wire types.
//!
//! Only the fields this crate uses — the device returns more (timings,
//! token counts) which deserialization ignores.

use serde::{Deserialize, Serialize};

/// One chat message on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system` | `user` | `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Request body for `POST {base}/api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model name as served by the device.
    pub model: String,
    /// System prompt followed by the user turn.
    pub messages: Vec<ChatMessage>,
    /// Always `false` — the engine consumes whole replies.
    pub stream: bool,
}

/// Response body for a non-streaming chat call.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// The assistant's reply.
    pub message: ChatMessage,
}
