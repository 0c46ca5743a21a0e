//! Common types for gateway requests

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A prior turn as sent to the provider: role and text, no timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: MessageRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Text generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    /// The newly submitted user text
    pub message: String,
    /// Everything before `message`, oldest first
    pub history: Vec<HistoryTurn>,
    /// Demand that the reply be written entirely in Arabic
    pub force_language: bool,
}

/// Build a `data:` URI from a base64 payload
pub fn data_uri(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}
