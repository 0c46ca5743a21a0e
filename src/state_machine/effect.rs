//! Effects produced by state transitions

use super::state::{FailureReport, Message, WormImage};
use crate::llm::TextRequest;
use serde_json::{json, Value};

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call the text endpoint; completion comes back as `TextCompleted` or `TextFailed`
    RequestText { epoch: u64, request: TextRequest },

    /// Call the image endpoint; completion comes back as `ImageCompleted` or `ImageFailed`
    RequestImage { epoch: u64, prompt: String },

    /// Notify connected clients
    NotifyClient { event_type: String, data: Value },
}

impl Effect {
    pub fn notify_message(message: &Message) -> Self {
        Effect::NotifyClient {
            event_type: "message".to_string(),
            data: serde_json::to_value(message).unwrap_or(Value::Null),
        }
    }

    pub fn notify_image(image: &WormImage) -> Self {
        Effect::NotifyClient {
            event_type: "image".to_string(),
            data: serde_json::to_value(image).unwrap_or(Value::Null),
        }
    }

    pub fn notify_error(report: &FailureReport) -> Self {
        Effect::NotifyClient {
            event_type: "error".to_string(),
            data: serde_json::to_value(report).unwrap_or(Value::Null),
        }
    }

    pub fn notify_reset() -> Self {
        Effect::NotifyClient {
            event_type: "reset".to_string(),
            data: Value::Null,
        }
    }

    pub fn notify_language(force_arabic: bool) -> Self {
        Effect::NotifyClient {
            event_type: "language".to_string(),
            data: json!({ "force_arabic": force_arabic }),
        }
    }
}
