//! Events that can occur in a session

use crate::llm::GatewayErrorKind;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
        at: DateTime<Utc>,
    },
    ImageRequested,
    ToggleForcedLanguage,
    Reset,

    // Gateway completions, tagged with the epoch they were issued in
    TextCompleted {
        epoch: u64,
        text: Option<String>,
        at: DateTime<Utc>,
    },
    TextFailed {
        epoch: u64,
        kind: GatewayErrorKind,
        message: String,
        at: DateTime<Utc>,
    },
    ImageCompleted {
        epoch: u64,
        url: Option<String>,
    },
    ImageFailed {
        epoch: u64,
        kind: GatewayErrorKind,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage {
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Epoch tag of a gateway completion
    pub fn epoch(&self) -> Option<u64> {
        match self {
            Event::TextCompleted { epoch, .. }
            | Event::TextFailed { epoch, .. }
            | Event::ImageCompleted { epoch, .. }
            | Event::ImageFailed { epoch, .. } => Some(*epoch),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user_message",
            Event::ImageRequested => "image_requested",
            Event::ToggleForcedLanguage => "toggle_forced_language",
            Event::Reset => "reset",
            Event::TextCompleted { .. } => "text_completed",
            Event::TextFailed { .. } => "text_failed",
            Event::ImageCompleted { .. } => "image_completed",
            Event::ImageFailed { .. } => "image_failed",
        }
    }
}
