//! Session state types

use crate::llm::{GatewayErrorKind, HistoryTurn, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound of the chaos gauge
pub const MAX_CHAOS: u8 = 100;

/// Level above which clients switch to their most frantic effects
pub const FRANTIC_THRESHOLD: u8 = 80;

/// One turn in the conversation. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Cosmetic mood gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosState {
    pub level: u8,
    pub is_glitching: bool,
}

impl ChaosState {
    /// Raise the level, saturating at [`MAX_CHAOS`]
    #[must_use]
    pub fn raised(self, by: u8) -> Self {
        Self {
            level: self.level.saturating_add(by).min(MAX_CHAOS),
            ..self
        }
    }

    /// Level as a fraction in `[0, 1]`
    pub fn intensity(self) -> f32 {
        f32::from(self.level) / f32::from(MAX_CHAOS)
    }

    pub fn is_frantic(self) -> bool {
        self.level > FRANTIC_THRESHOLD
    }
}

/// The most recently generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WormImage {
    /// `data:` URI
    pub url: String,
    pub prompt: String,
}

/// Which gateway operation a report refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Text,
    Image,
}

/// Last provider failure, kept so clients can show it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub operation: Operation,
    pub kind: GatewayErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Outstanding text call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingText {
    pub epoch: u64,
    /// The forced-language flag was set when this call was issued
    pub forced_language: bool,
}

/// Outstanding image call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub epoch: u64,
    pub prompt: String,
}

/// Complete session state. Only `transition` produces new values of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub chaos: ChaosState,
    pub force_arabic: bool,
    pub pending_text: Option<PendingText>,
    pub pending_image: Option<PendingImage>,
    pub image: Option<WormImage>,
    pub last_error: Option<FailureReport>,
    /// Bumped by every reset; completions from older epochs are stale
    pub epoch: u64,
    /// Source of message ids, survives resets so ids never repeat
    pub next_message_seq: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_typing(&self) -> bool {
        self.pending_text.is_some()
    }

    pub fn is_generating_image(&self) -> bool {
        self.pending_image.is_some()
    }

    /// Role and content of every message, oldest first
    pub fn history(&self) -> Vec<HistoryTurn> {
        self.messages
            .iter()
            .map(|m| HistoryTurn::new(m.role, m.content.clone()))
            .collect()
    }

    /// Append a message, assigning the next id
    pub(super) fn push_message(
        &mut self,
        role: MessageRole,
        content: String,
        timestamp: DateTime<Utc>,
    ) -> Message {
        self.next_message_seq += 1;
        let message = Message {
            id: format!("msg-{}", self.next_message_seq),
            role,
            content,
            timestamp,
        };
        self.messages.push(message.clone());
        message
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            chaos: ChaosView {
                level: self.chaos.level,
                is_glitching: self.chaos.is_glitching,
                intensity: self.chaos.intensity(),
                is_frantic: self.chaos.is_frantic(),
            },
            force_arabic: self.force_arabic,
            is_typing: self.is_typing(),
            is_generating_image: self.is_generating_image(),
            image: self.image.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Chaos gauge as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosView {
    pub level: u8,
    pub is_glitching: bool,
    pub intensity: f32,
    pub is_frantic: bool,
}

/// Read-only view of the session published to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub chaos: ChaosView,
    pub force_arabic: bool,
    pub is_typing: bool,
    pub is_generating_image: bool,
    pub image: Option<WormImage>,
    pub last_error: Option<FailureReport>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        SessionState::new().snapshot()
    }
}
