//! Pure state transition function
//!
//! Given the same state and event it always produces the same next state and
//! effects. Gateway calls, clocks and channels live in the runtime.

use super::state::{FailureReport, Operation, PendingImage, PendingText, SessionState, WormImage};
use super::{Effect, Event};
use crate::llm::{MessageRole, TextRequest};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Chaos added by every accepted message
pub const MESSAGE_CHAOS: u8 = 5;

/// Chaos added by every accepted image trigger
pub const IMAGE_CHAOS: u8 = 20;

/// Assistant text used when the provider answers with nothing
pub const FALLBACK_REPLY: &str = "The dirt is thick today... I can't think!";

/// Image prompt used when there is no message to draw from
pub const DEFAULT_IMAGE_PROMPT: &str = "The cosmic worm core";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Events the current state refuses. None of these are failures: the caller
/// drops the event and the state stays as it was.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is already being generated")]
    TextInFlight,
    #[error("An image is already being generated")]
    ImageInFlight,
    #[error("Nothing to draw yet, send a message first")]
    NothingToImagine,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::UserMessage { text, at } => submit_message(state, text, at),
        Event::ImageRequested => request_image(state),

        Event::ToggleForcedLanguage => {
            let mut next = state.clone();
            next.force_arabic = !state.force_arabic;
            let force_arabic = next.force_arabic;
            Ok(TransitionResult::new(next).with_effect(Effect::notify_language(force_arabic)))
        }

        // In-flight latches survive a reset: the calls are still outstanding and
        // their completions release the latches as stale results.
        Event::Reset => {
            let next = SessionState {
                epoch: state.epoch + 1,
                next_message_seq: state.next_message_seq,
                pending_text: state.pending_text,
                pending_image: state.pending_image.clone(),
                ..SessionState::default()
            };
            Ok(TransitionResult::new(next).with_effect(Effect::notify_reset()))
        }

        Event::TextCompleted { epoch, text, at } => {
            let pending = outstanding_text(state)?;
            let mut next = state.clone();
            next.pending_text = None;
            if epoch != state.epoch {
                return Ok(TransitionResult::new(next));
            }

            if pending.forced_language {
                next.force_arabic = false;
            }
            let content = text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_REPLY.to_string());
            let reply = next.push_message(MessageRole::Assistant, content, at);
            Ok(TransitionResult::new(next).with_effect(Effect::notify_message(&reply)))
        }

        Event::TextFailed {
            epoch,
            kind,
            message,
            at,
        } => {
            let pending = outstanding_text(state)?;
            let mut next = state.clone();
            next.pending_text = None;
            if epoch != state.epoch {
                return Ok(TransitionResult::new(next));
            }

            if pending.forced_language {
                next.force_arabic = false;
            }
            let report = FailureReport {
                operation: Operation::Text,
                kind,
                message,
                at,
            };
            let effect = Effect::notify_error(&report);
            next.last_error = Some(report);
            Ok(TransitionResult::new(next).with_effect(effect))
        }

        Event::ImageCompleted { epoch, url } => {
            let pending = outstanding_image(state)?;
            let mut next = state.clone();
            next.pending_image = None;
            if epoch != state.epoch {
                return Ok(TransitionResult::new(next));
            }

            match url {
                Some(url) => {
                    let image = WormImage {
                        url,
                        prompt: pending.prompt,
                    };
                    let effect = Effect::notify_image(&image);
                    next.image = Some(image);
                    Ok(TransitionResult::new(next).with_effect(effect))
                }
                None => Ok(TransitionResult::new(next)),
            }
        }

        Event::ImageFailed {
            epoch,
            kind,
            message,
            at,
        } => {
            outstanding_image(state)?;
            let mut next = state.clone();
            next.pending_image = None;
            if epoch != state.epoch {
                return Ok(TransitionResult::new(next));
            }

            let report = FailureReport {
                operation: Operation::Image,
                kind,
                message,
                at,
            };
            let effect = Effect::notify_error(&report);
            next.last_error = Some(report);
            Ok(TransitionResult::new(next).with_effect(effect))
        }
    }
}

fn submit_message(
    state: &SessionState,
    text: String,
    at: DateTime<Utc>,
) -> Result<TransitionResult, TransitionError> {
    if text.trim().is_empty() {
        return Err(TransitionError::EmptyMessage);
    }
    if state.is_typing() {
        return Err(TransitionError::TextInFlight);
    }

    let history = state.history();
    let mut next = state.clone();
    let user_message = next.push_message(MessageRole::User, text.clone(), at);
    next.chaos = state.chaos.raised(MESSAGE_CHAOS);
    next.pending_text = Some(PendingText {
        epoch: state.epoch,
        forced_language: state.force_arabic,
    });

    let request = TextRequest {
        message: text,
        history,
        force_language: state.force_arabic,
    };

    Ok(TransitionResult::new(next)
        .with_effect(Effect::notify_message(&user_message))
        .with_effect(Effect::RequestText {
            epoch: state.epoch,
            request,
        }))
}

fn request_image(state: &SessionState) -> Result<TransitionResult, TransitionError> {
    if state.is_generating_image() {
        return Err(TransitionError::ImageInFlight);
    }
    if state.messages.is_empty() {
        return Err(TransitionError::NothingToImagine);
    }

    let prompt = state
        .messages
        .last()
        .map_or_else(|| DEFAULT_IMAGE_PROMPT.to_string(), |m| m.content.clone());

    let mut next = state.clone();
    next.chaos = state.chaos.raised(IMAGE_CHAOS);
    next.pending_image = Some(PendingImage {
        epoch: state.epoch,
        prompt: prompt.clone(),
    });

    Ok(TransitionResult::new(next).with_effect(Effect::RequestImage {
        epoch: state.epoch,
        prompt,
    }))
}

fn outstanding_text(state: &SessionState) -> Result<PendingText, TransitionError> {
    state
        .pending_text
        .ok_or_else(|| TransitionError::InvalidTransition("no text request outstanding".to_string()))
}

fn outstanding_image(state: &SessionState) -> Result<PendingImage, TransitionError> {
    state
        .pending_image
        .clone()
        .ok_or_else(|| TransitionError::InvalidTransition("no image request outstanding".to_string()))
}
