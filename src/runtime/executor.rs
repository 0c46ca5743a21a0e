//! Effect executor: runs gateway calls and feeds their outcome back

use super::ConversationStore;
use crate::state_machine::{Effect, Event};
use chrono::Utc;

/// Spawn the gateway call behind a request effect. The completion is
/// dispatched back into the store as an event tagged with the same epoch.
pub(super) fn spawn_request(store: ConversationStore, effect: Effect) {
    match effect {
        Effect::RequestText { epoch, request } => {
            tokio::spawn(async move {
                let event = match store.gateway().generate_text(&request).await {
                    Ok(text) => {
                        if text.is_none() {
                            tracing::warn!(
                                session_id = %store.session_id(),
                                "Provider returned no text, using fallback reply"
                            );
                        }
                        Event::TextCompleted {
                            epoch,
                            text,
                            at: Utc::now(),
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %store.session_id(),
                            error = %e,
                            kind = ?e.kind,
                            "Text generation failed"
                        );
                        Event::TextFailed {
                            epoch,
                            kind: e.kind,
                            message: e.message,
                            at: Utc::now(),
                        }
                    }
                };
                complete(&store, event);
            });
        }

        Effect::RequestImage { epoch, prompt } => {
            tokio::spawn(async move {
                let event = match store.gateway().generate_image(&prompt).await {
                    Ok(url) => {
                        if url.is_none() {
                            tracing::warn!(
                                session_id = %store.session_id(),
                                "Provider response had no inline image"
                            );
                        }
                        Event::ImageCompleted { epoch, url }
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %store.session_id(),
                            error = %e,
                            kind = ?e.kind,
                            "Image generation failed"
                        );
                        Event::ImageFailed {
                            epoch,
                            kind: e.kind,
                            message: e.message,
                            at: Utc::now(),
                        }
                    }
                };
                complete(&store, event);
            });
        }

        Effect::NotifyClient { event_type, .. } => {
            tracing::error!(event_type = %event_type, "Notification reached the request executor");
        }
    }
}

fn complete(store: &ConversationStore, event: Event) {
    let name = event.name();
    if let Err(e) = store.dispatch(event) {
        // Every completion matches a latch set when its request was issued
        tracing::error!(session_id = %store.session_id(), event = name, error = %e, "Completion rejected");
    }
}
