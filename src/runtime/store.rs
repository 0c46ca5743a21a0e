//! The conversation store: single owner of session state

use super::executor;
use super::SseEvent;
use crate::llm::GenerationGateway;
use crate::state_machine::{transition, Effect, Event, SessionSnapshot, SessionState, TransitionError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};

const BROADCAST_CAPACITY: usize = 128;

/// Handle to the session. Cheap to clone; every clone sees the same state.
///
/// Operations apply their transition synchronously and return whether the
/// event was accepted. Gateway calls run in spawned tasks and re-enter the
/// store as completion events, so a tokio runtime must be running.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Inner>,
}

struct Inner {
    session_id: String,
    state: Mutex<SessionState>,
    gateway: Arc<dyn GenerationGateway>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    broadcast_tx: broadcast::Sender<SseEvent>,
}

impl ConversationStore {
    pub fn new(gateway: Arc<dyn GenerationGateway>) -> Self {
        let state = SessionState::new();
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                session_id: uuid::Uuid::new_v4().to_string(),
                state: Mutex::new(state),
                gateway,
                snapshot_tx,
                broadcast_tx,
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Append a user message and ask the gateway for a reply.
    /// Ignored when the text is blank or a reply is still pending.
    pub fn submit_user_message(&self, text: impl Into<String>) -> bool {
        self.dispatch(Event::user_message(text)).is_ok()
    }

    /// Ask the gateway for an image of the latest message.
    /// Ignored when an image is pending or there are no messages yet.
    pub fn trigger_image_generation(&self) -> bool {
        self.dispatch(Event::ImageRequested).is_ok()
    }

    /// Flip the one-shot Arabic flag; returns the new value
    pub fn toggle_forced_language(&self) -> bool {
        match self.dispatch(Event::ToggleForcedLanguage) {
            Ok(snapshot) => snapshot.force_arabic,
            Err(_) => self.snapshot().force_arabic,
        }
    }

    /// Clear the conversation. Outstanding calls keep running; their
    /// results are dropped when they arrive.
    pub fn reset(&self) {
        let _ = self.dispatch(Event::Reset);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Watch the snapshot as it changes
    #[allow(dead_code)] // HTTP clients use the event stream instead
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Client notifications, in the order the transitions happened
    pub fn events(&self) -> broadcast::Receiver<SseEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    pub(super) fn gateway(&self) -> &Arc<dyn GenerationGateway> {
        &self.inner.gateway
    }

    /// Apply one event and return the snapshot it produced. Publication
    /// happens under the state lock so that observers see transitions in
    /// order; gateway calls start after it is released.
    pub(super) fn dispatch(&self, event: Event) -> Result<SessionSnapshot, TransitionError> {
        let event_name = event.name();
        let (snapshot, requests) = {
            let mut state = self.lock_state();

            if event.epoch().is_some_and(|epoch| epoch != state.epoch) {
                tracing::debug!(
                    session_id = %self.inner.session_id,
                    event = event_name,
                    "Discarding result of a call issued before the last reset"
                );
            }

            let result = match transition(&state, event) {
                Ok(result) => result,
                Err(e) => {
                    tracing::debug!(
                        session_id = %self.inner.session_id,
                        event = event_name,
                        reason = %e,
                        "Event ignored"
                    );
                    return Err(e);
                }
            };

            *state = result.new_state;
            let snapshot = state.snapshot();
            tracing::debug!(
                session_id = %self.inner.session_id,
                event = event_name,
                messages = snapshot.messages.len(),
                chaos = snapshot.chaos.level,
                typing = snapshot.is_typing,
                generating_image = snapshot.is_generating_image,
                "State updated"
            );
            self.inner.snapshot_tx.send_replace(snapshot.clone());
            // No subscribers is fine
            let _ = self.inner.broadcast_tx.send(SseEvent::StateChange {
                snapshot: snapshot.clone(),
            });

            let mut requests = Vec::new();
            for effect in result.effects {
                match effect {
                    Effect::NotifyClient { event_type, data } => {
                        let _ = self
                            .inner
                            .broadcast_tx
                            .send(SseEvent::Notify { event_type, data });
                    }
                    request => requests.push(request),
                }
            }
            (snapshot, requests)
        };

        for request in requests {
            executor::spawn_request(self.clone(), request);
        }
        Ok(snapshot)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
