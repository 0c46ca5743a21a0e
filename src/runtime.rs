//! Runtime for the session
//!
//! Owns the single [`SessionState`](crate::state_machine::SessionState),
//! applies events through the pure transition function and executes the
//! resulting effects.

mod executor;
mod store;

#[cfg(test)]
pub mod testing;

pub use store::ConversationStore;

use crate::state_machine::SessionSnapshot;
use serde_json::Value;

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    /// Full state after a transition
    StateChange { snapshot: SessionSnapshot },
    /// Something worth showing: a new message, image, error, or a reset
    Notify { event_type: String, data: Value },
}
