//! HTTP API for the worm
//!
//! A thin adapter over [`ConversationStore`]; it owns no state of its own.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::ConversationStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ConversationStore,
}

impl AppState {
    pub fn new(store: ConversationStore) -> Self {
        Self { store }
    }
}
