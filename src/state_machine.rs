//! Session state machine
//!
//! Elm-style: a pure transition from (state, event) to (state, effects).
//! The runtime owns the state and executes the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{SessionSnapshot, SessionState};
pub use transition::{transition, TransitionError};
