//! Human-in-the-loop interrupt state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the session controller feeds events in and executes the returned effects.

mod decision;
mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use decision::{build_response, Decision, DecisionKind};
pub use effect::Effect;
pub use event::InterruptEvent;
pub use state::{ActionRequest, Interrupt, InterruptResponse, InterruptState, ResponseConfig};
pub use transition::{transition, TransitionError, TransitionResult};
