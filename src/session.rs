//! Stream session controller
//!
//! Owns the run-stream lifecycle for the active thread: optimistic state,
//! submission tokens, stale-frame rejection and interrupt hand-off.

mod controller;
mod notify;
mod request;

#[cfg(test)]
pub mod testing;

pub use controller::{StreamSession, SubmissionToken};
pub use notify::{ErrorNotifier, SessionEvent};
pub use request::{OptimisticFn, SubmitInput, SubmitOptions};

use crate::interrupt::TransitionError;
use thiserror::Error;

/// Errors returned by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Interrupt(#[from] TransitionError),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Regenerate needs an existing thread")]
    NoThread,
    #[error("A resume cannot carry new messages")]
    InputWithResume,
}
