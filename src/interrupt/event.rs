//! Events that drive the interrupt state machine

use super::decision::Decision;
use super::state::{Interrupt, InterruptResponse};

/// Events that trigger interrupt state transitions
#[derive(Debug, Clone)]
pub enum InterruptEvent {
    // Stream events
    /// An `interrupt` frame arrived on the current stream
    InterruptReceived(Interrupt),
    /// The current stream closed without error
    StreamCompleted,
    /// The resume submission failed before completing
    ResumeFailed { message: String },

    // User events
    /// The user edited the reply they are composing
    DraftChanged(String),
    Decide(Decision),
    /// Resume with a payload the caller already built
    Resume(InterruptResponse),
    /// Re-send the response of a failed resume
    RetryResume,

    /// Thread switched or stream replaced; drop any interrupt without answering it
    Reset,
}
