//! Effects produced by interrupt transitions

use super::state::{Interrupt, InterruptResponse};
use crate::message::Checkpoint;

/// Effects to be executed by the session controller after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a stream with `command: {resume: response}` and no new human message
    SubmitResume {
        response: InterruptResponse,
        checkpoint: Option<Checkpoint>,
    },

    /// Show this interrupt to the user
    NotifyInterrupt { interrupt: Interrupt },

    /// The interrupt is gone
    NotifyCleared,
}

impl Effect {
    pub fn submit_resume(interrupt: &Interrupt, response: InterruptResponse) -> Self {
        Effect::SubmitResume {
            response,
            checkpoint: interrupt.checkpoint.clone(),
        }
    }

    pub fn notify_interrupt(interrupt: &Interrupt) -> Self {
        Effect::NotifyInterrupt {
            interrupt: interrupt.clone(),
        }
    }
}
