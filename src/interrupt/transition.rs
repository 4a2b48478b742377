//! Pure interrupt state transition function
//!
//! Running -> Interrupted -> Resuming -> Running, with a reset edge from
//! every state. A second interrupt replaces the first one.

use super::decision::{build_response, DecisionKind};
use super::{Effect, InterruptEvent, InterruptState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: InterruptState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: InterruptState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("No interrupt is awaiting a decision")]
    NoActiveInterrupt,
    #[error("This interrupt does not accept '{0}'")]
    DecisionNotAllowed(DecisionKind),
    #[error("Response text is empty")]
    EmptyResponse,
    #[error("A resume is already in flight")]
    ResumeInFlight,
    #[error("No failed resume to retry")]
    NothingToRetry,
}

/// Pure transition function
///
/// Given the same state and event it always produces the same result and
/// performs no I/O. The caller executes the returned effects.
pub fn transition(
    state: &InterruptState,
    event: InterruptEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Interrupt arrival
        // ============================================================

        // Replace semantics: the newest interrupt wins, the draft survives
        (
            InterruptState::Interrupted { draft, .. },
            InterruptEvent::InterruptReceived(interrupt),
        ) => {
            let effect = Effect::notify_interrupt(&interrupt);
            Ok(TransitionResult::new(InterruptState::Interrupted {
                interrupt,
                draft: draft.clone(),
                pending: None,
            })
            .with_effect(effect))
        }

        (
            InterruptState::Running | InterruptState::Resuming { .. },
            InterruptEvent::InterruptReceived(interrupt),
        ) => {
            let effect = Effect::notify_interrupt(&interrupt);
            Ok(TransitionResult::new(InterruptState::interrupted(interrupt)).with_effect(effect))
        }

        // ============================================================
        // Composing
        // ============================================================
        (
            InterruptState::Interrupted {
                interrupt, pending, ..
            },
            InterruptEvent::DraftChanged(draft),
        ) => Ok(TransitionResult::new(InterruptState::Interrupted {
            interrupt: interrupt.clone(),
            draft,
            pending: pending.clone(),
        })),

        // ============================================================
        // Deciding
        // ============================================================
        (
            InterruptState::Interrupted {
                interrupt, draft, ..
            },
            InterruptEvent::Decide(decision),
        ) => {
            let response = build_response(interrupt, decision)?;
            Ok(resume_with(interrupt, draft, response))
        }

        (
            InterruptState::Interrupted {
                interrupt, draft, ..
            },
            InterruptEvent::Resume(response),
        ) => Ok(resume_with(interrupt, draft, response)),

        (
            InterruptState::Interrupted {
                interrupt,
                draft,
                pending,
            },
            InterruptEvent::RetryResume,
        ) => match pending {
            Some(response) => Ok(resume_with(interrupt, draft, response.clone())),
            None => Err(TransitionError::NothingToRetry),
        },

        (
            InterruptState::Resuming { .. },
            InterruptEvent::Decide(_)
            | InterruptEvent::Resume(_)
            | InterruptEvent::RetryResume
            | InterruptEvent::DraftChanged(_),
        ) => Err(TransitionError::ResumeInFlight),

        (
            InterruptState::Running,
            InterruptEvent::Decide(_)
            | InterruptEvent::Resume(_)
            | InterruptEvent::RetryResume
            | InterruptEvent::DraftChanged(_),
        ) => Err(TransitionError::NoActiveInterrupt),

        // ============================================================
        // Resume outcome
        // ============================================================
        (InterruptState::Resuming { .. }, InterruptEvent::StreamCompleted) => {
            Ok(TransitionResult::new(InterruptState::Running).with_effect(Effect::NotifyCleared))
        }

        // Back to the interrupt with its draft; the built response is kept for retry
        (
            InterruptState::Resuming {
                interrupt,
                draft,
                response,
            },
            InterruptEvent::ResumeFailed { .. },
        ) => Ok(TransitionResult::new(InterruptState::Interrupted {
            interrupt: interrupt.clone(),
            draft: draft.clone(),
            pending: Some(response.clone()),
        })
        .with_effect(Effect::notify_interrupt(interrupt))),

        // A normal stream ending, or an interrupted stream closing after its interrupt frame
        (
            InterruptState::Running | InterruptState::Interrupted { .. },
            InterruptEvent::StreamCompleted | InterruptEvent::ResumeFailed { .. },
        ) => Ok(TransitionResult::new(state.clone())),

        // ============================================================
        // Reset
        // ============================================================
        (InterruptState::Running, InterruptEvent::Reset) => {
            Ok(TransitionResult::new(InterruptState::Running))
        }

        (
            InterruptState::Interrupted { .. } | InterruptState::Resuming { .. },
            InterruptEvent::Reset,
        ) => Ok(TransitionResult::new(InterruptState::Running).with_effect(Effect::NotifyCleared)),
    }
}

fn resume_with(
    interrupt: &super::Interrupt,
    draft: &str,
    response: super::InterruptResponse,
) -> TransitionResult {
    let effect = Effect::submit_resume(interrupt, response.clone());
    TransitionResult::new(InterruptState::Resuming {
        interrupt: interrupt.clone(),
        draft: draft.to_string(),
        response,
    })
    .with_effect(effect)
}
