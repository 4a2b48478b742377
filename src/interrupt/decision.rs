//! Builders turning a user decision into a resume payload

use super::state::{Interrupt, InterruptResponse};
use super::transition::TransitionError;
use serde_json::{Map, Value};
use std::fmt;

/// What the user decided about the active interrupt
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Accept the action with its original args
    Approve,
    /// Accept the action with some args replaced; only changed keys are given
    Edit(Map<String, Value>),
    /// Skip the action
    Ignore,
    /// Free-text answer
    Respond(String),
}

impl Decision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Approve => DecisionKind::Approve,
            Decision::Edit(_) => DecisionKind::Edit,
            Decision::Ignore => DecisionKind::Ignore,
            Decision::Respond(_) => DecisionKind::Respond,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Approve,
    Edit,
    Ignore,
    Respond,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionKind::Approve => "approve",
            DecisionKind::Edit => "edit",
            DecisionKind::Ignore => "ignore",
            DecisionKind::Respond => "respond",
        };
        f.write_str(name)
    }
}

/// Build the resume payload for `decision`, checking it against the interrupt's config.
///
/// Edits are sent as an approval carrying the merged args. Keys the user did
/// not touch keep their original value and position.
pub fn build_response(
    interrupt: &Interrupt,
    decision: Decision,
) -> Result<InterruptResponse, TransitionError> {
    let config = interrupt.config;
    let not_allowed = |kind: DecisionKind| -> Result<InterruptResponse, TransitionError> {
        Err(TransitionError::DecisionNotAllowed(kind))
    };

    match decision {
        Decision::Approve => match &interrupt.action_request {
            Some(request) if config.approve => Ok(InterruptResponse::Approve(request.args.clone())),
            _ => not_allowed(DecisionKind::Approve),
        },
        Decision::Edit(changes) => match &interrupt.action_request {
            Some(request) if config.edit => {
                let mut args = request.args.clone();
                for (key, value) in changes {
                    args.insert(key, value);
                }
                Ok(InterruptResponse::Approve(args))
            }
            _ => not_allowed(DecisionKind::Edit),
        },
        Decision::Ignore if config.ignore => Ok(InterruptResponse::Ignore(Map::new())),
        Decision::Ignore => not_allowed(DecisionKind::Ignore),
        Decision::Respond(text) => {
            if !interrupt.accepts_text() {
                return not_allowed(DecisionKind::Respond);
            }
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(TransitionError::EmptyResponse);
            }
            Ok(InterruptResponse::Response(trimmed.to_string()))
        }
    }
}
