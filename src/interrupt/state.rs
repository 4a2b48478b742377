//! Interrupt payloads and machine state

use crate::message::Checkpoint;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Interrupt Payload - what the backend asks the user
// ============================================================================

/// The action the backend wants approved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Which decisions the backend will accept for an interrupt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseConfig {
    #[serde(default, alias = "allow_accept")]
    pub approve: bool,
    #[serde(default, alias = "allow_edit")]
    pub edit: bool,
    #[serde(default, alias = "allow_ignore")]
    pub ignore: bool,
    /// Free-text replies on an interrupt that also carries an action request
    #[serde(default, alias = "allow_respond")]
    pub respond: bool,
}

/// A backend-signaled pause awaiting a user decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    #[serde(default)]
    pub id: String,
    /// Free-form type tag chosen by the backend
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, alias = "description")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_request: Option<ActionRequest>,
    #[serde(default)]
    pub config: ResponseConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
}

impl Interrupt {
    /// Interrupt asking only for a free-text reply
    pub fn question(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            prompt: prompt.into(),
            action_request: None,
            config: ResponseConfig::default(),
            checkpoint: None,
        }
    }

    /// Interrupt asking for a decision on a structured action
    pub fn action(
        id: impl Into<String>,
        action: impl Into<String>,
        args: Map<String, Value>,
        config: ResponseConfig,
    ) -> Self {
        Self {
            action_request: Some(ActionRequest {
                action: action.into(),
                args,
            }),
            config,
            ..Self::question(id, "")
        }
    }

    /// Whether a free-text reply is an accepted answer
    pub fn accepts_text(&self) -> bool {
        self.action_request.is_none() || self.config.respond
    }
}

// ============================================================================
// Resume Payload - what the user answers
// ============================================================================

/// Payload sent as `command.resume`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum InterruptResponse {
    Approve(Map<String, Value>),
    Edit(Map<String, Value>),
    Ignore(Map<String, Value>),
    Response(String),
}

impl InterruptResponse {
    pub fn type_name(&self) -> &'static str {
        match self {
            InterruptResponse::Approve(_) => "approve",
            InterruptResponse::Edit(_) => "edit",
            InterruptResponse::Ignore(_) => "ignore",
            InterruptResponse::Response(_) => "response",
        }
    }
}

// ============================================================================
// Machine State
// ============================================================================

/// Interrupt state of the active conversation
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InterruptState {
    /// No interrupt; streaming normally or idle
    #[default]
    Running,

    /// An interrupt is active and unresolved
    Interrupted {
        interrupt: Interrupt,
        /// Reply text the user is composing, not yet sent
        draft: String,
        /// Response from a failed resume, kept for retry
        pending: Option<InterruptResponse>,
    },

    /// A resume submission is in flight
    Resuming {
        interrupt: Interrupt,
        /// Draft at the time of sending, restored if the resume fails
        draft: String,
        response: InterruptResponse,
    },
}

impl InterruptState {
    pub fn interrupted(interrupt: Interrupt) -> Self {
        InterruptState::Interrupted {
            interrupt,
            draft: String::new(),
            pending: None,
        }
    }

    /// The interrupt awaiting a decision, if any
    pub fn active_interrupt(&self) -> Option<&Interrupt> {
        match self {
            InterruptState::Interrupted { interrupt, .. } => Some(interrupt),
            InterruptState::Running | InterruptState::Resuming { .. } => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InterruptState::Running)
    }

    pub fn is_resuming(&self) -> bool {
        matches!(self, InterruptState::Resuming { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            InterruptState::Running => "running",
            InterruptState::Interrupted { .. } => "interrupted",
            InterruptState::Resuming { .. } => "resuming",
        }
    }
}
