//! Run submission payloads

use crate::interrupt::InterruptResponse;
use crate::message::{Checkpoint, Message};
use serde::Serialize;
use serde_json::{Map, Value};

/// New messages plus optional auxiliary context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunInput {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

/// Resume instruction for an interrupted run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub resume: InterruptResponse,
}

/// Body of a run-stream request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    /// `None` asks the backend to create a thread and report its id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<RunInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
    pub stream_mode: Vec<String>,
}
