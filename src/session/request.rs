//! Caller-facing submission inputs

use crate::message::{Checkpoint, Message};
use crate::transport::Command;
use serde_json::{Map, Value};
use std::fmt;

/// Computes the speculative message list shown before the backend confirms
pub type OptimisticFn = Box<dyn FnOnce(&[Message]) -> Vec<Message> + Send>;

/// New human messages for one turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitInput {
    pub messages: Vec<Message>,
    pub context: Option<Map<String, Value>>,
}

impl SubmitInput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }
}

/// Per-submission options
#[derive(Default)]
pub struct SubmitOptions {
    /// Overrides the configured stream modes
    pub stream_mode: Option<Vec<String>>,
    pub optimistic: Option<OptimisticFn>,
    /// Run from an earlier point instead of the thread head
    pub checkpoint: Option<Checkpoint>,
    pub command: Option<Command>,
}

impl SubmitOptions {
    #[must_use]
    pub fn optimistic(
        mut self,
        f: impl FnOnce(&[Message]) -> Vec<Message> + Send + 'static,
    ) -> Self {
        self.optimistic = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    #[must_use]
    pub fn command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    #[must_use]
    pub fn stream_mode(mut self, modes: Vec<String>) -> Self {
        self.stream_mode = Some(modes);
        self
    }
}

impl fmt::Debug for SubmitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitOptions")
            .field("stream_mode", &self.stream_mode)
            .field("optimistic", &self.optimistic.is_some())
            .field("checkpoint", &self.checkpoint)
            .field("command", &self.command)
            .finish()
    }
}
