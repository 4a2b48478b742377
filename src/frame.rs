//! Incremental stream frames
//!
//! One submission yields an ordered sequence of frames. The session applies
//! them strictly in arrival order with a single exhaustive match.

pub mod wire;

use crate::interrupt::Interrupt;
use crate::message::Message;
use serde_json::Value;

pub use wire::{decode_event, FrameError};

/// One event of a run stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Accumulated, authoritative message list so far
    ValueSnapshot { messages: Vec<Message> },
    /// Run metadata (run id and the like)
    Metadata(Value),
    /// Backend-defined side-channel payload
    Custom(Value),
    /// Execution paused awaiting a user decision
    Interrupt(Interrupt),
    /// Identifier assigned to a newly created thread
    ThreadId(String),
    /// Terminal backend error
    Error { message: String },
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::ValueSnapshot { .. } => "value-snapshot",
            Frame::Metadata(_) => "metadata",
            Frame::Custom(_) => "custom",
            Frame::Interrupt(_) => "interrupt",
            Frame::ThreadId(_) => "thread-id",
            Frame::Error { .. } => "error",
        }
    }
}
