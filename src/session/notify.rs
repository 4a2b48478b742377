//! Session change notifications

use crate::interrupt::Interrupt;
use serde_json::Value;

/// Events broadcast to session subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessagesChanged { count: usize },
    Loading(bool),
    /// First assistant output of the current submission
    FirstToken,
    Interrupted(Interrupt),
    InterruptCleared,
    ThreadIdAssigned(String),
    ThreadSwitched { thread_id: Option<String> },
    Metadata(Value),
    Custom(Value),
    /// Raw backend or transport error text
    Error { message: String },
}

/// Suppresses repeats of the error message shown last
#[derive(Debug, Default)]
pub struct ErrorNotifier {
    last_shown: Option<String>,
}

impl ErrorNotifier {
    /// Whether `message` should be shown; records it if so
    pub fn should_show(&mut self, message: &str) -> bool {
        if self.last_shown.as_deref() == Some(message) {
            return false;
        }
        self.last_shown = Some(message.to_string());
        true
    }

    pub fn reset(&mut self) {
        self.last_shown = None;
    }
}
