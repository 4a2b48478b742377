//! Single-slot artifact context registry
//!
//! At most one artifact is open at a time. Whatever context it sets is
//! attached to the next submission. Cleared on thread switch.

use serde_json::{Map, Value};

/// Registry owned by the session and lent to artifact views
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactRegistry {
    open_id: Option<String>,
    context: Map<String, Value>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle: opens `id`, or closes it if it is already the open artifact.
    /// Opening a different artifact replaces the current one.
    pub fn open(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.open_id.as_deref() == Some(id.as_str()) {
            self.close();
        } else {
            // Context belongs to the artifact that set it
            self.context.clear();
            self.open_id = Some(id);
        }
    }

    /// Close the open artifact and drop its context
    pub fn close(&mut self) {
        self.open_id = None;
        self.context.clear();
    }

    pub fn open_id(&self) -> Option<&str> {
        self.open_id.as_deref()
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open_id.as_deref() == Some(id)
    }

    /// Replace the context contributed by the open artifact
    pub fn set_context(&mut self, context: Map<String, Value>) {
        self.context = context;
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Context to attach to a submission; `None` when empty
    pub fn submission_context(&self) -> Option<Map<String, Value>> {
        if self.context.is_empty() {
            None
        } else {
            Some(self.context.clone())
        }
    }

    /// Mandatory on thread switch
    pub fn reset(&mut self) {
        self.open_id = None;
        self.context = Map::new();
    }
}
