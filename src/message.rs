//! Conversation message types
//!
//! Mirrors the message shape the backend streams back in value snapshots.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Tag marking a message that stays in the protocol history but is never rendered
pub const HIDDEN_TAG: &str = "hidden";

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
    Tool,
}

/// Content block in a message
///
/// Only blocks that match a known shape exactly are typed; everything else
/// is kept verbatim so history goes back to the backend unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        mime_type: String,
        /// Base64 payload, already encoded by the caller
        data: String,
    },
    File {
        mime_type: String,
        data: String,
        filename: Option<String>,
    },
    /// Block kinds or extra fields this client does not model
    Other(Value),
}

impl From<Value> for ContentBlock {
    fn from(value: Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str);
        let typed = match field("type") {
            Some("text") => field("text").map(ContentBlock::text),
            Some("image") => match (field("mime_type"), field("data")) {
                (Some(mime_type), Some(data)) => Some(ContentBlock::image(mime_type, data)),
                _ => None,
            },
            Some("file") => match (field("mime_type"), field("data")) {
                (Some(mime_type), Some(data)) => Some(ContentBlock::file(
                    mime_type,
                    data,
                    field("filename").map(str::to_string),
                )),
                _ => None,
            },
            _ => None,
        };

        match typed {
            Some(block) if Value::from(block.clone()) == value => block,
            _ => ContentBlock::Other(value),
        }
    }
}

impl From<ContentBlock> for Value {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => json!({"type": "text", "text": text}),
            ContentBlock::Image { mime_type, data } => {
                json!({"type": "image", "mime_type": mime_type, "data": data})
            }
            ContentBlock::File {
                mime_type,
                data,
                filename,
            } => {
                let mut value = json!({"type": "file", "mime_type": mime_type, "data": data});
                if let Some(filename) = filename {
                    value["filename"] = Value::String(filename);
                }
                value
            }
            ContentBlock::Other(value) => value,
        }
    }
}

impl ContentBlock {
    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text { text: s.into() }
    }

    pub fn image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentBlock::Image {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn file(
        mime_type: impl Into<String>,
        data: impl Into<String>,
        filename: Option<String>,
    ) -> Self {
        ContentBlock::File {
            mime_type: mime_type.into(),
            data: data.into(),
            filename,
        }
    }
}

/// A tool invocation embedded in an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
    /// Backend fields this client does not model, sent back as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
            extra: Map::new(),
        }
    }
}

/// Message body: backends send either a bare string or a list of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    /// Content blocks; a bare string counts as one text block
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match self {
            MessageContent::Text(text) if text.is_empty() => Vec::new(),
            MessageContent::Text(text) => vec![ContentBlock::text(text.as_str())],
            MessageContent::Blocks(blocks) => blocks.clone(),
        }
    }
}

/// One message of a thread
///
/// Fields the client does not model are kept in `extra`, so a message
/// decoded from a snapshot serializes back to the same JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default, deserialize_with = "deserialize_content")]
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool messages: the id of the call this result answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    fn new(role: Role, content: MessageContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            tags: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(Role::Human, MessageContent::Text(text.into()))
    }

    /// Human message with attachments following the text
    pub fn human_with_blocks(text: &str, attachments: Vec<ContentBlock>) -> Self {
        if attachments.is_empty() {
            return Self::human(text);
        }
        let mut content = Vec::with_capacity(attachments.len() + 1);
        if !text.trim().is_empty() {
            content.push(ContentBlock::text(text));
        }
        content.extend(attachments);
        Self::new(Role::Human, MessageContent::Blocks(content))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text(text.into()))
    }

    pub fn assistant_with_tool_calls(text: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(text)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, MessageContent::Text(text.into()))
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_hidden(&self) -> bool {
        self.has_tag(HIDDEN_TAG)
    }

    /// Concatenated text blocks
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Messages that should be rendered
pub fn visible_messages(messages: &[Message]) -> impl Iterator<Item = &Message> {
    messages.iter().filter(|m| !m.is_hidden())
}

/// Opaque backend marker for a point in execution history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(pub Value);

impl Checkpoint {
    pub fn from_id(checkpoint_id: impl Into<String>) -> Self {
        Checkpoint(serde_json::json!({ "checkpoint_id": checkpoint_id.into() }))
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("checkpoint_id").and_then(Value::as_str)
    }
}

/// Status of the active thread, derived from stream state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Running,
    Idle,
    Interrupted,
}

/// Missing and null content both read as an empty string
fn deserialize_content<'de, D>(deserializer: D) -> Result<MessageContent, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<MessageContent>::deserialize(deserializer)?.unwrap_or_default())
}
