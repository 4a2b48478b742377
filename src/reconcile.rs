//! Tool-call / tool-result pairing
//!
//! The backend rejects a new human turn while any earlier tool call is
//! unanswered. Before each submission the history is scanned and a hidden,
//! inert tool result is appended for every call still pending.

use crate::message::{Message, Role, HIDDEN_TAG};

/// Content of a synthesized tool result
pub const SYNTHETIC_TOOL_RESULT: &str = "Successfully handled tool call.";

/// Ids of tool calls with no later matching tool result, in call order
pub fn unresolved_tool_calls(messages: &[Message]) -> Vec<String> {
    let mut pending: Vec<String> = Vec::new();

    for message in messages {
        match message.role {
            Role::Assistant => {
                pending.extend(message.tool_calls.iter().map(|call| call.id.clone()));
            }
            Role::Tool => {
                if let Some(answered) = &message.tool_call_id {
                    // Only the first pending occurrence is answered by one result
                    if let Some(pos) = pending.iter().position(|id| id == answered) {
                        pending.remove(pos);
                    }
                }
            }
            Role::Human => {}
        }
    }

    pending
}

/// Return `messages` with one hidden tool result appended per unanswered tool call.
pub fn reconcile(messages: &[Message]) -> Vec<Message> {
    let pending = unresolved_tool_calls(messages);
    let mut out = Vec::with_capacity(messages.len() + pending.len());
    out.extend_from_slice(messages);

    for tool_call_id in pending {
        tracing::debug!(
            tool_call_id = %tool_call_id,
            "Synthesizing tool result for unanswered tool call"
        );
        out.push(Message::tool_result(tool_call_id, SYNTHETIC_TOOL_RESULT).with_tag(HIDDEN_TAG));
    }

    out
}
