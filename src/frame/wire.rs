//! Decoding of server-sent events into frames

use super::Frame;
use crate::interrupt::Interrupt;
use crate::message::Message;
use serde_json::Value;
use thiserror::Error;

/// Why an event could not be turned into frames
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),
    #[error("Invalid JSON in '{event}' event: {source}")]
    InvalidJson {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid '{event}' payload: {reason}")]
    InvalidPayload { event: String, reason: String },
}

/// Decode one SSE event into zero or more frames, in the order they must be applied.
///
/// A `values` event carrying `__interrupt__` yields the snapshot first and the
/// interrupt second.
pub fn decode_event(event: &str, data: &str) -> Result<Vec<Frame>, FrameError> {
    match event {
        "values" => {
            let value = parse_json(event, data)?;
            decode_values(event, &value)
        }
        "metadata" => Ok(vec![Frame::Metadata(parse_json(event, data)?)]),
        "custom" => Ok(vec![Frame::Custom(parse_json(event, data)?)]),
        "interrupt" => {
            let value = parse_json(event, data)?;
            Ok(vec![Frame::Interrupt(decode_interrupt(event, &value)?)])
        }
        "thread_id" | "thread-id" => Ok(vec![Frame::ThreadId(decode_thread_id(event, data)?)]),
        "error" => Ok(vec![Frame::Error {
            message: decode_error_message(data),
        }]),
        "end" => Ok(vec![]),
        other => Err(FrameError::UnknownEvent(other.to_string())),
    }
}

fn parse_json(event: &str, data: &str) -> Result<Value, FrameError> {
    serde_json::from_str(data).map_err(|source| FrameError::InvalidJson {
        event: event.to_string(),
        source,
    })
}

fn invalid(event: &str, reason: impl Into<String>) -> FrameError {
    FrameError::InvalidPayload {
        event: event.to_string(),
        reason: reason.into(),
    }
}

fn decode_values(event: &str, value: &Value) -> Result<Vec<Frame>, FrameError> {
    let mut frames = Vec::new();

    if let Some(messages) = value.get("messages") {
        let messages: Vec<Message> = serde_json::from_value(messages.clone())
            .map_err(|e| invalid(event, format!("messages: {e}")))?;
        frames.push(Frame::ValueSnapshot { messages });
    }

    if let Some(first) = value
        .get("__interrupt__")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
    {
        frames.push(Frame::Interrupt(decode_interrupt(event, first)?));
    }

    Ok(frames)
}

/// Accepts a bare interrupt, a `{value, id}` wrapper, or a wrapper around a
/// one-element list of interrupts.
fn decode_interrupt(event: &str, item: &Value) -> Result<Interrupt, FrameError> {
    let outer_id = item.get("id").and_then(Value::as_str);
    let mut payload = item.get("value").unwrap_or(item);
    if let Some(first) = payload.as_array().and_then(|items| items.first()) {
        payload = first;
    }

    let mut interrupt = match payload {
        Value::String(prompt) => Interrupt::question("", prompt.clone()),
        Value::Object(_) => serde_json::from_value(payload.clone())
            .map_err(|e| invalid(event, format!("interrupt: {e}")))?,
        other => return Err(invalid(event, format!("interrupt payload is {other}"))),
    };

    if interrupt.id.is_empty() {
        if let Some(id) = outer_id {
            interrupt.id = id.to_string();
        }
    }
    Ok(interrupt)
}

fn decode_thread_id(event: &str, data: &str) -> Result<String, FrameError> {
    let id = match serde_json::from_str::<Value>(data) {
        Ok(Value::String(id)) => id,
        Ok(value) => value
            .get("thread_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| invalid(event, "missing thread_id"))?,
        Err(_) => data.trim().to_string(),
    };

    if id.is_empty() {
        return Err(invalid(event, "empty thread id"));
    }
    Ok(id)
}

fn decode_error_message(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(message)) => message,
        Ok(value) => value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_string),
        Err(_) => data.trim().to_string(),
    }
}
