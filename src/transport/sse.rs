//! Server-sent events decoding for response bodies

use super::TransportError;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

/// Longest single line accepted from the body; snapshots can be large
const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Line-at-a-time event assembler
#[derive(Debug, Default)]
pub struct SseDecoder {
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed one line (without its terminator); returns an event on a blank line.
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() && event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

/// Turn a response body into a stream of events.
///
/// An unterminated trailing event is discarded.
pub fn decode_body<S>(body: S) -> impl Stream<Item = Result<SseEvent, TransportError>> + Send
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin,
{
    let lines = FramedRead::new(
        StreamReader::new(body),
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
    );
    let mut decoder = SseDecoder::default();

    lines.filter_map(move |line| {
        let item = match line {
            Ok(line) => decoder.push_line(&line).map(Ok),
            Err(e) => Some(Err(TransportError::network(format!(
                "Stream read failed: {e}"
            )))),
        };
        futures::future::ready(item)
    })
}
