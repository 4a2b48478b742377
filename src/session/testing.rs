//! Mock transport for testing
//!
//! Streams are scripted up front; requests are recorded for inspection.

use crate::frame::Frame;
use crate::transport::{FrameStream, RunRequest, RunTransport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// How the next opened stream behaves
pub enum Script {
    /// Yields these items, then closes
    Frames(Vec<Result<Frame, TransportError>>),
    /// Fails to open
    OpenError(TransportError),
    /// Yields whatever the test sends; closes when the sender is dropped
    Channel(mpsc::UnboundedReceiver<Result<Frame, TransportError>>),
}

/// Mock transport that plays queued scripts in order
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<RunRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream yielding `frames` then closing
    pub fn queue_frames(&self, frames: Vec<Frame>) {
        self.queue(Script::Frames(frames.into_iter().map(Ok).collect()));
    }

    pub fn queue_items(&self, items: Vec<Result<Frame, TransportError>>) {
        self.queue(Script::Frames(items));
    }

    pub fn queue_open_error(&self, error: TransportError) {
        self.queue(Script::OpenError(error));
    }

    /// Queue a stream driven by the returned sender
    pub fn queue_channel(&self) -> mpsc::UnboundedSender<Result<Frame, TransportError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queue(Script::Channel(rx));
        tx
    }

    fn queue(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<RunRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RunTransport for MockTransport {
    async fn stream_run(&self, request: &RunRequest) -> Result<FrameStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Frames(items)) => Ok(Box::pin(futures::stream::iter(items))),
            Some(Script::OpenError(error)) => Err(error),
            Some(Script::Channel(rx)) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
            None => Err(TransportError::network("No mock stream queued")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request() -> RunRequest {
        RunRequest {
            thread_id: None,
            assistant_id: "agent".into(),
            input: None,
            command: None,
            checkpoint: None,
            stream_mode: vec!["values".into()],
        }
    }

    #[tokio::test]
    async fn test_scripts_play_in_order() {
        let mock = MockTransport::new();
        mock.queue_frames(vec![Frame::ThreadId("t-1".into())]);
        mock.queue_open_error(TransportError::auth("denied"));

        let frames: Vec<_> = mock.stream_run(&request()).await.unwrap().collect().await;
        assert_eq!(frames.len(), 1);
        assert!(mock.stream_run(&request()).await.is_err());
        assert!(mock.stream_run(&request()).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 3);
    }
}
