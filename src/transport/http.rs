//! HTTP run-stream transport

use super::sse::{decode_body, SseEvent};
use super::{FrameStream, RunRequest, RunTransport, TokenProvider, TransportError};
use crate::config::ClientConfig;
use crate::frame::{decode_event, Frame};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;

/// Streams runs over `POST .../runs/stream` with a bearer token
pub struct HttpTransport {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        config: &ClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn run_url(&self, thread_id: Option<&str>) -> String {
        match thread_id {
            Some(id) => format!("{}/threads/{id}/runs/stream", self.base_url),
            None => format!("{}/runs/stream", self.base_url),
        }
    }
}

#[async_trait]
impl RunTransport for HttpTransport {
    async fn stream_run(&self, request: &RunRequest) -> Result<FrameStream, TransportError> {
        let token = self.tokens.bearer_token().await?;
        let url = self.run_url(request.thread_id.as_deref());

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), &body));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));

        let frames =
            decode_body(Box::pin(body)).flat_map(|event| stream::iter(event_to_frames(event)));
        Ok(Box::pin(frames))
    }
}

fn event_to_frames(event: Result<SseEvent, TransportError>) -> Vec<Result<Frame, TransportError>> {
    let event = match event {
        Ok(event) => event,
        Err(e) => return vec![Err(e)],
    };

    match decode_event(&event.event, &event.data) {
        Ok(frames) => frames.into_iter().map(Ok).collect(),
        Err(e) => vec![Err(TransportError::malformed(e.to_string()))],
    }
}
