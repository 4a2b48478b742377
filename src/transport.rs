//! Backend run-stream transport
//!
//! Provides the seam between the session controller and the network.

mod auth;
mod error;
mod http;
pub mod sse;
mod types;

pub use auth::{StaticToken, TokenProvider};
pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;
pub use types::{Command, RunInput, RunRequest};

use crate::frame::Frame;
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Ordered frames of one run, ending when the stream closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// Opens run streams against the backend
#[async_trait]
pub trait RunTransport: Send + Sync {
    /// Submit a run and return its frame stream.
    ///
    /// Dropping the returned stream aborts the underlying request.
    async fn stream_run(&self, request: &RunRequest) -> Result<FrameStream, TransportError>;
}

#[async_trait]
impl<T: RunTransport + ?Sized> RunTransport for Arc<T> {
    async fn stream_run(&self, request: &RunRequest) -> Result<FrameStream, TransportError> {
        (**self).stream_run(request).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: RunTransport> RunTransport for LoggingTransport<T> {
    async fn stream_run(&self, request: &RunRequest) -> Result<FrameStream, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.stream_run(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    thread_id = request.thread_id.as_deref().unwrap_or("<new>"),
                    duration_ms = %duration.as_millis(),
                    resume = request.command.is_some(),
                    "Run stream opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    thread_id = request.thread_id.as_deref().unwrap_or("<new>"),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Run stream failed to open"
                );
            }
        }

        result
    }
}
