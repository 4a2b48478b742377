//! Bearer token supply
//!
//! Token issuance and refresh belong to the identity provider; the transport
//! only asks for the current token before each request.

use super::TransportError;
use async_trait::async_trait;
use std::sync::Arc;

/// Supplies the bearer token attached to every run request
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, TransportError>;
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn bearer_token(&self) -> Result<String, TransportError> {
        (**self).bearer_token().await
    }
}

/// Fixed token, typically from the environment
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, TransportError> {
        if self.token.is_empty() {
            return Err(TransportError::auth("No bearer token configured"));
        }
        Ok(self.token.clone())
    }
}
