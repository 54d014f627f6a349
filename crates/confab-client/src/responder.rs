//! Remote responder abstraction and HTTP transport.
//!
//! The responder is an opaque text-in/text-out service: one POST carrying
//! `{"message": ...}`, one JSON reply carrying `{"response": ...}`. The only
//! status worth distinguishing is 429; the widget shows rate-limit copy for
//! it and generic retry copy for everything else. Timeout enforcement lives
//! with the request coordinator, not here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use confab_core::error::WidgetError;

/// Classified transport failures.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    /// HTTP 429.
    #[error("rate limit exceeded")]
    RateLimited,
    /// Any other non-success status.
    #[error("responder returned status {0}")]
    Status(u16),
    /// Connection-level failure (refused, DNS, closed mid-body).
    #[error("transport failure: {0}")]
    Transport(String),
    /// 2xx with a body that is not the expected shape.
    #[error("malformed response body: {0}")]
    Malformed(String),
}

impl From<ResponderError> for WidgetError {
    fn from(err: ResponderError) -> Self {
        match err {
            ResponderError::RateLimited => WidgetError::RateLimited,
            other => WidgetError::Transport(other.to_string()),
        }
    }
}

/// Outbound wire shape.
#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    message: &'a str,
}

/// Expected success payload.
#[derive(Debug, Deserialize)]
struct AskResponse {
    response: String,
}

/// The remote conversational service, behind a seam so the engine can be
/// driven by a scripted fake in tests.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Send one user message and return the reply text.
    async fn ask(&self, message: &str) -> Result<String, ResponderError>;
}

/// HTTP implementation of [`Responder`].
pub struct HttpResponder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResponder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn ask(&self, message: &str) -> Result<String, ResponderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { message })
            .send()
            .await
            .map_err(|e| ResponderError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(endpoint = %self.endpoint, "responder rate limited the request");
            return Err(ResponderError::RateLimited);
        }
        if !status.is_success() {
            tracing::warn!(endpoint = %self.endpoint, status = status.as_u16(), "responder error status");
            return Err(ResponderError::Status(status.as_u16()));
        }

        let body: AskResponse = response
            .json()
            .await
            .map_err(|e| ResponderError::Malformed(e.to_string()))?;
        Ok(body.response)
    }
}

// =============================================================================
// Tests
// =============================================================================
