//! Request coordinator: one outbound message, exactly one terminal outcome.
//!
//! `send` validates synchronously, appends the user message and the Pending
//! placeholder as one uninterrupted pair, then runs two tasks: a repeating
//! typing animation over the placeholder text, and the request itself under
//! a timeout. Whichever way the request settles (reply, timeout, rate
//! limit, transport failure), the animation is stopped first and the
//! placeholder transitions exactly once. There is no automatic retry; the
//! user resubmits.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use confab_client::{Responder, ResponderError};
use confab_core::error::{Result, WidgetError};
use confab_core::types::{InputOrigin, MessageId};
use confab_session::SessionStore;

/// Dot cycle shown on the placeholder while a request is in flight.
const TYPING_FRAMES: [&str; 4] = ["Thinking", "Thinking.", "Thinking..", "Thinking..."];

/// Copy for a request that outlived the timeout.
pub const TIMEOUT_MESSAGE: &str = "Sorry, that request took too long. Please try again.";
/// Copy for HTTP 429, distinct from the generic failure.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please wait and try again.";
/// Copy for every other transport or server failure.
pub const FAILURE_MESSAGE: &str = "Sorry, I'm having trouble right now. Please try again.";

/// Notice shown when the user submits nothing but whitespace.
pub const EMPTY_INPUT_NOTICE: &str = "Please type a message before sending.";

/// Notice shown when the user submits an over-length message.
pub fn over_length_notice(limit: usize) -> String {
    format!(
        "Your message exceeds the {} character limit. Please shorten it and try again.",
        limit
    )
}

/// Terminal outcome of one send.
#[derive(Clone, Debug, PartialEq)]
pub enum SendOutcome {
    /// The responder answered; the placeholder now holds `text`.
    Answered { text: String },
    TimedOut,
    RateLimited,
    Failed,
}

impl SendOutcome {
    /// Failure classification for hosts that branch on error kind; `None`
    /// for an answered request.
    pub fn error(&self) -> Option<WidgetError> {
        match self {
            SendOutcome::Answered { .. } => None,
            SendOutcome::TimedOut => Some(WidgetError::Timeout),
            SendOutcome::RateLimited => Some(WidgetError::RateLimited),
            SendOutcome::Failed => {
                Some(WidgetError::Transport("responder request failed".to_string()))
            }
        }
    }
}

/// Handle to an in-flight send.
pub struct SendHandle {
    message_id: MessageId,
    origin: InputOrigin,
    store: SessionStore,
    animation: tokio::task::AbortHandle,
    request: JoinHandle<SendOutcome>,
}

impl SendHandle {
    /// Id of the assistant placeholder this request settles.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn origin(&self) -> InputOrigin {
        self.origin
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(self) -> SendOutcome {
        match self.request.await {
            Ok(outcome) => outcome,
            // The request task was aborted (teardown); the placeholder is
            // already gone.
            Err(_) => SendOutcome::Failed,
        }
    }

    /// Teardown: stop the animation, drop the placeholder, and discard the
    /// eventual response. A completion that races past the abort finds the
    /// placeholder id gone and no-ops.
    pub fn cancel(self) {
        self.animation.abort();
        self.request.abort();
        self.store.discard_pending(self.message_id);
        tracing::debug!(message_id = ?self.message_id, "in-flight send cancelled");
    }
}

/// Issues outbound messages and settles their placeholders.
pub struct RequestCoordinator {
    store: SessionStore,
    responder: Arc<dyn Responder>,
    timeout: Duration,
    typing_tick: Duration,
    max_message_chars: usize,
}

impl RequestCoordinator {
    pub fn new(
        store: SessionStore,
        responder: Arc<dyn Responder>,
        timeout: Duration,
        typing_tick: Duration,
        max_message_chars: usize,
    ) -> Self {
        Self {
            store,
            responder,
            timeout,
            typing_tick,
            max_message_chars,
        }
    }

    /// Validate, append the user message and its placeholder, and launch the
    /// request.
    ///
    /// Validation failures append a System notice (the history is the only
    /// error channel) and return without any network call. A `Concurrency`
    /// error is a caller bug and is returned silently.
    pub fn send(&self, text: &str, origin: InputOrigin) -> Result<SendHandle> {
        // Fail fast before touching the history; a second in-flight send is
        // a caller bug and must not leave an orphaned user message behind.
        if self.store.pending_id().is_some() {
            return Err(WidgetError::Concurrency);
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.store.append_system(EMPTY_INPUT_NOTICE);
            return Err(WidgetError::Validation(
                "message cannot be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.max_message_chars {
            self.store
                .append_system(over_length_notice(self.max_message_chars));
            return Err(WidgetError::Validation(format!(
                "message exceeds maximum length of {} characters",
                self.max_message_chars
            )));
        }

        // The store re-validates; a failure here is a programming error in
        // the checks above.
        self.store.append_user(trimmed)?;
        let pending_id = self.store.append_pending()?;

        let animation = self.spawn_animation(pending_id);
        let animation_abort = animation.abort_handle();
        let request = self.spawn_request(pending_id, trimmed.to_string(), animation);

        Ok(SendHandle {
            message_id: pending_id,
            origin,
            store: self.store.clone(),
            animation: animation_abort,
            request,
        })
    }

    /// Cycle the placeholder text until aborted. Purely cosmetic; the
    /// request task owns stopping this on every terminal transition.
    fn spawn_animation(&self, pending_id: MessageId) -> JoinHandle<()> {
        let store = self.store.clone();
        let tick = self.typing_tick;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            let mut frame = 0usize;
            loop {
                interval.tick().await;
                store.set_pending_text(pending_id, TYPING_FRAMES[frame % TYPING_FRAMES.len()]);
                frame += 1;
            }
        })
    }

    fn spawn_request(
        &self,
        pending_id: MessageId,
        message: String,
        animation: JoinHandle<()>,
    ) -> JoinHandle<SendOutcome> {
        let store = self.store.clone();
        let responder = Arc::clone(&self.responder);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, responder.ask(&message)).await;

            // Every terminal path stops the animation before touching the
            // placeholder, so no tick can overwrite settled text.
            animation.abort();

            match result {
                Ok(Ok(reply)) => {
                    store.resolve_pending(pending_id, &reply);
                    SendOutcome::Answered { text: reply }
                }
                Ok(Err(ResponderError::RateLimited)) => {
                    tracing::warn!("responder rate limited the request");
                    store.fail_pending(pending_id, RATE_LIMIT_MESSAGE);
                    SendOutcome::RateLimited
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "responder request failed");
                    store.fail_pending(pending_id, FAILURE_MESSAGE);
                    SendOutcome::Failed
                }
                Err(_) => {
                    tracing::warn!(timeout_secs = timeout.as_secs(), "responder timed out");
                    store.fail_pending(pending_id, TIMEOUT_MESSAGE);
                    SendOutcome::TimedOut
                }
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
