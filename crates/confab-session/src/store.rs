//! Session store: exclusive owner of the ordered message history.
//!
//! All mutation of the session goes through this store, synchronously under
//! one mutex, so callbacks arriving from timers, network completions, and
//! speech events never interleave mid-mutation. Every mutation entry point
//! re-checks that its target message still exists in the expected state and
//! silently no-ops otherwise; a late callback from a settled or replaced
//! operation must never corrupt the history.
//!
//! Two invariants are enforced here, at one seam:
//! - at most one message is `Pending` at a time (single in-flight request);
//! - at most one message is `Playing` at a time (single synthesis channel).

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use confab_core::error::{Result, WidgetError};
use confab_core::events::SessionEvent;
use confab_core::types::{
    Message, MessageBody, MessageId, MessageStatus, Playback, PlaybackState,
};

/// Default cap on user message length, in chars.
pub const MAX_MESSAGE_CHARS: usize = 1000;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct SessionInner {
    messages: Vec<Message>,
    visible: bool,
    expanded: bool,
    greeted: bool,
    pending_request_id: Option<MessageId>,
    active_playback_id: Option<MessageId>,
}

/// Thread-safe handle to the session. Clones share the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionInner>>,
    event_tx: broadcast::Sender<SessionEvent>,
    max_message_chars: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_message_limit(MAX_MESSAGE_CHARS)
    }

    pub fn with_message_limit(max_message_chars: usize) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                messages: Vec::new(),
                visible: false,
                expanded: false,
                greeted: false,
                pending_request_id: None,
                active_playback_id: None,
            })),
            event_tx,
            max_message_chars,
        }
    }

    /// Subscribe to session change events (rendering-layer feed).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    // =========================================================================
    // Visibility and layout
    // =========================================================================

    /// Open the panel. Returns `true` exactly once per session lifetime,
    /// when the greeting sequence should run.
    ///
    /// Also asks the host to focus the input field; the focus transfer
    /// itself belongs to the rendering layer.
    pub fn open(&self) -> bool {
        let should_greet = {
            let mut inner = self.lock();
            if !inner.visible {
                inner.visible = true;
                self.emit(SessionEvent::VisibilityChanged { visible: true });
            }
            if !inner.greeted {
                inner.greeted = true;
                true
            } else {
                false
            }
        };
        self.emit(SessionEvent::InputFocusRequested);
        should_greet
    }

    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.visible {
            inner.visible = false;
            self.emit(SessionEvent::VisibilityChanged { visible: false });
        }
    }

    /// Flip between compact and expanded layout. Returns the new value.
    pub fn toggle_expanded(&self) -> bool {
        let mut inner = self.lock();
        inner.expanded = !inner.expanded;
        let expanded = inner.expanded;
        self.emit(SessionEvent::ExpandedChanged { expanded });
        expanded
    }

    pub fn visible(&self) -> bool {
        self.lock().visible
    }

    pub fn expanded(&self) -> bool {
        self.lock().expanded
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Snapshot of the ordered history.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.lock().messages.iter().find(|m| m.id == id).cloned()
    }

    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    /// Append a user message after validating it.
    ///
    /// Rejected input (empty after trim, or over the char limit) is not
    /// appended; the caller surfaces the error as a System notice so the
    /// failure shows up in the same history stream as everything else.
    pub fn append_user(&self, text: &str) -> Result<MessageId> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(WidgetError::Validation(
                "message cannot be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.max_message_chars {
            return Err(WidgetError::Validation(format!(
                "message exceeds maximum length of {} characters",
                self.max_message_chars
            )));
        }

        let message = Message::user(trimmed);
        let id = message.id;
        self.lock().messages.push(message);
        self.emit(SessionEvent::MessageAppended { id });
        Ok(id)
    }

    /// Append an inline notice (capability hints, validation feedback,
    /// listening indicator).
    pub fn append_system(&self, text: impl Into<String>) -> MessageId {
        let message = Message::system(text);
        let id = message.id;
        self.lock().messages.push(message);
        self.emit(SessionEvent::MessageAppended { id });
        id
    }

    /// Append a loaded assistant message outside the request path (greeting).
    pub fn append_assistant(&self, text: impl Into<String>) -> MessageId {
        let message = Message::assistant(text);
        let id = message.id;
        self.lock().messages.push(message);
        self.emit(SessionEvent::MessageAppended { id });
        id
    }

    /// Append the Pending assistant placeholder for an in-flight request.
    ///
    /// Fails with `Concurrency` if a request is already outstanding; the
    /// caller must not start a second send until the first settles.
    pub fn append_pending(&self) -> Result<MessageId> {
        let id = {
            let mut inner = self.lock();
            if inner.pending_request_id.is_some() {
                return Err(WidgetError::Concurrency);
            }
            let message = Message::assistant_pending();
            let id = message.id;
            inner.messages.push(message);
            inner.pending_request_id = Some(id);
            id
        };
        self.emit(SessionEvent::MessageAppended { id });
        Ok(id)
    }

    /// In-place text update for the Pending placeholder (typing animation).
    /// Stale-id no-op.
    pub fn set_pending_text(&self, id: MessageId, text: &str) -> bool {
        self.update_pending(id, |message| {
            message.text = text.to_string();
        })
    }

    /// Settle the placeholder with the responder's reply. Stale-id no-op.
    pub fn resolve_pending(&self, id: MessageId, text: &str) -> bool {
        self.settle_pending(id, text, MessageStatus::Loaded)
    }

    /// Settle the placeholder with failure copy. Stale-id no-op.
    pub fn fail_pending(&self, id: MessageId, text: &str) -> bool {
        self.settle_pending(id, text, MessageStatus::Failed)
    }

    /// Teardown path: drop the placeholder entirely so a late completion
    /// finds nothing to mutate.
    pub fn discard_pending(&self, id: MessageId) -> bool {
        let removed = {
            let mut inner = self.lock();
            if inner.pending_request_id != Some(id) {
                return false;
            }
            inner.pending_request_id = None;
            let before = inner.messages.len();
            inner.messages.retain(|m| m.id != id);
            inner.messages.len() != before
        };
        if removed {
            self.emit(SessionEvent::MessageRemoved { id });
        }
        removed
    }

    /// Remove a transient message (greeting typing indicator, listening
    /// notice). Stale-id no-op.
    pub fn remove_placeholder(&self, id: MessageId) -> bool {
        let removed = {
            let mut inner = self.lock();
            let before = inner.messages.len();
            inner.messages.retain(|m| m.id != id);
            inner.messages.len() != before
        };
        if removed {
            self.emit(SessionEvent::MessageRemoved { id });
        }
        removed
    }

    pub fn pending_id(&self) -> Option<MessageId> {
        self.lock().pending_request_id
    }

    // =========================================================================
    // Playback bookkeeping
    // =========================================================================

    /// Mark `id` as the playing message, pausing whichever message held the
    /// channel before. `resume_offset` is 0 for a fresh utterance, or the
    /// recorded offset when resuming.
    ///
    /// Returns `false` if `id` is not an assistant message.
    pub fn start_playback(&self, id: MessageId, full_text: &str, resume_offset: usize) -> bool {
        let (paused_prev, started) = {
            let mut inner = self.lock();

            let mut paused_prev = None;
            if let Some(prev_id) = inner.active_playback_id {
                if prev_id != id {
                    if let Some(playback) = inner
                        .messages
                        .iter_mut()
                        .find(|m| m.id == prev_id)
                        .and_then(|m| m.playback_mut())
                    {
                        if playback.state == PlaybackState::Playing {
                            playback.state = PlaybackState::Paused;
                            paused_prev = Some(prev_id);
                        }
                    }
                }
            }

            let started = match inner.messages.iter_mut().find(|m| m.id == id) {
                Some(message) => match &mut message.body {
                    MessageBody::Assistant { playback, .. } => {
                        *playback = Some(Playback {
                            state: PlaybackState::Playing,
                            full_text: full_text.to_string(),
                            resume_offset,
                        });
                        true
                    }
                    _ => false,
                },
                None => false,
            };

            if started {
                inner.active_playback_id = Some(id);
            }
            (paused_prev, started)
        };

        if let Some(prev_id) = paused_prev {
            self.emit(SessionEvent::PlaybackChanged {
                id: prev_id,
                state: PlaybackState::Paused,
            });
        }
        if started {
            self.emit(SessionEvent::PlaybackChanged {
                id,
                state: PlaybackState::Playing,
            });
        }
        started
    }

    /// Record the char offset of a boundary event. Ignored unless `id` is
    /// the currently playing message (a late boundary from a cancelled
    /// utterance must not touch a since-paused record).
    pub fn record_playback_offset(&self, id: MessageId, offset: usize) -> bool {
        let mut inner = self.lock();
        if inner.active_playback_id != Some(id) {
            return false;
        }
        match inner
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .and_then(|m| m.playback_mut())
        {
            Some(playback) if playback.state == PlaybackState::Playing => {
                playback.resume_offset = offset;
                true
            }
            _ => false,
        }
    }

    /// Stop-by-user: mark Paused, keep the offset and full text for
    /// resumption, release the channel. Stale-id no-op.
    pub fn pause_playback(&self, id: MessageId) -> bool {
        let paused = {
            let mut inner = self.lock();
            let paused = match inner
                .messages
                .iter_mut()
                .find(|m| m.id == id)
                .and_then(|m| m.playback_mut())
            {
                Some(playback) if playback.state == PlaybackState::Playing => {
                    playback.state = PlaybackState::Paused;
                    true
                }
                _ => false,
            };
            if paused && inner.active_playback_id == Some(id) {
                inner.active_playback_id = None;
            }
            paused
        };
        if paused {
            self.emit(SessionEvent::PlaybackChanged {
                id,
                state: PlaybackState::Paused,
            });
        }
        paused
    }

    /// Natural end of an utterance: back to Idle, offset cleared, channel
    /// released only if it still belongs to this message.
    pub fn finish_playback(&self, id: MessageId) -> bool {
        let finished = {
            let mut inner = self.lock();
            let finished = match inner
                .messages
                .iter_mut()
                .find(|m| m.id == id)
                .and_then(|m| m.playback_mut())
            {
                Some(playback) => {
                    playback.state = PlaybackState::Idle;
                    playback.resume_offset = 0;
                    true
                }
                None => false,
            };
            if finished && inner.active_playback_id == Some(id) {
                inner.active_playback_id = None;
            }
            finished
        };
        if finished {
            self.emit(SessionEvent::PlaybackChanged {
                id,
                state: PlaybackState::Idle,
            });
        }
        finished
    }

    pub fn active_playback_id(&self) -> Option<MessageId> {
        self.lock().active_playback_id
    }

    pub fn playback(&self, id: MessageId) -> Option<Playback> {
        self.lock()
            .messages
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| m.playback())
            .cloned()
    }

    // -- Private helpers --

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("session mutex poisoned")
    }

    fn update_pending(&self, id: MessageId, apply: impl FnOnce(&mut Message)) -> bool {
        let updated = {
            let mut inner = self.lock();
            if inner.pending_request_id != Some(id) {
                return false;
            }
            match inner.messages.iter_mut().find(|m| m.id == id) {
                Some(message) if message.is_pending() => {
                    apply(message);
                    true
                }
                _ => false,
            }
        };
        if updated {
            self.emit(SessionEvent::MessageUpdated { id });
        }
        updated
    }

    /// Transition the Pending placeholder to a terminal status, clearing the
    /// in-flight marker under the same lock.
    fn settle_pending(&self, id: MessageId, text: &str, status: MessageStatus) -> bool {
        let settled = {
            let mut inner = self.lock();
            if inner.pending_request_id != Some(id) {
                return false;
            }
            match inner.messages.iter_mut().find(|m| m.id == id) {
                Some(message) if message.is_pending() => {
                    message.text = text.to_string();
                    if let MessageBody::Assistant {
                        status: message_status,
                        ..
                    } = &mut message.body
                    {
                        *message_status = status;
                    }
                    inner.pending_request_id = None;
                    true
                }
                _ => false,
            }
        };
        if settled {
            self.emit(SessionEvent::MessageUpdated { id });
        }
        settled
    }

    fn emit(&self, event: SessionEvent) {
        tracing::trace!(event = event.event_name(), "session event");
        // No subscribers is fine; the engine works headless.
        let _ = self.event_tx.send(event);
    }
}

// =============================================================================
// Tests
// =============================================================================
