//! Widget facade: composition root for the session engine.
//!
//! Wires the store, request coordinator, voice adapter/controller, and the
//! reply formatter behind one surface the rendering layer calls on user
//! gestures. Also owns the two cross-component behaviors that belong to no
//! single part: the one-time greeting sequence, and auto-playing replies to
//! voice-originated sends.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use tokio::sync::broadcast;
use tokio::sync::mpsc;

use confab_client::Responder;
use confab_core::config::WidgetConfig;
use confab_core::error::Result;
use confab_core::events::SessionEvent;
use confab_core::types::{InputOrigin, Message, MessageId};
use confab_render::ReplyFormatter;
use confab_session::SessionStore;
use confab_voice::{
    SpeechInputAdapter, SpeechOutputController, SpeechRecognizer, SpeechSynthesizer,
};

use crate::coordinator::{RequestCoordinator, SendHandle, SendOutcome};

/// Transient indicator shown while the greeting "types".
const GREETING_TYPING_INDICATOR: &str = "...";

/// The assembled widget engine.
///
/// Constructed once per widget mount and never torn down mid-page-life;
/// `visible` toggles on user interaction instead.
pub struct AssistantWidget {
    store: SessionStore,
    coordinator: RequestCoordinator,
    input: SpeechInputAdapter,
    output: SpeechOutputController,
    formatter: ReplyFormatter,
    greeting_delay: Duration,
}

impl AssistantWidget {
    /// Assemble the engine from its capabilities. The returned `Arc` is the
    /// handle the rendering layer keeps for the page's lifetime.
    pub fn new(
        config: &WidgetConfig,
        responder: Arc<dyn Responder>,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Arc<Self> {
        let store = SessionStore::with_message_limit(config.input.max_message_chars);

        let output = SpeechOutputController::new(
            store.clone(),
            synthesizer,
            config.voice_output.clone(),
        );

        let (input, transcript_rx) = SpeechInputAdapter::new(
            store.clone(),
            recognizer,
            output.clone(),
            Duration::from_secs(config.voice_input.silence_timeout_secs),
        );

        let coordinator = RequestCoordinator::new(
            store.clone(),
            responder,
            Duration::from_secs(config.responder.timeout_secs),
            Duration::from_millis(config.input.typing_tick_ms),
            config.input.max_message_chars,
        );

        let widget = Arc::new(Self {
            store,
            coordinator,
            input,
            output,
            formatter: ReplyFormatter::new(),
            greeting_delay: Duration::from_millis(config.general.greeting_delay_ms),
        });

        Self::spawn_transcript_pump(Arc::clone(&widget), transcript_rx);
        widget
    }

    // =========================================================================
    // Panel gestures
    // =========================================================================

    /// Open the panel. The first open of the session runs the greeting
    /// sequence: a transient typing indicator, a short delay, then the
    /// time-of-day greeting.
    pub fn open(&self) {
        if self.store.open() {
            let store = self.store.clone();
            let delay = self.greeting_delay;
            tokio::spawn(async move {
                let placeholder = store.append_system(GREETING_TYPING_INDICATOR);
                tokio::time::sleep(delay).await;
                store.remove_placeholder(placeholder);
                store.append_assistant(greeting_text(Local::now().hour()));
            });
        }
    }

    pub fn close(&self) {
        self.store.close();
    }

    pub fn toggle_expanded(&self) -> bool {
        self.store.toggle_expanded()
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Send typed input. Returns the in-flight handle; typed replies are
    /// never auto-played.
    pub fn send(&self, text: &str) -> Result<SendHandle> {
        self.coordinator.send(text, InputOrigin::Typed)
    }

    /// Begin single-shot voice capture. The recognized transcript flows
    /// through the same send path, marked voice-originated.
    pub fn start_voice_input(&self) -> Result<()> {
        self.input.start_voice_input()
    }

    /// Stop playback of a spoken reply, keeping it resumable.
    pub fn stop_playback(&self, id: MessageId) -> bool {
        self.output.pause(id)
    }

    /// Resume a paused reply from its recorded offset.
    pub fn resume_playback(&self, id: MessageId) -> Result<bool> {
        self.output.resume(id)
    }

    // =========================================================================
    // Read surface for the rendering layer
    // =========================================================================

    pub fn messages(&self) -> Vec<Message> {
        self.store.messages()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.store.subscribe()
    }

    pub fn visible(&self) -> bool {
        self.store.visible()
    }

    pub fn expanded(&self) -> bool {
        self.store.expanded()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Render reply text to sanitized display markup.
    pub fn render_markup(&self, text: &str) -> String {
        self.formatter.format(text)
    }

    // -- Private helpers --

    /// Forward recognized transcripts into the send path and auto-play the
    /// replies they produce. Voice sends run serially; the single-in-flight
    /// invariant makes overlap a caller error anyway.
    fn spawn_transcript_pump(
        widget: Arc<Self>,
        mut transcripts: mpsc::UnboundedReceiver<String>,
    ) {
        tokio::spawn(async move {
            while let Some(transcript) = transcripts.recv().await {
                let handle = match widget.coordinator.send(&transcript, InputOrigin::Voice) {
                    Ok(handle) => handle,
                    Err(e) => {
                        tracing::warn!(error = %e, "voice transcript rejected");
                        continue;
                    }
                };

                let reply_id = handle.message_id();
                if let SendOutcome::Answered { text } = handle.outcome().await {
                    if let Err(e) = widget.output.speak(reply_id, &text) {
                        tracing::warn!(error = %e, "auto-play failed");
                    }
                }
            }
        });
    }
}

/// Time-of-day greeting, matching the assistant's opening copy.
fn greeting_text(hour: u32) -> String {
    let time_greeting = if hour < 12 {
        "Good morning"
    } else if hour < 18 {
        "Good afternoon"
    } else {
        "Good evening"
    };
    format!(
        "👋 {}! I'm your banking assistant. How can I help you today?",
        time_greeting
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_text_by_hour() {
        assert!(greeting_text(0).contains("Good morning"));
        assert!(greeting_text(11).contains("Good morning"));
        assert!(greeting_text(12).contains("Good afternoon"));
        assert!(greeting_text(17).contains("Good afternoon"));
        assert!(greeting_text(18).contains("Good evening"));
        assert!(greeting_text(23).contains("Good evening"));
    }

    #[test]
    fn test_greeting_text_invites_help() {
        assert!(greeting_text(9).contains("How can I help you today?"));
    }
}
