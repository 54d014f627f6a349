//! Speech input adapter.
//!
//! Wraps the host recognizer into a single-shot transcript producer:
//! `Idle -> Listening -> {Recognized | TimedOut | Errored} -> Idle`. While
//! listening, a transient notice sits in the history and a silence timer is
//! armed; exactly one of the three exits fires, removes the notice, and
//! returns the machine to Idle. Recognized transcripts are handed to the
//! widget over a channel, marked voice-originated there.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use confab_core::error::{Result, WidgetError};
use confab_session::SessionStore;

use crate::capability::{RecognitionErrorCode, RecognitionEvent, SpeechRecognizer};
use crate::output::SpeechOutputController;
use crate::state::{ListenState, ListenStateMachine};

/// Transient notice shown while the microphone is open.
pub const LISTENING_NOTICE: &str = "🎤 Listening...";

const NOT_SUPPORTED_MESSAGE: &str =
    "Voice input is not supported on this device. Please type your question instead.";
const SILENCE_MESSAGE: &str =
    "I didn't hear anything. Tap the microphone to try again, or type your question.";
const PERMISSION_DENIED_MESSAGE: &str =
    "Microphone access was denied. Check your microphone permissions and try again.";
const NO_SPEECH_MESSAGE: &str = "No speech was detected. Please try again.";
const RECOGNITION_FAILED_MESSAGE: &str =
    "Voice input failed. Please try again or type your question.";

/// How a listening session ended.
enum ListenExit {
    Recognized(String),
    TimedOut,
    Errored(RecognitionErrorCode),
}

/// Single-shot voice capture feeding transcripts to the send path.
#[derive(Clone)]
pub struct SpeechInputAdapter {
    store: SessionStore,
    recognizer: Arc<dyn SpeechRecognizer>,
    output: SpeechOutputController,
    transcript_tx: mpsc::UnboundedSender<String>,
    silence_timeout: Duration,
    state: ListenStateMachine,
}

impl SpeechInputAdapter {
    /// Build the adapter and the receiving end of the transcript channel.
    /// The widget owns the receiver and forwards each transcript into the
    /// request path as a voice-originated send.
    pub fn new(
        store: SessionStore,
        recognizer: Arc<dyn SpeechRecognizer>,
        output: SpeechOutputController,
        silence_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                recognizer,
                output,
                transcript_tx,
                silence_timeout,
                state: ListenStateMachine::new(),
            },
            transcript_rx,
        )
    }

    pub fn state(&self) -> ListenState {
        self.state.current()
    }

    /// Begin a single-shot capture.
    ///
    /// Appends the listening notice, arms the silence timer, and spawns the
    /// event loop. Active speech output is stopped first; microphone capture
    /// and speaker playback must not overlap.
    pub fn start_voice_input(&self) -> Result<()> {
        if !self.recognizer.is_available() {
            self.store.append_system(NOT_SUPPORTED_MESSAGE);
            return Err(WidgetError::CapabilityUnavailable(
                "speech input".to_string(),
            ));
        }

        self.state.transition(ListenState::Listening)?;
        self.output.pause_active();

        // Subscribe before starting so the first events cannot be missed.
        let events = self.recognizer.subscribe();
        let notice_id = self.store.append_system(LISTENING_NOTICE);

        if let Err(e) = self.recognizer.start() {
            self.store.remove_placeholder(notice_id);
            self.state.reset();
            return Err(e);
        }

        tracing::debug!(timeout_secs = self.silence_timeout.as_secs(), "listening started");

        let adapter = self.clone();
        tokio::spawn(async move {
            adapter.listen_loop(events, notice_id).await;
        });

        Ok(())
    }

    /// Wait for exactly one exit: a final transcript, the silence timer, or
    /// a recognizer error.
    async fn listen_loop(
        &self,
        mut events: broadcast::Receiver<RecognitionEvent>,
        notice_id: confab_core::types::MessageId,
    ) {
        let deadline = tokio::time::sleep(self.silence_timeout);
        tokio::pin!(deadline);

        let exit = loop {
            tokio::select! {
                _ = &mut deadline => break ListenExit::TimedOut,
                event = events.recv() => match event {
                    Ok(RecognitionEvent::Result { transcript, is_final }) if is_final => {
                        let trimmed = transcript.trim().to_string();
                        if trimmed.is_empty() {
                            // An empty final result is no transcript; keep
                            // waiting for the timer.
                            continue;
                        }
                        break ListenExit::Recognized(trimmed);
                    }
                    Ok(RecognitionEvent::Error(code)) => break ListenExit::Errored(code),
                    // Start/end notifications and interim results carry no
                    // decision.
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "recognition listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break ListenExit::Errored(RecognitionErrorCode::Other(
                            "recognizer event channel closed".to_string(),
                        ));
                    }
                }
            }
        };

        self.store.remove_placeholder(notice_id);
        self.recognizer.stop();

        match exit {
            ListenExit::Recognized(transcript) => {
                let _ = self.state.transition(ListenState::Recognized);
                tracing::debug!(chars = transcript.chars().count(), "transcript recognized");
                let _ = self.transcript_tx.send(transcript);
            }
            ListenExit::TimedOut => {
                let _ = self.state.transition(ListenState::TimedOut);
                tracing::debug!("listening timed out on silence");
                self.store.append_system(SILENCE_MESSAGE);
            }
            ListenExit::Errored(code) => {
                let _ = self.state.transition(ListenState::Errored);
                tracing::warn!(code = ?code, "speech recognition failed");
                self.store.append_system(classify_error(&code));
            }
        }

        self.state.reset();
    }
}

/// Fixed classification table from recognizer reason codes to the canonical
/// user-facing messages.
fn classify_error(code: &RecognitionErrorCode) -> &'static str {
    match code {
        RecognitionErrorCode::PermissionDenied => PERMISSION_DENIED_MESSAGE,
        RecognitionErrorCode::NoSpeech => NO_SPEECH_MESSAGE,
        RecognitionErrorCode::Other(_) => RECOGNITION_FAILED_MESSAGE,
    }
}

// =============================================================================
// Tests
// =============================================================================
