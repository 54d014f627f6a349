//! Speech capability seams.
//!
//! The host runtime (browser shim, desktop speech stack) provides the real
//! recognizer and synthesizer. Each capability is an interface with a small
//! closed set of event variants delivered over a broadcast channel, so the
//! adapter and controller can be driven by scripted fakes in tests.

use tokio::sync::broadcast;

use confab_core::error::{Result, WidgetError};

/// Reason codes a recognizer reports on failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    /// Microphone permission was refused.
    PermissionDenied,
    /// The capture window closed without detecting speech.
    NoSpeech,
    /// Anything else, with the host's own code preserved for logs.
    Other(String),
}

/// Events a speech recognizer emits during a single-shot capture.
#[derive(Clone, Debug)]
pub enum RecognitionEvent {
    Started,
    Result { transcript: String, is_final: bool },
    Error(RecognitionErrorCode),
    Ended,
}

/// Events a speech synthesizer emits for the active utterance.
#[derive(Clone, Debug)]
pub enum SynthesisEvent {
    /// Playback reached a word boundary at `char_offset` into the utterance
    /// text. Offsets are word-grained, not char-timed.
    Boundary { char_offset: usize },
    /// The utterance finished naturally. Not emitted on cancellation.
    End,
}

/// One utterance handed to the synthesizer.
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// BCP-47 language tag.
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
}

/// Single-shot speech capture: start, wait for events, stop.
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;
    /// Begin one capture. Continuous mode and interim results are not used.
    fn start(&self) -> Result<()>;
    /// Stop capturing. Safe to call when idle.
    fn stop(&self);
    fn subscribe(&self) -> broadcast::Receiver<RecognitionEvent>;
}

/// Single-channel speech synthesis with immediate cancellation.
pub trait SpeechSynthesizer: Send + Sync {
    fn is_available(&self) -> bool;
    /// Start speaking `utterance`, replacing anything queued.
    fn speak(&self, utterance: Utterance) -> Result<()>;
    /// Cancel the current utterance immediately. No `End` event follows.
    fn cancel(&self);
    fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent>;
}

/// Recognizer for hosts without speech input.
pub struct UnsupportedRecognizer {
    events: broadcast::Sender<RecognitionEvent>,
}

impl Default for UnsupportedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl UnsupportedRecognizer {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(8);
        Self { events }
    }
}

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&self) -> Result<()> {
        Err(WidgetError::CapabilityUnavailable(
            "speech input".to_string(),
        ))
    }

    fn stop(&self) {}

    fn subscribe(&self) -> broadcast::Receiver<RecognitionEvent> {
        self.events.subscribe()
    }
}

/// Synthesizer for hosts without speech output.
pub struct UnsupportedSynthesizer {
    events: broadcast::Sender<SynthesisEvent>,
}

impl Default for UnsupportedSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl UnsupportedSynthesizer {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(8);
        Self { events }
    }
}

impl SpeechSynthesizer for UnsupportedSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _utterance: Utterance) -> Result<()> {
        Err(WidgetError::CapabilityUnavailable(
            "speech output".to_string(),
        ))
    }

    fn cancel(&self) {}

    fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent> {
        self.events.subscribe()
    }
}
