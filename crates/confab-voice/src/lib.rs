//! Voice input and output for the Confab widget.
//!
//! Host speech capabilities sit behind the [`capability`] traits; the
//! [`SpeechInputAdapter`] turns single-shot recognition into transcripts for
//! the send path, and the [`SpeechOutputController`] mediates the one
//! synthesis channel with pause/resume bookkeeping.

pub mod capability;
pub mod input;
pub mod output;
pub mod state;

pub use capability::{
    RecognitionErrorCode, RecognitionEvent, SpeechRecognizer, SpeechSynthesizer, SynthesisEvent,
    UnsupportedRecognizer, UnsupportedSynthesizer, Utterance,
};
pub use input::{SpeechInputAdapter, LISTENING_NOTICE};
pub use output::SpeechOutputController;
pub use state::{ListenState, ListenStateMachine};
