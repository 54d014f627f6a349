//! Speech output controller.
//!
//! Mediates the one synthesis channel the host provides. All playback goes
//! through this controller, so the single-active invariant has exactly one
//! enforcement point: starting any utterance pauses whichever message held
//! the channel, and a paused message keeps its boundary offset so it stays
//! resumable.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use confab_core::config::VoiceOutputConfig;
use confab_core::error::{Result, WidgetError};
use confab_core::types::{MessageId, PlaybackState};
use confab_session::SessionStore;

use crate::capability::{SpeechSynthesizer, SynthesisEvent, Utterance};

/// Drives the host synthesizer and mirrors its progress into the session.
#[derive(Clone)]
pub struct SpeechOutputController {
    store: SessionStore,
    synth: Arc<dyn SpeechSynthesizer>,
    voice: VoiceOutputConfig,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SpeechOutputController {
    pub fn new(
        store: SessionStore,
        synth: Arc<dyn SpeechSynthesizer>,
        voice: VoiceOutputConfig,
    ) -> Self {
        Self {
            store,
            synth,
            voice,
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Speak an assistant reply from the beginning.
    ///
    /// If another message is playing it is stopped first and left Paused,
    /// not Idle, so an interrupted message remains resumable.
    pub fn speak(&self, id: MessageId, full_text: &str) -> Result<()> {
        if !self.synth.is_available() {
            return Err(WidgetError::CapabilityUnavailable(
                "speech output".to_string(),
            ));
        }

        if self.store.active_playback_id().is_some() {
            self.synth.cancel();
        }

        // Subscribe before speaking so no early boundary event is missed.
        let events = self.synth.subscribe();
        if !self.store.start_playback(id, full_text, 0) {
            return Err(WidgetError::Voice(
                "only assistant replies can be spoken".to_string(),
            ));
        }

        if let Err(e) = self.synth.speak(self.utterance(full_text)) {
            self.store.finish_playback(id);
            return Err(e);
        }

        tracing::debug!(message_id = ?id, chars = full_text.chars().count(), "playback started");
        self.spawn_listener(id, 0, events);
        Ok(())
    }

    /// Stop playback of `id`. The underlying capability has no true pause,
    /// so the utterance is cancelled and the recorded offset kept for
    /// `resume`. Returns `false` if `id` does not hold the channel.
    pub fn pause(&self, id: MessageId) -> bool {
        if self.store.active_playback_id() != Some(id) {
            return false;
        }
        self.synth.cancel();
        self.abort_listener();
        self.store.pause_playback(id)
    }

    /// Pause whichever message currently holds the channel, if any.
    pub fn pause_active(&self) -> Option<MessageId> {
        let id = self.store.active_playback_id()?;
        self.pause(id).then_some(id)
    }

    /// Continue a paused message from its recorded offset.
    ///
    /// No-op (`Ok(false)`) when the message has no playback record, is not
    /// paused, or has nothing left to say. Resumption restarts synthesis at
    /// a char offset taken from coarse word-boundary events, so it can land
    /// mid-word.
    pub fn resume(&self, id: MessageId) -> Result<bool> {
        let Some(playback) = self.store.playback(id) else {
            return Ok(false);
        };
        if playback.state != PlaybackState::Paused || playback.full_text.is_empty() {
            return Ok(false);
        }
        if !self.synth.is_available() {
            return Err(WidgetError::CapabilityUnavailable(
                "speech output".to_string(),
            ));
        }

        if let Some(active) = self.store.active_playback_id() {
            if active == id {
                return Ok(false);
            }
            self.pause(active);
        }

        let remainder: String = playback
            .full_text
            .chars()
            .skip(playback.resume_offset)
            .collect();
        if remainder.trim().is_empty() {
            // Paused on the final boundary; nothing left to play.
            self.store.finish_playback(id);
            return Ok(false);
        }

        let events = self.synth.subscribe();
        if !self
            .store
            .start_playback(id, &playback.full_text, playback.resume_offset)
        {
            return Ok(false);
        }

        if let Err(e) = self.synth.speak(self.utterance(&remainder)) {
            self.store.finish_playback(id);
            return Err(e);
        }

        tracing::debug!(message_id = ?id, offset = playback.resume_offset, "playback resumed");
        self.spawn_listener(id, playback.resume_offset, events);
        Ok(true)
    }

    // -- Private helpers --

    fn utterance(&self, text: &str) -> Utterance {
        Utterance {
            text: text.to_string(),
            language: self.voice.language.clone(),
            rate: self.voice.rate,
            pitch: self.voice.pitch,
        }
    }

    /// Mirror boundary/end events of the current utterance into the store.
    /// Boundary offsets are rebased by `base_offset` when resuming.
    fn spawn_listener(
        &self,
        id: MessageId,
        base_offset: usize,
        mut events: broadcast::Receiver<SynthesisEvent>,
    ) {
        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SynthesisEvent::Boundary { char_offset }) => {
                        store.record_playback_offset(id, base_offset + char_offset);
                    }
                    Ok(SynthesisEvent::End) => {
                        store.finish_playback(id);
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "synthesis listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut guard = self.listener.lock().expect("listener mutex poisoned");
        if let Some(old) = guard.replace(handle) {
            old.abort();
        }
    }

    fn abort_listener(&self) {
        if let Some(handle) = self
            .listener
            .lock()
            .expect("listener mutex poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::capability::UnsupportedSynthesizer;

    /// Synthesizer driven by the test: records utterances and cancellations,
    /// and lets the test push boundary/end events.
    struct ScriptedSynthesizer {
        events: broadcast::Sender<SynthesisEvent>,
        spoken: Mutex<Vec<Utterance>>,
        cancelled: AtomicUsize,
    }

    impl ScriptedSynthesizer {
        fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(64);
            Arc::new(Self {
                events,
                spoken: Mutex::new(Vec::new()),
                cancelled: AtomicUsize::new(0),
            })
        }

        fn spoken(&self) -> Vec<Utterance> {
            self.spoken.lock().unwrap().clone()
        }

        fn cancel_count(&self) -> usize {
            self.cancelled.load(Ordering::SeqCst)
        }

        fn boundary(&self, char_offset: usize) {
            let _ = self.events.send(SynthesisEvent::Boundary { char_offset });
        }

        fn end(&self) {
            let _ = self.events.send(SynthesisEvent::End);
        }
    }

    impl SpeechSynthesizer for ScriptedSynthesizer {
        fn is_available(&self) -> bool {
            true
        }

        fn speak(&self, utterance: Utterance) -> Result<()> {
            self.spoken.lock().unwrap().push(utterance);
            Ok(())
        }

        fn cancel(&self) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }

        fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent> {
            self.events.subscribe()
        }
    }

    fn setup() -> (SessionStore, Arc<ScriptedSynthesizer>, SpeechOutputController) {
        let store = SessionStore::new();
        let synth = ScriptedSynthesizer::new();
        let controller = SpeechOutputController::new(
            store.clone(),
            synth.clone() as Arc<dyn SpeechSynthesizer>,
            VoiceOutputConfig::default(),
        );
        (store, synth, controller)
    }

    fn loaded_assistant(store: &SessionStore, text: &str) -> MessageId {
        let id = store.append_pending().unwrap();
        store.resolve_pending(id, text);
        id
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // ---- speak ----

    #[tokio::test]
    async fn test_speak_starts_playback() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "hello there");

        controller.speak(id, "hello there").unwrap();

        let playback = store.playback(id).unwrap();
        assert_eq!(playback.state, PlaybackState::Playing);
        assert_eq!(playback.full_text, "hello there");
        assert_eq!(store.active_playback_id(), Some(id));

        let spoken = synth.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "hello there");
        assert_eq!(spoken[0].language, "en-US");
    }

    #[tokio::test]
    async fn test_boundary_events_record_offsets() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "one two three");

        controller.speak(id, "one two three").unwrap();
        synth.boundary(4);
        synth.boundary(8);
        settle().await;

        assert_eq!(store.playback(id).unwrap().resume_offset, 8);
    }

    #[tokio::test]
    async fn test_end_event_finishes_playback() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "short reply");

        controller.speak(id, "short reply").unwrap();
        synth.boundary(6);
        synth.end();
        settle().await;

        let playback = store.playback(id).unwrap();
        assert_eq!(playback.state, PlaybackState::Idle);
        assert_eq!(playback.resume_offset, 0);
        assert_eq!(store.active_playback_id(), None);
    }

    #[tokio::test]
    async fn test_speak_non_assistant_refused() {
        let (store, synth, controller) = setup();
        let id = store.append_user("hello").unwrap();

        let result = controller.speak(id, "hello");
        assert!(matches!(result, Err(WidgetError::Voice(_))));
        assert!(synth.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_speak_unavailable_synth() {
        let store = SessionStore::new();
        let controller = SpeechOutputController::new(
            store.clone(),
            Arc::new(UnsupportedSynthesizer::new()),
            VoiceOutputConfig::default(),
        );
        let id = loaded_assistant(&store, "reply");

        let result = controller.speak(id, "reply");
        assert!(matches!(
            result,
            Err(WidgetError::CapabilityUnavailable(_))
        ));
        assert!(store.playback(id).is_none());
    }

    #[tokio::test]
    async fn test_second_speak_pauses_first() {
        let (store, synth, controller) = setup();
        let first = loaded_assistant(&store, "first reply");
        let second = loaded_assistant(&store, "second reply");

        controller.speak(first, "first reply").unwrap();
        synth.boundary(6);
        settle().await;

        controller.speak(second, "second reply").unwrap();

        let first_playback = store.playback(first).unwrap();
        assert_eq!(first_playback.state, PlaybackState::Paused);
        assert_eq!(first_playback.resume_offset, 6);
        assert_eq!(synth.cancel_count(), 1);
        assert_eq!(store.active_playback_id(), Some(second));
    }

    // ---- pause ----

    #[tokio::test]
    async fn test_pause_retains_resume_state() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "a longer spoken reply");

        controller.speak(id, "a longer spoken reply").unwrap();
        synth.boundary(9);
        settle().await;

        assert!(controller.pause(id));
        assert_eq!(synth.cancel_count(), 1);

        let playback = store.playback(id).unwrap();
        assert_eq!(playback.state, PlaybackState::Paused);
        assert_eq!(playback.resume_offset, 9);
        assert_eq!(store.active_playback_id(), None);
    }

    #[tokio::test]
    async fn test_pause_wrong_id_is_noop() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "reply");
        let other = loaded_assistant(&store, "other");

        controller.speak(id, "reply").unwrap();
        assert!(!controller.pause(other));
        assert_eq!(synth.cancel_count(), 0);
        assert_eq!(store.playback(id).unwrap().state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_pause_active() {
        let (store, _synth, controller) = setup();
        let id = loaded_assistant(&store, "reply");

        assert_eq!(controller.pause_active(), None);
        controller.speak(id, "reply").unwrap();
        assert_eq!(controller.pause_active(), Some(id));
    }

    #[tokio::test]
    async fn test_boundary_after_pause_is_stale() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "some reply text");

        controller.speak(id, "some reply text").unwrap();
        synth.boundary(5);
        settle().await;
        controller.pause(id);

        // A boundary the host flushed after cancellation must not move the
        // paused offset.
        synth.boundary(12);
        settle().await;
        assert_eq!(store.playback(id).unwrap().resume_offset, 5);
    }

    // ---- resume ----

    #[tokio::test]
    async fn test_resume_speaks_remainder() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "hello world again");

        controller.speak(id, "hello world again").unwrap();
        synth.boundary(6);
        settle().await;
        controller.pause(id);

        assert!(controller.resume(id).unwrap());
        let spoken = synth.spoken();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[1].text, "world again");
        assert_eq!(store.playback(id).unwrap().state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_resume_rebases_boundary_offsets() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "hello world again");

        controller.speak(id, "hello world again").unwrap();
        synth.boundary(6);
        settle().await;
        controller.pause(id);
        controller.resume(id).unwrap();

        // Boundary offsets of the resumed utterance are relative to the
        // remainder; the store records them against the full text.
        synth.boundary(6);
        settle().await;
        assert_eq!(store.playback(id).unwrap().resume_offset, 12);
    }

    #[tokio::test]
    async fn test_resume_without_record_is_noop() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "never spoken");

        assert!(!controller.resume(id).unwrap());
        assert!(synth.spoken().is_empty());
        assert_eq!(store.message_count(), 1);
    }

    #[tokio::test]
    async fn test_resume_while_playing_is_noop() {
        let (store, synth, controller) = setup();
        let id = loaded_assistant(&store, "reply");

        controller.speak(id, "reply").unwrap();
        assert!(!controller.resume(id).unwrap());
        assert_eq!(synth.spoken().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_pauses_other_playing_message() {
        let (store, synth, controller) = setup();
        let first = loaded_assistant(&store, "first reply");
        let second = loaded_assistant(&store, "second reply");

        controller.speak(first, "first reply").unwrap();
        synth.boundary(6);
        settle().await;
        controller.pause(first);

        controller.speak(second, "second reply").unwrap();
        assert!(controller.resume(first).unwrap());

        assert_eq!(
            store.playback(second).unwrap().state,
            PlaybackState::Paused
        );
        assert_eq!(store.active_playback_id(), Some(first));
    }

    #[tokio::test]
    async fn test_resume_at_end_of_text_finishes() {
        let (store, synth, controller) = setup();
        let text = "done";
        let id = loaded_assistant(&store, text);

        controller.speak(id, text).unwrap();
        synth.boundary(4);
        settle().await;
        controller.pause(id);

        assert!(!controller.resume(id).unwrap());
        assert_eq!(store.playback(id).unwrap().state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_end_of_old_utterance_does_not_finish_successor() {
        let (store, synth, controller) = setup();
        let first = loaded_assistant(&store, "first");
        let second = loaded_assistant(&store, "second");

        controller.speak(first, "first").unwrap();
        controller.speak(second, "second").unwrap();
        synth.end();
        settle().await;

        // The end event belongs to the second utterance's listener; the
        // first message stays paused and resumable.
        assert_eq!(store.playback(first).unwrap().state, PlaybackState::Paused);
        assert_eq!(store.playback(second).unwrap().state, PlaybackState::Idle);
    }
}
