use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identity
// =============================================================================

/// Unique identifier for a message in the session history.
///
/// Ids stay stable while a message's text mutates in place (loading
/// animation, playback offset updates), so late-arriving callbacks can be
/// correlated against the message they belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
    /// Inline notices (capability hints, validation errors, listening
    /// indicator). Rendered in the same history stream as replies.
    System,
}

/// Loading state of an assistant reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Placeholder awaiting the responder; text carries the typing animation.
    Pending,
    /// Reply arrived and replaced the placeholder text.
    Loaded,
    /// Request settled with a timeout or transport failure.
    Failed,
}

/// Speech playback state of a spoken assistant reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// How a user message entered the widget. Voice-originated sends auto-play
/// the reply; typed sends never do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOrigin {
    Typed,
    Voice,
}

// =============================================================================
// Message
// =============================================================================

/// Speech playback bookkeeping attached to an assistant reply once it has
/// been spoken (or selected for speech).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    pub state: PlaybackState,
    /// The full reply text captured when playback first started.
    pub full_text: String,
    /// Char offset of the last reported boundary event. Resumption restarts
    /// synthesis from here, which can land mid-word; boundary events are
    /// word-grained, not char-timed.
    pub resume_offset: usize,
}

/// Sender-specific payload. User and System messages carry no loading or
/// playback state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    User,
    Assistant {
        status: MessageStatus,
        playback: Option<Playback>,
    },
    System,
}

/// A single entry in the session history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Current display text. Mutable while Pending and while playback offset
    /// updates are applied; otherwise fixed after creation.
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub body: MessageBody,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            created_at: Utc::now(),
            body: MessageBody::User,
        }
    }

    /// An empty assistant placeholder awaiting the responder.
    pub fn assistant_pending() -> Self {
        Self {
            id: MessageId::new(),
            text: String::new(),
            created_at: Utc::now(),
            body: MessageBody::Assistant {
                status: MessageStatus::Pending,
                playback: None,
            },
        }
    }

    /// A loaded assistant reply (used for the greeting, which never goes
    /// through the request path).
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            created_at: Utc::now(),
            body: MessageBody::Assistant {
                status: MessageStatus::Loaded,
                playback: None,
            },
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            created_at: Utc::now(),
            body: MessageBody::System,
        }
    }

    pub fn sender(&self) -> Sender {
        match self.body {
            MessageBody::User => Sender::User,
            MessageBody::Assistant { .. } => Sender::Assistant,
            MessageBody::System => Sender::System,
        }
    }

    /// Loading status, for assistant messages only.
    pub fn status(&self) -> Option<MessageStatus> {
        match self.body {
            MessageBody::Assistant { status, .. } => Some(status),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == Some(MessageStatus::Pending)
    }

    pub fn playback(&self) -> Option<&Playback> {
        match &self.body {
            MessageBody::Assistant { playback, .. } => playback.as_ref(),
            _ => None,
        }
    }

    pub fn playback_mut(&mut self) -> Option<&mut Playback> {
        match &mut self.body {
            MessageBody::Assistant { playback, .. } => playback.as_mut(),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_unique() {
        let a = MessageId::new();
        let b = MessageId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_user_message_has_no_status_or_playback() {
        let msg = Message::user("hello");
        assert_eq!(msg.sender(), Sender::User);
        assert_eq!(msg.status(), None);
        assert!(msg.playback().is_none());
        assert!(!msg.is_pending());
    }

    #[test]
    fn test_system_message_has_no_status() {
        let msg = Message::system("voice input is not supported");
        assert_eq!(msg.sender(), Sender::System);
        assert_eq!(msg.status(), None);
    }

    #[test]
    fn test_assistant_pending() {
        let msg = Message::assistant_pending();
        assert_eq!(msg.sender(), Sender::Assistant);
        assert_eq!(msg.status(), Some(MessageStatus::Pending));
        assert!(msg.is_pending());
        assert!(msg.text.is_empty());
        assert!(msg.playback().is_none());
    }

    #[test]
    fn test_assistant_loaded() {
        let msg = Message::assistant("Good morning!");
        assert_eq!(msg.status(), Some(MessageStatus::Loaded));
        assert!(!msg.is_pending());
        assert_eq!(msg.text, "Good morning!");
    }

    #[test]
    fn test_playback_mut_on_assistant() {
        let mut msg = Message::assistant("spoken reply");
        if let MessageBody::Assistant { playback, .. } = &mut msg.body {
            *playback = Some(Playback {
                state: PlaybackState::Playing,
                full_text: "spoken reply".to_string(),
                resume_offset: 0,
            });
        }
        msg.playback_mut().unwrap().resume_offset = 7;
        assert_eq!(msg.playback().unwrap().resume_offset, 7);
    }

    #[test]
    fn test_playback_mut_on_user_is_none() {
        let mut msg = Message::user("hi");
        assert!(msg.playback_mut().is_none());
    }

    #[test]
    fn test_sender_serialization() {
        let json = serde_json::to_string(&Sender::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let rt: Sender = serde_json::from_str(&json).unwrap();
        assert_eq!(rt, Sender::Assistant);
    }

    #[test]
    fn test_enum_serialization_round_trip() {
        for status in [
            MessageStatus::Pending,
            MessageStatus::Loaded,
            MessageStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let rt: MessageStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(status, rt);
        }

        for state in [
            PlaybackState::Idle,
            PlaybackState::Playing,
            PlaybackState::Paused,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            let rt: PlaybackState = serde_json::from_str(&json).unwrap();
            assert_eq!(state, rt);
        }

        for origin in [InputOrigin::Typed, InputOrigin::Voice] {
            let json = serde_json::to_string(&origin).unwrap();
            let rt: InputOrigin = serde_json::from_str(&json).unwrap();
            assert_eq!(origin, rt);
        }
    }

    #[test]
    fn test_message_json_round_trip() {
        let mut msg = Message::assistant("reply text");
        if let MessageBody::Assistant { playback, .. } = &mut msg.body {
            *playback = Some(Playback {
                state: PlaybackState::Paused,
                full_text: "reply text".to_string(),
                resume_offset: 6,
            });
        }

        let json = serde_json::to_string(&msg).unwrap();
        let rt: Message = serde_json::from_str(&json).unwrap();

        assert_eq!(msg.id, rt.id);
        assert_eq!(msg.text, rt.text);
        assert_eq!(rt.playback().unwrap().state, PlaybackState::Paused);
        assert_eq!(rt.playback().unwrap().resume_offset, 6);
    }

    #[test]
    fn test_message_id_serialization_round_trip() {
        let id = MessageId::new();
        let json = serde_json::to_string(&id).unwrap();
        let rt: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, rt);
    }
}
