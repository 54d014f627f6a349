use serde::{Deserialize, Serialize};

use crate::types::{MessageId, PlaybackState};

/// Session changes broadcast to the rendering layer.
///
/// The store emits one event per observable mutation; a subscriber can
/// re-read the message list on any event, or use the payload to patch its
/// own view incrementally.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    /// A message was appended to the history.
    MessageAppended { id: MessageId },

    /// A message's text or status changed in place.
    MessageUpdated { id: MessageId },

    /// A transient message (typing indicator, listening notice) was removed.
    MessageRemoved { id: MessageId },

    /// The panel was opened or closed.
    VisibilityChanged { visible: bool },

    /// The panel toggled between compact and expanded layout.
    ExpandedChanged { expanded: bool },

    /// A message's speech playback state changed.
    PlaybackChanged {
        id: MessageId,
        state: PlaybackState,
    },

    /// The host should move keyboard focus to the input field. Emitted on
    /// open; the focus transfer itself belongs to the rendering layer.
    InputFocusRequested,
}

impl SessionEvent {
    /// Returns a stable event name for logging and host dispatch.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::MessageAppended { .. } => "message_appended",
            SessionEvent::MessageUpdated { .. } => "message_updated",
            SessionEvent::MessageRemoved { .. } => "message_removed",
            SessionEvent::VisibilityChanged { .. } => "visibility_changed",
            SessionEvent::ExpandedChanged { .. } => "expanded_changed",
            SessionEvent::PlaybackChanged { .. } => "playback_changed",
            SessionEvent::InputFocusRequested => "input_focus_requested",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        let event = SessionEvent::MessageAppended {
            id: MessageId::new(),
        };
        assert_eq!(event.event_name(), "message_appended");
    }

    #[test]
    fn test_event_name_all_variants() {
        let id = MessageId::new();
        let events: Vec<(SessionEvent, &str)> = vec![
            (SessionEvent::MessageAppended { id }, "message_appended"),
            (SessionEvent::MessageUpdated { id }, "message_updated"),
            (SessionEvent::MessageRemoved { id }, "message_removed"),
            (
                SessionEvent::VisibilityChanged { visible: true },
                "visibility_changed",
            ),
            (
                SessionEvent::ExpandedChanged { expanded: false },
                "expanded_changed",
            ),
            (
                SessionEvent::PlaybackChanged {
                    id,
                    state: PlaybackState::Playing,
                },
                "playback_changed",
            ),
            (SessionEvent::InputFocusRequested, "input_focus_requested"),
        ];

        for (event, expected) in events {
            assert_eq!(event.event_name(), expected);
        }
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let id = MessageId::new();
        let event = SessionEvent::PlaybackChanged {
            id,
            state: PlaybackState::Paused,
        };
        let json = serde_json::to_string(&event).unwrap();
        let rt: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(rt.event_name(), "playback_changed");
        if let SessionEvent::PlaybackChanged { id: rt_id, state } = rt {
            assert_eq!(rt_id, id);
            assert_eq!(state, PlaybackState::Paused);
        } else {
            panic!("Expected PlaybackChanged variant");
        }
    }

    #[test]
    fn test_event_clone() {
        let event = SessionEvent::VisibilityChanged { visible: true };
        let cloned = event.clone();
        assert_eq!(event.event_name(), cloned.event_name());
    }
}
