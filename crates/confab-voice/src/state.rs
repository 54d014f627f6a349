//! Voice capture state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for the listening lifecycle:
//! - Idle -> Listening (capture started)
//! - Listening -> Recognized (final transcript arrived)
//! - Listening -> TimedOut (silence timer fired first)
//! - Listening -> Errored (recognizer reported a failure)
//! - Recognized | TimedOut | Errored -> Idle (cleanup complete)

use std::fmt;
use std::sync::{Arc, Mutex};

use confab_core::error::WidgetError;

/// Operational state of voice capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenState {
    /// No capture in progress. Ready to start.
    Idle,
    /// Actively listening for speech with the silence timer armed.
    Listening,
    /// A final transcript was produced and is being handed off.
    Recognized,
    /// The silence timer fired before any transcript.
    TimedOut,
    /// The recognizer reported an error.
    Errored,
}

impl fmt::Display for ListenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenState::Idle => write!(f, "Idle"),
            ListenState::Listening => write!(f, "Listening"),
            ListenState::Recognized => write!(f, "Recognized"),
            ListenState::TimedOut => write!(f, "TimedOut"),
            ListenState::Errored => write!(f, "Errored"),
        }
    }
}

impl ListenState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ListenState) -> bool {
        matches!(
            (self, target),
            (ListenState::Idle, ListenState::Listening)
                | (ListenState::Listening, ListenState::Recognized)
                | (ListenState::Listening, ListenState::TimedOut)
                | (ListenState::Listening, ListenState::Errored)
                | (ListenState::Recognized, ListenState::Idle)
                | (ListenState::TimedOut, ListenState::Idle)
                | (ListenState::Errored, ListenState::Idle)
        )
    }
}

/// Thread-safe state machine for the listening lifecycle.
///
/// Clones share state, so the spawned listener task and the adapter observe
/// the same machine.
#[derive(Debug, Clone)]
pub struct ListenStateMachine {
    state: Arc<Mutex<ListenState>>,
}

impl Default for ListenStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenStateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ListenState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> ListenState {
        *self.state.lock().expect("listen state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: ListenState) -> Result<(), WidgetError> {
        let mut state = self.state.lock().expect("listen state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Listen state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(WidgetError::Voice(format!(
                "invalid listen transition: {} -> {}",
                *state, target
            )))
        }
    }

    /// Force the machine back to Idle (error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("listen state mutex poisoned");
        if *state != ListenState::Idle {
            tracing::debug!("Listen state reset to Idle from {}", *state);
            *state = ListenState::Idle;
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
    fn test_state_display() {
        assert_eq!(ListenState::Idle.to_string(), "Idle");
        assert_eq!(ListenState::Listening.to_string(), "Listening");
        assert_eq!(ListenState::Recognized.to_string(), "Recognized");
        assert_eq!(ListenState::TimedOut.to_string(), "TimedOut");
        assert_eq!(ListenState::Errored.to_string(), "Errored");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(ListenState::Idle.can_transition_to(&ListenState::Listening));
        assert!(ListenState::Listening.can_transition_to(&ListenState::Recognized));
        assert!(ListenState::Listening.can_transition_to(&ListenState::TimedOut));
        assert!(ListenState::Listening.can_transition_to(&ListenState::Errored));
        assert!(ListenState::Recognized.can_transition_to(&ListenState::Idle));
        assert!(ListenState::TimedOut.can_transition_to(&ListenState::Idle));
        assert!(ListenState::Errored.can_transition_to(&ListenState::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot skip Listening.
        assert!(!ListenState::Idle.can_transition_to(&ListenState::Recognized));
        assert!(!ListenState::Idle.can_transition_to(&ListenState::TimedOut));
        assert!(!ListenState::Idle.can_transition_to(&ListenState::Errored));

        // Terminal states do not cross into each other.
        assert!(!ListenState::Recognized.can_transition_to(&ListenState::TimedOut));
        assert!(!ListenState::TimedOut.can_transition_to(&ListenState::Errored));

        // No self-transitions.
        assert!(!ListenState::Idle.can_transition_to(&ListenState::Idle));
        assert!(!ListenState::Listening.can_transition_to(&ListenState::Listening));
    }

    #[test]
    fn test_machine_happy_path() {
        let machine = ListenStateMachine::new();
        assert_eq!(machine.current(), ListenState::Idle);

        machine.transition(ListenState::Listening).unwrap();
        machine.transition(ListenState::Recognized).unwrap();
        machine.transition(ListenState::Idle).unwrap();
        assert_eq!(machine.current(), ListenState::Idle);
    }

    #[test]
    fn test_machine_timeout_path() {
        let machine = ListenStateMachine::new();
        machine.transition(ListenState::Listening).unwrap();
        machine.transition(ListenState::TimedOut).unwrap();
        machine.transition(ListenState::Idle).unwrap();
        assert_eq!(machine.current(), ListenState::Idle);
    }

    #[test]
    fn test_machine_rejects_double_start() {
        let machine = ListenStateMachine::new();
        machine.transition(ListenState::Listening).unwrap();
        let result = machine.transition(ListenState::Listening);
        assert!(matches!(result, Err(WidgetError::Voice(_))));
        assert_eq!(machine.current(), ListenState::Listening);
    }

    #[test]
    fn test_machine_reset() {
        let machine = ListenStateMachine::new();
        machine.transition(ListenState::Listening).unwrap();
        machine.reset();
        assert_eq!(machine.current(), ListenState::Idle);
    }

    #[test]
    fn test_machine_clone_is_shared() {
        let a = ListenStateMachine::new();
        let b = a.clone();
        a.transition(ListenState::Listening).unwrap();
        assert_eq!(b.current(), ListenState::Listening);
    }
}
