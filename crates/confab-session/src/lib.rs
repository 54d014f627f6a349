//! Session history store for the Confab widget.
//!
//! Owns the ordered message list, the panel flags, and the pending-request
//! and active-playback bookkeeping, and broadcasts change events to the
//! rendering layer.

pub mod store;

pub use store::{SessionStore, MAX_MESSAGE_CHARS};
