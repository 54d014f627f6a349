//! Shared types for the Confab widget engine.
//!
//! Domain types (messages, playback state), the error taxonomy, session
//! events, and configuration used by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::WidgetConfig;
pub use error::{Result, WidgetError};
pub use events::SessionEvent;
pub use types::*;
