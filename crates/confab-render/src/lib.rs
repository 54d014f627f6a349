//! Reply rendering for the Confab widget.
//!
//! Turns the responder's structured plain text into sanitized display
//! markup. Pure and deterministic; no dependency on the rest of the engine.

pub mod formatter;
pub mod sanitize;

pub use formatter::{escape_text, render_reply, ReplyFormatter};
pub use sanitize::sanitize_markup;
