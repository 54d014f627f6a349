//! Outbound transport for the Confab widget.
//!
//! Defines the [`Responder`] seam to the remote conversational service and
//! the HTTP implementation with its failure classification.

pub mod responder;

pub use responder::{HttpResponder, Responder, ResponderError};
