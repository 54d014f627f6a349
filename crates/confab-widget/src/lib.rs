//! Session/message lifecycle engine for the Confab widget.
//!
//! The [`RequestCoordinator`] runs the send path (validation, placeholder,
//! typing animation, timeout, classification) and the [`AssistantWidget`]
//! facade assembles the whole engine for a rendering-layer host.

pub mod coordinator;
pub mod widget;

pub use coordinator::{
    over_length_notice, RequestCoordinator, SendHandle, SendOutcome, EMPTY_INPUT_NOTICE,
    FAILURE_MESSAGE, RATE_LIMIT_MESSAGE, TIMEOUT_MESSAGE,
};
pub use widget::AssistantWidget;
