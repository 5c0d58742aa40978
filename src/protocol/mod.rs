//! Message protocol between controller and content script.
//!
//! One request, one reply, no correlation IDs: the reply travels back on
//! the channel the request came in on.
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`CaptureRequest`] | Controller → Content script | Serialize the document |
//! | [`CaptureResponse`] | Content script → Controller | Object URL and MIME type, or nulls |
//! | [`not_understood`] | Content script → Controller | Echo of an unknown request |
//!
//! Messages travel as [`serde_json::Value`] so that unknown requests can be
//! echoed back verbatim.

// ============================================================================
// Submodules
// ============================================================================

/// Request and response message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    CaptureRequest, CaptureResponse, NOT_UNDERSTOOD, SERIALIZE_DOM, not_understood,
};
