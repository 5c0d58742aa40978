//! The capture component: the content script that runs inside a page.
//!
//! One instance is created per injection. It answers every message
//! synchronously and never lets a failure escape: a document that cannot be
//! serialized is logged here and reported to the controller as a response
//! with a null handle.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `mode` | Strict XML vs. plain markup decision |
//! | `markup` | Serialization, line-ending detection, doctype line |
//! | `mime` | Content type → blob MIME type |

// ============================================================================
// Submodules
// ============================================================================

mod markup;
mod mime;
mod mode;

// ============================================================================
// Re-exports
// ============================================================================

pub use markup::{LineEnding, serialize};
pub use mime::{DEFAULT_MIME_TYPE, resolve_mime_type};
pub use mode::SerializationMode;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::Result;
use crate::page::{Blob, Page};
use crate::protocol::{CaptureRequest, CaptureResponse, not_understood};

// ============================================================================
// CaptureComponent
// ============================================================================

/// Serializes the document of one page on request.
#[derive(Debug, Clone)]
pub struct CaptureComponent {
    page: Arc<Page>,
}

impl CaptureComponent {
    /// Creates the component for `page`.
    #[inline]
    #[must_use]
    pub fn new(page: Arc<Page>) -> Self {
        Self { page }
    }

    /// Returns the page this component is bound to.
    #[inline]
    #[must_use]
    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// Answers a raw message.
    ///
    /// Capture requests get a [`CaptureResponse`]; anything else is echoed
    /// back with `problem: "not understood"` and nothing is serialized.
    #[must_use]
    pub fn handle_message(&self, message: &Value) -> Value {
        match CaptureRequest::from_message(message) {
            Some(request) => {
                let response = self.capture(&request);
                json!({
                    "documentAsObjectURL": response.document_as_object_url,
                    "contentType": response.content_type,
                })
            }
            None => {
                debug!(url = %self.page.url(), "Message not understood");
                not_understood(message)
            }
        }
    }

    /// Serializes the document and hands it off as an object URL.
    ///
    /// Failures are logged and turned into [`CaptureResponse::failure`].
    #[must_use]
    pub fn capture(&self, request: &CaptureRequest) -> CaptureResponse {
        match self.try_capture(request) {
            Ok(response) => response,
            Err(e) => {
                error!(url = %self.page.url(), error = %e, "Failed to serialize document");
                CaptureResponse::failure()
            }
        }
    }

    fn try_capture(&self, request: &CaptureRequest) -> Result<CaptureResponse> {
        let document = self.page.document();

        let mode = SerializationMode::select(document, request.respect_html_is_not_xml);
        let text = serialize(document, mode)?;
        let mime_type = resolve_mime_type(document.content_type());

        debug!(
            url = %self.page.url(),
            %mode,
            bytes = text.len(),
            mime_type = %mime_type,
            "Document serialized"
        );

        let url = self
            .page
            .create_object_url(Blob::from_text(text, mime_type.clone()));
        Ok(CaptureResponse::success(url, mime_type))
    }
}

// ============================================================================
// Tests
// ============================================================================
