//! Capture request and response messages.
//!
//! # Format
//!
//! Request (controller → content script):
//! ```json
//! { "please": "nrvrDomSerialize", "respectHTMLIsNotXML": true }
//! ```
//!
//! Success:
//! ```json
//! { "documentAsObjectURL": "blob:https://example.com/…", "contentType": "text/html" }
//! ```
//!
//! Failure:
//! ```json
//! { "documentAsObjectURL": null, "contentType": null }
//! ```
//!
//! Not understood (the request echoed back):
//! ```json
//! { "please": "somethingElse", "problem": "not understood" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::page::ObjectUrl;

// ============================================================================
// Constants
// ============================================================================

/// Discriminator value of a capture request.
pub const SERIALIZE_DOM: &str = "nrvrDomSerialize";

/// Value of the `problem` field in a not-understood reply.
pub const NOT_UNDERSTOOD: &str = "not understood";

// ============================================================================
// CaptureRequest
// ============================================================================

/// Asks the content script to serialize its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Discriminator, always [`SERIALIZE_DOM`] for requests this crate sends.
    pub please: String,

    /// Allow raw-markup serialization for documents that are plainly HTML.
    #[serde(rename = "respectHTMLIsNotXML", default)]
    pub respect_html_is_not_xml: bool,
}

impl CaptureRequest {
    /// Creates a capture request.
    #[inline]
    #[must_use]
    pub fn serialize_dom(respect_html_is_not_xml: bool) -> Self {
        Self {
            please: SERIALIZE_DOM.to_string(),
            respect_html_is_not_xml,
        }
    }

    /// Parses an incoming message.
    ///
    /// Returns `None` for anything that is not a capture request; a capture
    /// request with a missing or non-boolean flag reads the flag as `false`.
    #[must_use]
    pub fn from_message(message: &Value) -> Option<Self> {
        let please = message.get("please")?.as_str()?;
        if please != SERIALIZE_DOM {
            return None;
        }

        let respect_html_is_not_xml = message
            .get("respectHTMLIsNotXML")
            .and_then(Value::as_bool)
            .unwrap_or_default();

        Some(Self::serialize_dom(respect_html_is_not_xml))
    }
}

// ============================================================================
// CaptureResponse
// ============================================================================

/// The content script's answer to a [`CaptureRequest`].
///
/// Either both fields are set or both are null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResponse {
    /// Object URL of the serialized document.
    #[serde(rename = "documentAsObjectURL")]
    pub document_as_object_url: Option<String>,

    /// MIME type the blob was tagged with.
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

impl CaptureResponse {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(url: ObjectUrl, content_type: impl Into<String>) -> Self {
        Self {
            document_as_object_url: Some(url.into_string()),
            content_type: Some(content_type.into()),
        }
    }

    /// Creates a failure response.
    #[inline]
    #[must_use]
    pub fn failure() -> Self {
        Self {
            document_as_object_url: None,
            content_type: None,
        }
    }

    /// Returns `true` if a document handle is present.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.document_as_object_url.is_some()
    }

    /// Interprets a raw reply from the content script.
    ///
    /// # Errors
    ///
    /// - [`Error::NotUnderstood`] if the reply carries a `problem` field
    /// - [`Error::Protocol`] if the reply has neither shape
    pub fn from_reply(reply: Value) -> Result<Self> {
        if reply.get("problem").is_some() {
            return Err(Error::not_understood(reply.to_string()));
        }

        if !reply.is_object() {
            return Err(Error::protocol(format!("unexpected reply: {reply}")));
        }

        serde_json::from_value(reply)
            .map_err(|e| Error::protocol(format!("malformed capture response: {e}")))
    }

    /// Takes ownership of the document handle, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the handle is not an object URL.
    pub fn into_object_url(self) -> Result<Option<ObjectUrl>> {
        self.document_as_object_url.map(ObjectUrl::parse).transpose()
    }
}

// ============================================================================
// Not Understood
// ============================================================================

/// Echoes `message` back with `problem: "not understood"` added.
///
/// A message that is not a JSON object is answered with the `problem` field
/// alone.
#[must_use]
pub fn not_understood(message: &Value) -> Value {
    let mut reply = match message {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };
    reply.insert("problem".to_string(), Value::String(NOT_UNDERSTOOD.to_string()));
    Value::Object(reply)
}

// ============================================================================
// Tests
// ============================================================================
