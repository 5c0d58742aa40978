//! Error types for Download Serialized DOM.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use download_serialized_dom::{Error, Result};
//!
//! async fn example(controller: &Controller, tab: &TabInfo) -> Result<()> {
//!     let outcome = controller.initiate_capture(tab).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidPattern`] |
//! | Capture | [`Error::Serialization`], [`Error::CaptureFailed`] |
//! | Protocol | [`Error::NotUnderstood`], [`Error::Protocol`] |
//! | Messaging | [`Error::Injection`], [`Error::TabNotFound`], [`Error::NotInjected`], [`Error::Timeout`], [`Error::ChannelClosed`] |
//! | Download | [`Error::ObjectUrlNotFound`], [`Error::Download`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::TabId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a stored option has an unusable value.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// URL match pattern does not compile.
    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    // ========================================================================
    // Capture Errors
    // ========================================================================
    /// Document could not be serialized inside the page.
    ///
    /// Never crosses the message boundary; the capture component logs it
    /// and answers with a null handle.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Description of the serializer failure.
        message: String,
    },

    /// Capture component answered without a document handle.
    #[error("Capture failed in tab {tab_id}")]
    CaptureFailed {
        /// Tab the capture was requested from.
        tab_id: TabId,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Capture component did not recognize the request.
    #[error("Request not understood: {request}")]
    NotUnderstood {
        /// The echoed request, as JSON text.
        request: String,
    },

    /// Reply does not have the expected shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Messaging Errors
    // ========================================================================
    /// Content script could not be injected.
    #[error("Injection into tab {tab_id} failed: {message}")]
    Injection {
        /// Target tab.
        tab_id: TabId,
        /// Reason reported by the host.
        message: String,
    },

    /// Tab does not exist.
    #[error("Tab not found: {tab_id}")]
    TabNotFound {
        /// The missing tab ID.
        tab_id: TabId,
    },

    /// No content script listens in the tab.
    #[error("No content script in tab {tab_id}")]
    NotInjected {
        /// Tab without a listener.
        tab_id: TabId,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Reply channel dropped before an answer arrived.
    ///
    /// Happens when the page navigates away mid-capture.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),

    // ========================================================================
    // Download Errors
    // ========================================================================
    /// Object URL was revoked or never minted.
    #[error("Object URL not found: {url}")]
    ObjectUrlNotFound {
        /// The unresolvable URL.
        url: String,
    },

    /// Download facility failed.
    #[error("Download error: {message}")]
    Download {
        /// Description of the download failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[inline]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a capture failed error.
    #[inline]
    pub fn capture_failed(tab_id: TabId) -> Self {
        Self::CaptureFailed { tab_id }
    }

    /// Creates a not understood error.
    #[inline]
    pub fn not_understood(request: impl Into<String>) -> Self {
        Self::NotUnderstood {
            request: request.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an injection error.
    #[inline]
    pub fn injection(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::Injection {
            tab_id,
            message: message.into(),
        }
    }

    /// Creates a tab not found error.
    #[inline]
    pub fn tab_not_found(tab_id: TabId) -> Self {
        Self::TabNotFound { tab_id }
    }

    /// Creates a not injected error.
    #[inline]
    pub fn not_injected(tab_id: TabId) -> Self {
        Self::NotInjected { tab_id }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates an object URL not found error.
    #[inline]
    pub fn object_url_not_found(url: impl Into<String>) -> Self {
        Self::ObjectUrlNotFound { url: url.into() }
    }

    /// Creates a download error.
    #[inline]
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the page failed to produce a document.
    #[inline]
    #[must_use]
    pub fn is_capture_failure(&self) -> bool {
        matches!(
            self,
            Self::Serialization { .. } | Self::CaptureFailed { .. }
        )
    }

    /// Returns `true` if the round trip to the content script broke down.
    #[inline]
    #[must_use]
    pub fn is_messaging_error(&self) -> bool {
        matches!(
            self,
            Self::Injection { .. }
                | Self::TabNotFound { .. }
                | Self::NotInjected { .. }
                | Self::Timeout { .. }
                | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed when the user triggers the action again.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::ChannelClosed(_) | Self::NotInjected { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    fn tab() -> TabId {
        TabId::new(7).expect("valid tab id")
    }

    #[test]
    fn test_error_display() {
        let err = Error::injection(tab(), "restricted scheme");
        assert_eq!(
            err.to_string(),
            "Injection into tab 7 failed: restricted scheme"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("bad conflict action");
        assert_eq!(err.to_string(), "Configuration error: bad conflict action");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timeout("capture reply", 5000);
        let other_err = Error::protocol("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_capture_failure() {
        assert!(Error::serialization("bad name").is_capture_failure());
        assert!(Error::capture_failed(tab()).is_capture_failure());
        assert!(!Error::not_injected(tab()).is_capture_failure());
    }

    #[test]
    fn test_is_messaging_error() {
        assert!(Error::injection(tab(), "x").is_messaging_error());
        assert!(Error::tab_not_found(tab()).is_messaging_error());
        assert!(Error::timeout("x", 1).is_messaging_error());
        assert!(!Error::download("x").is_messaging_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::timeout("x", 1000).is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_from_regex_error() {
        let regex_err = regex::Regex::new("(").unwrap_err();
        let err: Error = regex_err.into();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
