//! Download Serialized DOM - save the live DOM of a tab as a file.
//!
//! Captures the fully rendered document of a page, serializes it back to
//! markup and hands the result to a download facility without copying it
//! through the messaging channel.
//!
//! # Architecture
//!
//! Two components talk over a one-shot request/reply channel:
//!
//! - **Controller** (privileged, long-lived): owns the options, decides
//!   whether a URL is eligible, injects the capture component, starts the
//!   download
//! - **Capture component** (in-page, one per injection): picks strict XML or
//!   plain markup serialization, detects line endings, mints an object URL
//!
//! Key design principles:
//!
//! - Options are immutable snapshots swapped atomically on change
//! - The document travels as a move-only [`ObjectUrl`], consumed exactly once
//! - Page teardown revokes every object URL the page minted
//! - Failures are absorbed at the nearest boundary and logged with `tracing`
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use download_serialized_dom::{
//!     Controller, DirectoryDownloads, Doctype, Document, Element, LocalBrowser, MemoryStore,
//!     Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let browser = Arc::new(LocalBrowser::new());
//!     let downloads = Arc::new(DirectoryDownloads::new("./saved", browser.blobs().clone()));
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let controller = Controller::new(browser.clone(), downloads);
//!     controller.load_options(store.as_ref()).await?;
//!
//!     let page = Document::html(Element::html("html").with_child(Element::html("body")))
//!         .with_doctype(Doctype::html());
//!     let tab = browser.open_tab("https://example.com/index.html", page);
//!
//!     if let Some(info) = browser.tab(tab) {
//!         let outcome = controller.initiate_capture(&info).await?;
//!         println!("{outcome:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Tab host, download facility and option store |
//! | [`capture`] | The capture component |
//! | [`controller`] | Options, page action and capture orchestration |
//! | [`dom`] | Document model and serializers |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`page`] | Page context, blobs and object URLs |
//! | [`protocol`] | Request and reply messages |
//! | [`transport`] | Content-script ports |

// ============================================================================
// Modules
// ============================================================================

/// Browser-side facilities: tabs, downloads, option storage.
///
/// The controller reaches them through the [`TabHost`], [`Downloads`] and
/// [`OptionsStore`] traits.
pub mod browser;

/// The in-page capture component.
pub mod capture;

/// The privileged controller.
///
/// Use [`Controller::new`] with a tab host and a download facility.
pub mod controller;

/// Document model and its HTML/XML serializers.
pub mod dom;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Page execution context and object URLs.
pub mod page;

/// Message types exchanged with the content script.
pub mod protocol;

/// Content-script ports.
///
/// Internal module driving the listener task behind each injection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    ConflictAction, ContentScript, DirectoryDownloads, DownloadItem, DownloadOptions, Downloads,
    LocalBrowser, MemoryStore, OptionsStore, StorageChange, TabHost, TabInfo,
};

// Capture types
pub use capture::{CaptureComponent, LineEnding, SerializationMode};

// Controller types
pub use controller::{CaptureOutcome, Controller, Listeners, Options, Settings, UrlPattern};

// Document types
pub use dom::{Doctype, Document, DocumentKind, DocumentSnapshot, Element, Node};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CaptureId, DownloadId, TabId};

// Page types
pub use page::{Blob, BlobStore, ObjectUrl, Page};

// Protocol types
pub use protocol::{CaptureRequest, CaptureResponse};
