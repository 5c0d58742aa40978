//! Browser-side facilities the controller talks to.
//!
//! The controller never touches tabs, downloads or storage directly; it goes
//! through three traits so a real browser binding and the in-process
//! [`LocalBrowser`] are interchangeable:
//!
//! | Trait | Provided by | Description |
//! |-------|-------------|-------------|
//! | [`TabHost`] | [`LocalBrowser`] | Tabs, page action, script injection, messaging |
//! | [`Downloads`] | [`DirectoryDownloads`] | Saving object URLs to disk |
//! | [`OptionsStore`] | [`MemoryStore`] | Persisted options and change events |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use download_serialized_dom::browser::{LocalBrowser, TabHost};
//! use download_serialized_dom::dom::{Document, Element};
//!
//! # async fn example() -> download_serialized_dom::Result<()> {
//! let browser = Arc::new(LocalBrowser::new());
//! let tab = browser.open_tab(
//!     "https://example.com/report.svg",
//!     Document::xml(Element::svg("svg")),
//! );
//!
//! for info in browser.query_tabs().await? {
//!     println!("{} {}", info.id, info.url);
//! }
//! # let _ = tab;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Download requests and the directory-backed facility.
pub mod downloads;

/// In-process tab host.
pub mod local;

/// In-memory option storage.
pub mod storage;

// ============================================================================
// Re-exports
// ============================================================================

pub use downloads::{ConflictAction, DirectoryDownloads, DownloadItem, DownloadOptions};
pub use local::LocalBrowser;
pub use storage::{MemoryStore, StorageChange};

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::identifiers::{DownloadId, TabId};

// ============================================================================
// TabInfo
// ============================================================================

/// A tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    /// Tab ID.
    pub id: TabId,
    /// Current URL.
    pub url: String,
}

impl TabInfo {
    /// Creates tab info.
    #[inline]
    #[must_use]
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

// ============================================================================
// ContentScript
// ============================================================================

/// Scripts the controller can inject into a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentScript {
    /// The document capture component.
    Capture,
}

// ============================================================================
// TabHost
// ============================================================================

/// Tabs, the page action, and content-script messaging.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Lists all open tabs.
    ///
    /// # Errors
    ///
    /// Host-specific.
    async fn query_tabs(&self) -> Result<Vec<TabInfo>>;

    /// Shows the page action on `tab`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`](crate::Error::TabNotFound) if the tab is gone.
    async fn show_page_action(&self, tab: TabId) -> Result<()>;

    /// Hides the page action on `tab`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`](crate::Error::TabNotFound) if the tab is gone.
    async fn hide_page_action(&self, tab: TabId) -> Result<()>;

    /// Injects `script` into the top frame of `tab`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Injection`](crate::Error::Injection) if the page
    /// refuses scripts.
    async fn inject(&self, tab: TabId, script: ContentScript) -> Result<()>;

    /// Sends `message` to the content script in `tab` and waits for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInjected`](crate::Error::NotInjected) if no
    /// script is listening.
    async fn send_message(&self, tab: TabId, message: Value) -> Result<Value>;

    /// Subscribes to tab creation and URL changes.
    fn tab_updates(&self) -> broadcast::Receiver<TabInfo>;
}

// ============================================================================
// Downloads
// ============================================================================

/// The download facility.
#[async_trait]
pub trait Downloads: Send + Sync {
    /// Starts a download, consuming the object URL in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectUrlNotFound`](crate::Error::ObjectUrlNotFound)
    /// for a revoked URL, or [`Error::Download`](crate::Error::Download) /
    /// [`Error::Io`](crate::Error::Io) if saving fails.
    async fn download(&self, options: DownloadOptions) -> Result<DownloadId>;

    /// Looks up a download; empty if unknown.
    ///
    /// # Errors
    ///
    /// Host-specific.
    async fn search(&self, id: DownloadId) -> Result<Vec<DownloadItem>>;
}

// ============================================================================
// OptionsStore
// ============================================================================

/// Persisted options.
#[async_trait]
pub trait OptionsStore: Send + Sync {
    /// Returns the stored value for every key in `defaults`, or its default.
    ///
    /// # Errors
    ///
    /// Host-specific.
    async fn get(&self, defaults: Map<String, Value>) -> Result<Map<String, Value>>;

    /// Subscribes to change batches.
    fn subscribe(&self) -> broadcast::Receiver<Vec<StorageChange>>;
}
