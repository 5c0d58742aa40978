//! The privileged controller.
//!
//! Owns the options, keeps the page action in sync with the URL pattern and
//! runs a capture when the user clicks it.
//!
//! # Capture Flow
//!
//! 1. URL does not match the pattern → [`CaptureOutcome::Skipped`]
//! 2. Derive the download filename
//! 3. Inject the capture component
//! 4. Send the capture request, await the single reply
//! 5. Move the returned object URL into the download facility
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use download_serialized_dom::browser::{DirectoryDownloads, LocalBrowser, MemoryStore};
//! use download_serialized_dom::controller::Controller;
//! use download_serialized_dom::dom::{Document, Element};
//!
//! # async fn example() -> download_serialized_dom::Result<()> {
//! let browser = Arc::new(LocalBrowser::new());
//! let downloads = Arc::new(DirectoryDownloads::new("/tmp/saved", browser.blobs().clone()));
//! let store = Arc::new(MemoryStore::new());
//!
//! let controller = Controller::new(browser.clone(), downloads);
//! controller.load_options(store.as_ref()).await?;
//! let _listeners = controller.spawn_listeners(store);
//!
//! let tab = browser.open_tab("https://example.com/report.svg", Document::xml(Element::svg("svg")));
//! if let Some(info) = browser.tab(tab) {
//!     controller.on_clicked(&info).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `filename` | Download filename derivation |
//! | `options` | Option snapshot and store keys |
//! | `settings` | Atomically swapped snapshot holder |

// ============================================================================
// Submodules
// ============================================================================

/// Download filename derivation.
pub mod filename;

/// Option snapshot and store keys.
pub mod options;

/// Shared option snapshot holder.
pub mod settings;

// ============================================================================
// Re-exports
// ============================================================================

pub use filename::derive_filename;
pub use options::{Options, UrlPattern};
pub use settings::Settings;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::browser::{
    ContentScript, DownloadOptions, Downloads, OptionsStore, StorageChange, TabHost, TabInfo,
};
use crate::error::{Error, Result};
use crate::identifiers::{CaptureId, DownloadId};
use crate::protocol::{CaptureRequest, CaptureResponse};

// ============================================================================
// CaptureOutcome
// ============================================================================

/// Result of a capture invocation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The URL does not match the pattern; nothing was done.
    Skipped {
        /// The tab URL.
        url: String,
    },
    /// A download was started.
    Started {
        /// Download ID.
        download_id: DownloadId,
        /// Final filename, if the download facility already knows it.
        filename: Option<String>,
    },
}

impl CaptureOutcome {
    /// Returns `true` if a download was started.
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Coordinates tabs, options and downloads.
///
/// Cloning is cheap and shares everything, including the options.
#[derive(Clone)]
pub struct Controller {
    tabs: Arc<dyn TabHost>,
    downloads: Arc<dyn Downloads>,
    settings: Settings,
    response_timeout: Option<Duration>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("settings", &self.settings)
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Controller - Construction
// ============================================================================

impl Controller {
    /// Creates a controller with default options and no response timeout.
    #[must_use]
    pub fn new(tabs: Arc<dyn TabHost>, downloads: Arc<dyn Downloads>) -> Self {
        Self {
            tabs,
            downloads,
            settings: Settings::default(),
            response_timeout: None,
        }
    }

    /// Gives up on a capture whose reply takes longer than `timeout`.
    #[inline]
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Returns the option holder.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the current option snapshot.
    #[inline]
    #[must_use]
    pub fn options(&self) -> Arc<Options> {
        self.settings.snapshot()
    }

    /// Loads the options from `store` and refreshes every tab.
    ///
    /// # Errors
    ///
    /// Returns the store's error or
    /// [`Error::InvalidPattern`] for a stored pattern that does not compile.
    pub async fn load_options(&self, store: &dyn OptionsStore) -> Result<Arc<Options>> {
        let options = self.settings.load(store).await?;
        debug!(pattern = %options.pattern, "Options loaded");
        self.refresh_all_tabs().await?;
        Ok(options)
    }
}

// ============================================================================
// Controller - Page Action
// ============================================================================

impl Controller {
    /// Shows or hides the page action on `tab` according to the pattern.
    ///
    /// # Errors
    ///
    /// Returns the host's error.
    pub async fn refresh_page_action(&self, tab: &TabInfo) -> Result<()> {
        if self.settings.snapshot().matches(&tab.url) {
            self.tabs.show_page_action(tab.id).await
        } else {
            self.tabs.hide_page_action(tab.id).await
        }
    }

    /// Refreshes the page action on every open tab.
    ///
    /// Tabs that vanish meanwhile are skipped.
    ///
    /// # Errors
    ///
    /// Returns the host's error if tabs cannot be listed.
    pub async fn refresh_all_tabs(&self) -> Result<()> {
        let tabs = self.tabs.query_tabs().await?;
        let results = join_all(tabs.iter().map(|tab| self.refresh_page_action(tab))).await;

        for (tab, result) in tabs.iter().zip(results) {
            if let Err(e) = result {
                warn!(tab_id = %tab.id, error = %e, "Failed to refresh page action");
            }
        }
        Ok(())
    }
}

// ============================================================================
// Controller - Listeners
// ============================================================================

impl Controller {
    /// Starts reacting to option changes and tab updates.
    ///
    /// Both subscriptions are taken before this returns, so no event after
    /// the call is missed. The tasks stop when the returned handle is
    /// dropped.
    #[must_use = "listeners stop when the handle is dropped"]
    pub fn spawn_listeners(&self, store: Arc<dyn OptionsStore>) -> Listeners {
        let changes = store.subscribe();
        let updates = self.tabs.tab_updates();

        let options = tokio::spawn(self.clone().watch_options(store, changes));
        let tabs = tokio::spawn(self.clone().watch_tabs(updates));

        Listeners { options, tabs }
    }

    async fn watch_options(
        self,
        store: Arc<dyn OptionsStore>,
        mut changes: broadcast::Receiver<Vec<StorageChange>>,
    ) {
        loop {
            let result = match changes.recv().await {
                Ok(batch) => self.settings.apply_changes(&batch).map(drop),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Option changes lagged, reloading");
                    self.settings.load(store.as_ref()).await.map(drop)
                }
                Err(RecvError::Closed) => break,
            };

            if let Err(e) = result {
                error!(error = %e, "Rejected option change");
                continue;
            }
            if let Err(e) = self.refresh_all_tabs().await {
                warn!(error = %e, "Failed to refresh tabs after option change");
            }
        }
        debug!("Option listener terminated");
    }

    async fn watch_tabs(self, mut updates: broadcast::Receiver<TabInfo>) {
        loop {
            let result = match updates.recv().await {
                Ok(tab) => self.refresh_page_action(&tab).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Tab updates lagged, refreshing all tabs");
                    self.refresh_all_tabs().await
                }
                Err(RecvError::Closed) => break,
            };

            if let Err(e) = result {
                debug!(error = %e, "Page action refresh failed");
            }
        }
        debug!("Tab listener terminated");
    }
}

// ============================================================================
// Controller - Capture
// ============================================================================

impl Controller {
    /// Page-action click handler.
    ///
    /// Runs [`Controller::initiate_capture`] and logs any failure.
    pub async fn on_clicked(&self, tab: &TabInfo) {
        if let Err(e) = self.initiate_capture(tab).await {
            if e.is_messaging_error() {
                error!(tab_id = %tab.id, url = %tab.url, error = %e, "Could not reach page");
            } else {
                error!(tab_id = %tab.id, url = %tab.url, error = %e, "Capture failed");
            }
        }
    }

    /// Captures the document in `tab` and starts its download.
    ///
    /// Uses one option snapshot for the whole invocation.
    ///
    /// # Errors
    ///
    /// - [`Error::Injection`] / [`Error::TabNotFound`] if injection fails
    /// - [`Error::Timeout`] if the response timeout elapses
    /// - [`Error::ChannelClosed`] if the page goes away mid-capture
    /// - [`Error::NotUnderstood`] / [`Error::Protocol`] for unexpected replies
    /// - [`Error::CaptureFailed`] if the page could not serialize its document
    /// - download facility errors
    pub async fn initiate_capture(&self, tab: &TabInfo) -> Result<CaptureOutcome> {
        let options = self.settings.snapshot();
        let capture_id = CaptureId::generate();

        if !options.matches(&tab.url) {
            info!(
                %capture_id,
                tab_id = %tab.id,
                url = %tab.url,
                pattern = %options.pattern,
                "Not saving, URL does not match"
            );
            return Ok(CaptureOutcome::Skipped {
                url: tab.url.clone(),
            });
        }

        let filename = derive_filename(&tab.url, &options.result_name_suffix, Utc::now());
        debug!(%capture_id, tab_id = %tab.id, %filename, "Capturing document");

        self.tabs.inject(tab.id, ContentScript::Capture).await?;

        let request = CaptureRequest::serialize_dom(options.respect_html_is_not_xml);
        let reply = self.request(tab, serde_json::to_value(&request)?).await?;

        let response = CaptureResponse::from_reply(reply)?;
        let content_type = response.content_type.clone();
        let url = response
            .into_object_url()?
            .ok_or_else(|| Error::capture_failed(tab.id))?;

        let download_id = self
            .downloads
            .download(DownloadOptions {
                url,
                filename,
                conflict_action: options.conflict_action,
                save_as: options.show_file_chooser,
            })
            .await?;

        let filename = self.final_filename(download_id).await;
        match &filename {
            Some(name) => info!(
                %capture_id,
                %download_id,
                content_type = content_type.as_deref().unwrap_or_default(),
                "Started downloading DOM as {name}"
            ),
            None => info!(%capture_id, %download_id, "Started downloading DOM"),
        }

        Ok(CaptureOutcome::Started {
            download_id,
            filename,
        })
    }

    /// Sends `message` to `tab`, bounded by the response timeout if set.
    async fn request(&self, tab: &TabInfo, message: Value) -> Result<Value> {
        let reply = self.tabs.send_message(tab.id, message);
        match self.response_timeout {
            Some(timeout) => tokio::time::timeout(timeout, reply)
                .await
                .map_err(|_| Error::timeout("capture reply", timeout.as_millis() as u64))?,
            None => reply.await,
        }
    }

    /// Best-effort lookup of the saved filename; empty names count as unknown.
    async fn final_filename(&self, id: DownloadId) -> Option<String> {
        match self.downloads.search(id).await {
            Ok(items) => items
                .into_iter()
                .next()
                .map(|item| item.filename)
                .filter(|name| !name.is_empty()),
            Err(e) => {
                debug!(download_id = %id, error = %e, "Download search failed");
                None
            }
        }
    }
}

// ============================================================================
// Listeners
// ============================================================================

/// Handle to the controller's background listeners.
///
/// Dropping it stops them.
#[derive(Debug)]
pub struct Listeners {
    options: JoinHandle<()>,
    tabs: JoinHandle<()>,
}

impl Listeners {
    /// Stops both listeners.
    pub fn abort(&self) {
        self.options.abort();
        self.tabs.abort();
    }

    /// Returns `true` once both listeners have stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.options.is_finished() && self.tabs.is_finished()
    }
}

impl Drop for Listeners {
    fn drop(&mut self) {
        self.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
