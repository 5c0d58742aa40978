//! In-process tab host.
//!
//! [`LocalBrowser`] keeps tabs in memory. Each tab holds its current
//! [`Page`] and, once injected, a [`Port`] to the capture component running
//! as a tokio task. Navigating replaces the page and disconnects the port;
//! the old page is dropped with the listener, which revokes any object URLs
//! it minted that were never consumed.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use url::Url;

use crate::capture::CaptureComponent;
use crate::dom::DocumentSnapshot;
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::page::{BlobStore, Page};
use crate::transport::Port;

use super::{ContentScript, TabHost, TabInfo};

// ============================================================================
// Constants
// ============================================================================

/// URL schemes whose pages refuse content scripts.
const RESTRICTED_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "jar",
    "moz-extension",
    "resource",
    "view-source",
];

/// Tab updates buffered per subscriber.
const TAB_UPDATE_CAPACITY: usize = 64;

// ============================================================================
// TabEntry
// ============================================================================

/// Internal state of one tab.
struct TabEntry {
    page: Arc<Page>,
    port: Option<Port>,
    page_action_visible: bool,
}

impl TabEntry {
    fn new(page: Page) -> Self {
        Self {
            page: Arc::new(page),
            port: None,
            page_action_visible: false,
        }
    }

    fn disconnect(&mut self) {
        if let Some(port) = self.port.take() {
            port.disconnect();
        }
    }
}

// ============================================================================
// LocalBrowser
// ============================================================================

/// Tabs living in this process.
///
/// All pages mint object URLs into one shared [`BlobStore`], available via
/// [`LocalBrowser::blobs`] for wiring up a download facility.
pub struct LocalBrowser {
    blobs: BlobStore,
    tabs: RwLock<FxHashMap<TabId, TabEntry>>,
    next_id: AtomicU32,
    updates: broadcast::Sender<TabInfo>,
}

impl Default for LocalBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBrowser {
    /// Creates a browser with no tabs and a fresh blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_blob_store(BlobStore::new())
    }

    /// Creates a browser minting object URLs into `blobs`.
    #[must_use]
    pub fn with_blob_store(blobs: BlobStore) -> Self {
        let (updates, _) = broadcast::channel(TAB_UPDATE_CAPACITY);
        Self {
            blobs,
            tabs: RwLock::new(FxHashMap::default()),
            next_id: AtomicU32::new(1),
            updates,
        }
    }

    /// Returns the shared blob store.
    #[inline]
    #[must_use]
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Opens a tab showing `document` at `url`.
    pub fn open_tab(
        &self,
        url: impl Into<String>,
        document: impl DocumentSnapshot + 'static,
    ) -> TabId {
        let id = self.allocate_id();
        let page = Page::new(url, document, self.blobs.clone());
        let info = TabInfo::new(id, page.url());

        self.tabs.write().insert(id, TabEntry::new(page));

        info!(tab_id = %id, url = %info.url, "Tab opened");
        self.emit(info);
        id
    }

    /// Loads a new page into `tab`.
    ///
    /// The content script of the previous page stops listening.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`] if the tab does not exist.
    pub fn navigate(
        &self,
        tab: TabId,
        url: impl Into<String>,
        document: impl DocumentSnapshot + 'static,
    ) -> Result<()> {
        let page = Page::new(url, document, self.blobs.clone());
        let info = TabInfo::new(tab, page.url());

        {
            let mut tabs = self.tabs.write();
            let entry = tabs.get_mut(&tab).ok_or_else(|| Error::tab_not_found(tab))?;
            entry.disconnect();
            entry.page = Arc::new(page);
        }

        debug!(tab_id = %tab, url = %info.url, "Tab navigated");
        self.emit(info);
        Ok(())
    }

    /// Closes `tab`; returns `false` if it did not exist.
    pub fn close_tab(&self, tab: TabId) -> bool {
        let Some(mut entry) = self.tabs.write().remove(&tab) else {
            return false;
        };
        entry.disconnect();
        debug!(tab_id = %tab, "Tab closed");
        true
    }

    /// Returns info for `tab`.
    #[must_use]
    pub fn tab(&self, tab: TabId) -> Option<TabInfo> {
        self.tabs
            .read()
            .get(&tab)
            .map(|entry| TabInfo::new(tab, entry.page.url()))
    }

    /// Returns whether the page action is shown on `tab`.
    #[must_use]
    pub fn is_page_action_visible(&self, tab: TabId) -> bool {
        self.tabs
            .read()
            .get(&tab)
            .is_some_and(|entry| entry.page_action_visible)
    }

    /// Returns whether a content script is listening in `tab`.
    #[must_use]
    pub fn is_injected(&self, tab: TabId) -> bool {
        self.tabs
            .read()
            .get(&tab)
            .and_then(|entry| entry.port.as_ref())
            .is_some_and(Port::is_connected)
    }

    fn allocate_id(&self) -> TabId {
        loop {
            let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
            if let Some(id) = TabId::new(raw) {
                return id;
            }
        }
    }

    fn emit(&self, info: TabInfo) {
        // No subscribers is fine.
        let _ = self.updates.send(info);
    }

    fn set_page_action(&self, tab: TabId, visible: bool) -> Result<()> {
        let mut tabs = self.tabs.write();
        let entry = tabs.get_mut(&tab).ok_or_else(|| Error::tab_not_found(tab))?;
        if entry.page_action_visible != visible {
            trace!(tab_id = %tab, visible, "Page action toggled");
        }
        entry.page_action_visible = visible;
        Ok(())
    }
}

#[async_trait]
impl TabHost for LocalBrowser {
    async fn query_tabs(&self) -> Result<Vec<TabInfo>> {
        let mut tabs: Vec<TabInfo> = self
            .tabs
            .read()
            .iter()
            .map(|(id, entry)| TabInfo::new(*id, entry.page.url()))
            .collect();
        tabs.sort_by_key(|info| info.id.as_u32());
        Ok(tabs)
    }

    async fn show_page_action(&self, tab: TabId) -> Result<()> {
        self.set_page_action(tab, true)
    }

    async fn hide_page_action(&self, tab: TabId) -> Result<()> {
        self.set_page_action(tab, false)
    }

    async fn inject(&self, tab: TabId, script: ContentScript) -> Result<()> {
        let mut tabs = self.tabs.write();
        let entry = tabs.get_mut(&tab).ok_or_else(|| Error::tab_not_found(tab))?;

        check_scriptable(tab, entry.page.url())?;

        let component = match script {
            ContentScript::Capture => CaptureComponent::new(Arc::clone(&entry.page)),
        };

        entry.disconnect();
        entry.port = Some(Port::spawn(tab, component));

        debug!(tab_id = %tab, ?script, "Content script injected");
        Ok(())
    }

    async fn send_message(&self, tab: TabId, message: Value) -> Result<Value> {
        let port = {
            let tabs = self.tabs.read();
            let entry = tabs.get(&tab).ok_or_else(|| Error::tab_not_found(tab))?;
            entry.port.clone().ok_or_else(|| Error::not_injected(tab))?
        };

        port.send(message).await
    }

    fn tab_updates(&self) -> broadcast::Receiver<TabInfo> {
        self.updates.subscribe()
    }
}

// ============================================================================
// Internal Functions
// ============================================================================

/// Rejects pages that do not accept content scripts.
fn check_scriptable(tab: TabId, url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| Error::injection(tab, format!("invalid URL {url:?}: {e}")))?;

    if RESTRICTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(Error::injection(
            tab,
            format!("scripts are not allowed on {}: pages", parsed.scheme()),
        ));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
