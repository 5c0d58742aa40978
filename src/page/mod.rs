//! Page execution context.
//!
//! A [`Page`] is what a content script sees: the live document and the
//! ability to mint object URLs bound to the page's origin. Dropping the page
//! (navigation, tab close) revokes every URL it minted that has not been
//! consumed yet.

// ============================================================================
// Submodules
// ============================================================================

/// Blobs, object URLs and the blob registry.
pub mod object_url;

// ============================================================================
// Re-exports
// ============================================================================

pub use object_url::{Blob, BlobStore, ObjectUrl};

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use tracing::trace;
use url::Url;

use crate::dom::DocumentSnapshot;

// ============================================================================
// Page
// ============================================================================

/// A loaded page: URL, origin, document and minted object URLs.
pub struct Page {
    url: String,
    origin: String,
    document: Box<dyn DocumentSnapshot>,
    blobs: BlobStore,
    minted: Mutex<Vec<String>>,
}

impl Page {
    /// Creates a page for `url` showing `document`.
    ///
    /// URLs without a tuple origin (`data:`, `about:`, unparsable input)
    /// get the opaque origin `null`.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        document: impl DocumentSnapshot + 'static,
        blobs: BlobStore,
    ) -> Self {
        let url = url.into();
        let origin = Url::parse(&url)
            .map(|parsed| parsed.origin().ascii_serialization())
            .unwrap_or_else(|_| "null".to_string());

        Self {
            url,
            origin,
            document: Box::new(document),
            blobs,
            minted: Mutex::new(Vec::new()),
        }
    }

    /// Returns the page URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the serialized origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the live document.
    #[inline]
    #[must_use]
    pub fn document(&self) -> &dyn DocumentSnapshot {
        self.document.as_ref()
    }

    /// Mints an object URL for `blob`, bound to this page's origin.
    ///
    /// Only URLs still live in the store are remembered for revocation;
    /// consumed ones are forgotten on the next mint.
    #[must_use]
    pub fn create_object_url(&self, blob: Blob) -> ObjectUrl {
        let url = self.blobs.create(&self.origin, blob);
        let mut minted = self.minted.lock();
        minted.retain(|minted_url| self.blobs.contains(minted_url));
        minted.push(url.as_str().to_string());
        url
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        let revoked = self
            .minted
            .get_mut()
            .drain(..)
            .filter(|url| self.blobs.revoke(url))
            .count();
        if revoked > 0 {
            trace!(url = %self.url, revoked, "Revoked object URLs on page teardown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dom::{Document, Element};

    fn page(url: &str, blobs: &BlobStore) -> Page {
        Page::new(url, Document::html(Element::html("html")), blobs.clone())
    }

    #[test]
    fn test_origin_of_http_url() {
        let blobs = BlobStore::new();
        let page = page("https://example.com:8443/a/b?c", &blobs);
        assert_eq!(page.origin(), "https://example.com:8443");
    }

    #[test]
    fn test_opaque_origin() {
        let blobs = BlobStore::new();
        assert_eq!(page("data:text/html,hi", &blobs).origin(), "null");
        assert_eq!(page("not a url", &blobs).origin(), "null");
    }

    #[test]
    fn test_drop_revokes_unconsumed_urls() {
        let blobs = BlobStore::new();
        let page = page("https://example.com/", &blobs);

        let kept = page.create_object_url(Blob::from_text("a".into(), "text/plain"));
        let consumed = page.create_object_url(Blob::from_text("b".into(), "text/plain"));
        blobs.take(consumed).expect("live");
        assert_eq!(blobs.len(), 1);

        drop(page);
        assert!(!blobs.contains(kept.as_str()));
        assert!(blobs.is_empty());
    }

    #[test]
    fn test_consumed_urls_are_forgotten() {
        let blobs = BlobStore::new();
        let page = page("https://example.com/", &blobs);

        let kept = page.create_object_url(Blob::from_text("kept".into(), "text/plain"));
        for i in 0..100 {
            let url = page.create_object_url(Blob::from_text(format!("{i}"), "text/plain"));
            blobs.take(url).expect("live");
        }

        let minted = page.minted.lock().clone();
        assert_eq!(minted.len(), 2);
        assert_eq!(minted[0], kept.as_str());

        drop(page);
        assert!(blobs.is_empty());
    }
}
