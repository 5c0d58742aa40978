//! Blobs, object URLs and the store that maps one to the other.
//!
//! An [`ObjectUrl`] is a move-only handle. Whoever holds it owns the blob
//! behind it; [`BlobStore::take`] consumes the handle and removes the blob in
//! one step, so a document can be downloaded at most once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Scheme prefix of every object URL.
const BLOB_SCHEME: &str = "blob:";

// ============================================================================
// Blob
// ============================================================================

/// An immutable byte buffer tagged with a MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
    mime_type: String,
}

impl Blob {
    /// Creates a blob from raw bytes.
    #[inline]
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Creates a blob holding UTF-8 text.
    #[inline]
    #[must_use]
    pub fn from_text(text: String, mime_type: impl Into<String>) -> Self {
        Self::new(text.into_bytes(), mime_type)
    }

    /// Returns the MIME type.
    #[inline]
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the contents.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the blob, returning its contents.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("size", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

// ============================================================================
// ObjectUrl
// ============================================================================

/// Move-only handle to a blob registered in a [`BlobStore`].
///
/// Not `Clone`: the handle is moved, never shared.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    /// Wraps a URL received over the message channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the string is not a `blob:` URL.
    pub fn parse(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.starts_with(BLOB_SCHEME) && url.len() > BLOB_SCHEME.len() {
            Ok(Self(url))
        } else {
            Err(Error::protocol(format!("not an object URL: {url}")))
        }
    }

    /// Returns the URL text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the handle, returning the URL text.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// BlobStore
// ============================================================================

/// Browser-wide registry of object URLs.
///
/// Cloning shares the registry. Pages mint into it, the download facility
/// takes out of it.
#[derive(Clone, Default)]
pub struct BlobStore {
    entries: Arc<Mutex<FxHashMap<String, Blob>>>,
}

impl BlobStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a blob under a fresh URL bound to `origin`.
    #[must_use]
    pub fn create(&self, origin: &str, blob: Blob) -> ObjectUrl {
        let url = format!("{BLOB_SCHEME}{origin}/{}", Uuid::new_v4());
        self.entries.lock().insert(url.clone(), blob);
        ObjectUrl(url)
    }

    /// Consumes the handle and removes its blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectUrlNotFound`] if the URL was already revoked.
    pub fn take(&self, url: ObjectUrl) -> Result<Blob> {
        self.entries
            .lock()
            .remove(url.as_str())
            .ok_or_else(|| Error::object_url_not_found(url.into_string()))
    }

    /// Revokes a URL by its text. Returns `true` if it was live.
    pub fn revoke(&self, url: &str) -> bool {
        self.entries.lock().remove(url).is_some()
    }

    /// Returns `true` if the URL is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.lock().contains_key(url)
    }

    /// Returns the number of live URLs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no URL is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStore")
            .field("live", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
