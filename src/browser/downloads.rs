//! Download requests, items and a directory-backed download facility.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::DownloadId;
use crate::page::{BlobStore, ObjectUrl};

use super::Downloads;

// ============================================================================
// Constants
// ============================================================================

/// Highest `name (N).ext` counter tried before giving up.
const MAX_UNIQUIFY_ATTEMPTS: u32 = 10_000;

// ============================================================================
// ConflictAction
// ============================================================================

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    /// Pick a fresh name: `report (1).svg`, `report (2).svg`, ...
    #[default]
    Uniquify,
    /// Replace the existing file.
    Overwrite,
}

impl ConflictAction {
    /// Returns the stored option value.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uniquify => "uniquify",
            Self::Overwrite => "overwrite",
        }
    }
}

impl FromStr for ConflictAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniquify" => Ok(Self::Uniquify),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(Error::config(format!("unknown conflict action: {other}"))),
        }
    }
}

impl fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DownloadOptions
// ============================================================================

/// A download request.
///
/// Owns the object URL; submitting the request hands the document over to
/// the download facility.
#[derive(Debug)]
pub struct DownloadOptions {
    /// Handle of the blob to save.
    pub url: ObjectUrl,
    /// Target filename, relative to the downloads directory.
    pub filename: String,
    /// Policy for existing files.
    pub conflict_action: ConflictAction,
    /// Whether the user asked to pick the location interactively.
    pub save_as: bool,
}

// ============================================================================
// DownloadItem
// ============================================================================

/// A finished or started download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    /// Download ID.
    pub id: DownloadId,
    /// Final absolute filename; empty while unknown.
    pub filename: String,
    /// MIME type of the saved blob.
    pub mime_type: String,
    /// Number of bytes written.
    pub bytes_received: u64,
    /// Whether a file chooser was requested.
    pub save_as: bool,
}

// ============================================================================
// DirectoryDownloads
// ============================================================================

/// Saves blobs into a fixed directory.
///
/// There is no interactive chooser; `save_as` is only recorded on the item.
pub struct DirectoryDownloads {
    directory: PathBuf,
    blobs: BlobStore,
    next_id: AtomicU64,
    items: Mutex<FxHashMap<DownloadId, DownloadItem>>,
}

impl DirectoryDownloads {
    /// Creates a facility saving into `directory`, resolving URLs from `blobs`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, blobs: BlobStore) -> Self {
        Self {
            directory: directory.into(),
            blobs,
            next_id: AtomicU64::new(1),
            items: Mutex::new(FxHashMap::default()),
        }
    }

    /// Returns the downloads directory.
    #[inline]
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl Downloads for DirectoryDownloads {
    async fn download(&self, options: DownloadOptions) -> Result<DownloadId> {
        let DownloadOptions {
            url,
            filename,
            conflict_action,
            save_as,
        } = options;

        // Taken first so a rejected request still discards the blob.
        let blob = self.blobs.take(url)?;
        let relative = relative_path(&filename)?;

        let target = self.directory.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let path = match conflict_action {
            ConflictAction::Overwrite => {
                fs::write(&target, blob.bytes()).await?;
                target
            }
            ConflictAction::Uniquify => write_unique(&target, blob.bytes()).await?,
        };

        let id = DownloadId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let item = DownloadItem {
            id,
            filename: path.to_string_lossy().into_owned(),
            mime_type: blob.mime_type().to_string(),
            bytes_received: blob.size() as u64,
            save_as,
        };

        debug!(%id, path = %path.display(), bytes = item.bytes_received, "Download written");
        self.items.lock().insert(id, item);

        Ok(id)
    }

    async fn search(&self, id: DownloadId) -> Result<Vec<DownloadItem>> {
        Ok(self.items.lock().get(&id).cloned().into_iter().collect())
    }
}

// ============================================================================
// Internal Functions
// ============================================================================

/// Validates a filename as a path inside the downloads directory.
fn relative_path(filename: &str) -> Result<&Path> {
    let path = Path::new(filename);
    let inside = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if filename.is_empty() || !inside {
        return Err(Error::download(format!("invalid filename: {filename:?}")));
    }
    Ok(path)
}

/// Writes to `target`, or to the first free `name (N).ext` next to it.
async fn write_unique(target: &Path, bytes: &[u8]) -> Result<PathBuf> {
    for attempt in 0..=MAX_UNIQUIFY_ATTEMPTS {
        let candidate = numbered(target, attempt);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(mut file) => {
                file.write_all(bytes).await?;
                file.flush().await?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::download(format!(
        "no free filename for {} after {MAX_UNIQUIFY_ATTEMPTS} attempts",
        target.display()
    )))
}

/// `dir/name.ext` → `dir/name (N).ext`; attempt 0 is the path itself.
fn numbered(target: &Path, attempt: u32) -> PathBuf {
    if attempt == 0 {
        return target.to_path_buf();
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{stem} ({attempt}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({attempt})"),
    };
    target.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::page::Blob;

    fn request(blobs: &BlobStore, text: &str, filename: &str, action: ConflictAction) -> DownloadOptions {
        DownloadOptions {
            url: blobs.create("null", Blob::from_text(text.to_string(), "text/html")),
            filename: filename.to_string(),
            conflict_action: action,
            save_as: false,
        }
    }

    #[test]
    fn test_conflict_action_parse() {
        assert_eq!("uniquify".parse::<ConflictAction>().ok(), Some(ConflictAction::Uniquify));
        assert_eq!("overwrite".parse::<ConflictAction>().ok(), Some(ConflictAction::Overwrite));
        assert!("prompt".parse::<ConflictAction>().is_err());
        assert_eq!(ConflictAction::default(), ConflictAction::Uniquify);
    }

    #[test]
    fn test_numbered() {
        let path = Path::new("/d/report.svg");
        assert_eq!(numbered(path, 0), PathBuf::from("/d/report.svg"));
        assert_eq!(numbered(path, 2), PathBuf::from("/d/report (2).svg"));
        assert_eq!(numbered(Path::new("/d/README"), 1), PathBuf::from("/d/README (1)"));
    }

    #[test]
    fn test_relative_path_rejects_escapes() {
        assert!(relative_path("a.html").is_ok());
        assert!(relative_path("sub/a.html").is_ok());
        assert!(relative_path("").is_err());
        assert!(relative_path("../a.html").is_err());
        assert!(relative_path("/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_uniquify_keeps_both_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = BlobStore::new();
        let downloads = DirectoryDownloads::new(dir.path(), blobs.clone());

        let first = downloads
            .download(request(&blobs, "one", "page.html", ConflictAction::Uniquify))
            .await
            .expect("first");
        let second = downloads
            .download(request(&blobs, "two", "page.html", ConflictAction::Uniquify))
            .await
            .expect("second");
        assert_ne!(first, second);

        let items = downloads.search(second).await.expect("search");
        assert_eq!(items.len(), 1);
        assert!(items[0].filename.ends_with("page (1).html"));
        assert_eq!(items[0].mime_type, "text/html");

        let one = std::fs::read_to_string(dir.path().join("page.html")).expect("read");
        let two = std::fs::read_to_string(dir.path().join("page (1).html")).expect("read");
        assert_eq!((one.as_str(), two.as_str()), ("one", "two"));
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = BlobStore::new();
        let downloads = DirectoryDownloads::new(dir.path(), blobs.clone());

        for text in ["old", "new"] {
            downloads
                .download(request(&blobs, text, "page.html", ConflictAction::Overwrite))
                .await
                .expect("download");
        }

        let content = std::fs::read_to_string(dir.path().join("page.html")).expect("read");
        assert_eq!(content, "new");
        assert!(!dir.path().join("page (1).html").exists());
    }

    #[tokio::test]
    async fn test_revoked_url_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = BlobStore::new();
        let downloads = DirectoryDownloads::new(dir.path(), blobs.clone());

        let options = request(&blobs, "x", "page.html", ConflictAction::Uniquify);
        assert!(blobs.revoke(options.url.as_str()));

        let err = downloads.download(options).await.unwrap_err();
        assert!(matches!(err, Error::ObjectUrlNotFound { .. }));
    }

    #[tokio::test]
    async fn test_search_unknown_id_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let downloads = DirectoryDownloads::new(dir.path(), BlobStore::new());
        let items = downloads.search(DownloadId::new(99)).await.expect("search");
        assert!(items.is_empty());
    }
}
