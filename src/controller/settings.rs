//! Shared, atomically swapped option snapshots.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::browser::{OptionsStore, StorageChange};
use crate::error::Result;

use super::Options;

// ============================================================================
// Constants
// ============================================================================

/// Reads of the store per `load` before a concurrent update wins.
const LOAD_ATTEMPTS: usize = 3;

// ============================================================================
// Settings
// ============================================================================

/// Holder of the current [`Options`] snapshot.
///
/// Readers take an `Arc` and keep using it even if a newer snapshot is
/// installed meanwhile. Cloning shares the holder.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    current: Arc<RwLock<Arc<Options>>>,
}

impl Settings {
    /// Creates settings holding `options`.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(options))),
        }
    }

    /// Returns the current snapshot.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<Options> {
        Arc::clone(&self.current.read())
    }

    /// Installs `options` as the current snapshot.
    pub fn replace(&self, options: Options) {
        *self.current.write() = Arc::new(options);
    }

    /// Applies a batch of store changes and installs the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if a
    /// changed pattern does not compile; the current snapshot is kept.
    pub fn apply_changes(&self, changes: &[StorageChange]) -> Result<Arc<Options>> {
        let mut current = self.current.write();
        let next = Arc::new(current.apply_changes(changes)?);
        *current = Arc::clone(&next);
        debug!(changes = changes.len(), "Options updated");
        Ok(next)
    }

    /// Reads the options from `store`, using the current snapshot for
    /// missing keys, and installs them.
    ///
    /// The result is only installed if no other update landed while the
    /// store was being read. Otherwise the store is read again; after
    /// [`LOAD_ATTEMPTS`] reads the concurrent update is kept.
    ///
    /// # Errors
    ///
    /// Returns the store's error, or
    /// [`Error::InvalidPattern`](crate::Error::InvalidPattern) for a stored
    /// pattern that does not compile.
    pub async fn load(&self, store: &dyn OptionsStore) -> Result<Arc<Options>> {
        for attempt in 1..=LOAD_ATTEMPTS {
            let base = self.snapshot();
            let values = store.get(base.to_values()).await?;
            let loaded = Options::from_values(&base, &values)?;

            let mut current = self.current.write();
            if Arc::ptr_eq(&*current, &base) {
                *current = Arc::new(loaded);
                return Ok(Arc::clone(&*current));
            }
            debug!(attempt, "Options changed while loading, reading again");
        }

        Ok(self.snapshot())
    }
}

// ============================================================================
// Tests
// ============================================================================
