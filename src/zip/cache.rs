//! Process-wide cache of parsed archive metadata.
//!
//! Reopening a physical jar that has not changed reuses the end record and the
//! central directory index from the first open.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use super::central_directory::CentralDirectory;
use super::end_record::EndRecord;
use crate::error::Result;

/// Identity of a file on disk: path, modification time and, on unix, device and inode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    path: PathBuf,
    modified: Option<SystemTime>,
    key: Option<(u64, u64)>,
}

impl FileIdentity {
    /// Identity of the file at `path` as it is on disk now.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be stat'ed or its path cannot be canonicalized.
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        let path = fs::canonicalize(path)?;

        #[cfg(unix)]
        let key = {
            use std::os::unix::fs::MetadataExt;
            Some((metadata.dev(), metadata.ino()))
        };
        #[cfg(not(unix))]
        let key = None;

        Ok(Self {
            path,
            modified: metadata.modified().ok(),
            key,
        })
    }

    /// Canonical path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// End record and central directory of one archive.
#[derive(Debug)]
pub struct ArchiveMetadata {
    pub end_record: EndRecord,
    pub directory: Arc<CentralDirectory>,
}

/// Map from [`FileIdentity`] to parsed metadata.
#[derive(Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<FileIdentity, Arc<ArchiveMetadata>>>,
}

static GLOBAL: Lazy<MetadataCache> = Lazy::new(MetadataCache::default);

impl MetadataCache {
    /// The cache shared by the whole process.
    pub fn global() -> &'static MetadataCache {
        &GLOBAL
    }

    /// Return the cached metadata for `identity`, running `parse` on a miss.
    ///
    /// `parse` runs without the lock held. When two threads miss at the same
    /// time, the first insert wins and the other result is dropped.
    pub fn get_or_parse(
        &self,
        identity: FileIdentity,
        parse: impl FnOnce() -> Result<ArchiveMetadata>,
    ) -> Result<Arc<ArchiveMetadata>> {
        if let Some(found) = self.entries.lock().get(&identity) {
            debug!(path = %identity.path.display(), "metadata cache hit");
            return Ok(Arc::clone(found));
        }

        let parsed = Arc::new(parse()?);

        match self.entries.lock().entry(identity) {
            Entry::Occupied(existing) => {
                debug!(
                    path = %existing.key().path.display(),
                    "discarding duplicate metadata parse"
                );
                drop(parsed);
                Ok(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => Ok(Arc::clone(slot.insert(parsed))),
        }
    }

    /// Number of cached archives.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forget every cached archive.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
