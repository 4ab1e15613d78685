use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{RandomAccessData, check_range};
use crate::error::Result;

/// The single open handle of a physical file.
///
/// Every view of the file goes through this lock so that a seek and the read
/// that follows it are never interleaved with another thread's seek.
struct SharedFile {
    path: PathBuf,
    file: Mutex<File>,
}

/// [`RandomAccessData`] backed by a file on disk.
#[derive(Clone)]
pub struct RandomAccessDataFile {
    shared: Arc<SharedFile>,
    /// Absolute offset of this view within the file
    start: u64,
    length: u64,
}

impl RandomAccessDataFile {
    /// Open `path` and create a view over the whole file.
    ///
    /// # Arguments
    ///
    /// * `path` - File to open for reading
    ///
    /// # Returns
    ///
    /// A view of the whole file. Views cut from it share the same handle.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        debug!(path = %path.display(), length, "opened random access file");
        Ok(Self {
            shared: Arc::new(SharedFile {
                path: path.to_path_buf(),
                file: Mutex::new(file),
            }),
            start: 0,
            length,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Absolute offset of this view within the backing file.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Same as [`RandomAccessData::subsection`] but keeps the concrete type.
    pub fn section(&self, offset: u64, length: u64) -> Result<Self> {
        check_range(self.length, offset, length)?;
        Ok(Self {
            shared: Arc::clone(&self.shared),
            start: self.start + offset,
            length,
        })
    }
}

impl RandomAccessData for RandomAccessDataFile {
    /// Seek and read under the file lock, looping until `buf` or the view is exhausted.
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize> {
        if position >= self.length || buf.is_empty() {
            return Ok(0);
        }
        let wanted = buf.len().min((self.length - position) as usize);
        let buf = &mut buf[..wanted];

        let mut file = self.shared.file.lock();
        file.seek(SeekFrom::Start(self.start + position))?;
        let mut read = 0;
        while read < wanted {
            match file.read(&mut buf[read..])? {
                0 => break,
                n => read += n,
            }
        }
        Ok(read)
    }

    fn len(&self) -> u64 {
        self.length
    }

    fn subsection(&self, offset: u64, length: u64) -> Result<Arc<dyn RandomAccessData>> {
        Ok(Arc::new(self.section(offset, length)?))
    }
}
