//! Byte sources for archive reading.
//!
//! All reading goes through [`RandomAccessData`], a positioned read interface
//! over a range of bytes. Implementations:
//!
//! - [`RandomAccessDataFile`]: a range of a file on disk, sharing one handle
//! - [`ByteArrayData`]: a range of bytes held in memory
//!
//! [`DataReader`] turns any view into a sequential [`std::io::Read`].

mod file;
mod memory;
mod stream;

pub use file::RandomAccessDataFile;
pub use memory::ByteArrayData;
pub use stream::DataReader;

use std::io;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Random access view over a range of bytes.
///
/// Positions are relative to the start of the view. Subsections share the
/// backing storage of the view they were cut from and never copy bytes.
pub trait RandomAccessData: Send + Sync {
    /// Read up to `buf.len()` bytes at `position`, returning how many were read.
    ///
    /// Returns `0` once `position` reaches the end of the view.
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize>;

    /// Size of this view in bytes.
    fn len(&self) -> u64;

    /// Create a view over `[offset, offset + length)` of this view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the range does not fit in this view.
    fn subsection(&self, offset: u64, length: u64) -> Result<Arc<dyn RandomAccessData>>;

    /// Whether this view holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a single byte, or `None` at the end of the view.
    fn read_byte(&self, position: u64) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read_at(position, &mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Fill `buf` completely from `position`.
    ///
    /// # Errors
    ///
    /// Returns an `UnexpectedEof` I/O error if the view ends before `buf` is full.
    fn read_exact_at(&self, position: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(position + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "needed {} bytes at position {}, data ends at {}",
                        buf.len(),
                        position,
                        self.len()
                    ),
                )
                .into());
            }
            filled += n;
        }
        Ok(())
    }

    /// Read `length` bytes from `position` into a new buffer.
    fn read_vec(&self, position: u64, length: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length];
        self.read_exact_at(position, &mut buf)?;
        Ok(buf)
    }
}

/// Validate that `[offset, offset + length)` lies inside `available` bytes.
pub(crate) fn check_range(available: u64, offset: u64, length: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= available => Ok(()),
        _ => Err(Error::OutOfBounds {
            offset,
            length,
            available,
        }),
    }
}
