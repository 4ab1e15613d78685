use std::sync::Arc;

use super::{RandomAccessData, check_range};
use crate::error::Result;

/// [`RandomAccessData`] over bytes already held in memory.
#[derive(Clone)]
pub struct ByteArrayData {
    bytes: Arc<[u8]>,
    start: usize,
    length: usize,
}

impl ByteArrayData {
    /// Create a view over all of `bytes`.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The backing bytes, shared by every subsection cut from this view
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let length = bytes.len();
        Self {
            bytes,
            start: 0,
            length,
        }
    }

    /// The bytes of this view.
    fn as_slice(&self) -> &[u8] {
        &self.bytes[self.start..self.start + self.length]
    }
}

impl RandomAccessData for ByteArrayData {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize> {
        let data = self.as_slice();
        if position >= data.len() as u64 {
            return Ok(0);
        }
        let available = &data[position as usize..];
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    fn len(&self) -> u64 {
        self.length as u64
    }

    fn subsection(&self, offset: u64, length: u64) -> Result<Arc<dyn RandomAccessData>> {
        check_range(self.length as u64, offset, length)?;
        Ok(Arc::new(Self {
            bytes: Arc::clone(&self.bytes),
            start: self.start + offset as usize,
            length: length as usize,
        }))
    }
}
