use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use super::RandomAccessData;

/// Sequential reader over a [`RandomAccessData`] view.
pub struct DataReader {
    data: Arc<dyn RandomAccessData>,
    position: u64,
}

impl DataReader {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: Arc<dyn RandomAccessData>) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes left before the end of the view.
    pub fn remaining(&self) -> u64 {
        self.data.len().saturating_sub(self.position)
    }
}

impl Read for DataReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for DataReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.data.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
