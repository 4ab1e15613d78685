//! Locating the End of Central Directory record.
//!
//! ZIP archives are read from the end: the EOCD names the position and size of
//! the central directory. Bytes placed in front of the archive (a launch script
//! concatenated before the jar, for example) shift every position, so the true
//! start of the archive is derived from where the central directory actually
//! ends rather than trusted from the stored offset.

use std::sync::Arc;

use tracing::{debug, trace};

use super::structures::{EndOfCentralDirectory, Zip64EOCD, Zip64EOCDLocator, u16_at};
use crate::error::{ArchiveFormatError, Result};
use crate::io::RandomAccessData;

/// Bytes read from the end on the first attempt.
const READ_BLOCK_SIZE: u64 = 256;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
const MAX_COMMENT_SIZE: u64 = 0xFFFF;

/// Largest possible distance between the EOCD signature and the end of the data.
const MAX_SEARCH_SIZE: u64 = EndOfCentralDirectory::SIZE as u64 + MAX_COMMENT_SIZE;

/// Summary of an archive's trailer.
#[derive(Debug, Clone)]
pub struct EndRecord {
    /// Number of central directory entries
    pub entries: u64,
    /// Size of the central directory in bytes
    pub central_directory_size: u64,
    /// Central directory offset as stored, relative to the archive start
    pub central_directory_offset: u64,
    /// Number of bytes in front of the archive proper
    pub archive_start_offset: u64,
    /// Whether the values came from a ZIP64 record
    pub zip64: bool,
    /// Archive comment
    pub comment: Vec<u8>,
}

impl EndRecord {
    /// Find and decode the end record of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveFormatError::MissingEndRecord`] when no signature with a
    /// matching comment length exists within the last 65557 bytes.
    pub fn locate(data: &dyn RandomAccessData) -> Result<Self> {
        let length = data.len();
        let max_window = MAX_SEARCH_SIZE.min(length);
        let mut window = READ_BLOCK_SIZE.min(max_window);

        loop {
            let block_start = length - window;
            let block = data.read_vec(block_start, window as usize)?;
            if let Some(pos) = find_record(&block) {
                let eocd_offset = block_start + pos as u64;
                trace!(eocd_offset, window, "found end of central directory");
                return Self::decode(data, eocd_offset, &block[pos..]);
            }
            if window == max_window {
                return Err(ArchiveFormatError::MissingEndRecord.into());
            }
            window = max_window;
        }
    }

    fn decode(data: &dyn RandomAccessData, eocd_offset: u64, record: &[u8]) -> Result<Self> {
        let eocd = EndOfCentralDirectory::from_bytes(record)?;
        let comment = record[EndOfCentralDirectory::SIZE..].to_vec();

        let zip64 = if eocd.is_zip64() {
            read_zip64(data, eocd_offset)?
        } else {
            None
        };

        let (entries, cd_size, cd_offset, cd_end) = match &zip64 {
            Some((record, record_offset)) => (
                record.total_entries,
                record.cd_size,
                record.cd_offset,
                *record_offset,
            ),
            None => (
                eocd.total_entries as u64,
                eocd.cd_size as u64,
                eocd.cd_offset as u64,
                eocd_offset,
            ),
        };

        let archive_start_offset = cd_end
            .checked_sub(cd_size)
            .and_then(|cd_start| cd_start.checked_sub(cd_offset))
            .ok_or(ArchiveFormatError::ArchiveStartUnderflow)?;

        let record = Self {
            entries,
            central_directory_size: cd_size,
            central_directory_offset: cd_offset,
            archive_start_offset,
            zip64: zip64.is_some(),
            comment,
        };
        debug!(
            entries = record.entries,
            cd_size = record.central_directory_size,
            archive_start = record.archive_start_offset,
            zip64 = record.zip64,
            "decoded end record"
        );
        Ok(record)
    }

    /// View over the archive proper, skipping any prefixed bytes.
    pub fn archive_data(&self, data: &dyn RandomAccessData) -> Result<Arc<dyn RandomAccessData>> {
        data.subsection(
            self.archive_start_offset,
            data.len() - self.archive_start_offset,
        )
    }

    /// Raw central directory bytes, read from the archive view.
    pub fn read_central_directory(&self, archive: &dyn RandomAccessData) -> Result<Vec<u8>> {
        let section = archive.subsection(
            self.central_directory_offset,
            self.central_directory_size,
        )?;
        section.read_vec(0, self.central_directory_size as usize)
    }
}

/// Position of the last EOCD signature whose comment runs exactly to the end of `block`.
fn find_record(block: &[u8]) -> Option<usize> {
    let size = EndOfCentralDirectory::SIZE;
    if block.len() < size {
        return None;
    }
    (0..=block.len() - size).rev().find(|&i| {
        &block[i..i + 4] == EndOfCentralDirectory::SIGNATURE
            && u16_at(block, i + EndOfCentralDirectory::COMMENT_LENGTH_OFFSET) as usize + size
                == block.len() - i
    })
}

/// Read the ZIP64 record for the EOCD at `eocd_offset`.
///
/// Returns `None` when no locator precedes the EOCD, in which case the 16-bit
/// and 32-bit values are taken literally.
fn read_zip64(data: &dyn RandomAccessData, eocd_offset: u64) -> Result<Option<(Zip64EOCD, u64)>> {
    let locator_size = Zip64EOCDLocator::SIZE as u64;
    let Some(locator_offset) = eocd_offset.checked_sub(locator_size) else {
        return Ok(None);
    };
    let buf = data.read_vec(locator_offset, Zip64EOCDLocator::SIZE)?;
    if &buf[0..4] != Zip64EOCDLocator::SIGNATURE {
        return Ok(None);
    }
    let locator = Zip64EOCDLocator::from_bytes(&buf)?;

    // The record normally sits right before the locator; the stored offset is
    // only correct when nothing was prefixed to the archive.
    let record_size = Zip64EOCD::MIN_SIZE as u64;
    let candidates = [
        locator_offset.checked_sub(record_size),
        Some(locator.eocd64_offset),
    ];
    for offset in candidates.into_iter().flatten() {
        if offset.checked_add(record_size).is_none_or(|end| end > locator_offset) {
            continue;
        }
        let buf = data.read_vec(offset, Zip64EOCD::MIN_SIZE)?;
        if &buf[0..4] == Zip64EOCD::SIGNATURE {
            return Ok(Some((Zip64EOCD::from_bytes(&buf)?, offset)));
        }
    }
    Err(ArchiveFormatError::InvalidZip64("record not found before locator").into())
}
