//! In-memory index over the raw central directory.
//!
//! The directory bytes are kept as read from the archive. Lookup goes through
//! a chained hash table whose slots only hold `(hash, next, offset)`; entry
//! metadata is decoded from the bytes at `offset` when someone asks for it.
//! Slots are stored in directory order, so walking them front to back
//! replays the archive's own entry order.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use super::structures::{
    CDFH_MIN_SIZE, CDFH_SIGNATURE, CompressionMethod, ZIP64_EXTRA_ID, cdfh, u16_at, u32_at,
};
use crate::error::{ArchiveFormatError, Result};

/// Marks the end of a bucket chain.
const NONE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Slot {
    hash: u32,
    next: u32,
    offset: usize,
}

/// Parsed central directory with name lookup in directory order.
#[derive(Debug)]
pub struct CentralDirectory {
    bytes: Vec<u8>,
    table: Vec<u32>,
    slots: Vec<Slot>,
}

impl CentralDirectory {
    /// Index `bytes`, which must hold exactly `declared_entries` records.
    ///
    /// # Errors
    ///
    /// Any truncated record, bad signature, or a record count that differs from
    /// `declared_entries` makes the archive unusable.
    pub fn parse(bytes: Vec<u8>, declared_entries: u64) -> Result<Self> {
        if declared_entries >= NONE as u64 {
            return Err(ArchiveFormatError::CentralDirectory {
                offset: 0,
                reason: "too many entries",
            }
            .into());
        }
        let capacity = declared_entries as usize;
        // A corrupt count must not drive the allocation
        let expected = capacity.min(bytes.len() / CDFH_MIN_SIZE);
        let table_size = (expected / 2).max(1);
        let mut table = vec![NONE; table_size];
        let mut slots: Vec<Slot> = Vec::with_capacity(expected);

        let mut offset = 0usize;
        while offset < bytes.len() {
            if slots.len() == capacity {
                return Err(ArchiveFormatError::EntryCountMismatch {
                    declared: declared_entries,
                    found: slots.len() as u64 + 1,
                }
                .into());
            }
            let record_size = record_size(&bytes, offset)?;
            let name = &bytes[offset + CDFH_MIN_SIZE
                ..offset + CDFH_MIN_SIZE + u16_at(&bytes, offset + cdfh::NAME_LENGTH) as usize];
            let hash = name_hash(&[name]);
            let bucket = hash as usize % table_size;

            slots.push(Slot {
                hash,
                next: table[bucket],
                offset,
            });
            table[bucket] = (slots.len() - 1) as u32;
            offset += record_size;
        }

        if slots.len() != capacity {
            return Err(ArchiveFormatError::EntryCountMismatch {
                declared: declared_entries,
                found: slots.len() as u64,
            }
            .into());
        }

        debug!(entries = slots.len(), bytes = bytes.len(), "indexed central directory");
        Ok(Self {
            bytes,
            table,
            slots,
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Find the entry whose name is the concatenation of `parts`.
    ///
    /// When nothing matches exactly and the name does not already end with
    /// `/`, the lookup is retried as a directory name.
    pub fn find(&self, parts: &[&[u8]]) -> Option<CentralDirectoryEntry<'_>> {
        if let Some(entry) = self.find_exact(parts) {
            return Some(entry);
        }
        let ends_with_slash = parts
            .iter()
            .rev()
            .find(|part| !part.is_empty())
            .is_some_and(|part| part.ends_with(b"/"));
        if ends_with_slash {
            return None;
        }
        let mut with_slash: Vec<&[u8]> = parts.to_vec();
        with_slash.push(b"/");
        self.find_exact(&with_slash)
    }

    /// Lookup without the directory retry.
    fn find_exact(&self, parts: &[&[u8]]) -> Option<CentralDirectoryEntry<'_>> {
        let hash = name_hash(parts);
        let mut index = self.table[hash as usize % self.table.len()];
        while index != NONE {
            let slot = &self.slots[index as usize];
            if slot.hash == hash {
                let entry = self.entry_at_offset(slot.offset);
                if name_equals(entry.name(), parts) {
                    return Some(entry);
                }
            }
            index = slot.next;
        }
        None
    }

    /// Entry at position `index` in directory order.
    pub fn entry(&self, index: usize) -> Option<CentralDirectoryEntry<'_>> {
        self.slots.get(index).map(|slot| self.entry_at_offset(slot.offset))
    }

    /// All entries in directory order.
    pub fn iter(&self) -> impl Iterator<Item = CentralDirectoryEntry<'_>> + '_ {
        self.slots.iter().map(|slot| self.entry_at_offset(slot.offset))
    }

    fn entry_at_offset(&self, offset: usize) -> CentralDirectoryEntry<'_> {
        let end = offset + record_size_unchecked(&self.bytes, offset);
        CentralDirectoryEntry {
            record: &self.bytes[offset..end],
            offset,
        }
    }
}

/// Polynomial hash of the concatenated `parts`, multiplier 31.
pub(crate) fn name_hash(parts: &[&[u8]]) -> u32 {
    parts
        .iter()
        .flat_map(|part| part.iter())
        .fold(0u32, |hash, &b| hash.wrapping_mul(31).wrapping_add(b as u32))
}

/// Whether `name` is exactly the concatenation of `parts`.
fn name_equals(name: &[u8], parts: &[&[u8]]) -> bool {
    let mut rest = name;
    for part in parts {
        match rest.strip_prefix(*part) {
            Some(tail) => rest = tail,
            None => return false,
        }
    }
    rest.is_empty()
}

/// Length of the record at `offset`, checked against the directory bounds.
fn record_size(bytes: &[u8], offset: usize) -> Result<usize> {
    let invalid = |reason| ArchiveFormatError::CentralDirectory { offset, reason };
    if bytes.len() - offset < CDFH_MIN_SIZE {
        return Err(invalid("truncated header").into());
    }
    if &bytes[offset..offset + 4] != CDFH_SIGNATURE {
        return Err(invalid("bad signature").into());
    }
    let size = record_size_unchecked(bytes, offset);
    if bytes.len() - offset < size {
        return Err(invalid("record extends past the end of the directory").into());
    }
    Ok(size)
}

fn record_size_unchecked(bytes: &[u8], offset: usize) -> usize {
    CDFH_MIN_SIZE
        + u16_at(bytes, offset + cdfh::NAME_LENGTH) as usize
        + u16_at(bytes, offset + cdfh::EXTRA_LENGTH) as usize
        + u16_at(bytes, offset + cdfh::COMMENT_LENGTH) as usize
}

/// One central directory record, decoded on demand.
#[derive(Debug, Clone, Copy)]
pub struct CentralDirectoryEntry<'a> {
    record: &'a [u8],
    offset: usize,
}

impl<'a> CentralDirectoryEntry<'a> {
    /// Offset of this record within the central directory.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn name_length(&self) -> usize {
        u16_at(self.record, cdfh::NAME_LENGTH) as usize
    }

    fn extra_length(&self) -> usize {
        u16_at(self.record, cdfh::EXTRA_LENGTH) as usize
    }

    /// Raw entry name as stored.
    pub fn name(&self) -> &'a [u8] {
        &self.record[CDFH_MIN_SIZE..CDFH_MIN_SIZE + self.name_length()]
    }

    /// Central directory copy of the extra field.
    pub fn extra(&self) -> &'a [u8] {
        let start = CDFH_MIN_SIZE + self.name_length();
        &self.record[start..start + self.extra_length()]
    }

    /// Entry comment.
    pub fn comment(&self) -> &'a [u8] {
        &self.record[CDFH_MIN_SIZE + self.name_length() + self.extra_length()..]
    }

    /// Compression method of the entry data.
    pub fn method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(u16_at(self.record, cdfh::METHOD))
    }

    /// CRC-32 of the uncompressed data.
    pub fn crc32(&self) -> u32 {
        u32_at(self.record, cdfh::CRC32)
    }

    /// Packed MS-DOS date (high half) and time (low half).
    pub fn dos_time(&self) -> u32 {
        (u16_at(self.record, cdfh::DATE) as u32) << 16 | u16_at(self.record, cdfh::TIME) as u32
    }

    /// Last modification time, or `None` if the packed value is not a valid date.
    pub fn last_modified(&self) -> Option<NaiveDateTime> {
        decode_dos_time(self.dos_time())
    }

    /// Size of the stored data, ZIP64 value applied.
    pub fn compressed_size(&self) -> u64 {
        self.zip64_fields().1
    }

    /// Uncompressed size, ZIP64 value applied.
    pub fn size(&self) -> u64 {
        self.zip64_fields().0
    }

    /// Offset of the local file header, relative to the archive start.
    pub fn local_header_offset(&self) -> u64 {
        self.zip64_fields().2
    }

    /// `(size, compressed size, local header offset)` with ZIP64 values applied.
    ///
    /// The extended information field only carries the values whose 32-bit
    /// slot holds 0xFFFFFFFF, in this fixed order.
    fn zip64_fields(&self) -> (u64, u64, u64) {
        let raw = [
            u32_at(self.record, cdfh::UNCOMPRESSED_SIZE),
            u32_at(self.record, cdfh::COMPRESSED_SIZE),
            u32_at(self.record, cdfh::LOCAL_HEADER_OFFSET),
        ];
        let mut values = raw.map(u64::from);
        if !raw.contains(&u32::MAX) {
            return (values[0], values[1], values[2]);
        }

        let extra = self.extra();
        let mut pos = 0;
        while pos + 4 <= extra.len() {
            let id = u16_at(extra, pos);
            let size = u16_at(extra, pos + 2) as usize;
            let data = &extra[pos + 4..(pos + 4 + size).min(extra.len())];
            if id == ZIP64_EXTRA_ID {
                let mut cursor = 0;
                for (value, raw) in values.iter_mut().zip(raw) {
                    if raw == u32::MAX && cursor + 8 <= data.len() {
                        let mut le = [0u8; 8];
                        le.copy_from_slice(&data[cursor..cursor + 8]);
                        *value = u64::from_le_bytes(le);
                        cursor += 8;
                    }
                }
                break;
            }
            pos += 4 + size;
        }
        (values[0], values[1], values[2])
    }
}

/// Decode an MS-DOS `date << 16 | time` value.
pub fn decode_dos_time(dos_time: u32) -> Option<NaiveDateTime> {
    let date = dos_time >> 16;
    let time = dos_time & 0xFFFF;
    let year = ((date >> 9) & 0x7F) as i32 + 1980;
    let month = (date >> 5) & 0x0F;
    let day = date & 0x1F;
    let hour = (time >> 11) & 0x1F;
    let minute = (time >> 5) & 0x3F;
    let second = (time << 1) & 0x3E;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}
