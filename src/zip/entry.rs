use chrono::NaiveDateTime;

use super::central_directory::{CentralDirectoryEntry, decode_dos_time};
use super::structures::CompressionMethod;

/// Metadata of one jar entry, decoded from the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarEntry {
    /// Entry name, relative to the jar it was looked up in
    pub name: String,
    pub method: CompressionMethod,
    pub crc32: u32,
    pub compressed_size: u64,
    /// Uncompressed size
    pub size: u64,
    /// MS-DOS `date << 16 | time`
    pub dos_time: u32,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    local_header_offset: u64,
    directory_offset: usize,
}

impl JarEntry {
    /// Build an entry whose name has `prefix` removed.
    pub(crate) fn from_directory(entry: &CentralDirectoryEntry<'_>, prefix: &[u8]) -> Self {
        let name = entry.name();
        let name = name.strip_prefix(prefix).unwrap_or(name);
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            method: entry.method(),
            crc32: entry.crc32(),
            compressed_size: entry.compressed_size(),
            size: entry.size(),
            dos_time: entry.dos_time(),
            extra: entry.extra().to_vec(),
            comment: entry.comment().to_vec(),
            local_header_offset: entry.local_header_offset(),
            directory_offset: entry.offset(),
        }
    }

    /// Directory entries end with '/'
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Last modification time, if the stored MS-DOS value is a real date.
    pub fn last_modified(&self) -> Option<NaiveDateTime> {
        decode_dos_time(self.dos_time)
    }

    /// Offset of the entry's local file header within its archive.
    pub fn local_header_offset(&self) -> u64 {
        self.local_header_offset
    }

    /// Offset of the entry's record within the central directory.
    pub fn directory_offset(&self) -> usize {
        self.directory_offset
    }
}
