//! Shared helpers for integration tests: an in-memory ZIP writer.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::DeflateEncoder;

/// 2024-03-15 10:30:42 as MS-DOS time and date.
pub const DOS_TIME: u16 = (10 << 11) | (30 << 5) | 21;
pub const DOS_DATE: u16 = ((2024 - 1980) << 9) | (3 << 5) | 15;

struct Entry {
    name: Vec<u8>,
    data: Vec<u8>,
    deflate: bool,
    local_extra: Vec<u8>,
}

/// Builds ZIP archives entry by entry.
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
    zip64: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(Entry {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            deflate: false,
            local_extra: Vec::new(),
        });
        self
    }

    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(Entry {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            deflate: true,
            local_extra: Vec::new(),
        });
        self
    }

    pub fn directory(self, name: &str) -> Self {
        assert!(name.ends_with('/'));
        self.stored(name, b"")
    }

    /// Give the last entry an extra field that only its local header carries.
    pub fn local_extra(mut self, extra: &[u8]) -> Self {
        let entry = self.entries.last_mut().expect("no entry to extend");
        entry.local_extra = extra.to_vec();
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Always write a ZIP64 trailer, with escaped EOCD fields.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = out.len() as u32;
            let compressed = if entry.deflate {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&entry.data).unwrap();
                encoder.finish().unwrap()
            } else {
                entry.data.clone()
            };
            let mut crc = flate2::Crc::new();
            crc.update(&entry.data);
            let method: u16 = if entry.deflate { 8 } else { 0 };

            out.extend_from_slice(b"PK\x03\x04");
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&method.to_le_bytes());
            out.extend_from_slice(&DOS_TIME.to_le_bytes());
            out.extend_from_slice(&DOS_DATE.to_le_bytes());
            out.extend_from_slice(&crc.sum().to_le_bytes());
            out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(entry.local_extra.len() as u16).to_le_bytes());
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(&entry.local_extra);
            out.extend_from_slice(&compressed);

            central.extend_from_slice(b"PK\x01\x02");
            central.extend_from_slice(&20u16.to_le_bytes());
            central.extend_from_slice(&20u16.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&method.to_le_bytes());
            central.extend_from_slice(&DOS_TIME.to_le_bytes());
            central.extend_from_slice(&DOS_DATE.to_le_bytes());
            central.extend_from_slice(&crc.sum().to_le_bytes());
            central.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            central.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&0u32.to_le_bytes());
            central.extend_from_slice(&offset.to_le_bytes());
            central.extend_from_slice(&entry.name);
        }

        let cd_offset = out.len() as u64;
        let cd_size = central.len() as u64;
        let count = self.entries.len() as u64;
        out.extend_from_slice(&central);

        let zip64 = self.zip64 || count >= 0xFFFF;
        if zip64 {
            let record_offset = out.len() as u64;
            out.extend_from_slice(b"PK\x06\x06");
            out.extend_from_slice(&44u64.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&cd_size.to_le_bytes());
            out.extend_from_slice(&cd_offset.to_le_bytes());

            out.extend_from_slice(b"PK\x06\x07");
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&record_offset.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
        }

        let eocd_count: u16 = if zip64 { 0xFFFF } else { count as u16 };
        let (eocd_size, eocd_offset) = if zip64 {
            (u32::MAX, u32::MAX)
        } else {
            (cd_size as u32, cd_offset as u32)
        };
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&eocd_count.to_le_bytes());
        out.extend_from_slice(&eocd_count.to_le_bytes());
        out.extend_from_slice(&eocd_size.to_le_bytes());
        out.extend_from_slice(&eocd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }
}

/// The three-entry jar used by several tests.
pub fn sample_jar() -> ZipBuilder {
    ZipBuilder::new()
        .stored(
            "META-INF/MANIFEST.MF",
            b"Manifest-Version: 1.0\r\nStart-Class: com.example.App\r\n\r\n",
        )
        .stored("a/b.txt", b"hello from b")
        .deflated("c.bin", &deflatable_bytes())
}

/// Repetitive content that deflate shrinks.
pub fn deflatable_bytes() -> Vec<u8> {
    (0..10_000u32).map(|i| (i % 17) as u8).collect()
}

/// Write `bytes` to `name` inside `dir`.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Names of the files directly inside `dir`, sorted.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
