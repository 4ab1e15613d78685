//! Jar (ZIP) archive reading.
//!
//! ## Architecture
//!
//! - [`structures`]: fixed-layout ZIP records (EOCD, ZIP64 trailer, headers)
//! - [`end_record`]: finds the EOCD from the end of the data and derives the
//!   archive start, which absorbs bytes prepended to the archive
//! - [`central_directory`]: hash index over the raw central directory bytes
//! - [`jar_file`]: the [`JarFile`] facade, including nested jars and directories
//! - [`cache`]: process-wide reuse of parsed metadata for unchanged files
//! - [`manifest`]: `META-INF/MANIFEST.MF` parsing
//!
//! ## Supported Features
//!
//! - Standard ZIP format and ZIP64 trailers (65535 entries and more)
//! - STORED and DEFLATE entries
//! - Launch scripts or other bytes in front of the archive
//! - Jars stored inside jars, opened in place without extraction
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - Nested jars must be STORED

pub mod cache;
pub mod central_directory;
pub mod end_record;
mod entry;
mod jar_file;
pub mod manifest;
pub mod structures;

pub use cache::{FileIdentity, MetadataCache};
pub use end_record::EndRecord;
pub use entry::JarEntry;
pub use jar_file::{EntryReader, JarFile, JarFileKind, JarFileOptions};
pub use manifest::{Attributes, Manifest};
pub use structures::CompressionMethod;
