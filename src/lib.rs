//! # nestjar
//!
//! Random access reader for executable jar files, including jars nested inside
//! other jars.
//!
//! A jar is read from its end: the End of Central Directory record locates the
//! central directory, which is indexed in memory without building per-entry
//! objects. Entry data is streamed from byte ranges of the file. A jar stored
//! inside another jar is opened by handing its byte range to the same reader,
//! so nothing is ever extracted to a temporary file.
//!
//! ## Features
//!
//! - One shared file handle per physical file, safe to use from many threads
//! - Launch scripts prepended to the jar are skipped automatically
//! - ZIP64 archives with 65535 entries or more
//! - Nested jars (`BOOT-INF/lib/*.jar`) and nested directories (`BOOT-INF/classes/`)
//! - `jar:` URLs with any number of `!/` separators
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Read;
//! use nestjar::JarFile;
//!
//! fn main() -> nestjar::Result<()> {
//!     let jar = JarFile::open("app.jar")?;
//!     for entry in jar.entries() {
//!         println!("{}", entry.name);
//!     }
//!
//!     if let Some(lib) = jar.nested_jar_file_by_name("BOOT-INF/lib/lib.jar")? {
//!         if let Some(entry) = lib.entry("com/example/Foo.class") {
//!             let mut bytes = Vec::new();
//!             lib.input_stream(&entry)?.read_to_end(&mut bytes)?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod url;
pub mod zip;

pub use cli::Cli;
pub use error::{ArchiveFormatError, Error, Result};
pub use io::{ByteArrayData, DataReader, RandomAccessData, RandomAccessDataFile};
pub use url::{Handler, JarUrl, JarUrlConnection};
pub use zip::{
    CompressionMethod, EntryReader, JarEntry, JarFile, JarFileKind, JarFileOptions, Manifest,
};
