//! Error types for jar reading.
//!
//! Transport failures ([`Error::Io`]) are kept apart from archives that are not
//! valid jars ([`Error::Format`]) so callers can tell a failing disk from a
//! corrupt file.

use std::io;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the jar reader.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the underlying file failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The data is not a usable ZIP archive
    #[error("invalid archive: {0}")]
    Format(#[from] ArchiveFormatError),

    /// A subsection was requested outside the bounds of its parent view
    #[error("range [{offset}, +{length}) is outside data of length {available}")]
    OutOfBounds {
        offset: u64,
        length: u64,
        available: u64,
    },

    /// The entry uses a compression method other than STORED or DEFLATE
    #[error("unsupported compression method {method} for entry '{name}'")]
    UnsupportedMethod { name: String, method: u16 },

    /// A nested jar was requested for an entry that is compressed
    #[error(
        "unable to open nested entry '{0}': nested jar files must be stored without compression"
    )]
    CompressedNestedJar(String),

    /// A path segment or entry named by a `jar:` URL does not exist
    #[error("entry '{0}' not found")]
    NotFound(String),

    /// The string is not a `jar:file:` URL with at least one `!/`
    #[error("invalid jar URL: {0}")]
    InvalidUrl(String),
}

/// The bytes read do not form a usable ZIP archive.
#[derive(Debug, Error)]
pub enum ArchiveFormatError {
    /// No EOCD signature with a consistent comment length in the last 65557 bytes
    #[error("end of central directory record not found")]
    MissingEndRecord,

    /// The ZIP64 locator or record is missing or unreadable
    #[error("invalid zip64 end of central directory: {0}")]
    InvalidZip64(&'static str),

    /// A central directory record is truncated or has a bad signature
    #[error("invalid central directory at offset {offset:#x}: {reason}")]
    CentralDirectory { offset: usize, reason: &'static str },

    /// The number of records differs from the count in the end record
    #[error("central directory declares {declared} entries but holds {found}")]
    EntryCountMismatch { declared: u64, found: u64 },

    /// The local file header of an entry has a bad signature
    #[error("invalid local file header at offset {0:#x}")]
    LocalHeader(u64),

    /// The end record places the central directory before the first byte
    #[error("central directory position is before the start of the data")]
    ArchiveStartUnderflow,
}

/// Lets entry readers report library errors through [`std::io::Read`].
///
/// Transport errors are unwrapped; everything else becomes `InvalidData`.
impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
