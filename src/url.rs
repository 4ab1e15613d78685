//! `jar:` URLs with any number of nested `!/` separators.
//!
//! `jar:file:/app.jar!/BOOT-INF/lib/lib.jar!/com/example/Foo.class` names the
//! entry `com/example/Foo.class` of the jar `BOOT-INF/lib/lib.jar` stored in
//! `/app.jar`. [`Handler`] resolves such URLs through [`JarFile`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::zip::{EntryReader, FileIdentity, JarEntry, JarFile, JarFileOptions};

/// Separator between an archive and a path inside it.
pub const SEPARATOR: &str = "!/";

/// `file:` URL of a path, with UNC paths reduced to `file://server/share`.
pub fn file_url(path: &Path) -> String {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut path = path.to_string_lossy().replace('\\', "/");
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    format!("file:{}", encode(&path)).replacen("file:////", "file://", 1)
}

/// Percent-encode the bytes of `s` that cannot appear literally in a URL path.
pub fn encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        match b {
            b'%' | b' ' | b'#' | b'?' | b'"' | b'<' | b'>' | b'\\' | b'^' | b'`' | b'{' | b'|'
            | b'}' => out.push_str(&format!("%{b:02X}")),
            0x21..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Decode `%XX` escapes; malformed escapes are kept as they are.
pub fn decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// A parsed `jar:file:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarUrl {
    /// The physical file
    pub file: PathBuf,
    /// Nested jars or directories, outermost first
    pub nested: Vec<String>,
    /// Entry within the innermost jar, empty for the jar itself
    pub entry: String,
}

impl JarUrl {
    /// Split a `jar:file:` URL at its `!/` separators.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] if the URL is not `jar:file:`, has no separator,
    /// or has an empty nested segment.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = || Error::InvalidUrl(url.to_owned());
        let rest = url.strip_prefix("jar:").ok_or_else(invalid)?;
        let rest = rest.strip_prefix("file:").ok_or_else(invalid)?;
        if !rest.contains(SEPARATOR) {
            return Err(invalid());
        }

        let mut segments: Vec<String> = rest.split(SEPARATOR).map(decode).collect();
        let entry = segments.pop().unwrap_or_default();
        let mut file = segments.remove(0);
        if file.is_empty() {
            return Err(invalid());
        }
        // file:///app.jar and file:/app.jar name the same path
        if let Some(stripped) = file.strip_prefix("///") {
            file = format!("/{stripped}");
        }
        if segments.iter().any(String::is_empty) {
            return Err(invalid());
        }

        Ok(Self {
            file: PathBuf::from(file),
            nested: segments,
            entry,
        })
    }
}

impl fmt::Display for JarUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jar:{}", file_url(&self.file))?;
        for segment in &self.nested {
            write!(f, "{SEPARATOR}{}", encode(segment))?;
        }
        write!(f, "{SEPARATOR}{}", encode(&self.entry))
    }
}

/// An opened `jar:` URL: the innermost jar and, if named, one of its entries.
#[derive(Debug)]
pub struct JarUrlConnection {
    jar: JarFile,
    entry: Option<JarEntry>,
}

impl JarUrlConnection {
    /// The innermost jar named by the URL.
    pub fn jar_file(&self) -> &JarFile {
        &self.jar
    }

    /// The entry named after the last `!/`, if any.
    pub fn entry(&self) -> Option<&JarEntry> {
        self.entry.as_ref()
    }

    /// Uncompressed size of the entry, if the URL names one.
    pub fn content_length(&self) -> Option<u64> {
        self.entry.as_ref().map(|entry| entry.size)
    }

    /// Stream the entry the URL names.
    pub fn input_stream(&self) -> Result<EntryReader> {
        match &self.entry {
            Some(entry) => self.jar.input_stream(entry),
            None => Err(Error::NotFound(self.jar.url())),
        }
    }
}

/// Resolves `jar:` URLs through [`JarFile`], keeping root jars open.
///
/// Root jars are keyed by [`FileIdentity`], so a root file that is replaced or
/// modified on disk is opened again instead of served from the old parse.
pub struct Handler {
    options: JarFileOptions,
    roots: Mutex<HashMap<FileIdentity, JarFile>>,
}

static GLOBAL: Lazy<Handler> = Lazy::new(|| Handler::new(JarFileOptions::default()));

impl Handler {
    /// Create a handler that opens root jars with `options`.
    ///
    /// Most callers want [`Handler::global`]; a separate handler keeps its own
    /// set of open root jars.
    pub fn new(options: JarFileOptions) -> Self {
        Self {
            options,
            roots: Mutex::new(HashMap::new()),
        }
    }

    /// The handler shared by the whole process.
    pub fn global() -> &'static Handler {
        &GLOBAL
    }

    /// Resolve `url` to its jar and entry.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when a nested segment or the entry does not exist.
    pub fn open_connection(&self, url: &str) -> Result<JarUrlConnection> {
        let url = JarUrl::parse(url)?;
        let mut jar = self.root(&url.file)?;
        for segment in &url.nested {
            jar = jar
                .nested_jar_file_by_name(segment)?
                .ok_or_else(|| Error::NotFound(segment.clone()))?;
        }
        let entry = if url.entry.is_empty() {
            None
        } else {
            Some(
                jar.entry(&url.entry)
                    .ok_or_else(|| Error::NotFound(url.entry.clone()))?,
            )
        };
        Ok(JarUrlConnection { jar, entry })
    }

    /// The open root jar for `path`, opening it on a miss.
    ///
    /// Jars cached for an older version of the same file are forgotten.
    fn root(&self, path: &Path) -> Result<JarFile> {
        let identity = FileIdentity::of(path)?;
        if let Some(jar) = self.roots.lock().get(&identity) {
            return Ok(jar.clone());
        }
        let jar = JarFile::open_with(path, &self.options)?;
        debug!(path = %path.display(), "caching root jar for URL handler");

        let mut roots = self.roots.lock();
        roots.retain(|cached, _| cached.path() != identity.path() || *cached == identity);
        Ok(roots.entry(identity).or_insert(jar).clone())
    }

    /// Number of root jars currently held open.
    pub fn open_roots(&self) -> usize {
        self.roots.lock().len()
    }

    /// Close every cached root jar.
    pub fn clear(&self) {
        self.roots.lock().clear();
    }
}
