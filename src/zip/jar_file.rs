//! The [`JarFile`] facade.
//!
//! A `JarFile` is an archive view: a [`RandomAccessData`] range plus the
//! central directory parsed from it. Opening a nested jar cuts a new range out
//! of the parent and runs the same pipeline on it; opening a nested directory
//! shares the parent's range and directory and only filters names by prefix.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::DeflateDecoder;
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use super::cache::{ArchiveMetadata, FileIdentity, MetadataCache};
use super::central_directory::CentralDirectory;
use super::end_record::EndRecord;
use super::entry::JarEntry;
use super::manifest::{MANIFEST_NAME, Manifest};
use super::structures::{CompressionMethod, LFH_SIZE, LocalFileHeader};
use crate::error::{Error, Result};
use crate::io::{DataReader, RandomAccessData, RandomAccessDataFile};
use crate::url;

/// Options for [`JarFile::open_with`].
#[derive(Debug, Clone)]
pub struct JarFileOptions {
    /// Reuse central directories parsed earlier in this process for unchanged files
    pub use_metadata_cache: bool,
}

impl Default for JarFileOptions {
    fn default() -> Self {
        Self {
            use_metadata_cache: true,
        }
    }
}

/// How a [`JarFile`] relates to the physical file it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JarFileKind {
    /// The file itself
    Direct,
    /// A directory entry of a parent jar
    NestedDirectory,
    /// A stored jar entry of a parent jar
    NestedJar,
}

/// Random access, name indexed view of a jar archive.
#[derive(Clone)]
pub struct JarFile {
    root: PathBuf,
    /// `!/`-separated path from the root file, empty for the root itself
    path_from_root: String,
    kind: JarFileKind,
    /// The archive proper, prefixed bytes excluded
    data: Arc<dyn RandomAccessData>,
    end_record: Arc<EndRecord>,
    directory: Arc<CentralDirectory>,
    /// Name prefix of a nested directory view
    prefix: Vec<u8>,
    manifest: Arc<OnceCell<Option<Manifest>>>,
}

impl JarFile {
    /// Open the jar at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &JarFileOptions::default())
    }

    /// Open the jar at `path`.
    ///
    /// The end record is located and the central directory indexed, or both are
    /// taken from [`MetadataCache::global`] when the cache is enabled and the
    /// file has not changed since it was last parsed.
    ///
    /// # Arguments
    ///
    /// * `path` - The physical jar file
    /// * `options` - Reader options
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Format`] if it is not a
    /// valid archive.
    pub fn open_with(path: impl AsRef<Path>, options: &JarFileOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = RandomAccessDataFile::open(path)?;
        let file: Arc<dyn RandomAccessData> = Arc::new(file);

        let metadata = if options.use_metadata_cache {
            let identity = FileIdentity::of(path)?;
            MetadataCache::global().get_or_parse(identity, || read_metadata(file.as_ref()))?
        } else {
            Arc::new(read_metadata(file.as_ref())?)
        };

        let data = metadata.end_record.archive_data(file.as_ref())?;
        debug!(
            path = %path.display(),
            entries = metadata.directory.len(),
            "opened jar file"
        );
        Ok(Self::new(
            path.to_path_buf(),
            String::new(),
            JarFileKind::Direct,
            data,
            metadata.end_record.clone(),
            Arc::clone(&metadata.directory),
        ))
    }

    /// Read a jar from any data source. `root` names it in URLs.
    pub fn from_data(data: Arc<dyn RandomAccessData>, root: impl Into<PathBuf>) -> Result<Self> {
        Self::parse(data, root.into(), String::new(), JarFileKind::Direct)
    }

    /// Run the full end record and central directory pipeline over `data`.
    fn parse(
        data: Arc<dyn RandomAccessData>,
        root: PathBuf,
        path_from_root: String,
        kind: JarFileKind,
    ) -> Result<Self> {
        let metadata = read_metadata(data.as_ref())?;
        let data = metadata.end_record.archive_data(data.as_ref())?;
        Ok(Self::new(
            root,
            path_from_root,
            kind,
            data,
            metadata.end_record,
            metadata.directory,
        ))
    }

    fn new(
        root: PathBuf,
        path_from_root: String,
        kind: JarFileKind,
        data: Arc<dyn RandomAccessData>,
        end_record: EndRecord,
        directory: Arc<CentralDirectory>,
    ) -> Self {
        Self {
            root,
            path_from_root,
            kind,
            data,
            end_record: Arc::new(end_record),
            directory,
            prefix: Vec::new(),
            manifest: Arc::new(OnceCell::new()),
        }
    }

    /// Path of the physical file this jar lives in.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Path from the root file, such as `!/BOOT-INF/lib/lib.jar`.
    pub fn path_from_root(&self) -> &str {
        &self.path_from_root
    }

    /// Whether this is the file itself, a nested jar or a nested directory.
    pub fn kind(&self) -> JarFileKind {
        self.kind
    }

    /// Trailer of the archive this view reads from.
    pub fn end_record(&self) -> &EndRecord {
        &self.end_record
    }

    /// Archive comment.
    pub fn comment(&self) -> &[u8] {
        &self.end_record.comment
    }

    /// Look up an entry by name.
    ///
    /// Returns `None` if no such entry exists in this view.
    pub fn entry(&self, name: &str) -> Option<JarEntry> {
        if name.is_empty() && !self.prefix.is_empty() {
            return None;
        }
        let found = self
            .directory
            .find(&[self.prefix.as_slice(), name.as_bytes()])
            .map(|entry| JarEntry::from_directory(&entry, &self.prefix));
        trace!(name, found = found.is_some(), "entry lookup");
        found
    }

    /// Whether an entry called `name` exists in this view.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Entries of this view in central directory order.
    pub fn entries(&self) -> impl Iterator<Item = JarEntry> + '_ {
        let prefix = self.prefix.as_slice();
        self.directory
            .iter()
            .filter(move |entry| {
                let name = entry.name();
                prefix.is_empty() || (name.starts_with(prefix) && name.len() > prefix.len())
            })
            .map(move |entry| JarEntry::from_directory(&entry, prefix))
    }

    /// Number of entries in this view.
    pub fn len(&self) -> usize {
        if self.prefix.is_empty() {
            self.directory.len()
        } else {
            self.entries().count()
        }
    }

    /// Whether this view has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw (possibly compressed) bytes of `entry`.
    ///
    /// The local file header is read to find where the data starts, since its
    /// name and extra lengths can differ from the central directory's copy.
    pub fn entry_data(&self, entry: &JarEntry) -> Result<Arc<dyn RandomAccessData>> {
        let offset = entry.local_header_offset();
        let mut header = [0u8; LFH_SIZE];
        self.data.read_exact_at(offset, &mut header)?;
        let header = LocalFileHeader::from_bytes(&header, offset)?;
        self.data
            .subsection(offset + header.size(), entry.compressed_size)
    }

    /// Stream the uncompressed content of `entry`.
    ///
    /// STORED data is returned as is and DEFLATE data is inflated while reading.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedMethod`] for any other compression method, or a
    /// format error if the local file header is invalid.
    pub fn input_stream(&self, entry: &JarEntry) -> Result<EntryReader> {
        let data = DataReader::new(self.entry_data(entry)?);
        match entry.method {
            CompressionMethod::Stored => Ok(EntryReader::Stored(data)),
            CompressionMethod::Deflated => Ok(EntryReader::Deflated(DeflateDecoder::new(data))),
            CompressionMethod::Unknown(method) => Err(Error::UnsupportedMethod {
                name: entry.name.clone(),
                method,
            }),
        }
    }

    /// Read the whole uncompressed content of the named entry.
    ///
    /// # Returns
    ///
    /// `None` if no such entry exists, otherwise the entry's bytes.
    pub fn read_entry(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.entry(name) else {
            return Ok(None);
        };
        let mut buf = Vec::with_capacity(self.capacity_hint(&entry));
        self.input_stream(&entry)?.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    /// Buffer size for reading `entry`, bounded by the size of the archive.
    fn capacity_hint(&self, entry: &JarEntry) -> usize {
        entry.size.min(self.data.len()) as usize
    }

    /// The jar manifest, parsed on first use.
    ///
    /// A nested directory without its own manifest reports the manifest of the
    /// archive it lives in.
    pub fn manifest(&self) -> Result<Option<&Manifest>> {
        let manifest = self.manifest.get_or_try_init(|| {
            let entry = self.entry(MANIFEST_NAME).or_else(|| {
                (self.kind == JarFileKind::NestedDirectory)
                    .then(|| self.directory.find(&[MANIFEST_NAME.as_bytes()]))
                    .flatten()
                    .map(|entry| JarEntry::from_directory(&entry, b""))
            });
            match entry {
                Some(entry) => {
                    let mut bytes = Vec::with_capacity(self.capacity_hint(&entry));
                    self.input_stream(&entry)?.read_to_end(&mut bytes)?;
                    Ok::<_, Error>(Some(Manifest::parse(&bytes)))
                }
                None => Ok(None),
            }
        })?;
        Ok(manifest.as_ref())
    }

    /// Open `entry` as a jar of its own.
    ///
    /// Directory entries become a name-filtered view over this jar; file
    /// entries must be stored uncompressed and are parsed from their byte range.
    pub fn nested_jar_file(&self, entry: &JarEntry) -> Result<JarFile> {
        if entry.is_directory() {
            return Ok(self.nested_directory(entry));
        }
        if entry.method != CompressionMethod::Stored {
            return Err(Error::CompressedNestedJar(entry.name.clone()));
        }
        let data = self.entry_data(entry)?;
        let path_from_root = format!("{}!/{}", self.path_from_root, entry.name);
        debug!(path = %path_from_root, size = data.len(), "opening nested jar");
        Self::parse(
            data,
            self.root.clone(),
            path_from_root,
            JarFileKind::NestedJar,
        )
    }

    /// Look up `name` and open it as a nested jar.
    ///
    /// # Returns
    ///
    /// `None` if no such entry exists.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> nestjar::Result<()> {
    /// let jar = nestjar::JarFile::open("app.jar")?;
    /// let lib = jar.nested_jar_file_by_name("BOOT-INF/lib/lib.jar")?;
    /// let classes = jar.nested_jar_file_by_name("BOOT-INF/classes/")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn nested_jar_file_by_name(&self, name: &str) -> Result<Option<JarFile>> {
        self.entry(name)
            .map(|entry| self.nested_jar_file(&entry))
            .transpose()
    }

    /// View of the entries under directory `entry`, sharing this jar's index.
    fn nested_directory(&self, entry: &JarEntry) -> JarFile {
        let name = entry.name.trim_end_matches('/');
        let mut prefix = self.prefix.clone();
        prefix.extend_from_slice(entry.name.as_bytes());
        JarFile {
            root: self.root.clone(),
            path_from_root: format!("{}!/{}", self.path_from_root, name),
            kind: JarFileKind::NestedDirectory,
            data: Arc::clone(&self.data),
            end_record: Arc::clone(&self.end_record),
            directory: Arc::clone(&self.directory),
            prefix,
            manifest: Arc::new(OnceCell::new()),
        }
    }

    /// URL of this jar, such as `jar:file:/app.jar!/BOOT-INF/lib/lib.jar!/`.
    pub fn url(&self) -> String {
        format!(
            "jar:{}{}!/",
            url::file_url(&self.root),
            url::encode(&self.path_from_root)
        )
    }

    /// URL of `entry` within this jar.
    pub fn entry_url(&self, entry: &JarEntry) -> String {
        format!("{}{}", self.url(), url::encode(&entry.name))
    }
}

impl std::fmt::Debug for JarFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JarFile")
            .field("root", &self.root)
            .field("path_from_root", &self.path_from_root)
            .field("kind", &self.kind)
            .field("entries", &self.directory.len())
            .finish()
    }
}

/// Locate the end record of `data` and index its central directory.
fn read_metadata(data: &dyn RandomAccessData) -> Result<ArchiveMetadata> {
    let end_record = EndRecord::locate(data)?;
    let archive = end_record.archive_data(data)?;
    let bytes = end_record.read_central_directory(archive.as_ref())?;
    let directory = CentralDirectory::parse(bytes, end_record.entries)?;
    Ok(ArchiveMetadata {
        end_record,
        directory: Arc::new(directory),
    })
}

/// Uncompressed content of one entry.
pub enum EntryReader {
    /// Data read as stored
    Stored(DataReader),
    /// Raw DEFLATE data inflated on the fly
    Deflated(DeflateDecoder<DataReader>),
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            EntryReader::Stored(reader) => reader.read(buf),
            EntryReader::Deflated(reader) => reader.read(buf),
        }
    }
}
