//! Archive handle: the public entry point for reading BA2 archives
//!
//! An [`Archive`] owns its byte source and entry index. It moves through
//! two states, open and closed; once closed every query and extraction
//! fails with [`Ba2Error::Closed`]. The handle is `Send + Sync` and all
//! extraction methods take `&self`, so one archive can serve several
//! threads at once.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{ExtractMode, LoadOptions};
use crate::dds::dds_header;
use crate::decoder::{decode_chunk, decode_entry};
use crate::entry::Entry;
use crate::error::{Ba2Error, Ba2Result};
use crate::hash::EntryHash;
use crate::header::{ArchiveKind, Ba2Header, Codec};
use crate::index::EntryIndex;
use crate::opener::open_source;
use crate::source::ByteSource;
use crate::stream::EntryStream;

/// Open the archive at `path`, with default options when `None`
pub fn load_ba2(path: impl AsRef<Path>, options: Option<LoadOptions>) -> Ba2Result<Archive> {
    Archive::open(path, options.unwrap_or_default())
}

/// Either an entry already looked up or a name to look up
#[derive(Debug, Clone, Copy)]
pub enum EntryRef<'a> {
    /// A resolved entry
    Entry(&'a Entry),
    /// A path inside the archive
    Name(&'a str),
}

impl<'a> From<&'a Entry> for EntryRef<'a> {
    fn from(entry: &'a Entry) -> Self {
        Self::Entry(entry)
    }
}

impl<'a> From<&'a str> for EntryRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for EntryRef<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

/// Payload handed back by [`Archive::read`]
pub enum Extraction<'a> {
    /// The whole payload in one buffer
    Buffered(Vec<u8>),
    /// A lazy sequence of blocks
    Streamed(EntryStream<'a>),
}

impl Extraction<'_> {
    /// Collect the payload into one buffer, draining a stream if needed
    pub fn into_bytes(self) -> Ba2Result<Vec<u8>> {
        match self {
            Self::Buffered(data) => Ok(data),
            Self::Streamed(stream) => stream.read_to_vec(),
        }
    }
}

/// An entry whose stored hash does not match the one computed from its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashMismatch {
    /// Entry name
    pub name: String,
    /// Hash triple stored in the record
    pub stored: EntryHash,
    /// Hash triple computed from the name
    pub computed: EntryHash,
}

/// An open BA2 archive
pub struct Archive {
    source: ByteSource,
    header: Ba2Header,
    index: EntryIndex,
    options: LoadOptions,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.source.path())
            .field("kind", &self.kind())
            .field("version", &self.header.version)
            .field("entries", &self.index.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Archive {
    /// Memory-map and open the archive at `path`
    pub fn open(path: impl AsRef<Path>, options: LoadOptions) -> Ba2Result<Self> {
        let path = path.as_ref();
        let source = ByteSource::open(path)?;
        let archive = Self::from_source(source, options)?;
        info!(
            "Opened {} archive {} (v{}, {} entries)",
            archive.kind(),
            path.display(),
            archive.header.version,
            archive.index.len()
        );
        Ok(archive)
    }

    /// Open an archive held in memory
    pub fn from_bytes(data: Vec<u8>, options: LoadOptions) -> Ba2Result<Self> {
        let archive = Self::from_source(ByteSource::from_bytes(data), options)?;
        debug!(
            "Opened in-memory {} archive (v{}, {} entries)",
            archive.kind(),
            archive.header.version,
            archive.index.len()
        );
        Ok(archive)
    }

    fn from_source(source: ByteSource, options: LoadOptions) -> Ba2Result<Self> {
        let opened = open_source(&source, &options)?;
        Ok(Self {
            source,
            header: opened.header,
            index: opened.index,
            options,
        })
    }

    /// Release the underlying file. Closing twice is a no-op.
    pub fn close(&self) {
        if self.source.close() {
            match self.source.path() {
                Some(path) => info!("Closed archive {}", path.display()),
                None => debug!("Closed in-memory archive"),
            }
        }
    }

    /// Check if [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.source.is_closed()
    }

    fn ensure_open(&self) -> Ba2Result<()> {
        if self.is_closed() {
            Err(Ba2Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Parsed header
    pub fn header(&self) -> &Ba2Header {
        &self.header
    }

    /// Archive sub-type
    pub fn kind(&self) -> ArchiveKind {
        self.header.kind()
    }

    /// Format version from the header
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Codec used for compressed payloads
    pub fn codec(&self) -> Codec {
        self.header.codec()
    }

    /// Options the archive was opened with
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Number of entries
    pub fn count(&self) -> Ba2Result<usize> {
        self.ensure_open()?;
        Ok(self.index.len())
    }

    /// Entries in record order; the iterator can be requested again at will
    pub fn list_entries(&self) -> Ba2Result<std::slice::Iter<'_, Entry>> {
        self.ensure_open()?;
        Ok(self.index.iter())
    }

    /// Entry names in record order
    pub fn file_list(&self) -> Ba2Result<Vec<String>> {
        Ok(self.list_entries()?.map(|e| e.name.clone()).collect())
    }

    /// Look up an entry by path, ignoring case and separator style
    pub fn find_entry(&self, name: &str) -> Ba2Result<&Entry> {
        self.ensure_open()?;
        self.index
            .find(name)
            .ok_or_else(|| Ba2Error::EntryNotFound(name.to_string()))
    }

    /// Look up an entry by its hash triple
    pub fn find_by_hash(&self, hash: &EntryHash) -> Ba2Result<&Entry> {
        self.ensure_open()?;
        self.index
            .find_by_hash(hash)
            .ok_or_else(|| Ba2Error::EntryNotFound(hash.to_string()))
    }

    /// Entries are accepted only when they belong to this archive's index;
    /// one taken from another archive is `EntryNotFound`.
    fn resolve<'a>(&'a self, entry: EntryRef<'a>) -> Ba2Result<&'a Entry> {
        match entry {
            EntryRef::Entry(entry) => {
                self.ensure_open()?;
                if !self.index.contains(entry) {
                    return Err(Ba2Error::EntryNotFound(entry.name.clone()));
                }
                Ok(entry)
            }
            EntryRef::Name(name) => self.find_entry(name),
        }
    }

    /// Full payload of an entry; textures come back without a DDS header
    pub fn extract<'a>(&'a self, entry: impl Into<EntryRef<'a>>) -> Ba2Result<Vec<u8>> {
        let entry = self.resolve(entry.into())?;
        decode_entry(&self.source, entry, self.codec())
    }

    /// Payload of one texture chunk
    pub fn extract_chunk<'a>(
        &'a self,
        entry: impl Into<EntryRef<'a>>,
        chunk_index: usize,
    ) -> Ba2Result<Vec<u8>> {
        let entry = self.resolve(entry.into())?;
        decode_chunk(&self.source, entry, chunk_index, self.codec())
    }

    /// Lazy block stream over an entry's payload
    pub fn extract_streamed<'a>(
        &'a self,
        entry: impl Into<EntryRef<'a>>,
    ) -> Ba2Result<EntryStream<'a>> {
        let entry = self.resolve(entry.into())?;
        Ok(EntryStream::new(
            &self.source,
            self.codec(),
            entry,
            self.options.block_size,
        ))
    }

    /// Texture payload prefixed with a DDS header
    pub fn extract_dds<'a>(&'a self, entry: impl Into<EntryRef<'a>>) -> Ba2Result<Vec<u8>> {
        let entry = self.resolve(entry.into())?;
        let info = entry
            .texture()
            .ok_or_else(|| Ba2Error::NotATexture(entry.name.clone()))?;
        let mut out = dds_header(info)?;
        out.extend_from_slice(&decode_entry(&self.source, entry, self.codec())?);
        Ok(out)
    }

    /// Buffered or streamed extraction, following the configured mode
    pub fn read<'a>(&'a self, entry: impl Into<EntryRef<'a>>) -> Ba2Result<Extraction<'a>> {
        let entry = entry.into();
        match self.options.mode {
            ExtractMode::Buffered => self.extract(entry).map(Extraction::Buffered),
            ExtractMode::Streamed => self.extract_streamed(entry).map(Extraction::Streamed),
        }
    }

    /// Entries whose stored hash differs from the one computed from the name.
    ///
    /// Archives without a name table only carry synthesized names, so
    /// there is nothing to compare and the report is empty.
    pub fn verify_hashes(&self) -> Ba2Result<Vec<HashMismatch>> {
        let entries = self.list_entries()?;
        if !self.header.has_names() {
            debug!("Archive has no name table, skipping hash verification");
            return Ok(Vec::new());
        }

        Ok(entries
            .filter_map(|entry| {
                let computed = EntryHash::from_path(&entry.name);
                (computed != entry.hash).then(|| HashMismatch {
                    name: entry.name.clone(),
                    stored: entry.hash,
                    computed,
                })
            })
            .collect())
    }
}
