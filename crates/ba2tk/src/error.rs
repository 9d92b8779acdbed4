//! Error types for BA2 archive operations

use thiserror::Error;

/// Result type for BA2 operations
pub type Ba2Result<T> = Result<T, Ba2Error>;

/// Error type covering opening, lookup and extraction
#[derive(Debug, Error)]
pub enum Ba2Error {
    /// Underlying I/O failure (missing file, permissions, short write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data is not a BA2 archive at all
    #[error("not a BA2 archive: {0}")]
    InvalidFormat(String),

    /// A BA2 archive of a version this reader does not know
    #[error("unsupported BA2 version: {0}")]
    UnsupportedVersion(u32),

    /// Record table or name table is inconsistent with the file
    #[error("corrupt archive index at offset {offset:#x}: {reason}")]
    CorruptIndex {
        /// What was wrong
        reason: String,
        /// Byte offset where the problem was detected
        offset: u64,
    },

    /// Fewer bytes were available than a structure or payload declares
    #[error("truncated {context} at offset {offset:#x}: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Structure or entry that was being read
        context: String,
        /// Byte offset of the read
        offset: u64,
        /// Bytes required
        expected: u64,
        /// Bytes available
        actual: u64,
    },

    /// A payload block failed to decode to its declared size
    #[error("decompression of '{entry}' at offset {offset:#x} failed: {reason}")]
    Decompression {
        /// Entry name
        entry: String,
        /// Byte offset of the compressed block
        offset: u64,
        /// Codec message or size mismatch description
        reason: String,
    },

    /// No entry with the given name or hash
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Chunk index past the end of a texture's chunk list
    #[error("chunk {index} out of range for '{entry}' ({count} chunks)")]
    ChunkOutOfRange {
        /// Entry name
        entry: String,
        /// Requested chunk
        index: usize,
        /// Chunks available
        count: usize,
    },

    /// Chunk or DDS access on a general-file entry
    #[error("'{0}' is not a texture entry")]
    NotATexture(String),

    /// Entry name would escape the extraction directory
    #[error("refusing to extract unsafe path: {0}")]
    UnsafePath(String),

    /// The archive has been closed
    #[error("archive is closed")]
    Closed,

    /// A progress callback asked to stop
    #[error("operation canceled")]
    Canceled,
}

impl Ba2Error {
    pub(crate) fn corrupt(reason: impl Into<String>, offset: u64) -> Self {
        Self::CorruptIndex {
            reason: reason.into(),
            offset,
        }
    }

    pub(crate) fn decompression(entry: &str, offset: u64, reason: impl Into<String>) -> Self {
        Self::Decompression {
            entry: entry.to_string(),
            offset,
            reason: reason.into(),
        }
    }

    /// Check if this error can only come out of opening an archive
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_) | Self::UnsupportedVersion(_) | Self::CorruptIndex { .. }
        )
    }

    /// Check if this error is local to one extraction, leaving the archive usable
    pub fn is_entry_failure(&self) -> bool {
        matches!(
            self,
            Self::Decompression { .. }
                | Self::Truncated { .. }
                | Self::EntryNotFound(_)
                | Self::ChunkOutOfRange { .. }
                | Self::NotATexture(_)
                | Self::UnsafePath(_)
        )
    }
}
