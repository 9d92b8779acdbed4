//! Byte source backing an open archive
//!
//! Files are memory-mapped read-only; in-memory archives own their buffer.
//! Every read is a positioned copy taken under a shared lock, so concurrent
//! readers never share a cursor. Closing takes the exclusive lock and drops
//! the backing, after which every read fails with `Closed`.

use memmap2::{Mmap, MmapOptions};
use parking_lot::RwLock;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Ba2Error, Ba2Result};

/// Largest single read a [`SourceReader`] issues
const READ_BLOCK: usize = 64 * 1024;

enum Backing {
    Mapped(Mmap),
    Memory(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Memory(data) => data.as_slice(),
        }
    }
}

/// Shared, closeable random-access byte source
pub(crate) struct ByteSource {
    backing: RwLock<Option<Backing>>,
    len: u64,
    path: Option<PathBuf>,
}

impl ByteSource {
    /// Memory-map a file
    pub(crate) fn open(path: &Path) -> Ba2Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        let backing = if len == 0 {
            Backing::Memory(Vec::new())
        } else {
            #[allow(unsafe_code)]
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            Backing::Mapped(mmap)
        };
        debug!("Mapped {} ({} bytes)", path.display(), len);

        Ok(Self {
            backing: RwLock::new(Some(backing)),
            len,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an owned buffer
    pub(crate) fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            len: data.len() as u64,
            backing: RwLock::new(Some(Backing::Memory(data))),
            path: None,
        }
    }

    /// Total length in bytes
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// File the source was opened from, if any
    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` over `len` bytes at `offset`.
    ///
    /// Fails with `Closed` after [`close`](Self::close) and with `Truncated`
    /// when the range extends past the end of the source.
    pub(crate) fn with_slice<T>(
        &self,
        offset: u64,
        len: u64,
        context: &str,
        f: impl FnOnce(&[u8]) -> T,
    ) -> Ba2Result<T> {
        let guard = self.backing.read();
        let bytes = guard.as_ref().ok_or(Ba2Error::Closed)?.bytes();

        let available = (bytes.len() as u64).saturating_sub(offset);
        if len > available {
            return Err(Ba2Error::Truncated {
                context: context.to_string(),
                offset,
                expected: len,
                actual: available,
            });
        }

        // Both fit in usize: they are bounded by a slice length.
        let start = offset as usize;
        let end = start + len as usize;
        Ok(f(&bytes[start..end]))
    }

    /// Copy `len` bytes at `offset` into a new buffer
    pub(crate) fn read_at(&self, offset: u64, len: u64, context: &str) -> Ba2Result<Vec<u8>> {
        self.with_slice(offset, len, context, <[u8]>::to_vec)
    }

    /// Release the backing; returns whether it was still open
    pub(crate) fn close(&self) -> bool {
        self.backing.write().take().is_some()
    }

    /// Check if the source has been closed
    pub(crate) fn is_closed(&self) -> bool {
        self.backing.read().is_none()
    }
}

/// Sequential [`Read`] view over a byte range of a [`ByteSource`].
///
/// Reads at most [`READ_BLOCK`] bytes per call so that decoders layered on
/// top pull compressed input incrementally.
pub(crate) struct SourceReader<'a> {
    source: &'a ByteSource,
    position: u64,
    end: u64,
    context: &'a str,
}

impl<'a> SourceReader<'a> {
    pub(crate) fn new(source: &'a ByteSource, offset: u64, len: u64, context: &'a str) -> Self {
        Self {
            source,
            position: offset,
            end: offset.saturating_add(len),
            context,
        }
    }
}

impl Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.end.saturating_sub(self.position);
        let n = buf.len().min(READ_BLOCK).min(remaining as usize);
        if n == 0 {
            return Ok(0);
        }

        self.source
            .with_slice(self.position, n as u64, self.context, |bytes| {
                buf[..n].copy_from_slice(bytes);
            })
            .map_err(io::Error::other)?;
        self.position += n as u64;
        Ok(n)
    }
}
