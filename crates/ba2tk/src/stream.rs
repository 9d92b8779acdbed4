//! Streamed extraction
//!
//! [`EntryStream`] yields an entry's payload as a sequence of bounded
//! blocks. Raw and zlib data are pulled from the archive as the caller
//! consumes the stream; LZ4 blocks cannot be decoded incrementally, so each
//! one is decoded whole and then handed out in pieces.

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::compression::size_mismatch;
use crate::decoder::decode_block;
use crate::entry::{Block, Entry};
use crate::error::{Ba2Error, Ba2Result};
use crate::header::Codec;
use crate::source::{ByteSource, SourceReader};

enum BlockCursor<'a> {
    Raw {
        position: u64,
        end: u64,
    },
    Zlib {
        decoder: Box<ZlibDecoder<SourceReader<'a>>>,
        block: Block,
        produced: u64,
    },
    Decoded {
        data: Vec<u8>,
        position: usize,
    },
}

/// Lazy sequence of payload blocks for one entry.
///
/// Borrows the archive it came from. Each item is at most the configured
/// block size. After the archive is closed the next item is `Err(Closed)`;
/// after any error the stream ends.
pub struct EntryStream<'a> {
    source: &'a ByteSource,
    codec: Codec,
    name: String,
    blocks: std::vec::IntoIter<Block>,
    current: Option<BlockCursor<'a>>,
    block_size: usize,
    produced: u64,
    total: u64,
    finished: bool,
}

impl<'a> EntryStream<'a> {
    pub(crate) fn new(
        source: &'a ByteSource,
        codec: Codec,
        entry: &Entry,
        block_size: usize,
    ) -> Self {
        Self {
            source,
            codec,
            name: entry.name.clone(),
            blocks: entry.blocks().into_iter(),
            current: None,
            block_size: block_size.max(1),
            produced: 0,
            total: entry.uncompressed_size(),
            finished: false,
        }
    }

    /// Total bytes the stream yields when read to the end
    pub fn total_size(&self) -> u64 {
        self.total
    }

    /// Bytes yielded so far
    pub fn position(&self) -> u64 {
        self.produced
    }

    /// Collect the remaining blocks into one buffer
    pub fn read_to_vec(self) -> Ba2Result<Vec<u8>> {
        let mut out = Vec::new();
        for block in self {
            out.extend_from_slice(&block?);
        }
        Ok(out)
    }

    fn start_block(&self, block: Block) -> Ba2Result<BlockCursor<'a>> {
        if !block.is_compressed() {
            return Ok(BlockCursor::Raw {
                position: block.offset,
                end: block.offset.saturating_add(block.stored_size()),
            });
        }

        match self.codec {
            Codec::Zlib => {
                let reader = SourceReader::new(
                    self.source,
                    block.offset,
                    block.stored_size(),
                    "compressed block",
                );
                Ok(BlockCursor::Zlib {
                    decoder: Box::new(ZlibDecoder::new(reader)),
                    block,
                    produced: 0,
                })
            }
            Codec::Lz4 => Ok(BlockCursor::Decoded {
                data: decode_block(self.source, &block, self.codec, &self.name)?,
                position: 0,
            }),
        }
    }

    fn pull(&self, cursor: &mut BlockCursor<'a>) -> Ba2Result<Option<Vec<u8>>> {
        match cursor {
            BlockCursor::Raw { position, end } => {
                let n = (*end - *position).min(self.block_size as u64);
                if n == 0 {
                    return Ok(None);
                }
                let bytes = self.source.read_at(*position, n, &self.name)?;
                *position += n;
                Ok(Some(bytes))
            }
            BlockCursor::Decoded { data, position } => {
                if *position >= data.len() {
                    return Ok(None);
                }
                let end = (*position + self.block_size).min(data.len());
                let bytes = data[*position..end].to_vec();
                *position = end;
                Ok(Some(bytes))
            }
            BlockCursor::Zlib {
                decoder,
                block,
                produced,
            } => {
                let expected = u64::from(block.unpacked_size);
                let remaining = expected - *produced;

                if remaining == 0 {
                    let mut probe = [0u8; 1];
                    let extra = decoder
                        .read(&mut probe)
                        .map_err(|e| self.stream_error(block, &e))?;
                    if extra != 0 {
                        return Err(Ba2Error::decompression(
                            &self.name,
                            block.offset,
                            size_mismatch(expected, expected + 1),
                        ));
                    }
                    return Ok(None);
                }

                let mut buf = vec![0u8; remaining.min(self.block_size as u64) as usize];
                let mut filled = 0;
                while filled < buf.len() {
                    let n = decoder
                        .read(&mut buf[filled..])
                        .map_err(|e| self.stream_error(block, &e))?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }

                if filled < buf.len() {
                    return Err(Ba2Error::decompression(
                        &self.name,
                        block.offset,
                        size_mismatch(expected, *produced + filled as u64),
                    ));
                }
                *produced += filled as u64;
                Ok(Some(buf))
            }
        }
    }

    fn stream_error(&self, block: &Block, error: &std::io::Error) -> Ba2Error {
        if self.source.is_closed() {
            Ba2Error::Closed
        } else {
            Ba2Error::decompression(
                &self.name,
                block.offset,
                format!("zlib decompression failed: {error}"),
            )
        }
    }
}

impl Iterator for EntryStream<'_> {
    type Item = Ba2Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.source.is_closed() {
            self.finished = true;
            return Some(Err(Ba2Error::Closed));
        }

        loop {
            let mut cursor = match self.current.take() {
                Some(cursor) => cursor,
                None => match self.blocks.next() {
                    Some(block) => match self.start_block(block) {
                        Ok(cursor) => cursor,
                        Err(e) => {
                            self.finished = true;
                            return Some(Err(e));
                        }
                    },
                    None => {
                        self.finished = true;
                        if self.produced != self.total {
                            return Some(Err(Ba2Error::decompression(
                                &self.name,
                                0,
                                size_mismatch(self.total, self.produced),
                            )));
                        }
                        return None;
                    }
                },
            };

            match self.pull(&mut cursor) {
                Ok(Some(bytes)) => {
                    self.produced += bytes.len() as u64;
                    self.current = Some(cursor);
                    return Some(Ok(bytes));
                }
                Ok(None) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for EntryStream<'_> {}
