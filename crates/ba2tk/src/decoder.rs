//! Record decoder: turns entries and chunks into payload bytes

use tracing::debug;

use crate::compression::decompress_block;
use crate::entry::{Block, Entry};
use crate::error::{Ba2Error, Ba2Result};
use crate::header::Codec;
use crate::source::ByteSource;

/// Read one stored block and decode it to exactly its unpacked size
pub(crate) fn decode_block(
    source: &ByteSource,
    block: &Block,
    codec: Codec,
    name: &str,
) -> Ba2Result<Vec<u8>> {
    if !block.is_compressed() {
        return source.read_at(block.offset, u64::from(block.unpacked_size), name);
    }

    debug!(
        "Decoding {} bytes at {:#x} for '{}' ({:?})",
        block.packed_size, block.offset, name, codec
    );
    source
        .with_slice(block.offset, u64::from(block.packed_size), name, |data| {
            decompress_block(data, codec, block.unpacked_size as usize)
        })?
        .map_err(|reason| Ba2Error::decompression(name, block.offset, reason))
}

/// Full payload of an entry; texture chunks are concatenated in stored order
pub(crate) fn decode_entry(source: &ByteSource, entry: &Entry, codec: Codec) -> Ba2Result<Vec<u8>> {
    let blocks = entry.blocks();
    if let [block] = blocks.as_slice() {
        return decode_block(source, block, codec, &entry.name);
    }

    // Grown per decoded block: declared sizes are only trusted once a block
    // has passed the decompression cap.
    let mut out = Vec::new();
    for block in &blocks {
        out.extend_from_slice(&decode_block(source, block, codec, &entry.name)?);
    }
    Ok(out)
}

/// Payload of a single texture chunk
pub(crate) fn decode_chunk(
    source: &ByteSource,
    entry: &Entry,
    index: usize,
    codec: Codec,
) -> Ba2Result<Vec<u8>> {
    let info = entry
        .texture()
        .ok_or_else(|| Ba2Error::NotATexture(entry.name.clone()))?;
    let chunk = info.chunks.get(index).ok_or_else(|| Ba2Error::ChunkOutOfRange {
        entry: entry.name.clone(),
        index,
        count: info.chunks.len(),
    })?;
    decode_block(source, &chunk.block, codec, &entry.name)
}
