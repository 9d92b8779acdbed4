//! Entry and chunk records as exposed to callers

use serde::Serialize;

use crate::hash::EntryHash;
use crate::record::{ChunkRecord, GeneralRecord, TextureRecord};

/// Location and sizes of one stored payload block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block {
    /// Offset from the start of the archive
    pub offset: u64,
    /// Compressed size, 0 when stored raw
    pub packed_size: u32,
    /// Decompressed size
    pub unpacked_size: u32,
}

impl Block {
    /// Whether the block needs decoding
    pub fn is_compressed(&self) -> bool {
        self.packed_size != 0
    }

    /// Bytes the block occupies in the archive
    pub fn stored_size(&self) -> u64 {
        if self.is_compressed() {
            u64::from(self.packed_size)
        } else {
            u64::from(self.unpacked_size)
        }
    }

    /// Offset one past the last stored byte
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.stored_size())
    }
}

/// One mip chunk of a texture entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Stored payload of the chunk
    pub block: Block,
    /// First mip level in the chunk
    pub start_mip: u16,
    /// Last mip level in the chunk
    pub end_mip: u16,
}

impl From<&ChunkRecord> for Chunk {
    fn from(record: &ChunkRecord) -> Self {
        Self {
            block: Block {
                offset: record.offset,
                packed_size: record.packed_size,
                unpacked_size: record.unpacked_size,
            },
            start_mip: record.start_mip,
            end_mip: record.end_mip,
        }
    }
}

/// Texture metadata carried by `DX10` records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Number of mip levels
    pub mip_count: u8,
    /// DXGI_FORMAT value
    pub format: u8,
    /// Whether the texture is a cubemap
    pub is_cubemap: bool,
    /// Tile mode byte
    pub tile_mode: u8,
    /// Chunks in stored order; chunk 0 holds the largest mips
    pub chunks: Vec<Chunk>,
}

/// Kind-specific part of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryData {
    /// A general file stored as one block
    General {
        /// Stored payload
        block: Block,
        /// Record flags
        flags: u32,
    },
    /// A texture stored as mip chunks
    Texture(TextureInfo),
}

/// One logical file inside an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Path as stored, backslash separated
    pub name: String,
    /// Hash triple from the record
    pub hash: EntryHash,
    /// Payload description
    pub data: EntryData,
}

impl Entry {
    pub(crate) fn from_general(name: String, record: &GeneralRecord) -> Self {
        Self {
            name,
            hash: EntryHash::from_parts(record.name_hash, record.extension, record.dir_hash),
            data: EntryData::General {
                block: Block {
                    offset: record.offset,
                    packed_size: record.packed_size,
                    unpacked_size: record.unpacked_size,
                },
                flags: record.flags,
            },
        }
    }

    pub(crate) fn from_texture(name: String, record: &TextureRecord) -> Self {
        Self {
            name,
            hash: EntryHash::from_parts(record.name_hash, record.extension, record.dir_hash),
            data: EntryData::Texture(TextureInfo {
                width: record.width,
                height: record.height,
                mip_count: record.mip_count,
                format: record.format,
                is_cubemap: record.flags & TextureRecord::FLAG_CUBEMAP != 0,
                tile_mode: record.tile_mode,
                chunks: record.chunks.iter().map(Chunk::from).collect(),
            }),
        }
    }

    /// Extension from the record, without padding
    pub fn extension(&self) -> String {
        self.hash.extension_str()
    }

    /// Whether this is a texture entry
    pub fn is_texture(&self) -> bool {
        matches!(self.data, EntryData::Texture(_))
    }

    /// Texture metadata, if this is a texture entry
    pub fn texture(&self) -> Option<&TextureInfo> {
        match &self.data {
            EntryData::Texture(info) => Some(info),
            EntryData::General { .. } => None,
        }
    }

    /// Texture chunks; empty for general entries
    pub fn chunks(&self) -> &[Chunk] {
        match &self.data {
            EntryData::Texture(info) => info.chunks.as_slice(),
            EntryData::General { .. } => &[],
        }
    }

    /// Stored blocks in payload order
    pub fn blocks(&self) -> Vec<Block> {
        match &self.data {
            EntryData::General { block, .. } => vec![*block],
            EntryData::Texture(info) => info.chunks.iter().map(|c| c.block).collect(),
        }
    }

    /// Total decompressed size
    pub fn uncompressed_size(&self) -> u64 {
        self.blocks()
            .iter()
            .map(|b| u64::from(b.unpacked_size))
            .sum()
    }

    /// Total compressed size, 0 when everything is stored raw
    pub fn compressed_size(&self) -> u64 {
        self.blocks().iter().map(|b| u64::from(b.packed_size)).sum()
    }

    /// Offset of the first stored byte
    pub fn offset(&self) -> u64 {
        self.blocks().first().map_or(0, |b| b.offset)
    }

    /// Whether any block is compressed
    pub fn is_compressed(&self) -> bool {
        self.blocks().iter().any(Block::is_compressed)
    }
}
