//! On-disk record layouts of the BA2 record table
//!
//! The record table follows the header directly. General archives use one
//! fixed 36-byte record per file; texture archives use a 24-byte record
//! followed by one 24-byte chunk record per mip chunk.

use binrw::BinRead;

/// Marker closing every general record and chunk record
pub const RECORD_SENTINEL: u32 = 0xBAAD_F00D;

/// General file record (36 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct GeneralRecord {
    /// CRC-32 of the file stem
    pub name_hash: u32,
    /// Extension bytes, zero padded
    pub extension: [u8; 4],
    /// CRC-32 of the directory
    pub dir_hash: u32,
    /// Unidentified flags, usually `0x0010_0100`
    pub flags: u32,
    /// Payload offset from the start of the archive
    pub offset: u64,
    /// Compressed size, 0 when stored raw
    pub packed_size: u32,
    /// Decompressed size
    pub unpacked_size: u32,
    /// Always [`RECORD_SENTINEL`] in well-formed archives
    pub sentinel: u32,
}

impl GeneralRecord {
    /// Size of a general record on disk
    pub const SIZE: usize = 36;
}

/// Texture mip chunk record (24 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct ChunkRecord {
    /// Payload offset from the start of the archive
    pub offset: u64,
    /// Compressed size, 0 when stored raw
    pub packed_size: u32,
    /// Decompressed size
    pub unpacked_size: u32,
    /// First mip level stored in this chunk
    pub start_mip: u16,
    /// Last mip level stored in this chunk
    pub end_mip: u16,
    /// Always [`RECORD_SENTINEL`] in well-formed archives
    pub sentinel: u32,
}

impl ChunkRecord {
    /// Size of a chunk record on disk
    pub const SIZE: usize = 24;
}

/// Texture record header followed by its chunk records
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct TextureRecord {
    /// CRC-32 of the file stem
    pub name_hash: u32,
    /// Extension bytes (`dds\0`)
    pub extension: [u8; 4],
    /// CRC-32 of the directory
    pub dir_hash: u32,
    /// Unidentified byte
    pub unknown: u8,
    /// Number of chunk records that follow
    pub chunk_count: u8,
    /// Size of each chunk record, 24
    pub chunk_header_size: u16,
    /// Texture height in pixels
    pub height: u16,
    /// Texture width in pixels
    pub width: u16,
    /// Number of mip levels
    pub mip_count: u8,
    /// DXGI_FORMAT value
    pub format: u8,
    /// Bit 0 marks a cubemap
    pub flags: u8,
    /// Tile mode, 8 on PC
    pub tile_mode: u8,
    /// Chunk records, largest mips first
    #[br(count = chunk_count)]
    pub chunks: Vec<ChunkRecord>,
}

impl TextureRecord {
    /// Size of the fixed part of a texture record
    pub const HEADER_SIZE: usize = 24;

    /// Cubemap flag bit
    pub const FLAG_CUBEMAP: u8 = 0x01;
}
