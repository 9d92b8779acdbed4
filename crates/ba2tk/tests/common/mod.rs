//! Synthetic BA2 writer shared by the integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use ba2tk::EntryHash;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

pub const GENERAL_RECORD_SIZE: usize = 36;
pub const TEXTURE_RECORD_SIZE: usize = 24;
pub const CHUNK_RECORD_SIZE: usize = 24;
pub const SENTINEL: u32 = 0xBAAD_F00D;

/// Payload storage for one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Raw,
    Compressed,
}

#[derive(Debug, Clone)]
struct Blob {
    data: Vec<u8>,
    storage: Storage,
}

#[derive(Debug, Clone)]
enum Item {
    General {
        name: String,
        blob: Blob,
    },
    Texture {
        name: String,
        width: u16,
        height: u16,
        format: u8,
        cubemap: bool,
        chunks: Vec<Blob>,
    },
}

impl Item {
    fn name(&self) -> &str {
        match self {
            Self::General { name, .. } | Self::Texture { name, .. } => name,
        }
    }
}

/// Builds BA2 archives byte by byte.
///
/// Layout: header, record table, payloads in record order, name table.
#[derive(Debug, Clone)]
pub struct Ba2Builder {
    version: u32,
    texture: bool,
    compression_format: u32,
    names: bool,
    items: Vec<Item>,
}

impl Ba2Builder {
    pub fn general(version: u32) -> Self {
        Self {
            version,
            texture: false,
            compression_format: 0,
            names: true,
            items: Vec::new(),
        }
    }

    pub fn texture(version: u32) -> Self {
        Self {
            texture: true,
            ..Self::general(version)
        }
    }

    /// Version 3 archive using LZ4 block compression
    pub fn lz4(mut self) -> Self {
        self.compression_format = 3;
        self
    }

    pub fn without_names(mut self) -> Self {
        self.names = false;
        self
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.items.push(Item::General {
            name: name.to_string(),
            blob: Blob {
                data: data.to_vec(),
                storage: Storage::Raw,
            },
        });
        self
    }

    pub fn compressed_file(mut self, name: &str, data: &[u8]) -> Self {
        self.items.push(Item::General {
            name: name.to_string(),
            blob: Blob {
                data: data.to_vec(),
                storage: Storage::Compressed,
            },
        });
        self
    }

    /// Texture with one chunk per payload, chunk `i` holding mip `i`
    pub fn texture_file(
        mut self,
        name: &str,
        (width, height): (u16, u16),
        format: u8,
        chunks: &[&[u8]],
        storage: Storage,
    ) -> Self {
        self.items.push(Item::Texture {
            name: name.to_string(),
            width,
            height,
            format,
            cubemap: false,
            chunks: chunks
                .iter()
                .map(|data| Blob {
                    data: data.to_vec(),
                    storage,
                })
                .collect(),
        });
        self
    }

    pub fn header_size(&self) -> usize {
        match self.version {
            2 => 32,
            3 => 36,
            _ => 24,
        }
    }

    /// Offset of record `index` in the built archive
    pub fn record_offset(&self, index: usize) -> usize {
        self.header_size()
            + self.items[..index]
                .iter()
                .map(|item| match item {
                    Item::General { .. } => GENERAL_RECORD_SIZE,
                    Item::Texture { chunks, .. } => {
                        TEXTURE_RECORD_SIZE + chunks.len() * CHUNK_RECORD_SIZE
                    }
                })
                .sum::<usize>()
    }

    fn encode(&self, blob: &Blob) -> (Vec<u8>, u32) {
        match blob.storage {
            Storage::Raw => (blob.data.clone(), 0),
            Storage::Compressed => {
                let packed = if self.compression_format == 3 {
                    lz4_flex::block::compress(&blob.data)
                } else {
                    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(&blob.data).unwrap();
                    encoder.finish().unwrap()
                };
                let packed_len = packed.len() as u32;
                (packed, packed_len)
            }
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let records_end = self.record_offset(self.items.len());
        let mut records = Vec::new();
        let mut payload = Vec::new();

        for item in &self.items {
            let hash = EntryHash::from_path(item.name());
            match item {
                Item::General { blob, .. } => {
                    let (stored, packed) = self.encode(blob);
                    let offset = (records_end + payload.len()) as u64;
                    payload.extend_from_slice(&stored);

                    records.extend_from_slice(&hash.file.to_le_bytes());
                    records.extend_from_slice(&hash.extension);
                    records.extend_from_slice(&hash.directory.to_le_bytes());
                    records.extend_from_slice(&0x0010_0100u32.to_le_bytes());
                    records.extend_from_slice(&offset.to_le_bytes());
                    records.extend_from_slice(&packed.to_le_bytes());
                    records.extend_from_slice(&(blob.data.len() as u32).to_le_bytes());
                    records.extend_from_slice(&SENTINEL.to_le_bytes());
                }
                Item::Texture {
                    width,
                    height,
                    format,
                    cubemap,
                    chunks,
                    ..
                } => {
                    records.extend_from_slice(&hash.file.to_le_bytes());
                    records.extend_from_slice(&hash.extension);
                    records.extend_from_slice(&hash.directory.to_le_bytes());
                    records.push(0);
                    records.push(chunks.len() as u8);
                    records.extend_from_slice(&24u16.to_le_bytes());
                    records.extend_from_slice(&height.to_le_bytes());
                    records.extend_from_slice(&width.to_le_bytes());
                    records.push(chunks.len() as u8);
                    records.push(*format);
                    records.push(u8::from(*cubemap));
                    records.push(8);

                    for (mip, chunk) in chunks.iter().enumerate() {
                        let (stored, packed) = self.encode(chunk);
                        let offset = (records_end + payload.len()) as u64;
                        payload.extend_from_slice(&stored);

                        records.extend_from_slice(&offset.to_le_bytes());
                        records.extend_from_slice(&packed.to_le_bytes());
                        records.extend_from_slice(&(chunk.data.len() as u32).to_le_bytes());
                        records.extend_from_slice(&(mip as u16).to_le_bytes());
                        records.extend_from_slice(&(mip as u16).to_le_bytes());
                        records.extend_from_slice(&SENTINEL.to_le_bytes());
                    }
                }
            }
        }

        let name_table_offset = if self.names {
            (records_end + payload.len()) as u64
        } else {
            0
        };

        let mut out = Vec::new();
        out.extend_from_slice(b"BTDX");
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(if self.texture { b"DX10" } else { b"GNRL" });
        out.extend_from_slice(&(self.items.len() as u32).to_le_bytes());
        out.extend_from_slice(&name_table_offset.to_le_bytes());
        if self.version == 2 || self.version == 3 {
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
        }
        if self.version == 3 {
            out.extend_from_slice(&self.compression_format.to_le_bytes());
        }
        assert_eq!(out.len(), self.header_size());

        out.extend_from_slice(&records);
        out.extend_from_slice(&payload);
        if self.names {
            for item in &self.items {
                let name = item.name().as_bytes();
                out.extend_from_slice(&(name.len() as u16).to_le_bytes());
                out.extend_from_slice(name);
            }
        }
        out
    }
}

/// Overwrite a little-endian u32 at `offset`
pub fn patch_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Overwrite a little-endian u64 at `offset`
pub fn patch_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Deterministic filler bytes
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// The `foo.txt` archive: v1 general, one raw 11-byte entry
pub fn foo_archive() -> Vec<u8> {
    Ba2Builder::general(1).file("foo.txt", b"hello world").build()
}
