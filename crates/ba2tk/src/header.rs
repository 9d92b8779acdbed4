//! BA2 header structures and parsing

use binrw::BinRead;
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use tracing::warn;

use crate::error::{Ba2Error, Ba2Result};

/// BA2 magic bytes
pub const BA2_MAGIC: [u8; 4] = *b"BTDX";

/// Versions this reader understands: 1, 7, 8 (Fallout 4 / 76), 2, 3 (Starfield)
pub const SUPPORTED_VERSIONS: [u32; 5] = [1, 2, 3, 7, 8];

/// Size of the common header prefix shared by all versions
pub const BASE_HEADER_SIZE: usize = 24;

/// Largest header any version carries
pub const MAX_HEADER_SIZE: usize = 36;

/// Compression format id selecting LZ4 block compression (v3 only)
pub const COMPRESSION_LZ4: u32 = 3;

/// Archive sub-type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// General files (`GNRL`)
    General,
    /// DirectX 10 textures split into mip chunks (`DX10`)
    #[serde(rename = "dx10")]
    Texture,
}

impl ArchiveKind {
    /// Parse from the four-byte type tag
    pub fn from_tag(tag: [u8; 4]) -> Option<Self> {
        match &tag {
            b"GNRL" => Some(Self::General),
            b"DX10" => Some(Self::Texture),
            _ => None,
        }
    }

    /// Four-byte type tag as stored in the header
    pub fn tag(&self) -> [u8; 4] {
        match self {
            Self::General => *b"GNRL",
            Self::Texture => *b"DX10",
        }
    }

    /// Short name, `"general"` or `"dx10"`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Texture => "dx10",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload compression codec of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// zlib stream (all versions unless overridden)
    Zlib,
    /// Raw LZ4 block (Starfield v3 archives)
    Lz4,
}

/// BA2 file header
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct Ba2Header {
    /// Magic bytes (always `BTDX`)
    pub magic: [u8; 4],

    /// Format version
    pub version: u32,

    /// Archive type tag (`GNRL` or `DX10`)
    pub type_tag: [u8; 4],

    /// Number of records
    pub file_count: u32,

    /// Offset of the name table, 0 when names are stripped
    pub name_table_offset: u64,

    /// Two unidentified words present in v2 and v3
    #[br(if(version == 2 || version == 3))]
    pub extra: Option<[u32; 2]>,

    /// Compression format selector present in v3
    #[br(if(version == 3))]
    pub compression_format: Option<u32>,
}

impl Ba2Header {
    /// Header size in bytes for a given version
    pub fn size_for_version(version: u32) -> usize {
        match version {
            2 => BASE_HEADER_SIZE + 8,
            3 => BASE_HEADER_SIZE + 12,
            _ => BASE_HEADER_SIZE,
        }
    }

    /// Parse and validate a header from the start of an archive.
    ///
    /// `data` may be longer than the header. The magic is checked before
    /// anything else so that foreign files report `InvalidFormat` rather
    /// than a truncation.
    pub fn parse(data: &[u8], strict: bool) -> Ba2Result<Self> {
        if data.len() < 4 || data[..4] != BA2_MAGIC {
            let found = &data[..data.len().min(4)];
            return Err(Ba2Error::InvalidFormat(format!(
                "expected magic 'BTDX', found {found:02X?}"
            )));
        }

        let expected = if data.len() >= 8 {
            let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
            Self::size_for_version(version)
        } else {
            BASE_HEADER_SIZE
        };
        if data.len() < expected {
            return Err(Ba2Error::Truncated {
                context: "header".to_string(),
                offset: 0,
                expected: expected as u64,
                actual: data.len() as u64,
            });
        }

        let header = Self::read(&mut Cursor::new(data))
            .map_err(|e| Ba2Error::InvalidFormat(format!("unreadable header: {e}")))?;
        header.validate(strict)?;
        Ok(header)
    }

    /// Validate version, type tag and compression selector
    pub fn validate(&self, strict: bool) -> Ba2Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            if strict {
                return Err(Ba2Error::UnsupportedVersion(self.version));
            }
            warn!(
                "Unknown BA2 version {}, reading with the {}-byte layout",
                self.version, BASE_HEADER_SIZE
            );
        }

        if ArchiveKind::from_tag(self.type_tag).is_none() {
            return Err(Ba2Error::InvalidFormat(format!(
                "unsupported archive type '{}'",
                String::from_utf8_lossy(&self.type_tag)
            )));
        }

        match self.compression_format {
            None | Some(0 | COMPRESSION_LZ4) => Ok(()),
            Some(other) => Err(Ba2Error::InvalidFormat(format!(
                "unknown compression format {other}"
            ))),
        }
    }

    /// Size of this header on disk
    pub fn size(&self) -> usize {
        BASE_HEADER_SIZE
            + self.extra.map_or(0, |_| 8)
            + self.compression_format.map_or(0, |_| 4)
    }

    /// Archive sub-type; only valid after [`validate`](Self::validate)
    pub fn kind(&self) -> ArchiveKind {
        ArchiveKind::from_tag(self.type_tag).unwrap_or(ArchiveKind::General)
    }

    /// Codec used for compressed payloads
    pub fn codec(&self) -> Codec {
        if self.compression_format == Some(COMPRESSION_LZ4) {
            Codec::Lz4
        } else {
            Codec::Zlib
        }
    }

    /// Whether the archive carries a name table
    pub fn has_names(&self) -> bool {
        self.name_table_offset != 0
    }
}
