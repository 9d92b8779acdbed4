//! Read-only access to Bethesda BA2 archives (`BTDX`).
//!
//! BA2 is the asset container of Fallout 4, Fallout 76 and Starfield. Two
//! sub-types exist: general archives (`GNRL`) holding arbitrary files, and
//! texture archives (`DX10`) holding textures split into mip chunks.
//!
//! Opening an archive validates the header and parses the whole record
//! and name tables up front. Lookups are then pure in-memory operations;
//! payloads are read and decompressed only when extracted.
//!
//! # Supported versions
//!
//! | Version | Game              | Header | Codec                   |
//! |---------|-------------------|--------|-------------------------|
//! | 1, 7, 8 | Fallout 4 / 76    | 24     | zlib                    |
//! | 2       | Starfield         | 32     | zlib                    |
//! | 3       | Starfield         | 36     | zlib or LZ4 block       |
//!
//! # Example
//!
//! ```rust,no_run
//! use ba2tk::{ExtractOptions, load_ba2};
//!
//! # fn example() -> Result<(), ba2tk::Ba2Error> {
//! let archive = load_ba2("Fallout4 - Meshes.ba2", None)?;
//! println!("{} archive with {} entries", archive.kind(), archive.count()?);
//!
//! let entry = archive.find_entry("meshes/actors/character/characterassets/basemale.nif")?;
//! let bytes = archive.extract(entry)?;
//! assert_eq!(bytes.len() as u64, entry.uncompressed_size());
//!
//! let report = archive.extract_all("out", &ExtractOptions::default())?;
//! println!("{} files written", report.extracted);
//! archive.close();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::cast_possible_wrap)] // Binary format offsets
#![allow(clippy::cast_lossless)] // Sometimes clearer than From

pub mod archive;
pub mod compression;
pub mod config;
pub mod dds;
pub mod entry;
pub mod error;
pub mod extract;
pub mod hash;
pub mod header;
pub mod index;
pub mod record;
pub mod stream;

mod decoder;
mod opener;
mod source;

pub use archive::{Archive, EntryRef, Extraction, HashMismatch, load_ba2};
pub use config::{DEFAULT_BLOCK_SIZE, ExtractMode, ExtractOptions, LoadOptions};
pub use dds::{DDS_HEADER_SIZE, dds_header};
pub use entry::{Block, Chunk, Entry, EntryData, TextureInfo};
pub use error::{Ba2Error, Ba2Result};
pub use extract::{ExtractFailure, ExtractReport, relative_path};
pub use hash::{EntryHash, crc32, normalize_path};
pub use header::{ArchiveKind, Ba2Header, Codec};
pub use index::EntryIndex;
pub use stream::EntryStream;
