//! BA2 path hashing
//!
//! Every record in a BA2 archive carries a hash triple computed from its
//! path: a CRC-32 of the file stem, the first four bytes of the extension
//! and a CRC-32 of the directory. The CRC is the reflected `0xEDB88320`
//! polynomial, but seeded with zero and without the final inversion that
//! zlib's `crc32` applies.

use serde::{Serialize, Serializer};
use std::fmt;

/// Path separator used inside archives
pub const SEPARATOR: char = '\\';

/// Zero-seeded CRC-32 as used by BA2 record hashes
///
/// `crc32fast` keeps its state inverted between updates, so starting from
/// an all-ones state and inverting the result yields the zero-seeded CRC.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(0xFFFF_FFFF);
    hasher.update(data);
    !hasher.finalize()
}

/// Normalise an archive path: ASCII lowercase, backslash separators, no
/// leading or trailing separators.
pub fn normalize_path(path: &str) -> String {
    let converted: String = path
        .chars()
        .map(|c| match c {
            '/' => SEPARATOR,
            c => c.to_ascii_lowercase(),
        })
        .collect();
    converted.trim_matches(SEPARATOR).to_string()
}

/// Hash triple identifying a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntryHash {
    /// CRC-32 of the file stem
    pub file: u32,
    /// Extension bytes, zero padded
    #[serde(serialize_with = "serialize_extension")]
    pub extension: [u8; 4],
    /// CRC-32 of the directory path
    pub directory: u32,
}

impl EntryHash {
    /// Create from raw components
    pub fn from_parts(file: u32, extension: [u8; 4], directory: u32) -> Self {
        Self {
            file,
            extension,
            directory,
        }
    }

    /// Compute the hash triple for a path inside an archive
    pub fn from_path(path: &str) -> Self {
        let normalized = normalize_path(path);
        let (directory, file_name) = match normalized.rfind(SEPARATOR) {
            Some(pos) => (&normalized[..pos], &normalized[pos + 1..]),
            None => ("", normalized.as_str()),
        };
        let (stem, extension) = match file_name.rfind('.') {
            Some(pos) => (&file_name[..pos], &file_name[pos + 1..]),
            None => (file_name, ""),
        };

        Self {
            file: crc32(stem.as_bytes()),
            extension: extension_bytes(extension),
            directory: crc32(directory.as_bytes()),
        }
    }

    /// Extension as text, without padding
    pub fn extension_str(&self) -> String {
        let len = self
            .extension
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.extension.len());
        String::from_utf8_lossy(&self.extension[..len]).into_owned()
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}{}{:08x}.{}",
            self.directory,
            SEPARATOR,
            self.file,
            self.extension_str()
        )
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_extension<S: Serializer>(extension: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&EntryHash::from_parts(0, *extension, 0).extension_str())
}

fn extension_bytes(extension: &str) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    for (dst, src) in bytes.iter_mut().zip(extension.bytes()) {
        *dst = src;
    }
    bytes
}
