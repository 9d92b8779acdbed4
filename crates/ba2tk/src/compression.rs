//! Payload decompression

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::header::Codec;

/// Maximum allowed decompression size per block (1 GB)
///
/// Limits output so that a forged size field cannot make a single block
/// allocate without bound.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Decompress one block, requiring exactly `expected` output bytes.
///
/// Returns a description of the failure on error; callers attach the entry
/// name and offset.
pub fn decompress_block(data: &[u8], codec: Codec, expected: usize) -> Result<Vec<u8>, String> {
    if expected > MAX_DECOMPRESSION_SIZE {
        return Err(format!(
            "declared size {expected} exceeds limit of {MAX_DECOMPRESSION_SIZE} bytes"
        ));
    }

    let decompressed = match codec {
        Codec::Zlib => {
            // One byte of slack so an oversized stream is detected, not cut.
            let mut decoder = ZlibDecoder::new(data).take(expected as u64 + 1);
            let mut out = Vec::with_capacity(expected);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| format!("zlib decompression failed: {e}"))?;
            out
        }
        Codec::Lz4 => lz4_flex::block::decompress(data, expected)
            .map_err(|e| format!("LZ4 decompression failed: {e}"))?,
    };

    if decompressed.len() != expected {
        return Err(size_mismatch(expected as u64, decompressed.len() as u64));
    }
    Ok(decompressed)
}

pub(crate) fn size_mismatch(expected: u64, actual: u64) -> String {
    if actual > expected {
        format!("output exceeds declared size of {expected} bytes")
    } else {
        format!("size mismatch: expected {expected} bytes, got {actual}")
    }
}
