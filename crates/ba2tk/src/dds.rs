//! DDS header synthesis for texture entries
//!
//! Texture archives store only the mip payload. To turn an entry back into
//! a loadable `.dds` file a `DDS_HEADER` plus `DDS_HEADER_DXT10` is
//! prepended, built from the metadata in the texture record.

use binrw::BinWrite;
use std::io::Cursor;

use crate::entry::TextureInfo;
use crate::error::{Ba2Error, Ba2Result};

/// Size of the magic, `DDS_HEADER` and `DDS_HEADER_DXT10` together
pub const DDS_HEADER_SIZE: usize = 148;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;

const DDPF_FOURCC: u32 = 0x4;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;
const DDSCAPS2_CUBEMAP_ALL_FACES: u32 = 0xFE00;

const D3D10_RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;
const D3D11_RESOURCE_MISC_TEXTURECUBE: u32 = 0x4;

#[derive(Debug, Clone, BinWrite)]
#[bw(little)]
struct PixelFormat {
    size: u32,
    flags: u32,
    four_cc: [u8; 4],
    rgb_bit_count: u32,
    masks: [u32; 4],
}

#[derive(Debug, Clone, BinWrite)]
#[bw(little, magic = b"DDS ")]
struct DdsHeader {
    size: u32,
    flags: u32,
    height: u32,
    width: u32,
    pitch_or_linear_size: u32,
    depth: u32,
    mip_map_count: u32,
    reserved1: [u32; 11],
    pixel_format: PixelFormat,
    caps: u32,
    caps2: u32,
    caps3: u32,
    caps4: u32,
    reserved2: u32,
    dxgi_format: u32,
    resource_dimension: u32,
    misc_flag: u32,
    array_size: u32,
    misc_flags2: u32,
}

/// Bytes per 4x4 block for block-compressed DXGI formats
fn block_bytes(format: u8) -> Option<u32> {
    match format {
        // BC1, BC4
        70..=72 | 79..=81 => Some(8),
        // BC2, BC3, BC5, BC6H, BC7
        73..=78 | 82..=84 | 94..=99 => Some(16),
        _ => None,
    }
}

/// Bits per pixel for uncompressed DXGI formats
fn bits_per_pixel(format: u8) -> u32 {
    match format {
        1..=4 => 128,
        5..=8 => 96,
        9..=22 => 64,
        48..=59 | 85 | 86 => 16,
        60..=65 => 8,
        66 => 1,
        _ => 32,
    }
}

/// Build the 148-byte DDS header for a texture
pub fn dds_header(info: &TextureInfo) -> Ba2Result<Vec<u8>> {
    let width = u32::from(info.width);
    let height = u32::from(info.height);
    let mips = u32::from(info.mip_count).max(1);

    let (size_flag, pitch) = match block_bytes(info.format) {
        Some(bytes) => (
            DDSD_LINEARSIZE,
            u64::from(width.div_ceil(4).max(1))
                * u64::from(height.div_ceil(4).max(1))
                * u64::from(bytes),
        ),
        None => (
            DDSD_PITCH,
            (u64::from(width) * u64::from(bits_per_pixel(info.format))).div_ceil(8),
        ),
    };
    // Linear sizes past u32 are written as 0
    let pitch = u32::try_from(pitch).unwrap_or(0);

    let mut caps = DDSCAPS_TEXTURE;
    if mips > 1 {
        caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
    }
    if info.is_cubemap {
        caps |= DDSCAPS_COMPLEX;
    }

    let header = DdsHeader {
        size: 124,
        flags: DDSD_CAPS
            | DDSD_HEIGHT
            | DDSD_WIDTH
            | DDSD_PIXELFORMAT
            | DDSD_MIPMAPCOUNT
            | size_flag,
        height,
        width,
        pitch_or_linear_size: pitch,
        depth: 0,
        mip_map_count: mips,
        reserved1: [0; 11],
        pixel_format: PixelFormat {
            size: 32,
            flags: DDPF_FOURCC,
            four_cc: *b"DX10",
            rgb_bit_count: 0,
            masks: [0; 4],
        },
        caps,
        caps2: if info.is_cubemap {
            DDSCAPS2_CUBEMAP_ALL_FACES
        } else {
            0
        },
        caps3: 0,
        caps4: 0,
        reserved2: 0,
        dxgi_format: u32::from(info.format),
        resource_dimension: D3D10_RESOURCE_DIMENSION_TEXTURE2D,
        misc_flag: if info.is_cubemap {
            D3D11_RESOURCE_MISC_TEXTURECUBE
        } else {
            0
        },
        array_size: 1,
        misc_flags2: 0,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(DDS_HEADER_SIZE));
    header
        .write(&mut cursor)
        .map_err(|e| Ba2Error::InvalidFormat(format!("cannot encode DDS header: {e}")))?;
    Ok(cursor.into_inner())
}
