//! Material (.mat): either a flat palette color or one or more indexed texture cels.
//!
//! ```text
//! [76 bytes]        header
//! [n × 40 bytes]    texture records: type (0 = color, 8 = texture), color index, ...
//! per cel:
//!   [24 bytes]      width, height, transparent flag, 2 × pad, mipmap count
//!   [...]           mip chain, level l is (w >> l) × (h >> l) pixels
//! ```
//!
//! A transparent 16-bit cel keys out pure black (`0x0000`).

use std::io::Cursor;

use binrw::BinRead;

use super::palette::Palette;
use super::raster::{
    expand_indexed, expand_rgb565, read_u16_words, AlphaSource, BlendMode, IndexAlpha, RasterImage,
};
use crate::error::{DecodeError, DecodeResult};

pub const MAT_HEADER_SIZE: usize = 76;
pub const MAT_RECORD_SIZE: usize = 40;
pub const MAT_CEL_HEADER_SIZE: usize = 24;
pub const TEXTURE_RECORD_TYPE: u32 = 8;

#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub struct MatHeader {
    pub magic: [u8; 4],
    pub version: u32,
    /// 0 = color, 2 = texture
    pub mat_type: u32,
    pub record_count: u32,
    pub cel_count: u32,
    pub unknown: u32,
    pub bits_per_pixel: u32,
    pub red_bits: u32,
    pub green_bits: u32,
    pub blue_bits: u32,
    pub red_shift: u32,
    pub green_shift: u32,
    pub blue_shift: u32,
    pub red_loss: u32,
    pub green_loss: u32,
    pub blue_loss: u32,
    pub unknown2: [u32; 3],
}

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct TextureRecord {
    record_type: u32,
    color_index: u32,
}

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct CelHeader {
    width: u32,
    height: u32,
    transparent: u32,
    _pad: [u32; 2],
    mipmap_count: u32,
}

#[derive(Debug, Clone)]
pub enum MatContent {
    /// Flat palette color
    Color { index: u8, rgba: [f32; 4] },
    Texture(RasterImage),
}

/// Decode a material against `palette`.
pub fn decode_mat(bytes: &[u8], palette: &Palette, alpha: AlphaSource) -> DecodeResult<MatContent> {
    if bytes.len() < MAT_HEADER_SIZE + 8 {
        return Err(DecodeError::corrupt_image(format!(
            "material is {} bytes, header needs {}",
            bytes.len(),
            MAT_HEADER_SIZE + 8
        )));
    }
    let header = MatHeader::read(&mut Cursor::new(bytes))
        .map_err(|e| DecodeError::corrupt_image(format!("material header: {e}")))?;
    let first = TextureRecord::read(&mut Cursor::new(&bytes[MAT_HEADER_SIZE..]))
        .map_err(|e| DecodeError::corrupt_image(format!("texture record: {e}")))?;

    if first.record_type != TEXTURE_RECORD_TYPE {
        let index = first.color_index as u8;
        let [r, g, b] = palette.color(index);
        return Ok(MatContent::Color {
            index,
            rgba: [r, g, b, 1.0],
        });
    }

    let bytes_per_pixel = match header.bits_per_pixel {
        0 | 8 => 1,
        16 => 2,
        other => {
            return Err(DecodeError::corrupt_image(format!(
                "unsupported bit depth {other}"
            )))
        }
    };

    if header.cel_count != header.record_count {
        return Err(DecodeError::corrupt_image(format!(
            "{} texture records but {} cels",
            header.record_count, header.cel_count
        )));
    }
    let records = header.record_count.max(1) as usize;
    let mut offset = MAT_RECORD_SIZE
        .checked_mul(records)
        .and_then(|n| n.checked_add(MAT_HEADER_SIZE))
        .ok_or_else(|| DecodeError::corrupt_image(format!("{records} records overflow")))?;
    let mut cels: Vec<(CelHeader, &[u8])> =
        Vec::with_capacity(records.min(bytes.len() / MAT_CEL_HEADER_SIZE));
    for c in 0..records {
        let cel_bytes = offset
            .checked_add(MAT_CEL_HEADER_SIZE)
            .and_then(|end| bytes.get(offset..end))
            .ok_or_else(|| {
                DecodeError::corrupt_image(format!("cel {c} header at {offset} past end"))
            })?;
        let cel = CelHeader::read(&mut Cursor::new(cel_bytes))
            .map_err(|e| DecodeError::corrupt_image(format!("cel {c} header: {e}")))?;
        if cel.width == 0 || cel.height == 0 {
            return Err(DecodeError::corrupt_image(format!("cel {c} has zero size")));
        }
        if let Some((first, _)) = cels.first() {
            if (first.width, first.height) != (cel.width, cel.height) {
                return Err(DecodeError::corrupt_image(format!(
                    "cel {c} is {}x{}, expected {}x{}",
                    cel.width, cel.height, first.width, first.height
                )));
            }
        }

        let start = offset + MAT_CEL_HEADER_SIZE;
        let overflow = || {
            DecodeError::corrupt_image(format!(
                "cel {c} size {}x{} overflows",
                cel.width, cel.height
            ))
        };
        let base_len = level_len(&cel, 0, bytes_per_pixel).ok_or_else(overflow)?;
        let chain_len = mip_chain_len(&cel, bytes_per_pixel).ok_or_else(overflow)?;
        let level0 = start
            .checked_add(base_len)
            .and_then(|end| bytes.get(start..end))
            .ok_or_else(|| {
                DecodeError::corrupt_image(format!(
                    "cel {c} needs {base_len} bytes at {start}, buffer is {}",
                    bytes.len()
                ))
            })?;
        cels.push((cel, level0));
        offset = start.checked_add(chain_len).ok_or_else(overflow)?;
    }

    let (width, height) = match cels.first() {
        Some((cel, _)) => (cel.width, cel.height),
        None => return Err(DecodeError::corrupt_image("material has no cels")),
    };

    let mut frames = Vec::with_capacity(cels.len());
    let mut any_transparent = false;
    let table = match alpha {
        AlphaSource::TransparencyTable => palette.alpha_table(),
        AlphaSource::TransparentIndex => None,
    };

    for (cel, pixels) in cels {
        let (rgba, transparent) = if bytes_per_pixel == 2 {
            let key = (cel.transparent != 0).then_some(0);
            expand_rgb565(&read_u16_words(pixels), width as usize, key)
        } else {
            let index_alpha = match (table, cel.transparent != 0) {
                (Some(t), _) => IndexAlpha::Table(t),
                (None, true) => IndexAlpha::Transparent(0),
                (None, false) => IndexAlpha::Opaque,
            };
            expand_indexed(pixels, width as usize, &palette.colors, index_alpha)
        };
        any_transparent |= transparent;
        frames.push(rgba);
    }

    let blend = match (table, any_transparent) {
        (Some(_), _) if bytes_per_pixel == 1 => BlendMode::AlphaBlend,
        (_, true) => BlendMode::AlphaClip,
        _ => BlendMode::Opaque,
    };
    Ok(MatContent::Texture(RasterImage::from_frames(
        width, height, frames, blend,
    )?))
}

fn level_len(cel: &CelHeader, level: u32, bytes_per_pixel: usize) -> Option<usize> {
    let w = (cel.width >> level) as usize;
    let h = (cel.height >> level) as usize;
    w.checked_mul(h)?.checked_mul(bytes_per_pixel)
}

/// Bytes taken by a cel's whole mip chain. Levels stop once both sides reach zero.
fn mip_chain_len(cel: &CelHeader, bytes_per_pixel: usize) -> Option<usize> {
    let levels = cel.mipmap_count.clamp(1, u32::BITS);
    let mut total = 0usize;
    for level in 0..levels {
        if cel.width >> level == 0 && cel.height >> level == 0 {
            break;
        }
        total = total.checked_add(level_len(cel, level, bytes_per_pixel)?)?;
    }
    Some(total)
}
