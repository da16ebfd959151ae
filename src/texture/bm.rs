//! Bitmap (.bm): 8-bit indexed or 16-bit 5:6:5 frames behind a 128-byte header.

use std::io::Cursor;

use binrw::BinRead;

use super::palette::{colors_from_rgb, Palette, COLOR_TABLE_SIZE};
use super::raster::{
    expand_indexed, expand_rgb565, read_u16_words, AlphaSource, BlendMode, IndexAlpha, RasterImage,
};
use crate::error::{DecodeError, DecodeResult};

pub const BM_HEADER_SIZE: usize = 128;
pub const BM_FRAME_HEADER_SIZE: usize = 8;
/// `palette_mode` value meaning a 768-byte palette follows the last frame
pub const BM_PALETTE_INCLUDED: u32 = 2;

#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub struct BmHeader {
    pub magic: [u8; 4],
    pub unknown1: u32,
    pub unknown2: u32,
    pub palette_mode: u32,
    pub frame_count: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub transparent: u32,
    pub unknown3: u32,
    pub bits_per_pixel: u32,
    pub blue_bits: u32,
    pub green_bits: u32,
    pub red_bits: u32,
    #[br(pad_after = 52)]
    pub unknown4: [u32; 6],
}

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct FrameHeader {
    width: u32,
    height: u32,
}

/// Decode a bitmap. 8-bit images without an embedded palette need `palette`.
pub fn decode_bm(
    bytes: &[u8],
    palette: Option<&Palette>,
    alpha: AlphaSource,
) -> DecodeResult<RasterImage> {
    if bytes.len() < BM_HEADER_SIZE {
        return Err(DecodeError::corrupt_image(format!(
            "bitmap is {} bytes, header needs {BM_HEADER_SIZE}",
            bytes.len()
        )));
    }
    let mut cursor = Cursor::new(bytes);
    let header = BmHeader::read(&mut cursor)
        .map_err(|e| DecodeError::corrupt_image(format!("bitmap header: {e}")))?;

    let bytes_per_pixel = match header.bits_per_pixel {
        8 => 1,
        16 => 2,
        other => {
            return Err(DecodeError::corrupt_image(format!(
                "unsupported bit depth {other}"
            )))
        }
    };

    // Frames are stored back to back; each one repeats its size.
    let frame_count = header.frame_count.max(1) as usize;
    let mut offset = BM_HEADER_SIZE;
    let mut frames: Vec<&[u8]> =
        Vec::with_capacity(frame_count.min(bytes.len() / BM_FRAME_HEADER_SIZE));
    let mut size: Option<(u32, u32)> = None;
    for f in 0..frame_count {
        let frame = read_frame_header(bytes, offset)?;
        if frame.width == 0 || frame.height == 0 {
            return Err(DecodeError::corrupt_image(format!("frame {f} has zero size")));
        }
        match size {
            None => size = Some((frame.width, frame.height)),
            Some(first) if first != (frame.width, frame.height) => {
                return Err(DecodeError::corrupt_image(format!(
                    "frame {f} is {}x{}, expected {}x{}",
                    frame.width, frame.height, first.0, first.1
                )))
            }
            Some(_) => {}
        }
        let start = offset + BM_FRAME_HEADER_SIZE;
        let len = (frame.width as usize)
            .checked_mul(frame.height as usize)
            .and_then(|n| n.checked_mul(bytes_per_pixel))
            .ok_or_else(|| {
                DecodeError::corrupt_image(format!(
                    "frame {f} size {}x{} overflows",
                    frame.width, frame.height
                ))
            })?;
        let pixels = start
            .checked_add(len)
            .and_then(|end| bytes.get(start..end))
            .ok_or_else(|| {
                DecodeError::corrupt_image(format!(
                    "frame {f} needs {len} bytes at {start}, buffer is {}",
                    bytes.len()
                ))
            })?;
        frames.push(pixels);
        offset = start + len;
    }
    let Some((width, height)) = size else {
        return Err(DecodeError::corrupt_image("bitmap has no frames"));
    };

    let mut decoded = Vec::with_capacity(frames.len());
    let mut any_transparent = false;

    if bytes_per_pixel == 2 {
        let key = u16::try_from(header.transparent).ok();
        for pixels in frames {
            let (rgba, transparent) = expand_rgb565(&read_u16_words(pixels), width as usize, key);
            any_transparent |= transparent;
            decoded.push(rgba);
        }
        let blend = if any_transparent {
            BlendMode::AlphaClip
        } else {
            BlendMode::Opaque
        };
        return RasterImage::from_frames(width, height, decoded, blend);
    }

    let embedded;
    let colors = if header.palette_mode == BM_PALETTE_INCLUDED {
        let rgb = bytes.get(offset..offset + COLOR_TABLE_SIZE).ok_or_else(|| {
            DecodeError::corrupt_image("embedded palette runs past end of bitmap")
        })?;
        embedded = colors_from_rgb(rgb);
        &embedded
    } else {
        match palette {
            Some(p) => &p.colors,
            None => {
                return Err(DecodeError::corrupt_image(
                    "8-bit bitmap has no embedded palette and none was supplied",
                ))
            }
        }
    };

    let table = match (alpha, palette) {
        (AlphaSource::TransparencyTable, Some(p)) => p.alpha_table(),
        _ => None,
    };
    let index_alpha = match table {
        Some(t) => IndexAlpha::Table(t),
        None => IndexAlpha::Transparent(header.transparent as u8),
    };

    for pixels in frames {
        let (rgba, transparent) = expand_indexed(pixels, width as usize, colors, index_alpha);
        any_transparent |= transparent;
        decoded.push(rgba);
    }

    let blend = match (table, any_transparent) {
        (Some(_), _) => BlendMode::AlphaBlend,
        (None, true) => BlendMode::AlphaClip,
        (None, false) => BlendMode::Opaque,
    };
    RasterImage::from_frames(width, height, decoded, blend)
}

fn read_frame_header(bytes: &[u8], offset: usize) -> DecodeResult<FrameHeader> {
    let slice = bytes
        .get(offset..offset + BM_FRAME_HEADER_SIZE)
        .ok_or_else(|| DecodeError::corrupt_image(format!("frame header at {offset} past end")))?;
    FrameHeader::read(&mut Cursor::new(slice))
        .map_err(|e| DecodeError::corrupt_image(format!("frame header: {e}")))
}
