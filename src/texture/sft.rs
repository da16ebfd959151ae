//! Bitmap font (.sft): character table followed by an embedded bitmap.

use std::io::Cursor;

use binrw::BinRead;
use serde::Serialize;

use super::bm::decode_bm;
use super::palette::Palette;
use super::raster::{AlphaSource, RasterImage};
use crate::error::{DecodeError, DecodeResult};

pub const SFT_HEADER_SIZE: usize = 44;
pub const SFT_CHAR_SIZE: usize = 8;

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct SftHeader {
    pub magic: [u8; 4],
    pub unknown: [u32; 9],
    pub first_char: u16,
    pub last_char: u16,
}

/// Horizontal extent of one glyph in the font strip.
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[br(little)]
pub struct Glyph {
    pub x_offset: u32,
    pub width: u32,
}

#[derive(Debug, Clone)]
pub struct Font {
    pub first_char: u16,
    pub last_char: u16,
    pub glyphs: Vec<Glyph>,
    pub image: RasterImage,
}

impl Font {
    pub fn glyph(&self, c: char) -> Option<Glyph> {
        let code = u16::try_from(u32::from(c)).ok()?;
        let idx = code.checked_sub(self.first_char)? as usize;
        self.glyphs.get(idx).copied()
    }
}

pub fn decode_sft(bytes: &[u8], palette: Option<&Palette>) -> DecodeResult<Font> {
    if bytes.len() < SFT_HEADER_SIZE {
        return Err(DecodeError::corrupt_image(format!(
            "font is {} bytes, header needs {SFT_HEADER_SIZE}",
            bytes.len()
        )));
    }
    let mut cursor = Cursor::new(bytes);
    let header = SftHeader::read(&mut cursor)
        .map_err(|e| DecodeError::corrupt_image(format!("font header: {e}")))?;
    if header.last_char < header.first_char {
        return Err(DecodeError::corrupt_image(format!(
            "character range {}..={} is empty",
            header.first_char, header.last_char
        )));
    }

    let count = (header.last_char - header.first_char) as usize + 1;
    let bm_start = SFT_HEADER_SIZE + count * SFT_CHAR_SIZE;
    if bm_start > bytes.len() {
        return Err(DecodeError::corrupt_image(format!(
            "{count} character definitions run past end of font"
        )));
    }
    let glyphs = (0..count)
        .map(|_| Glyph::read(&mut cursor))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DecodeError::corrupt_image(format!("glyph table: {e}")))?;

    let image = decode_bm(&bytes[bm_start..], palette, AlphaSource::TransparentIndex)?;

    Ok(Font {
        first_char: header.first_char,
        last_char: header.last_char,
        glyphs,
        image,
    })
}
