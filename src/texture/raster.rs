use image::{ImageBuffer, Rgba, Rgba32FImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};

/// How a decoded image's alpha channel should be treated by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// Binary cutout from a transparent index or key color
    AlphaClip,
    /// Graded alpha from the palette's transparency table
    AlphaBlend,
}

/// Where 8-bit indexed pixels take their alpha from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlphaSource {
    /// Only the transparent index is see-through
    #[default]
    TransparentIndex,
    /// Per-index alpha from the palette's first transparency table
    TransparencyTable,
}

/// Decoded RGBA pixels, float channels in `0.0..=1.0`.
///
/// Rows are stored bottom-up: row 0 of each frame is the image's bottom
/// row. Multi-frame images are a vertical strip where frame `f` occupies
/// rows `f * height .. (f + 1) * height`.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    /// Height of one frame
    pub height: u32,
    pub frame_count: u32,
    pub blend_mode: BlendMode,
    pub pixels: Rgba32FImage,
}

impl RasterImage {
    /// Stack equally sized frames of bottom-up RGBA floats.
    pub(crate) fn from_frames(
        width: u32,
        height: u32,
        frames: Vec<Vec<f32>>,
        blend_mode: BlendMode,
    ) -> DecodeResult<Self> {
        let frame_count = frames.len() as u32;
        let data: Vec<f32> = frames.into_iter().flatten().collect();
        let pixels = ImageBuffer::from_raw(width, height * frame_count, data).ok_or_else(|| {
            DecodeError::corrupt_image(format!(
                "pixel buffer does not match {width}x{height}x{frame_count}"
            ))
        })?;
        Ok(Self {
            width,
            height,
            frame_count,
            blend_mode,
            pixels,
        })
    }

    /// Pixel of `frame` at (`x`, `y`), with `y = 0` the bottom row.
    pub fn pixel(&self, frame: u32, x: u32, y: u32) -> Option<[f32; 4]> {
        if frame >= self.frame_count || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels.get_pixel(x, frame * self.height + y).0)
    }

    /// 8-bit copy for PNG export, flipped back to top-down rows.
    pub fn to_rgba8(&self) -> RgbaImage {
        let total = self.height * self.frame_count;
        RgbaImage::from_fn(self.width, total, |x, y| {
            let frame = y / self.height.max(1);
            let row = y % self.height.max(1);
            let src = frame * self.height + (self.height - 1 - row);
            let p = self.pixels.get_pixel(x, src).0;
            Rgba(p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
        })
    }
}

/// Unpack a 5:6:5 word into RGB floats.
pub fn unpack_rgb565(value: u16) -> [f32; 3] {
    let r = ((value >> 11) & 0x1F) as f32 / 31.0;
    let g = ((value >> 5) & 0x3F) as f32 / 63.0;
    let b = (value & 0x1F) as f32 / 31.0;
    [r, g, b]
}

/// Reverse row order of a `width`-wide buffer (top-left to bottom-left origin).
pub fn flip_rows<T: Copy>(src: &[T], width: usize) -> Vec<T> {
    if width == 0 {
        return src.to_vec();
    }
    src.chunks(width).rev().flatten().copied().collect()
}

/// Per-pixel alpha rule for indexed frames.
#[derive(Clone, Copy)]
pub(crate) enum IndexAlpha<'a> {
    Opaque,
    Transparent(u8),
    Table(&'a [f32; 256]),
}

/// Expand one top-down indexed frame into bottom-up RGBA floats.
///
/// Returns the pixels and whether any pixel ended up non-opaque.
pub(crate) fn expand_indexed(
    indices: &[u8],
    width: usize,
    colors: &[[f32; 3]; 256],
    alpha: IndexAlpha<'_>,
) -> (Vec<f32>, bool) {
    let mut out = Vec::with_capacity(indices.len() * 4);
    let mut any_transparent = false;
    for &index in flip_rows(indices, width).iter() {
        let [r, g, b] = colors[index as usize];
        let a = match alpha {
            IndexAlpha::Opaque => 1.0,
            IndexAlpha::Transparent(key) if key == index => 0.0,
            IndexAlpha::Transparent(_) => 1.0,
            IndexAlpha::Table(table) => table[index as usize],
        };
        any_transparent |= a < 1.0;
        out.extend_from_slice(&[r, g, b, a]);
    }
    (out, any_transparent)
}

/// Expand one top-down 5:6:5 frame into bottom-up RGBA floats.
pub(crate) fn expand_rgb565(words: &[u16], width: usize, key: Option<u16>) -> (Vec<f32>, bool) {
    let mut out = Vec::with_capacity(words.len() * 4);
    let mut any_transparent = false;
    for &word in flip_rows(words, width).iter() {
        let [r, g, b] = unpack_rgb565(word);
        let a = if key == Some(word) { 0.0 } else { 1.0 };
        any_transparent |= a < 1.0;
        out.extend_from_slice(&[r, g, b, a]);
    }
    (out, any_transparent)
}

pub(crate) fn read_u16_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}
