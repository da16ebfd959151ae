//! Color map (.cmp): 256-entry palette with light-level and transparency tables.
//!
//! ```text
//! [64 bytes]        header: magic "CMP ", version, transparency flag, padding
//! [768 bytes]       256 × RGB, 8 bits per channel
//! [63 × 256 bytes]  light-level remap tables
//! [N × 256 bytes]   transparency tables (N ≥ 1)
//! ```

use std::io::Cursor;

use binrw::BinRead;
use image::ImageBuffer;

use super::raster::{BlendMode, RasterImage};
use crate::error::{DecodeError, DecodeResult};

pub const CMP_HEADER_SIZE: usize = 64;
pub const PALETTE_ENTRIES: usize = 256;
pub const COLOR_TABLE_SIZE: usize = PALETTE_ENTRIES * 3;
pub const SHADE_LEVELS: usize = 63;
pub const SHADE_TABLES_OFFSET: usize = CMP_HEADER_SIZE + COLOR_TABLE_SIZE;
pub const ALPHA_TABLES_OFFSET: usize = SHADE_TABLES_OFFSET + SHADE_LEVELS * PALETTE_ENTRIES;
/// Header, colors, shade tables and one transparency table.
pub const CMP_MIN_SIZE: usize = ALPHA_TABLES_OFFSET + PALETTE_ENTRIES;

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct CmpHeader {
    pub magic: [u8; 4],
    pub version: u32,
    #[br(pad_after = 52)]
    pub transparency: u32,
}

#[derive(Debug, Clone)]
pub struct Palette {
    pub header: CmpHeader,
    /// RGB per index, each channel `byte / 255`
    pub colors: [[f32; 3]; PALETTE_ENTRIES],
    /// `shade_tables[level][index]` is the remapped index at that light level
    pub shade_tables: Vec<[u8; PALETTE_ENTRIES]>,
    /// Per-index alpha, `byte / 63` clamped to 1.0
    pub alpha_tables: Vec<[f32; PALETTE_ENTRIES]>,
}

impl Palette {
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.len() < CMP_MIN_SIZE {
            return Err(DecodeError::CorruptPalette {
                len: bytes.len(),
                required: CMP_MIN_SIZE,
            });
        }

        let header = CmpHeader::read(&mut Cursor::new(bytes)).map_err(|_| {
            DecodeError::CorruptPalette {
                len: bytes.len(),
                required: CMP_MIN_SIZE,
            }
        })?;

        let colors = colors_from_rgb(&bytes[CMP_HEADER_SIZE..SHADE_TABLES_OFFSET]);

        let shade_tables = bytes[SHADE_TABLES_OFFSET..ALPHA_TABLES_OFFSET]
            .chunks_exact(PALETTE_ENTRIES)
            .map(|chunk| {
                let mut table = [0u8; PALETTE_ENTRIES];
                table.copy_from_slice(chunk);
                table
            })
            .collect();

        let alpha_tables: Vec<[f32; PALETTE_ENTRIES]> = bytes[ALPHA_TABLES_OFFSET..]
            .chunks_exact(PALETTE_ENTRIES)
            .map(|chunk| {
                let mut table = [0.0f32; PALETTE_ENTRIES];
                for (dst, &b) in table.iter_mut().zip(chunk) {
                    *dst = (b as f32 / 63.0).min(1.0);
                }
                table
            })
            .collect();

        tracing::trace!(alpha_tables = alpha_tables.len(), "decoded palette");

        Ok(Self {
            header,
            colors,
            shade_tables,
            alpha_tables,
        })
    }

    pub fn has_transparency(&self) -> bool {
        self.header.transparency != 0
    }

    pub fn color(&self, index: u8) -> [f32; 3] {
        self.colors[index as usize]
    }

    /// Color with alpha from the first transparency table.
    pub fn rgba(&self, index: u8) -> [f32; 4] {
        let [r, g, b] = self.color(index);
        [r, g, b, self.alpha(index)]
    }

    pub fn alpha(&self, index: u8) -> f32 {
        self.alpha_tables
            .first()
            .map_or(1.0, |table| table[index as usize])
    }

    pub fn alpha_table(&self) -> Option<&[f32; PALETTE_ENTRIES]> {
        self.alpha_tables.first()
    }

    /// Index `index` remapped for `level` (0 = darkest).
    pub fn shade(&self, level: usize, index: u8) -> Option<u8> {
        self.shade_tables.get(level).map(|t| t[index as usize])
    }

    /// 16×16 swatch; index `i` sits at column `i % 16`, row `i / 16` counted from the bottom.
    pub fn to_swatch(&self) -> DecodeResult<RasterImage> {
        let data: Vec<f32> = self
            .colors
            .iter()
            .flat_map(|&[r, g, b]| [r, g, b, 1.0])
            .collect();
        let pixels = ImageBuffer::from_raw(16, 16, data)
            .ok_or_else(|| DecodeError::corrupt_image("swatch buffer size"))?;
        Ok(RasterImage {
            width: 16,
            height: 16,
            frame_count: 1,
            blend_mode: BlendMode::Opaque,
            pixels,
        })
    }
}

/// 768 RGB bytes to normalized colors.
pub(crate) fn colors_from_rgb(rgb: &[u8]) -> [[f32; 3]; PALETTE_ENTRIES] {
    let mut colors = [[0.0f32; 3]; PALETTE_ENTRIES];
    for (dst, src) in colors.iter_mut().zip(rgb.chunks_exact(3)) {
        *dst = [
            src[0] as f32 / 255.0,
            src[1] as f32 / 255.0,
            src[2] as f32 / 255.0,
        ];
    }
    colors
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Palette where index `i` has RGB (i, 255 - i, i / 2) and alpha byte `i % 64`.
    pub(crate) fn build_cmp(alpha_tables: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"CMP ");
        buf.extend_from_slice(&30u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.resize(CMP_HEADER_SIZE, 0);
        for i in 0..PALETTE_ENTRIES {
            buf.extend_from_slice(&[i as u8, 255 - i as u8, (i / 2) as u8]);
        }
        for level in 0..SHADE_LEVELS {
            for i in 0..PALETTE_ENTRIES {
                buf.push(((i * level) / SHADE_LEVELS) as u8);
            }
        }
        for _ in 0..alpha_tables {
            for i in 0..PALETTE_ENTRIES {
                buf.push((i % 64) as u8);
            }
        }
        buf
    }

    #[test]
    fn minimum_size_is_accepted() {
        let data = build_cmp(1);
        assert_eq!(data.len(), CMP_MIN_SIZE);
        let palette = Palette::decode(&data).unwrap();
        assert_eq!(palette.shade_tables.len(), SHADE_LEVELS);
        assert_eq!(palette.alpha_tables.len(), 1);
        assert!(palette.has_transparency());
    }

    #[test]
    fn one_byte_short_is_corrupt() {
        let data = build_cmp(1);
        assert!(matches!(
            Palette::decode(&data[..data.len() - 1]),
            Err(DecodeError::CorruptPalette {
                required: CMP_MIN_SIZE,
                ..
            })
        ));
    }

    #[test]
    fn colors_are_normalized_by_255() {
        let palette = Palette::decode(&build_cmp(1)).unwrap();
        assert_eq!(palette.color(255), [1.0, 0.0, 127.0 / 255.0]);
        assert_eq!(palette.color(0), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn alpha_divides_by_63_and_clamps() {
        let palette = Palette::decode(&build_cmp(1)).unwrap();
        assert_eq!(palette.alpha(0), 0.0);
        assert_eq!(palette.alpha(63), 1.0);
        assert!((palette.alpha(21) - 21.0 / 63.0).abs() < 1e-6);
        assert_eq!(palette.rgba(63)[3], 1.0);
    }

    #[test]
    fn extra_alpha_tables_are_counted() {
        let mut data = build_cmp(3);
        data.extend_from_slice(&[0; 10]); // partial trailing table is ignored
        let palette = Palette::decode(&data).unwrap();
        assert_eq!(palette.alpha_tables.len(), 3);
    }

    #[test]
    fn shade_tables_remap_indices() {
        let palette = Palette::decode(&build_cmp(1)).unwrap();
        assert_eq!(palette.shade(0, 200), Some(0));
        assert_eq!(palette.shade(SHADE_LEVELS, 200), None);
    }

    #[test]
    fn swatch_places_index_zero_bottom_left() {
        let palette = Palette::decode(&build_cmp(1)).unwrap();
        let swatch = palette.to_swatch().unwrap();
        assert_eq!(swatch.pixel(0, 0, 0), Some([0.0, 1.0, 0.0, 1.0]));
        let [r, ..] = swatch.pixel(0, 1, 1).unwrap();
        assert_eq!(r, 17.0 / 255.0);
    }
}
