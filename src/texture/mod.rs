//! Palette and raster decoders: CMP color maps, BM bitmaps, MAT materials, SFT fonts.

pub mod bm;
pub mod mat;
pub mod palette;
pub mod raster;
pub mod sft;

pub use bm::decode_bm;
pub use mat::{decode_mat, MatContent};
pub use palette::Palette;
pub use raster::{flip_rows, unpack_rgb565, AlphaSource, BlendMode, RasterImage};
pub use sft::{decode_sft, Font};
