//! Readers for Jedi Knight and Mysteries of the Sith game data.
//!
//! GOB archives, CMP palettes, BM/MAT/SFT rasters, JKL levels and 3DO meshes
//! decode into engine-neutral scenes that a host can turn into its own objects.

pub mod archive;
pub mod error;
pub mod hierarchy;
pub mod math;
pub mod scene;
pub mod text;
pub mod texture;

pub use archive::{Archive, ArchiveEntry};
pub use error::{DecodeError, DecodeResult};
pub use scene::{Diagnostic, ImportOptions, Scene, SceneAssembler};
pub use text::{FormatEdition, ParserConfig};
pub use texture::{AlphaSource, BlendMode, Palette, RasterImage};
