use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::DecodeResult;
use crate::texture::{decode_mat, AlphaSource, BlendMode, MatContent, Palette, RasterImage};

/// Base color of materials that failed to decode.
pub const PLACEHOLDER_COLOR: [f32; 4] = [1.0, 0.0, 1.0, 1.0];
/// Base color of the shared portal material.
pub const PORTAL_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];
pub const PORTAL_MATERIAL_NAME: &str = "__portal";

#[derive(Debug, Clone)]
pub enum MaterialKind {
    Texture(RasterImage),
    /// Flat palette color
    Color([f32; 4]),
    /// Fully transparent; surfaces with no material
    Portal,
    /// Visible stand-in for a material that could not be decoded
    Placeholder,
    /// Material import was switched off
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct SceneMaterial {
    pub name: String,
    pub kind: MaterialKind,
    pub blend_mode: BlendMode,
}

/// Flat summary of a material for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialSummary {
    pub name: String,
    pub kind: &'static str,
    pub blend_mode: BlendMode,
    pub size: Option<(u32, u32)>,
    pub frames: u32,
}

impl SceneMaterial {
    pub fn portal() -> Self {
        Self {
            name: PORTAL_MATERIAL_NAME.to_string(),
            kind: MaterialKind::Portal,
            blend_mode: BlendMode::AlphaClip,
        }
    }

    pub fn unresolved(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MaterialKind::Unresolved,
            blend_mode: BlendMode::Opaque,
        }
    }

    /// Decode a `.mat` payload.
    pub fn decode(name: &str, bytes: &[u8], palette: &Palette, alpha: AlphaSource) -> DecodeResult<Self> {
        let material = match decode_mat(bytes, palette, alpha)? {
            MatContent::Color { rgba, .. } => Self {
                name: name.to_string(),
                kind: MaterialKind::Color(rgba),
                blend_mode: BlendMode::Opaque,
            },
            MatContent::Texture(image) => Self {
                name: name.to_string(),
                blend_mode: image.blend_mode,
                kind: MaterialKind::Texture(image),
            },
        };
        Ok(material)
    }

    /// Pixel size of the first frame, for textured materials.
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        match &self.kind {
            MaterialKind::Texture(image) => Some((image.width, image.height)),
            _ => None,
        }
    }

    pub fn base_color(&self) -> [f32; 4] {
        match &self.kind {
            MaterialKind::Texture(_) | MaterialKind::Unresolved => [1.0; 4],
            MaterialKind::Color(rgba) => *rgba,
            MaterialKind::Portal => PORTAL_COLOR,
            MaterialKind::Placeholder => PLACEHOLDER_COLOR,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, MaterialKind::Placeholder)
    }

    pub fn summary(&self) -> MaterialSummary {
        let kind = match self.kind {
            MaterialKind::Texture(_) => "texture",
            MaterialKind::Color(_) => "color",
            MaterialKind::Portal => "portal",
            MaterialKind::Placeholder => "placeholder",
            MaterialKind::Unresolved => "unresolved",
        };
        let frames = match &self.kind {
            MaterialKind::Texture(image) => image.frame_count,
            _ => 0,
        };
        MaterialSummary {
            name: self.name.clone(),
            kind,
            blend_mode: self.blend_mode,
            size: self.texture_size(),
            frames,
        }
    }
}

/// Stand-in for a material whose decode failed: flat opaque magenta.
pub fn placeholder_for(name: &str) -> SceneMaterial {
    SceneMaterial {
        name: name.to_string(),
        kind: MaterialKind::Placeholder,
        blend_mode: BlendMode::Opaque,
    }
}

/// Cache key: material file names are case-insensitive, and the same file decodes
/// differently per alpha source.
pub fn material_key(name: &str, alpha: AlphaSource) -> (String, AlphaSource) {
    (name.to_ascii_lowercase(), alpha)
}

type CacheMap = HashMap<(String, AlphaSource), Arc<SceneMaterial>>;

/// Decoded materials shared across a whole import, keyed by file name and alpha source.
#[derive(Debug, Default)]
pub struct MaterialCache {
    entries: Mutex<CacheMap>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheMap> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, name: &str, alpha: AlphaSource) -> Option<Arc<SceneMaterial>> {
        self.lock().get(&material_key(name, alpha)).cloned()
    }

    /// Store `material` unless another thread got there first; returns the cached entry.
    pub fn insert(&self, material: SceneMaterial, alpha: AlphaSource) -> Arc<SceneMaterial> {
        let key = material_key(&material.name, alpha);
        self.lock()
            .entry(key)
            .or_insert_with(|| Arc::new(material))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct file names held, whatever their alpha source.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().map(|(name, _)| name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}
