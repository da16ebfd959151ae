//! Polygon records shared by level surfaces and mesh faces.

use serde::Serialize;

use super::{FormatEdition, RecordTokens};
use crate::error::DecodeResult;

/// Surface flag: rendered as sky.
pub const SURFACE_FLAG_HORIZON_SKY: u32 = 0x200;
/// Surface flag: rendered as ceiling sky.
pub const SURFACE_FLAG_CEILING_SKY: u32 = 0x400;
/// Face flag: translucent face.
pub const FACE_FLAG_TRANSLUCENT: u32 = 0x2;

/// One polygon corner: geometry vertex plus texture vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VertexRef {
    pub vertex: usize,
    /// Negative when the corner has no texture vertex.
    pub uv: i32,
}

/// Per-corner light values as stored in the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SurfaceLighting {
    /// No light values were present.
    None,
    /// Single intensity per corner (JK).
    Intensity(Vec<f32>),
    /// Intensity, red, green, blue per corner (MotS).
    Rgbi(Vec<[f32; 4]>),
}

impl SurfaceLighting {
    pub fn len(&self) -> usize {
        match self {
            SurfaceLighting::None => 0,
            SurfaceLighting::Intensity(v) => v.len(),
            SurfaceLighting::Rgbi(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A polygon: level surface or mesh face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Surface {
    /// −1 means no material (portal / adjoin-only)
    pub material_index: i32,
    pub surface_flags: u32,
    pub face_flags: u32,
    pub geometry_mode: u32,
    pub light_mode: u32,
    pub texture_mode: u32,
    /// −1 when the surface is not a portal
    pub adjoin_index: i32,
    pub extra_light: f32,
    pub vertex_refs: Vec<VertexRef>,
    pub lighting: SurfaceLighting,
}

impl Surface {
    pub fn is_portal(&self) -> bool {
        self.adjoin_index >= 0
    }

    pub fn has_material(&self) -> bool {
        self.material_index >= 0
    }

    pub fn is_sky(&self) -> bool {
        self.surface_flags & (SURFACE_FLAG_HORIZON_SKY | SURFACE_FLAG_CEILING_SKY) != 0
    }

    pub fn is_translucent(&self) -> bool {
        self.face_flags & FACE_FLAG_TRANSLUCENT != 0
    }
}

/// Read `nverts` then the corner pairs, then per-corner light values.
///
/// Level surfaces always carry light values; mesh faces may omit them, in
/// which case `lighting_optional` yields [`SurfaceLighting::None`].
pub(crate) fn read_polygon_tail(
    rec: &mut RecordTokens<'_>,
    edition: FormatEdition,
    lighting_optional: bool,
) -> DecodeResult<(Vec<VertexRef>, SurfaceLighting)> {
    let nverts = rec.next_usize()?;
    let pair_tokens = nverts
        .checked_mul(2)
        .ok_or_else(|| rec.error(format!("vertex count {nverts} overflows")))?;
    rec.require(pair_tokens, "vertex/uv pairs")?;

    let mut refs = Vec::with_capacity(nverts);
    for _ in 0..nverts {
        let vertex = rec.next_usize()?;
        let uv = rec.next_i32()?;
        refs.push(VertexRef { vertex, uv });
    }

    // Bounded by the pair check above, so this cannot overflow.
    let light_tokens = nverts * edition.intensity_stride();
    if lighting_optional && rec.remaining() < light_tokens {
        return Ok((refs, SurfaceLighting::None));
    }
    rec.require(light_tokens, "light values")?;

    let lighting = match edition {
        FormatEdition::JediKnight => {
            let mut values = Vec::with_capacity(nverts);
            for _ in 0..nverts {
                values.push(rec.next_f32()?);
            }
            SurfaceLighting::Intensity(values)
        }
        FormatEdition::MysteriesOfTheSith => {
            let mut values = Vec::with_capacity(nverts);
            for _ in 0..nverts {
                values.push([
                    rec.next_f32()?,
                    rec.next_f32()?,
                    rec.next_f32()?,
                    rec.next_f32()?,
                ]);
            }
            SurfaceLighting::Rgbi(values)
        }
    };
    Ok((refs, lighting))
}
