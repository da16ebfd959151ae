//! Scene assembly: turns a level or mesh file plus its archive into geometry,
//! materials and placed instances.
//!
//! A bad material or mesh never aborts the whole import. It is replaced by a
//! placeholder (or skipped) and reported in [`Scene::diagnostics`].

pub mod lighting;
pub mod material;
pub mod model;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::archive::{file_name, Archive};
use crate::error::{DecodeError, DecodeResult};
use crate::hierarchy::resolve;
use crate::math::{Rotation, Vertex3};
use crate::text::jkl::{parse_level, sector_for_surface, LevelFile, Sector};
use crate::text::three_do::parse_model;
use crate::text::{decode_latin1, FormatEdition, ParserConfig, SectionKind};
use crate::texture::{AlphaSource, Palette};

use lighting::corner_colors;
use material::{placeholder_for, MaterialCache, SceneMaterial};
use model::{build_model, polygon_corners, Model, PlacedInstance};

/// Texture size assumed for level surfaces whose material has no texture.
pub const LEVEL_FALLBACK_TEXTURE_SIZE: (u32, u32) = (16, 16);

/// Import switches. Deserializes from JSON with every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub edition: FormatEdition,
    /// Multiplier applied to all positions
    pub scale: f32,
    pub import_things: bool,
    pub import_materials: bool,
    /// Per-corner vertex colors from stored light values
    pub import_intensities: bool,
    /// Decode portal textures with the palette's transparency table
    pub import_alpha: bool,
    pub import_sector_info: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            edition: FormatEdition::JediKnight,
            scale: 1.0,
            import_things: true,
            import_materials: true,
            import_intensities: false,
            import_alpha: true,
            import_sector_info: false,
        }
    }
}

impl ImportOptions {
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            edition: self.edition,
            scale: self.scale,
        }
    }
}

/// A recoverable problem met while assembling a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub asset: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(asset: &str, message: impl Into<String>) -> Self {
        let diagnostic = Self {
            asset: asset.to_string(),
            message: message.into(),
        };
        tracing::warn!(asset = %diagnostic.asset, "{}", diagnostic.message);
        diagnostic
    }

    pub fn from_error(asset: &str, error: &DecodeError) -> Self {
        Self::new(asset, error.to_string())
    }
}

/// What a level face is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaceMaterial {
    /// Index into [`Scene::materials`]
    Level(usize),
    /// No material; drawn with [`Scene::portal_material`]
    Portal,
    /// Material index past the level's list; drawn with [`Scene::missing_material`]
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelFace {
    pub surface_index: usize,
    /// Indices into [`LevelMesh::vertices`]
    pub vertices: Vec<u32>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Option<Vec<[f32; 3]>>,
    pub material: FaceMaterial,
    pub tiling: [f32; 2],
    /// Id of the owning sector
    pub sector: Option<u32>,
    pub adjoin_index: i32,
    pub surface_flags: u32,
    pub face_flags: u32,
    pub geometry_mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelMesh {
    pub vertices: Vec<Vertex3>,
    pub faces: Vec<LevelFace>,
}

#[derive(Debug)]
pub struct Scene {
    pub name: String,
    pub level: LevelMesh,
    /// Level materials in file order
    pub materials: Vec<Arc<SceneMaterial>>,
    pub portal_material: Arc<SceneMaterial>,
    pub missing_material: Arc<SceneMaterial>,
    /// Decoded mesh templates by file name
    pub models: BTreeMap<String, Arc<Model>>,
    pub instances: Vec<PlacedInstance>,
    /// Empty unless sector info was requested
    pub sectors: Vec<Sector>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Scene {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            level: LevelMesh::default(),
            materials: Vec::new(),
            portal_material: Arc::new(SceneMaterial::portal()),
            missing_material: Arc::new(placeholder_for("__missing")),
            models: BTreeMap::new(),
            instances: Vec::new(),
            sectors: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn face_material(&self, face: &LevelFace) -> &Arc<SceneMaterial> {
        match face.material {
            FaceMaterial::Level(i) => self.materials.get(i).unwrap_or(&self.missing_material),
            FaceMaterial::Portal => &self.portal_material,
            FaceMaterial::Missing => &self.missing_material,
        }
    }
}

/// Strip directories and the extension: `jkl\01narshadda.jkl` -> `01narshadda`.
pub fn asset_stem(path: &str) -> &str {
    let name = file_name(path);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Builds scenes from level and mesh files, resolving resources through an archive.
///
/// Shareable across threads: the material cache is the only mutable state.
#[derive(Debug)]
pub struct SceneAssembler<'a> {
    archive: Option<&'a Archive>,
    options: ImportOptions,
    materials: MaterialCache,
}

impl<'a> SceneAssembler<'a> {
    pub fn new(archive: &'a Archive, options: ImportOptions) -> Self {
        Self {
            archive: Some(archive),
            options,
            materials: MaterialCache::new(),
        }
    }

    /// Assembler with no resource archive; materials and things become diagnostics.
    pub fn standalone(options: ImportOptions) -> Self {
        Self {
            archive: None,
            options,
            materials: MaterialCache::new(),
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn material_cache(&self) -> &MaterialCache {
        &self.materials
    }

    fn resource(&self, name: &str) -> DecodeResult<&'a [u8]> {
        match self.archive {
            Some(archive) => archive.extract(name),
            None => Err(DecodeError::EntryNotFound {
                path: name.to_string(),
            }),
        }
    }

    /// Decode the level stored in the archive under `entry`.
    pub fn assemble_level_entry(&self, entry: &str) -> DecodeResult<Scene> {
        let bytes = self.resource(entry)?;
        self.assemble_level(asset_stem(entry), bytes)
    }

    /// Decode a level file's bytes into a scene.
    pub fn assemble_level(&self, name: &str, bytes: &[u8]) -> DecodeResult<Scene> {
        let span = tracing::info_span!("level", name);
        let _guard = span.enter();

        let text = decode_latin1(bytes);
        let level = parse_level(&text, &self.options.parser_config())?;

        let mut scene = Scene::empty(name);
        scene.diagnostics.extend(
            level
                .skipped
                .iter()
                .map(|e| Diagnostic::from_error(name, e)),
        );

        let palette = if self.options.import_materials || self.options.import_things {
            self.level_palette(&level, &mut scene.diagnostics)
        } else {
            None
        };

        scene.materials = self.level_materials(&level, palette.as_ref(), &mut scene.diagnostics);
        scene.level = build_level_mesh(
            &level,
            &scene.materials,
            self.options.import_intensities,
            &mut scene.diagnostics,
        )?;

        if self.options.import_things {
            self.place_things(&level, palette.as_ref(), &mut scene);
        }
        if self.options.import_sector_info {
            scene.sectors = level.sectors.clone();
        }

        tracing::info!(
            faces = scene.level.faces.len(),
            materials = scene.materials.len(),
            instances = scene.instances.len(),
            diagnostics = scene.diagnostics.len(),
            "assembled level"
        );
        Ok(scene)
    }

    /// Decode a single mesh file, placed once at the origin.
    pub fn assemble_model(
        &self,
        name: &str,
        bytes: &[u8],
        palette: Option<&Palette>,
    ) -> DecodeResult<Scene> {
        let mut scene = Scene::empty(asset_stem(name));
        let model = Arc::new(self.load_model(name, bytes, palette, &mut scene.diagnostics)?);
        scene.instances.push(PlacedInstance::new(
            model.clone(),
            0,
            &model.name,
            Vertex3::new(0.0, 0.0, 0.0),
            Rotation::default(),
            0,
        ));
        scene.models.insert(file_name(name).to_string(), model);
        Ok(scene)
    }

    fn level_palette(&self, level: &LevelFile, diagnostics: &mut Vec<Diagnostic>) -> Option<Palette> {
        let Some(cmp) = level.colormaps.first() else {
            diagnostics.push(Diagnostic::new(
                SectionKind::WorldColormaps.name(),
                "level lists no colormap",
            ));
            return None;
        };
        match self.resource(cmp).and_then(Palette::decode) {
            Ok(palette) => Some(palette),
            Err(err) => {
                diagnostics.push(Diagnostic::from_error(cmp, &err));
                None
            }
        }
    }

    /// Material indices used by surfaces that are both textured and portals.
    fn alpha_material_indices(level: &LevelFile) -> HashSet<usize> {
        level
            .surfaces
            .iter()
            .filter(|s| s.is_portal() && s.has_material())
            .filter_map(|s| usize::try_from(s.material_index).ok())
            .collect()
    }

    fn level_materials(
        &self,
        level: &LevelFile,
        palette: Option<&Palette>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Arc<SceneMaterial>> {
        if !self.options.import_materials {
            return level
                .materials
                .iter()
                .map(|m| Arc::new(SceneMaterial::unresolved(&m.file_name)))
                .collect();
        }

        let alpha_indices = if self.options.import_alpha {
            Self::alpha_material_indices(level)
        } else {
            HashSet::new()
        };

        level
            .materials
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let alpha = if alpha_indices.contains(&i) {
                    AlphaSource::TransparencyTable
                } else {
                    AlphaSource::TransparentIndex
                };
                self.resolve_material(&entry.file_name, palette, alpha, diagnostics)
            })
            .collect()
    }

    /// Cached decode of one material; failures yield a cached placeholder.
    pub fn resolve_material(
        &self,
        file: &str,
        palette: Option<&Palette>,
        alpha: AlphaSource,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Arc<SceneMaterial> {
        if let Some(hit) = self.materials.get(file, alpha) {
            return hit;
        }
        let Some(palette) = palette else {
            diagnostics.push(Diagnostic::new(file, "no colormap to decode against"));
            return Arc::new(placeholder_for(file));
        };

        let decoded = self
            .resource(file)
            .and_then(|bytes| SceneMaterial::decode(file, bytes, palette, alpha));
        let material = match decoded {
            Ok(material) => material,
            Err(err) => {
                diagnostics.push(Diagnostic::from_error(file, &err));
                placeholder_for(file)
            }
        };
        self.materials.insert(material, alpha)
    }

    fn load_model(
        &self,
        name: &str,
        bytes: &[u8],
        palette: Option<&Palette>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> DecodeResult<Model> {
        let text = decode_latin1(bytes);
        let file = parse_model(&text, &self.options.parser_config())?;
        let nodes = resolve(&file.nodes)?;

        let materials = file
            .materials
            .iter()
            .map(|m| {
                if self.options.import_materials {
                    // Archive lookups are case-sensitive and entries are stored lower case
                    let file = m.to_ascii_lowercase();
                    let alpha = AlphaSource::TransparentIndex;
                    self.resolve_material(&file, palette, alpha, diagnostics)
                } else {
                    Arc::new(SceneMaterial::unresolved(m))
                }
            })
            .collect();

        build_model(
            asset_stem(name),
            &file,
            nodes,
            materials,
            self.options.import_intensities,
        )
    }

    fn place_things(&self, level: &LevelFile, palette: Option<&Palette>, scene: &mut Scene) {
        let mut loaded: HashMap<String, Option<Arc<Model>>> = HashMap::new();

        for thing in &level.things {
            let Some(model_file) = thing.model_file() else {
                tracing::debug!(thing = thing.index, name = %thing.resolved_name, "thing has no mesh");
                continue;
            };
            let key = model_file.to_ascii_lowercase();
            let model = match loaded.get(&key) {
                Some(cached) => cached.clone(),
                None => {
                    let decoded = self.resource(model_file).and_then(|bytes| {
                        self.load_model(model_file, bytes, palette, &mut scene.diagnostics)
                    });
                    let model = match decoded {
                        Ok(model) => Some(Arc::new(model)),
                        Err(err) => {
                            scene
                                .diagnostics
                                .push(Diagnostic::from_error(model_file, &err));
                            None
                        }
                    };
                    loaded.insert(key, model.clone());
                    model
                }
            };
            let Some(model) = model else { continue };

            scene
                .models
                .entry(model_file.to_string())
                .or_insert_with(|| model.clone());
            scene.instances.push(PlacedInstance::new(
                model,
                thing.index,
                &thing.template,
                thing.position,
                thing.rotation,
                thing.sector,
            ));
        }
    }
}

/// Level surfaces to faces. Vertex and UV references must be in range.
fn build_level_mesh(
    level: &LevelFile,
    materials: &[Arc<SceneMaterial>],
    with_colors: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> DecodeResult<LevelMesh> {
    let section = SectionKind::WorldSurfaces.name();
    let mut faces = Vec::with_capacity(level.surfaces.len());

    for (i, surface) in level.surfaces.iter().enumerate() {
        let material = match usize::try_from(surface.material_index) {
            Err(_) => FaceMaterial::Portal,
            Ok(m) if m < materials.len() => FaceMaterial::Level(m),
            Ok(m) => {
                diagnostics.push(Diagnostic::new(
                    section,
                    format!("surface {i} uses material {m}, level lists {}", materials.len()),
                ));
                FaceMaterial::Missing
            }
        };

        let (size, tiling) = match material {
            FaceMaterial::Level(m) => (
                materials[m]
                    .texture_size()
                    .unwrap_or(LEVEL_FALLBACK_TEXTURE_SIZE),
                level
                    .materials
                    .get(m)
                    .map_or([1.0, 1.0], |e| [e.tile_u, e.tile_v]),
            ),
            _ => (LEVEL_FALLBACK_TEXTURE_SIZE, [1.0, 1.0]),
        };

        let (vertices, uvs) = polygon_corners(
            section,
            i,
            &surface.vertex_refs,
            level.vertices.len(),
            &level.uvs,
            size,
        )?;

        let sector = sector_for_surface(&level.sectors, i).map(|k| &level.sectors[k]);
        let colors = if with_colors {
            let (extra, tint) = sector.map_or((0.0, [0.0; 3]), |s| (s.extra_light, s.tint));
            corner_colors(&surface.lighting, surface.extra_light, extra, tint)
        } else {
            None
        };

        faces.push(LevelFace {
            surface_index: i,
            vertices,
            uvs,
            colors,
            material,
            tiling,
            sector: sector.map(|s| s.id),
            adjoin_index: surface.adjoin_index,
            surface_flags: surface.surface_flags,
            face_flags: surface.face_flags,
            geometry_mode: surface.geometry_mode,
        });
    }

    Ok(LevelMesh {
        vertices: level.vertices.clone(),
        faces,
    })
}
