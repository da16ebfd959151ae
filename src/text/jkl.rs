//! Level (.jkl) records: world geometry, sectors, materials and thing placements.

use cgmath::Vector3;
use serde::Serialize;

use super::surface::{read_polygon_tail, Surface};
use super::{
    is_data_line, section_rows, split_lines, tokenize, FormatEdition, ParserConfig, RecordTokens,
    Section, SectionKind, SectionTable,
};
use crate::error::{DecodeError, DecodeResult};
use crate::math::{Rotation, Uv2, Vertex3};

/// One `World materials` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialEntry {
    /// Lowercased file name, e.g. `dflt.mat`
    pub file_name: String,
    pub tile_u: f32,
    pub tile_v: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sector {
    pub id: u32,
    pub flags: u32,
    pub ambient: f32,
    pub extra_light: f32,
    pub tint: [f32; 3],
    /// min xyz, max xyz
    pub bounding_box: [f32; 6],
    pub center: Vertex3,
    pub radius: f32,
    pub surface_start: usize,
    pub surface_count: usize,
}

/// Vertex order of the six quads of [`Sector::bounding_box_corners`].
pub const BOUNDING_BOX_FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [1, 5, 6, 2],
    [5, 4, 7, 6],
    [4, 0, 3, 7],
    [3, 2, 6, 7],
    [0, 4, 5, 1],
];

impl Sector {
    /// Index of the last surface owned by this sector; `start - 1` when empty.
    pub fn surface_range_end(&self) -> i64 {
        self.surface_start as i64 + self.surface_count as i64 - 1
    }

    pub fn bounding_box_corners(&self) -> [Vertex3; 8] {
        let [x1, y1, z1, x2, y2, z2] = self.bounding_box;
        [
            Vector3::new(x1, y1, z1),
            Vector3::new(x1, y2, z1),
            Vector3::new(x1, y2, z2),
            Vector3::new(x1, y1, z2),
            Vector3::new(x2, y1, z1),
            Vector3::new(x2, y2, z1),
            Vector3::new(x2, y2, z2),
            Vector3::new(x2, y1, z2),
        ]
    }
}

/// Index into `sectors` (sorted by range end) owning `surface`.
pub fn sector_for_surface(sectors: &[Sector], surface: usize) -> Option<usize> {
    let idx = sectors.partition_point(|s| s.surface_range_end() < surface as i64);
    (idx < sectors.len()).then_some(idx)
}

/// One `World templates` row: `name base key=value ...`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub name: String,
    pub base: String,
    pub params: Vec<(String, String)>,
}

impl Template {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// One `World things` row with its mesh name resolved through the templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThingPlacement {
    pub index: usize,
    pub template: String,
    pub raw_name: String,
    /// `model3d` of the template chain, or `raw_name` when none was found
    pub resolved_name: String,
    pub position: Vertex3,
    pub rotation: Rotation,
    pub sector: u32,
}

impl ThingPlacement {
    /// Mesh file to instantiate, if the name resolved to one.
    pub fn model_file(&self) -> Option<&str> {
        let lower = self.resolved_name.to_ascii_lowercase();
        lower.ends_with(".3do").then_some(self.resolved_name.as_str())
    }
}

#[derive(Debug, Default)]
pub struct LevelFile {
    pub colormaps: Vec<String>,
    pub materials: Vec<MaterialEntry>,
    pub vertices: Vec<Vertex3>,
    pub uvs: Vec<Uv2>,
    pub adjoin_count: usize,
    pub surfaces: Vec<Surface>,
    /// Sorted ascending by [`Sector::surface_range_end`]
    pub sectors: Vec<Sector>,
    pub templates: Vec<Template>,
    pub things: Vec<ThingPlacement>,
    /// Best-effort rows that were dropped
    pub skipped: Vec<DecodeError>,
}

struct LevelSections<'a> {
    lines: Vec<&'a str>,
    table: SectionTable,
    config: ParserConfig,
}

impl<'a> LevelSections<'a> {
    fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.table.get(kind)
    }

    fn end(&self, section: &Section) -> usize {
        self.table.end_of(section, self.lines.len())
    }

    fn rows(&self, kind: SectionKind) -> DecodeResult<Vec<(usize, &'a str)>> {
        match self.section(kind) {
            Some(section) => {
                section_rows(&self.lines, section, self.end(section), self.config.edition)
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Decode a level file's text.
pub fn parse_level(text: &str, config: &ParserConfig) -> DecodeResult<LevelFile> {
    let lines = split_lines(text);
    let table = SectionTable::scan(&lines, 0..lines.len(), SectionKind::LEVEL);
    let ctx = LevelSections {
        lines,
        table,
        config: *config,
    };

    let mut level = LevelFile {
        colormaps: parse_colormaps(&ctx)?,
        materials: parse_materials(&ctx)?,
        vertices: parse_vertices(&ctx)?,
        uvs: parse_uvs(&ctx)?,
        adjoin_count: ctx
            .section(SectionKind::WorldAdjoins)
            .map_or(0, |s| s.count),
        surfaces: parse_surfaces(&ctx)?,
        sectors: parse_sectors(&ctx)?,
        ..LevelFile::default()
    };

    let (templates, mut skipped) = parse_templates(&ctx);
    level.templates = templates;
    let (things, skipped_things) = parse_things(&ctx, &level.templates);
    level.things = things;
    skipped.extend(skipped_things);
    level.skipped = skipped;

    tracing::debug!(
        vertices = level.vertices.len(),
        surfaces = level.surfaces.len(),
        sectors = level.sectors.len(),
        things = level.things.len(),
        "parsed level"
    );
    Ok(level)
}

fn parse_colormaps(ctx: &LevelSections) -> DecodeResult<Vec<String>> {
    let name = SectionKind::WorldColormaps.name();
    ctx.rows(SectionKind::WorldColormaps)?
        .into_iter()
        .enumerate()
        .map(|(i, (_, line))| {
            let mut rec = RecordTokens::new(name, i, line);
            rec.next_index()?;
            Ok(rec.next_str()?.to_string())
        })
        .collect()
}

/// Rows until a leading `end` token; the declared count is advisory.
fn parse_materials(ctx: &LevelSections) -> DecodeResult<Vec<MaterialEntry>> {
    let kind = SectionKind::WorldMaterials;
    let Some(section) = ctx.section(kind) else {
        return Ok(Vec::new());
    };
    let start = section.data_start + ctx.config.edition.label_lines(kind);
    let end = ctx.end(section);

    let mut materials = Vec::new();
    for line in ctx.lines[start.min(end)..end].iter().filter(|l| is_data_line(l)) {
        let first = tokenize(line).first().copied().unwrap_or_default();
        if first.eq_ignore_ascii_case("end") {
            return Ok(materials);
        }
        let mut rec = RecordTokens::new(kind.name(), materials.len(), line);
        rec.next_index()?;
        let file_name = rec.next_str()?.to_ascii_lowercase();
        let tile_u = rec.next_f32()?;
        let tile_v = rec.next_f32()?;
        materials.push(MaterialEntry {
            file_name,
            tile_u,
            tile_v,
        });
    }

    Err(DecodeError::TruncatedSection {
        section: kind.name().to_string(),
        declared: section.count,
        available: materials.len(),
    })
}

fn parse_vertices(ctx: &LevelSections) -> DecodeResult<Vec<Vertex3>> {
    let name = SectionKind::WorldVertices.name();
    let scale = ctx.config.scale;
    ctx.rows(SectionKind::WorldVertices)?
        .into_iter()
        .enumerate()
        .map(|(i, (_, line))| {
            let mut rec = RecordTokens::new(name, i, line);
            rec.require(4, "index x y z")?;
            rec.next_index()?;
            let x = rec.next_f32()?;
            let y = rec.next_f32()?;
            let z = rec.next_f32()?;
            Ok(Vector3::new(x, y, z) * scale)
        })
        .collect()
}

fn parse_uvs(ctx: &LevelSections) -> DecodeResult<Vec<Uv2>> {
    let name = SectionKind::WorldTextureVertices.name();
    ctx.rows(SectionKind::WorldTextureVertices)?
        .into_iter()
        .enumerate()
        .map(|(i, (_, line))| {
            let mut rec = RecordTokens::new(name, i, line);
            rec.require(3, "index u v")?;
            rec.next_index()?;
            Ok(Uv2::new(rec.next_f32()?, rec.next_f32()?))
        })
        .collect()
}

fn parse_surfaces(ctx: &LevelSections) -> DecodeResult<Vec<Surface>> {
    let name = SectionKind::WorldSurfaces.name();
    ctx.rows(SectionKind::WorldSurfaces)?
        .into_iter()
        .enumerate()
        .map(|(i, (_, line))| parse_surface(name, i, line, ctx.config.edition))
        .collect()
}

pub(crate) fn parse_surface(
    section: &'static str,
    record: usize,
    line: &str,
    edition: FormatEdition,
) -> DecodeResult<Surface> {
    let mut rec = RecordTokens::new(section, record, line);
    rec.require(10, "surface prefix")?;
    rec.next_index()?;
    let material_index = rec.next_i32()?;
    let surface_flags = rec.next_hex()?;
    let face_flags = rec.next_hex()?;
    let geometry_mode = rec.next_u32()?;
    let light_mode = rec.next_u32()?;
    let texture_mode = rec.next_u32()?;
    let adjoin_index = rec.next_i32()?;
    let extra_light = rec.next_f32()?;
    let (vertex_refs, lighting) = read_polygon_tail(&mut rec, edition, false)?;

    Ok(Surface {
        material_index,
        surface_flags,
        face_flags,
        geometry_mode,
        light_mode,
        texture_mode,
        adjoin_index,
        extra_light,
        vertex_refs,
        lighting,
    })
}

#[derive(Default)]
struct SectorBuilder {
    id: u32,
    flags: u32,
    ambient: f32,
    extra_light: f32,
    tint: [f32; 3],
    bounding_box: [f32; 6],
    center: [f32; 3],
    radius: f32,
}

/// Key-led sector blocks; a block completes at its `SURFACES` line.
fn parse_sectors(ctx: &LevelSections) -> DecodeResult<Vec<Sector>> {
    let kind = SectionKind::WorldSectors;
    let Some(section) = ctx.section(kind) else {
        return Ok(Vec::new());
    };
    let name = kind.name();
    let scale = ctx.config.scale;
    let end = ctx.end(section);

    let mut sectors = Vec::new();
    let mut current: Option<SectorBuilder> = None;

    for line in ctx.lines[section.data_start.min(end)..end].iter() {
        if sectors.len() == section.count {
            break;
        }
        let tokens = tokenize(line);
        let Some(&key) = tokens.first() else { continue };
        let record = sectors.len();
        let upper = key.to_ascii_uppercase();
        let second = tokens.get(1).map(|t| t.to_ascii_uppercase());

        match (upper.as_str(), second.as_deref()) {
            ("SECTOR", _) => {
                let mut rec = RecordTokens::new(name, record, line);
                rec.skip(1)?;
                current = Some(SectorBuilder {
                    id: rec.next_u32()?,
                    ..SectorBuilder::default()
                });
            }
            _ => {
                let Some(sector) = current.as_mut() else { continue };
                let mut rec = RecordTokens::new(name, record, line);
                match (upper.as_str(), second.as_deref()) {
                    ("FLAGS", _) => {
                        rec.skip(1)?;
                        sector.flags = rec.next_hex()?;
                    }
                    ("AMBIENT", Some("LIGHT")) => {
                        rec.skip(2)?;
                        sector.ambient = rec.next_f32()?;
                    }
                    ("EXTRA", Some("LIGHT")) => {
                        rec.skip(2)?;
                        sector.extra_light = rec.next_f32()?;
                    }
                    ("TINT", _) => {
                        rec.skip(1)?;
                        sector.tint = [rec.next_f32()?, rec.next_f32()?, rec.next_f32()?];
                    }
                    ("BOUNDBOX", _) => {
                        rec.skip(1)?;
                        for value in sector.bounding_box.iter_mut() {
                            *value = rec.next_f32()? * scale;
                        }
                    }
                    ("CENTER", _) => {
                        rec.skip(1)?;
                        for value in sector.center.iter_mut() {
                            *value = rec.next_f32()? * scale;
                        }
                    }
                    ("RADIUS", _) => {
                        rec.skip(1)?;
                        sector.radius = rec.next_f32()? * scale;
                    }
                    ("SURFACES", _) => {
                        rec.skip(1)?;
                        let surface_start = rec.next_usize()?;
                        let surface_count = rec.next_usize()?;
                        if let Some(done) = current.take() {
                            sectors.push(Sector {
                                id: done.id,
                                flags: done.flags,
                                ambient: done.ambient,
                                extra_light: done.extra_light,
                                tint: done.tint,
                                bounding_box: done.bounding_box,
                                center: Vector3::from(done.center),
                                radius: done.radius,
                                surface_start,
                                surface_count,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    if sectors.len() < section.count {
        return Err(DecodeError::TruncatedSection {
            section: name.to_string(),
            declared: section.count,
            available: sectors.len(),
        });
    }

    sectors.sort_by_key(Sector::surface_range_end);
    Ok(sectors)
}

fn parse_templates(ctx: &LevelSections) -> (Vec<Template>, Vec<DecodeError>) {
    let kind = SectionKind::WorldTemplates;
    let Some(section) = ctx.section(kind) else {
        return (Vec::new(), Vec::new());
    };
    let end = ctx.end(section);

    let mut templates = Vec::new();
    let mut skipped = Vec::new();
    for line in ctx.lines[section.data_start.min(end)..end]
        .iter()
        .filter(|l| is_data_line(l))
    {
        if templates.len() == section.count {
            break;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first().is_some_and(|t| t.eq_ignore_ascii_case("end")) {
            break;
        }
        if tokens.len() < 2 {
            skipped.push(DecodeError::malformed(
                kind.name(),
                templates.len(),
                "template needs a name and a base",
            ));
            continue;
        }
        let params = tokens[2..]
            .iter()
            .filter_map(|kv| kv.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        templates.push(Template {
            name: tokens[0].to_string(),
            base: tokens[1].to_string(),
            params,
        });
    }
    (templates, skipped)
}

/// `model3d` along the template inheritance chain starting at `name`.
pub fn resolve_model_name(templates: &[Template], name: &str) -> Option<String> {
    let mut current = name;
    for _ in 0..=templates.len() {
        let template = templates.iter().find(|t| t.name == current)?;
        if let Some(model) = template.param("model3d") {
            return Some(model.to_string());
        }
        current = &template.base;
    }
    None
}

fn parse_things(ctx: &LevelSections, templates: &[Template]) -> (Vec<ThingPlacement>, Vec<DecodeError>) {
    let kind = SectionKind::WorldThings;
    let Some(section) = ctx.section(kind) else {
        return (Vec::new(), Vec::new());
    };
    let end = ctx.end(section);
    let scale = ctx.config.scale;

    let mut things = Vec::new();
    let mut skipped = Vec::new();
    for (record, line) in ctx.lines[section.data_start.min(end)..end]
        .iter()
        .filter(|l| is_data_line(l))
        .take(section.count)
        .enumerate()
    {
        if tokenize(line).first().is_some_and(|t| t.eq_ignore_ascii_case("end")) {
            break;
        }
        let parsed = parse_thing(kind.name(), record, line, scale, templates);
        match parsed {
            Ok(thing) => things.push(thing),
            Err(err) => {
                tracing::warn!(record, error = %err, "skipping thing");
                skipped.push(err);
            }
        }
    }
    (things, skipped)
}

fn parse_thing(
    section: &'static str,
    record: usize,
    line: &str,
    scale: f32,
    templates: &[Template],
) -> DecodeResult<ThingPlacement> {
    let mut rec = RecordTokens::new(section, record, line);
    rec.require(10, "thing prefix")?;
    let index = rec.next_index()?;
    let template = rec.next_str()?.to_string();
    let raw_name = rec.next_str()?.to_string();
    let position = Vector3::new(rec.next_f32()?, rec.next_f32()?, rec.next_f32()?) * scale;
    let rotation = Rotation::new(rec.next_f32()?, rec.next_f32()?, rec.next_f32()?);
    let sector = rec.next_u32()?;
    let resolved_name = resolve_model_name(templates, &raw_name).unwrap_or_else(|| raw_name.clone());
    Ok(ThingPlacement {
        index,
        template,
        raw_name,
        resolved_name,
        position,
        rotation,
        sector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::surface::SurfaceLighting;

    fn jk() -> ParserConfig {
        ParserConfig::default()
    }

    #[test]
    fn single_vertex_is_scaled() {
        let config = ParserConfig {
            scale: 10.0,
            ..jk()
        };
        let level = parse_level("World vertices 1\n0 1.0 2.0 3.0 0\n", &config).unwrap();
        assert_eq!(level.vertices, vec![Vector3::new(10.0, 20.0, 30.0)]);
    }

    #[test]
    fn declared_count_past_eof_is_truncated() {
        let err = parse_level("World vertices 3\n0: 1 2 3\n1: 4 5 6\n", &jk()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedSection {
                declared: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn surface_with_short_prefix_is_malformed() {
        let text = "World surfaces 1\n0: 3 0x4 0x0 4 3 1\n";
        let err = parse_level(text, &jk()).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedRecord { record: 0, .. }));
    }

    #[test]
    fn surfaces_decode_flags_pairs_and_intensities() {
        let text = "World surfaces 1\n\
                    0:\t2\t0x4\t0x2\t4\t3\t1\t-1\t0.25\t3\t0,0\t1,1\t2,2\t0.5\t0.6\t0.7\n";
        let level = parse_level(text, &jk()).unwrap();
        let surface = &level.surfaces[0];
        assert_eq!(surface.material_index, 2);
        assert_eq!(surface.surface_flags, 4);
        assert!(surface.is_translucent());
        assert!(!surface.is_portal());
        assert_eq!(surface.vertex_refs.len(), 3);
        assert_eq!(
            surface.lighting,
            SurfaceLighting::Intensity(vec![0.5, 0.6, 0.7])
        );
    }

    #[test]
    fn materials_stop_at_end_marker() {
        let text = "World materials 3\n#num: mat: xtile: ytile:\n0: Wall.mat 1.0 1.0\n1: floor.mat 2.0 0.5\nend\n";
        let level = parse_level(text, &jk()).unwrap();
        assert_eq!(level.materials.len(), 2);
        assert_eq!(level.materials[0].file_name, "wall.mat");
        assert_eq!(level.materials[1].tile_u, 2.0);
    }

    #[test]
    fn materials_without_end_are_truncated() {
        let text = "World materials 2\n#label\n0: wall.mat 1 1\n";
        assert!(matches!(
            parse_level(text, &jk()),
            Err(DecodeError::TruncatedSection { .. })
        ));
    }

    #[test]
    fn mots_materials_have_no_label_line() {
        let config = ParserConfig {
            edition: FormatEdition::MysteriesOfTheSith,
            ..jk()
        };
        let text = "World materials 1\n0: wall.mat 1 1\nend\n";
        let level = parse_level(text, &config).unwrap();
        assert_eq!(level.materials.len(), 1);
    }

    const SECTORS: &str = "World sectors 2\n\
        SECTOR 0\n\
        FLAGS 0x0\n\
        AMBIENT LIGHT 0.1\n\
        EXTRA LIGHT 0.5\n\
        TINT 1.0 0.5 0.25\n\
        BOUNDBOX -1 -1 -1 1 1 1\n\
        CENTER 0 0 0\n\
        RADIUS 2\n\
        SURFACES 4 3\n\
        SECTOR 1\n\
        AMBIENT LIGHT 0.2\n\
        EXTRA LIGHT 0.0\n\
        TINT 0 0 0\n\
        SURFACES 0 4\n";

    #[test]
    fn sectors_are_sorted_by_range_end() {
        let level = parse_level(SECTORS, &jk()).unwrap();
        let ids: Vec<u32> = level.sectors.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 0]);
        assert_eq!(level.sectors[0].surface_range_end(), 3);
        assert_eq!(level.sectors[1].surface_range_end(), 6);
        assert_eq!(level.sectors[1].tint, [1.0, 0.5, 0.25]);
    }

    #[test]
    fn surfaces_attribute_to_first_covering_sector() {
        let level = parse_level(SECTORS, &jk()).unwrap();
        let owners: Vec<_> = (0..7)
            .map(|s| sector_for_surface(&level.sectors, s).map(|i| level.sectors[i].id))
            .collect();
        assert_eq!(
            owners,
            vec![Some(1), Some(1), Some(1), Some(1), Some(0), Some(0), Some(0)]
        );
        assert_eq!(sector_for_surface(&level.sectors, 7), None);
    }

    #[test]
    fn sector_geometry_is_scaled() {
        let config = ParserConfig {
            scale: 2.0,
            ..jk()
        };
        let level = parse_level(SECTORS, &config).unwrap();
        let sector = &level.sectors[1];
        assert_eq!(sector.radius, 4.0);
        assert_eq!(sector.bounding_box_corners()[6], Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn incomplete_sector_list_is_truncated() {
        let text = "World sectors 2\nSECTOR 0\nSURFACES 0 1\nSECTOR 1\nAMBIENT LIGHT 0\n";
        assert!(matches!(
            parse_level(text, &jk()),
            Err(DecodeError::TruncatedSection { available: 1, .. })
        ));
    }

    const THINGS: &str = "World templates 3\n\
        _humanactor _actor type=actor model3d=ky.3do\n\
        walkplayer _humanactor type=player model3d=kyle.3do\n\
        stormtroop _humanactor type=actor\n\
        end\n\
        World things 4\n\
        #num template: name: X: Y: Z: Pitch: Yaw: Roll: Sector:\n\
        0: walkplayer walkplayer 1.0 2.0 3.0 0.0 90.0 0.0 5 thingflags=0x1\n\
        1: stormtroop stormtroop 0 0 0 0 0 0 1\n\
        2: ghost ghost 0 0 zero 0 0 0 1\n\
        3: ghost ghost 0 0 0 0 0 0 2\n\
        end\n";

    #[test]
    fn thing_names_resolve_through_templates() {
        let level = parse_level(THINGS, &jk()).unwrap();
        assert_eq!(level.things.len(), 3);

        let player = &level.things[0];
        assert_eq!(player.resolved_name, "kyle.3do");
        assert_eq!(player.rotation.yaw, 90.0);
        assert_eq!(player.sector, 5);

        // Inherits model3d from its base template
        assert_eq!(level.things[1].resolved_name, "ky.3do");

        let ghost = &level.things[2];
        assert_eq!(ghost.resolved_name, "ghost");
        assert_eq!(ghost.model_file(), None);
    }

    #[test]
    fn malformed_thing_is_skipped_not_fatal() {
        let level = parse_level(THINGS, &jk()).unwrap();
        assert_eq!(level.skipped.len(), 1);
        assert!(matches!(
            level.skipped[0],
            DecodeError::MalformedRecord { record: 2, .. }
        ));
    }

    #[test]
    fn cyclic_templates_do_not_hang() {
        let templates = vec![
            Template {
                name: "a".into(),
                base: "b".into(),
                params: vec![],
            },
            Template {
                name: "b".into(),
                base: "a".into(),
                params: vec![],
            },
        ];
        assert_eq!(resolve_model_name(&templates, "a"), None);
    }

    #[test]
    fn absurd_counts_are_errors_not_allocations() {
        let text = "SECTION: SECTORS\nWorld sectors 4000000000000000000\nSECTOR 0\n";
        assert!(matches!(
            parse_level(text, &jk()),
            Err(DecodeError::TruncatedSection { available: 0, .. })
        ));

        let text = "World templates 4000000000000000000\n_a none model3d=a.3do\nend\n\
                    World things 4000000000000000000\n\
                    0: _a _a 0 0 0 0 0 0 0\nend\n";
        let level = parse_level(text, &jk()).unwrap();
        assert_eq!(level.templates.len(), 1);
        assert_eq!(level.things.len(), 1);
    }

    #[test]
    fn missing_sections_are_empty() {
        let level = parse_level("# nothing here\n", &jk()).unwrap();
        assert!(level.vertices.is_empty());
        assert!(level.sectors.is_empty());
        assert!(level.things.is_empty());
    }
}
