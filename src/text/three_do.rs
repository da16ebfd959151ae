//! Mesh (.3do) records: material list, first geoset's meshes and the node hierarchy.

use cgmath::Vector3;
use serde::Serialize;

use super::surface::{read_polygon_tail, Surface};
use super::{
    section_rows, split_lines, FormatEdition, ParserConfig, RecordTokens, Section, SectionKind,
    SectionTable,
};
use crate::error::{DecodeError, DecodeResult};
use crate::hierarchy::HierarchyNode;
use crate::math::{Rotation, Uv2, Vertex3};

/// Tokens in one `HIERARCHY NODES` row.
pub const HIERARCHY_ROW_TOKENS: usize = 18;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshRecord {
    /// Number from the `MESH n` header
    pub index: usize,
    pub name: String,
    /// Mesh-local positions, scaled, pivot not yet applied
    pub vertices: Vec<Vertex3>,
    pub vertex_intensities: Vec<f32>,
    pub uvs: Vec<Uv2>,
    pub faces: Vec<Surface>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelFile {
    /// Material file names as written, e.g. `dflt.mat`
    pub materials: Vec<String>,
    pub meshes: Vec<MeshRecord>,
    pub nodes: Vec<HierarchyNode>,
}

impl ModelFile {
    pub fn mesh(&self, index: usize) -> Option<&MeshRecord> {
        self.meshes.iter().find(|m| m.index == index)
    }
}

/// Decode a mesh file's text.
pub fn parse_model(text: &str, config: &ParserConfig) -> DecodeResult<ModelFile> {
    let lines = split_lines(text);
    let top = SectionTable::scan(
        &lines,
        0..lines.len(),
        &[
            SectionKind::Materials,
            SectionKind::Meshes,
            SectionKind::HierarchyNodes,
        ],
    );

    let materials = match top.get(SectionKind::Materials) {
        Some(section) => parse_materials(&lines, section, &top, config.edition)?,
        None => Vec::new(),
    };

    let hierarchy_line = top
        .get(SectionKind::HierarchyNodes)
        .map_or(lines.len(), |s| s.header_line);

    let meshes = match top.get(SectionKind::Meshes) {
        Some(section) => parse_meshes(&lines, section, hierarchy_line, config)?,
        None => Vec::new(),
    };

    let nodes = match top.get(SectionKind::HierarchyNodes) {
        Some(section) => parse_hierarchy(&lines, section, config)?,
        None => Vec::new(),
    };

    tracing::debug!(
        materials = materials.len(),
        meshes = meshes.len(),
        nodes = nodes.len(),
        "parsed model"
    );
    Ok(ModelFile {
        materials,
        meshes,
        nodes,
    })
}

fn parse_materials(
    lines: &[&str],
    section: &Section,
    table: &SectionTable,
    edition: FormatEdition,
) -> DecodeResult<Vec<String>> {
    let end = table.end_of(section, lines.len());
    section_rows(lines, section, end, edition)?
        .into_iter()
        .enumerate()
        .map(|(i, (_, line))| {
            let mut rec = RecordTokens::new(SectionKind::Materials.name(), i, line);
            rec.next_index()?;
            Ok(rec.next_str()?.to_string())
        })
        .collect()
}

fn is_block_boundary(line: &str) -> bool {
    SectionKind::Mesh.match_header(line).is_some()
        || SectionKind::HierarchyNodes.match_header(line).is_some()
        || line
            .split_whitespace()
            .next()
            .is_some_and(|t| t.eq_ignore_ascii_case("geoset"))
}

/// The first `MESHES n` worth of `MESH i` blocks.
fn parse_meshes(
    lines: &[&str],
    meshes: &Section,
    hierarchy_line: usize,
    config: &ParserConfig,
) -> DecodeResult<Vec<MeshRecord>> {
    let limit = if hierarchy_line > meshes.header_line {
        hierarchy_line
    } else {
        lines.len()
    };

    let headers: Vec<(usize, usize)> = (meshes.data_start..limit)
        .filter_map(|idx| SectionKind::Mesh.match_header(lines[idx]).map(|n| (idx, n)))
        .take(meshes.count)
        .collect();

    if headers.len() < meshes.count {
        return Err(DecodeError::TruncatedSection {
            section: SectionKind::Meshes.name().to_string(),
            declared: meshes.count,
            available: headers.len(),
        });
    }

    headers
        .into_iter()
        .map(|(header_line, index)| {
            let end = (header_line + 1..limit)
                .find(|&idx| is_block_boundary(lines[idx]))
                .unwrap_or(limit);
            parse_mesh_block(lines, header_line, end, index, config)
        })
        .collect()
}

fn parse_mesh_block(
    lines: &[&str],
    header_line: usize,
    end: usize,
    index: usize,
    config: &ParserConfig,
) -> DecodeResult<MeshRecord> {
    let block = SectionTable::scan(
        lines,
        header_line + 1..end,
        &[
            SectionKind::Vertices,
            SectionKind::TextureVertices,
            SectionKind::Faces,
        ],
    );

    let name = (header_line + 1..end)
        .map(|idx| lines[idx].split_whitespace().collect::<Vec<_>>())
        .find(|tokens| tokens.first().is_some_and(|t| t.eq_ignore_ascii_case("name")))
        .and_then(|tokens| tokens.get(1).map(|n| n.to_string()))
        .unwrap_or_else(|| format!("mesh{index}"));

    let rows = |kind: SectionKind| match block.get(kind) {
        Some(section) => section_rows(lines, section, block.end_of(section, end), config.edition),
        None => Ok(Vec::new()),
    };

    let mut vertices = Vec::new();
    let mut vertex_intensities = Vec::new();
    for (i, (_, line)) in rows(SectionKind::Vertices)?.into_iter().enumerate() {
        let mut rec = RecordTokens::new(SectionKind::Vertices.name(), i, line);
        rec.require(4, "index x y z")?;
        rec.next_index()?;
        let v = Vector3::new(rec.next_f32()?, rec.next_f32()?, rec.next_f32()?);
        vertices.push(v * config.scale);
        vertex_intensities.push(if rec.remaining() > 0 { rec.next_f32()? } else { 0.0 });
    }

    let mut uvs = Vec::new();
    for (i, (_, line)) in rows(SectionKind::TextureVertices)?.into_iter().enumerate() {
        let mut rec = RecordTokens::new(SectionKind::TextureVertices.name(), i, line);
        rec.require(3, "index u v")?;
        rec.next_index()?;
        uvs.push(Uv2::new(rec.next_f32()?, rec.next_f32()?));
    }

    let faces = rows(SectionKind::Faces)?
        .into_iter()
        .enumerate()
        .map(|(i, (_, line))| parse_face(i, line, config.edition))
        .collect::<DecodeResult<Vec<_>>>()?;

    Ok(MeshRecord {
        index,
        name,
        vertices,
        vertex_intensities,
        uvs,
        faces,
    })
}

fn parse_face(record: usize, line: &str, edition: FormatEdition) -> DecodeResult<Surface> {
    let mut rec = RecordTokens::new(SectionKind::Faces.name(), record, line);
    rec.require(8, "face prefix")?;
    rec.next_index()?;
    let material_index = rec.next_i32()?;
    let face_flags = rec.next_hex()?;
    let geometry_mode = rec.next_u32()?;
    let light_mode = rec.next_u32()?;
    let texture_mode = rec.next_u32()?;
    let extra_light = rec.next_f32()?;
    let (vertex_refs, lighting) = read_polygon_tail(&mut rec, edition, true)?;

    Ok(Surface {
        material_index,
        surface_flags: 0,
        face_flags,
        geometry_mode,
        light_mode,
        texture_mode,
        adjoin_index: -1,
        extra_light,
        vertex_refs,
        lighting,
    })
}

fn parse_hierarchy(
    lines: &[&str],
    section: &Section,
    config: &ParserConfig,
) -> DecodeResult<Vec<HierarchyNode>> {
    let scale = config.scale;
    section_rows(lines, section, lines.len(), config.edition)?
        .into_iter()
        .enumerate()
        .map(|(i, (_, line))| {
            let mut rec = RecordTokens::new(SectionKind::HierarchyNodes.name(), i, line);
            rec.require(HIERARCHY_ROW_TOKENS, "hierarchy node")?;
            rec.next_index()?;
            let flags = rec.next_hex()?;
            let node_type = rec.next_hex()?;
            let mesh_index = rec.next_i32()?;
            let parent_index = rec.next_i32()?;
            let child_index = rec.next_i32()?;
            let sibling_index = rec.next_i32()?;
            let child_count = rec.next_u32()?;
            let translation = Vector3::new(rec.next_f32()?, rec.next_f32()?, rec.next_f32()?);
            let rotation = Rotation::new(rec.next_f32()?, rec.next_f32()?, rec.next_f32()?);
            let pivot = Vector3::new(rec.next_f32()?, rec.next_f32()?, rec.next_f32()?);
            let name = rec.next_str()?.to_string();
            Ok(HierarchyNode {
                name,
                flags,
                node_type,
                mesh_index,
                parent_index,
                child_index,
                sibling_index,
                child_count,
                local_translation: translation * scale,
                local_rotation: rotation,
                local_pivot: pivot * scale,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::surface::SurfaceLighting;

    const CUBE: &str = "3DO 2.1\n\
        MODELRESOURCE\n\
        MATERIALS 2\n\
        \n\
        0: wall.mat\n\
        1: dflt.mat\n\
        SECTION: GEOMETRYDEF\n\
        RADIUS 1.0\n\
        GEOSETS 1\n\
        GEOSET 0\n\
        MESHES 2\n\
        MESH 0\n\
        NAME body\n\
        RADIUS 1.0\n\
        VERTICES 3\n\
        # num: x: y: z: i:\n\
        0: 0.0 0.0 0.0 0.1\n\
        1: 1.0 0.0 0.0 0.2\n\
        2: 0.0 1.0 0.0 0.3\n\
        TEXTURE VERTICES 2\n\
        # num: u: v:\n\
        0: 0.0 0.0\n\
        1: 32.0 32.0\n\
        VERTEX NORMALS\n\
        FACES 1\n\
        # num: material: type: geo: light: tex: extralight: verts:\n\
        0: 1 0x0 4 3 0 0.0 3 0,0 1,1 2,1 1.0 1.0 1.0\n\
        MESH 1\n\
        NAME head\n\
        VERTICES 1\n\
        #\n\
        0: 0.0 0.0 2.0 0.0\n\
        TEXTURE VERTICES 0\n\
        #\n\
        FACES 0\n\
        #\n\
        SECTION: HIERARCHYDEF\n\
        HIERARCHY NODES 3\n\
        # num: flags: type: mesh: parent: child: sibling: numChildren: x: y: z: pitch: yaw: roll: pivotx: pivoty: pivotz: hnodename:\n\
        0: 0x0 0x1 0 -1 1 -1 1 0.0 0.0 1.0 0.0 0.0 0.0 0.0 0.0 0.0 body\n\
        1: 0x0 0x1 1 0 -1 2 0 0.0 0.0 0.5 0.0 90.0 0.0 0.0 0.0 0.25 head\n\
        2: 0x0 0x1 -1 0 -1 -1 0 1.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 $$$dummy\n";

    #[test]
    fn cube_model_decodes() {
        let model = parse_model(CUBE, &ParserConfig::default()).unwrap();
        assert_eq!(model.materials, vec!["wall.mat", "dflt.mat"]);
        assert_eq!(model.meshes.len(), 2);

        let body = &model.meshes[0];
        assert_eq!(body.name, "body");
        assert_eq!(body.vertices[1], Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(body.vertex_intensities, vec![0.1, 0.2, 0.3]);
        assert_eq!(body.uvs[1], Uv2::new(32.0, 32.0));
        assert_eq!(body.faces.len(), 1);
        assert_eq!(body.faces[0].material_index, 1);
        assert_eq!(
            body.faces[0].lighting,
            SurfaceLighting::Intensity(vec![1.0, 1.0, 1.0])
        );

        let head = &model.meshes[1];
        assert_eq!(head.name, "head");
        assert!(head.faces.is_empty());
    }

    #[test]
    fn hierarchy_nodes_decode() {
        let model = parse_model(CUBE, &ParserConfig::default()).unwrap();
        assert_eq!(model.nodes.len(), 3);
        let head = &model.nodes[1];
        assert_eq!(head.parent_index, 0);
        assert_eq!(head.mesh_index, 1);
        assert_eq!(head.local_rotation.yaw, 90.0);
        assert_eq!(head.local_pivot, Vector3::new(0.0, 0.0, 0.25));
        assert!(model.nodes[2].is_dummy());
    }

    #[test]
    fn scale_applies_to_positions_and_pivots() {
        let config = ParserConfig {
            scale: 10.0,
            ..ParserConfig::default()
        };
        let model = parse_model(CUBE, &config).unwrap();
        assert_eq!(model.meshes[1].vertices[0], Vector3::new(0.0, 0.0, 20.0));
        assert_eq!(model.nodes[1].local_translation, Vector3::new(0.0, 0.0, 5.0));
        assert_eq!(model.nodes[1].local_pivot, Vector3::new(0.0, 0.0, 2.5));
        // Angles are never scaled
        assert_eq!(model.nodes[1].local_rotation.yaw, 90.0);
    }

    #[test]
    fn short_hierarchy_row_is_malformed() {
        let text = "HIERARCHY NODES 1\n#\n0: 0x0 0x1 0 -1 -1 -1 0 0 0 0\n";
        let err = parse_model(text, &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedRecord { record: 0, .. }));
    }

    #[test]
    fn missing_mesh_blocks_are_truncated() {
        let text = "MESHES 2\nMESH 0\nVERTICES 0\n#\n";
        assert!(matches!(
            parse_model(text, &ParserConfig::default()),
            Err(DecodeError::TruncatedSection { declared: 2, available: 1, .. })
        ));
    }

    #[test]
    fn mots_rows_follow_header_directly() {
        let config = ParserConfig {
            edition: FormatEdition::MysteriesOfTheSith,
            ..ParserConfig::default()
        };
        let text = "MATERIALS 1\n0: a.mat\nMESHES 1\nMESH 0\nVERTICES 1\n0: 1 2 3 0.5\n";
        let model = parse_model(text, &config).unwrap();
        assert_eq!(model.materials, vec!["a.mat"]);
        assert_eq!(model.meshes[0].vertices, vec![Vector3::new(1.0, 2.0, 3.0)]);
    }
}
