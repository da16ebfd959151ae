//! Decoded mesh templates and their placed instances.

use std::sync::Arc;

use cgmath::Matrix4;
use serde::Serialize;

use super::lighting::corner_colors;
use super::material::SceneMaterial;
use crate::error::{DecodeError, DecodeResult};
use crate::hierarchy::{mesh_pivot, world_transforms, ResolvedNode};
use crate::math::{matrix_to_cols, translate_rotate, Rotation, Uv2, Vertex3};
use crate::text::surface::{Surface, VertexRef};
use crate::text::three_do::{MeshRecord, ModelFile};
use crate::text::SectionKind;

/// Texture size assumed for mesh faces whose material has no texture.
pub const MESH_FALLBACK_TEXTURE_SIZE: (u32, u32) = (64, 64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFace {
    /// Indices into the owning mesh's vertex list
    pub vertices: Vec<u32>,
    /// Normalized texture coordinates, one per corner
    pub uvs: Vec<[f32; 2]>,
    /// Index into [`Model::materials`]
    pub material: Option<usize>,
    pub face_flags: u32,
    pub colors: Option<Vec<[f32; 3]>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMesh {
    pub index: usize,
    pub name: String,
    /// Mesh-local positions with the node pivot applied
    pub vertices: Vec<Vertex3>,
    pub faces: Vec<ModelFace>,
}

/// One decoded mesh file, shared by every instance placing it.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub materials: Vec<Arc<SceneMaterial>>,
    pub meshes: Vec<ModelMesh>,
    pub nodes: Vec<ResolvedNode>,
}

impl Model {
    /// Position in [`Model::meshes`] of the mesh numbered `index`.
    pub fn mesh_slot(&self, index: usize) -> Option<usize> {
        self.meshes.iter().position(|m| m.index == index)
    }
}

/// A node of a placed instance; dummies carry no mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceNode {
    pub name: String,
    /// Index into [`Model::meshes`]
    pub mesh: Option<usize>,
    pub parent: Option<usize>,
    /// Summed local translations plus the instance position
    pub position: Vertex3,
    /// Column-major world matrix
    pub world: [[f32; 4]; 4],
}

/// One thing placement with its resolved mesh.
#[derive(Debug, Clone)]
pub struct PlacedInstance {
    pub thing_index: usize,
    pub template_name: String,
    pub position: Vertex3,
    pub rotation: Rotation,
    pub sector_id: u32,
    pub model: Arc<Model>,
    pub nodes: Vec<InstanceNode>,
}

impl PlacedInstance {
    /// Place `model` at `position` / `rotation`. Nodes keep hierarchy order.
    pub fn new(
        model: Arc<Model>,
        thing_index: usize,
        template_name: &str,
        position: Vertex3,
        rotation: Rotation,
        sector_id: u32,
    ) -> Self {
        let placement: Matrix4<f32> = translate_rotate(position, rotation);
        let worlds = world_transforms(&model.nodes, placement);
        let nodes = model
            .nodes
            .iter()
            .zip(worlds)
            .map(|(resolved, world)| InstanceNode {
                name: resolved.node.name.clone(),
                mesh: resolved.node.mesh().and_then(|m| model.mesh_slot(m)),
                parent: resolved.node.parent(),
                position: resolved.absolute_translation + position,
                world: matrix_to_cols(&world),
            })
            .collect();

        Self {
            thing_index,
            template_name: template_name.to_string(),
            position,
            rotation,
            sector_id,
            model,
            nodes,
        }
    }
}

/// Normalize pixel UVs by texture size; v is negated for a bottom-left origin.
pub(crate) fn normalize_uv(uv: Uv2, size: (u32, u32)) -> [f32; 2] {
    let (w, h) = (size.0.max(1) as f32, size.1.max(1) as f32);
    [uv.x / w, -uv.y / h]
}

/// Vertex indices and normalized UVs for one polygon.
pub(crate) fn polygon_corners(
    section: &str,
    record: usize,
    refs: &[VertexRef],
    vertex_count: usize,
    uvs: &[Uv2],
    size: (u32, u32),
) -> DecodeResult<(Vec<u32>, Vec<[f32; 2]>)> {
    let mut vertices = Vec::with_capacity(refs.len());
    let mut corners = Vec::with_capacity(refs.len());
    for r in refs {
        if r.vertex >= vertex_count {
            return Err(DecodeError::malformed(
                section,
                record,
                format!("vertex {} out of range ({vertex_count} vertices)", r.vertex),
            ));
        }
        vertices.push(r.vertex as u32);
        let uv = match usize::try_from(r.uv) {
            Err(_) => [0.0, 0.0],
            Ok(i) => {
                let uv = uvs.get(i).ok_or_else(|| {
                    DecodeError::malformed(
                        section,
                        record,
                        format!("texture vertex {i} out of range ({} uvs)", uvs.len()),
                    )
                })?;
                normalize_uv(*uv, size)
            }
        };
        corners.push(uv);
    }
    Ok((vertices, corners))
}

fn build_face(
    record: usize,
    face: &Surface,
    mesh: &MeshRecord,
    materials: &[Arc<SceneMaterial>],
    with_colors: bool,
) -> DecodeResult<ModelFace> {
    let material = usize::try_from(face.material_index)
        .ok()
        .filter(|&m| m < materials.len());
    let size = material
        .and_then(|m| materials[m].texture_size())
        .unwrap_or(MESH_FALLBACK_TEXTURE_SIZE);

    let (vertices, uvs) = polygon_corners(
        SectionKind::Faces.name(),
        record,
        &face.vertex_refs,
        mesh.vertices.len(),
        &mesh.uvs,
        size,
    )?;
    let colors = with_colors
        .then(|| corner_colors(&face.lighting, face.extra_light, 0.0, [0.0; 3]))
        .flatten();

    Ok(ModelFace {
        vertices,
        uvs,
        material,
        face_flags: face.face_flags,
        colors,
    })
}

/// Turn parsed records into a [`Model`]; materials are already resolved in file order.
pub(crate) fn build_model(
    name: &str,
    file: &ModelFile,
    nodes: Vec<ResolvedNode>,
    materials: Vec<Arc<SceneMaterial>>,
    with_colors: bool,
) -> DecodeResult<Model> {
    let raw_nodes: Vec<_> = nodes.iter().map(|r| r.node.clone()).collect();

    let meshes = file
        .meshes
        .iter()
        .map(|mesh| {
            let pivot = mesh_pivot(&raw_nodes, mesh.index);
            let faces = mesh
                .faces
                .iter()
                .enumerate()
                .map(|(i, face)| build_face(i, face, mesh, &materials, with_colors))
                .collect::<DecodeResult<Vec<_>>>()?;
            Ok(ModelMesh {
                index: mesh.index,
                name: mesh.name.clone(),
                vertices: mesh.vertices.iter().map(|v| v + pivot).collect(),
                faces,
            })
        })
        .collect::<DecodeResult<Vec<_>>>()?;

    Ok(Model {
        name: name.to_string(),
        materials,
        meshes,
        nodes,
    })
}
