//! Rigid node hierarchy of a mesh file.
//!
//! Nodes reference their parent by index into the same list (`-1` for the
//! root). Local transforms compose parent-first; the placement of a whole
//! instance sits above the root.

use cgmath::{Matrix4, Vector3, Zero};
use serde::Serialize;

use crate::error::{DecodeError, DecodeResult};
use crate::math::{translate_rotate, Rotation, Vertex3};

/// Node name marking a transform-only placeholder.
pub const DUMMY_NODE_NAME: &str = "$$$dummy";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub name: String,
    pub flags: u32,
    pub node_type: u32,
    /// −1 when the node carries no geometry
    pub mesh_index: i32,
    /// −1 for the root
    pub parent_index: i32,
    pub child_index: i32,
    pub sibling_index: i32,
    pub child_count: u32,
    pub local_translation: Vertex3,
    pub local_rotation: Rotation,
    pub local_pivot: Vertex3,
}

impl HierarchyNode {
    pub fn is_dummy(&self) -> bool {
        self.mesh_index < 0 || self.name.eq_ignore_ascii_case(DUMMY_NODE_NAME)
    }

    pub fn parent(&self) -> Option<usize> {
        usize::try_from(self.parent_index).ok()
    }

    pub fn mesh(&self) -> Option<usize> {
        if self.is_dummy() {
            None
        } else {
            usize::try_from(self.mesh_index).ok()
        }
    }
}

/// A node with its translation summed along the parent chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNode {
    pub node: HierarchyNode,
    pub absolute_translation: Vertex3,
    /// Root-first indices from the root down to this node
    pub chain: Vec<usize>,
}

/// Every parent index is −1 or names a node in the list.
pub fn validate_parents(nodes: &[HierarchyNode]) -> DecodeResult<()> {
    for (i, node) in nodes.iter().enumerate() {
        let valid = node.parent_index == -1
            || node
                .parent()
                .is_some_and(|p| p < nodes.len());
        if !valid {
            return Err(DecodeError::InvalidParentReference {
                node: i,
                parent: node.parent_index,
                count: nodes.len(),
            });
        }
    }
    Ok(())
}

/// Indices from `start` up to its root, bounded by the node count.
fn ancestry(nodes: &[HierarchyNode], start: usize) -> DecodeResult<Vec<usize>> {
    let mut chain = vec![start];
    let mut current = nodes[start].parent();
    while let Some(parent) = current {
        if chain.len() > nodes.len() {
            return Err(DecodeError::CyclicHierarchy { node: start });
        }
        chain.push(parent);
        current = nodes[parent].parent();
    }
    Ok(chain)
}

/// Absolute translation of every node: the sum of local translations from
/// the node up to its root. Rotations do not enter this sum.
pub fn resolve(nodes: &[HierarchyNode]) -> DecodeResult<Vec<ResolvedNode>> {
    validate_parents(nodes)?;

    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let mut chain = ancestry(nodes, i)?;
            let absolute_translation = chain
                .iter()
                .fold(Vector3::zero(), |sum, &k| sum + nodes[k].local_translation);
            chain.reverse();
            Ok(ResolvedNode {
                node: node.clone(),
                absolute_translation,
                chain,
            })
        })
        .collect()
}

/// World matrix of each node: `placement * local(root) * ... * local(node)`,
/// where `local = T(translation) * R(yaw, pitch, roll)`.
pub fn world_transforms(resolved: &[ResolvedNode], placement: Matrix4<f32>) -> Vec<Matrix4<f32>> {
    let locals: Vec<Matrix4<f32>> = resolved
        .iter()
        .map(|r| translate_rotate(r.node.local_translation, r.node.local_rotation))
        .collect();

    resolved
        .iter()
        .map(|r| r.chain.iter().fold(placement, |world, &k| world * locals[k]))
        .collect()
}

/// Pivot of the node carrying `mesh`, or zero when no node does.
///
/// When several nodes name the same mesh the last one wins.
pub fn mesh_pivot(nodes: &[HierarchyNode], mesh: usize) -> Vertex3 {
    nodes
        .iter()
        .rev()
        .find(|n| n.mesh() == Some(mesh))
        .map_or_else(Vector3::zero, |n| n.local_pivot)
}
