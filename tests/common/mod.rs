// Common test utilities and helpers
#![allow(dead_code)]

use cgmath::Vector3;
use jk_tools_lib::hierarchy::HierarchyNode;
use jk_tools_lib::math::Rotation;

pub fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Build a GOB container: 16-byte header, 136-byte index records, payloads after the index.
pub fn build_gob(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"GOB ");
    push_u32(&mut buf, 0x14);
    push_u32(&mut buf, 0x0C);
    push_u32(&mut buf, files.len() as u32);

    let mut offset = 16 + files.len() * 136;
    for (path, payload) in files {
        push_u32(&mut buf, offset as u32);
        push_u32(&mut buf, payload.len() as u32);
        let mut raw = [0u8; 128];
        raw[..path.len()].copy_from_slice(path.as_bytes());
        buf.extend_from_slice(&raw);
        offset += payload.len();
    }
    for (_, payload) in files {
        buf.extend_from_slice(payload);
    }
    buf
}

/// Colormap where index `i` is RGB `(i, 255 - i, i / 2)` and table alpha is `i % 64`.
pub fn build_cmp(alpha_tables: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"CMP ");
    push_u32(&mut buf, 30);
    push_u32(&mut buf, u32::from(alpha_tables > 0));
    buf.resize(64, 0);
    for i in 0..256usize {
        buf.extend_from_slice(&[i as u8, 255 - i as u8, (i / 2) as u8]);
    }
    for level in 0..63usize {
        for i in 0..256usize {
            buf.push(((i * level) / 63) as u8);
        }
    }
    for _ in 0..alpha_tables.max(1) {
        for i in 0..256usize {
            buf.push((i % 64) as u8);
        }
    }
    buf
}

/// 8-bit texture material with one cel per entry of `cels` and no mip chain.
pub fn build_texture_mat(width: u32, height: u32, transparent: bool, cels: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"MAT ");
    push_u32(&mut buf, 0x32);
    push_u32(&mut buf, 2);
    push_u32(&mut buf, cels.len() as u32);
    push_u32(&mut buf, cels.len() as u32);
    push_u32(&mut buf, 0);
    push_u32(&mut buf, 8);
    buf.resize(76, 0);
    for i in 0..cels.len() {
        push_u32(&mut buf, 8);
        for _ in 0..8 {
            push_u32(&mut buf, 0);
        }
        push_u32(&mut buf, i as u32);
    }
    for cel in cels {
        push_u32(&mut buf, width);
        push_u32(&mut buf, height);
        push_u32(&mut buf, u32::from(transparent));
        push_u32(&mut buf, 0);
        push_u32(&mut buf, 0);
        push_u32(&mut buf, 1);
        buf.extend_from_slice(cel);
    }
    buf
}

/// Header claiming a texture whose pixels are missing.
pub fn build_truncated_mat() -> Vec<u8> {
    let mut mat = build_texture_mat(8, 8, false, &[vec![1; 64]]);
    mat.truncate(mat.len() - 40);
    mat
}

pub fn node(name: &str, mesh: i32, parent: i32, translation: [f32; 3]) -> HierarchyNode {
    HierarchyNode {
        name: name.to_string(),
        flags: 0,
        node_type: 1,
        mesh_index: mesh,
        parent_index: parent,
        child_index: -1,
        sibling_index: -1,
        child_count: 0,
        local_translation: Vector3::from(translation),
        local_rotation: Rotation::default(),
        local_pivot: Vector3::new(0.0, 0.0, 0.0),
    }
}

/// Two-mesh model: `body` carries one triangle on `crate.mat`, `lid` sits on a dummy.
pub const CRATE_3DO: &str = "3DO 2.1\n\
    MODELRESOURCE\n\
    MATERIALS 1\n\
    # num: name:\n\
    0: crate.mat\n\
    SECTION: GEOMETRYDEF\n\
    GEOSETS 1\n\
    GEOSET 0\n\
    MESHES 2\n\
    MESH 0\n\
    NAME body\n\
    VERTICES 3\n\
    #\n\
    0: 0.0 0.0 0.0 0.0\n\
    1: 1.0 0.0 0.0 0.0\n\
    2: 0.0 1.0 0.0 0.0\n\
    TEXTURE VERTICES 2\n\
    #\n\
    0: 0.0 0.0\n\
    1: 4.0 2.0\n\
    FACES 1\n\
    #\n\
    0: 0 0x0 4 3 0 0.0 3 0,0 1,1 2,1\n\
    MESH 1\n\
    NAME lid\n\
    VERTICES 1\n\
    #\n\
    0: 0.0 0.0 0.0 0.0\n\
    TEXTURE VERTICES 0\n\
    #\n\
    FACES 0\n\
    #\n\
    SECTION: HIERARCHYDEF\n\
    HIERARCHY NODES 3\n\
    #\n\
    0: 0x0 0x1 0 -1 1 -1 1 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 body\n\
    1: 0x0 0x1 -1 0 2 -1 1 0.0 0.0 1.0 0.0 0.0 0.0 0.0 0.0 0.0 $$$dummy\n\
    2: 0x0 0x1 1 1 -1 -1 0 0.5 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 lid\n";

/// Two-sector level with one portal pair, a corrupt material and three things.
///
/// Materials: 0 `floor.mat` (8×8 texture), 1 `broken.mat` (truncated),
/// 2 `glass.mat` (used by the adjoined surface 1).
pub const LEVEL_JKL: &str = "JK\n\
    SECTION: HEADER\n\
    Version 1\n\
    SECTION: MATERIALS\n\
    World materials 3\n\
    # num: mat: xtile: ytile:\n\
    0: floor.mat 1.0 1.0\n\
    1: broken.mat 1.0 1.0\n\
    2: glass.mat 2.0 2.0\n\
    end\n\
    SECTION: GEORESOURCE\n\
    World Colormaps 1\n\
    0: dflt.cmp\n\
    World vertices 4\n\
    0: 0 0 0\n\
    1: 1 0 0\n\
    2: 1 1 0\n\
    3: 0 1 0\n\
    World texture vertices 2\n\
    0: 0 0\n\
    1: 4 8\n\
    World adjoins 1\n\
    0: 0x7 1 0\n\
    World surfaces 4\n\
    0: 0 0x4 0x0 4 3 1 -1 0.0 3 0,0 1,1 2,1 0.5 0.5 0.5\n\
    1: 2 0x0 0x2 4 3 1 0 0.0 3 0,0 2,1 3,1 0.5 0.5 0.5\n\
    2: -1 0x0 0x0 0 3 1 -1 0.0 3 0,-1 2,-1 3,-1 0.0 0.0 0.0\n\
    3: 1 0x0 0x0 4 3 1 -1 0.25 3 1,1 2,1 3,1 0.5 0.5 0.5\n\
    SECTION: SECTORS\n\
    World sectors 2\n\
    SECTOR 0\n\
    FLAGS 0x0\n\
    AMBIENT LIGHT 0.1\n\
    EXTRA LIGHT 0.5\n\
    TINT 1.0 0.5 0.0\n\
    BOUNDBOX 0 0 0 1 1 1\n\
    CENTER 0.5 0.5 0.5\n\
    RADIUS 1\n\
    SURFACES 0 2\n\
    SECTOR 1\n\
    FLAGS 0x0\n\
    AMBIENT LIGHT 0.2\n\
    EXTRA LIGHT 0.0\n\
    TINT 0 0 0\n\
    BOUNDBOX 0 0 0 1 1 1\n\
    CENTER 0.5 0.5 0.5\n\
    RADIUS 1\n\
    SURFACES 2 2\n\
    SECTION: TEMPLATES\n\
    World templates 2\n\
    _crate none type=cog model3d=crate.3do\n\
    crate2 _crate type=cog\n\
    end\n\
    SECTION: THINGS\n\
    World things 3\n\
    #num template: name: X: Y: Z: Pitch: Yaw: Roll: Sector:\n\
    0: _crate _crate 1.0 0.0 0.0 0.0 0.0 0.0 0\n\
    1: crate2 crate2 0.0 2.0 0.0 0.0 90.0 0.0 1\n\
    2: walkplayer walkplayer 0.0 0.0 0.0 0.0 0.0 0.0 0\n\
    end\n";

/// Archive with everything `LEVEL_JKL` references.
pub fn level_archive() -> Vec<u8> {
    let cmp = build_cmp(1);
    let floor = build_texture_mat(8, 8, false, &[vec![10; 64]]);
    let broken = build_truncated_mat();
    let glass = build_texture_mat(4, 4, false, &[vec![33; 16]]);
    let crate_mat = build_texture_mat(4, 2, false, &[vec![5; 8]]);
    build_gob(&[
        ("jkl\\test.jkl", LEVEL_JKL.as_bytes()),
        ("misc\\dflt.cmp", &cmp),
        ("mat\\floor.mat", &floor),
        ("mat\\broken.mat", &broken),
        ("mat\\glass.mat", &glass),
        ("3do\\mat\\crate.mat", &crate_mat),
        ("3do\\crate.3do", CRATE_3DO.as_bytes()),
    ])
}
