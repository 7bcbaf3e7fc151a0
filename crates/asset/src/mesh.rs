//! CPU-side triangle mesh built from a parsed OBJ document.

use corelib::{Aabb, Vec3};

use crate::obj::ObjDocument;

/// Vertex with position and normal. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// Non-indexed triangle list. `positions` and `normals` are flat buffers of
/// equal length, a multiple of 9 (three vertices of three floats each).
/// Immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    positions: Vec<f32>,
    normals: Vec<f32>,
}

impl MeshData {
    /// Fan-triangulate every face around its first vertex and compute smooth
    /// normals by averaging face normals at shared positions.
    ///
    /// Only correct for convex planar polygons. Normals and UVs from the
    /// document are not used.
    pub fn from_obj(doc: &ObjDocument) -> Self {
        let triangles = fan_triangulate(&doc.faces, doc.positions.len());
        if triangles.is_empty() {
            log::warn!("OBJ contained no usable faces; building an empty mesh");
            return Self::default();
        }

        let vertex_normals = smooth_normals(&doc.positions, &triangles);
        let mut positions = Vec::with_capacity(triangles.len() * 9);
        let mut normals = Vec::with_capacity(triangles.len() * 9);
        for tri in &triangles {
            for &i in tri {
                positions.extend_from_slice(&doc.positions[i as usize]);
                normals.extend_from_slice(&vertex_normals[i as usize]);
            }
        }

        log::debug!(
            "Built mesh: {} positions, {} faces, {} triangles",
            doc.positions.len(),
            doc.faces.len(),
            triangles.len()
        );
        Self { positions, normals }
    }

    /// Flat triangle buffer: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub fn triangle_buffer(&self) -> &[f32] {
        &self.positions
    }

    pub fn normal_buffer(&self) -> &[f32] {
        &self.normals
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 9
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = MeshVertex> + '_ {
        self.positions
            .chunks_exact(3)
            .zip(self.normals.chunks_exact(3))
            .map(|(p, n)| MeshVertex::new([p[0], p[1], p[2]], [n[0], n[1], n[2]]))
    }

    /// Bounds of all emitted vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(
            self.positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        )
    }
}

/// (v0, v1, v2), (v0, v2, v3), ... for each face: `n - 2` triangles per face.
/// Indices past `vertex_count` are dropped first, the same way the parser
/// treats them; faces left with fewer than three are skipped.
fn fan_triangulate(faces: &[Vec<u32>], vertex_count: usize) -> Vec<[u32; 3]> {
    let mut triangles = Vec::new();
    for face in faces {
        let face: Vec<u32> = face
            .iter()
            .copied()
            .filter(|&i| (i as usize) < vertex_count)
            .collect();
        if face.len() < 3 {
            continue;
        }
        for pair in face[1..].windows(2) {
            triangles.push([face[0], pair[0], pair[1]]);
        }
    }
    triangles
}

/// Area-weighted face normals accumulated per position index, then normalized.
/// Positions no triangle touches, or whose normals cancel out, get +Z.
fn smooth_normals(positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for &[a, b, c] in triangles {
        let p0 = Vec3::from(positions[a as usize]);
        let p1 = Vec3::from(positions[b as usize]);
        let p2 = Vec3::from(positions[c as usize]);
        // Unnormalized cross product: its length is twice the triangle area.
        let face = (p1 - p0).cross(p2 - p0);
        acc[a as usize] += face;
        acc[b as usize] += face;
        acc[c as usize] += face;
    }
    acc.into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            let n = if n == Vec3::ZERO { Vec3::Z } else { n };
            n.to_array()
        })
        .collect()
}
