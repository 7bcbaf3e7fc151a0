//! Minimal, lenient OBJ parser: positions, normals, texture coordinates and faces.
//!
//! Malformed numbers default to 0.0 and invalid face indices are dropped; only
//! I/O errors are reported. Normals and texture coordinates are kept on the
//! document but the mesh builder recomputes normals and ignores UVs.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result};

use crate::mesh::MeshData;

/// Parsed OBJ contents. Face entries are 0-based position indices, each face
/// holding at least three of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjDocument {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub faces: Vec<Vec<u32>>,
}

/// Load an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let doc = parse_obj(BufReader::new(file))
        .with_context(|| format!("Failed to read OBJ file: {}", path.display()))?;
    Ok(MeshData::from_obj(&doc))
}

/// Convenience helper to build a mesh from an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> MeshData {
    MeshData::from_obj(&parse_obj_str(contents))
}

/// Parse OBJ text held in memory. Never fails.
pub fn parse_obj_str(contents: &str) -> ObjDocument {
    let mut doc = ObjDocument::default();
    for line in contents.lines() {
        parse_line(&mut doc, line);
    }
    doc
}

/// Parse OBJ text from a reader. Only read errors are returned; bytes that
/// are not valid UTF-8 are replaced rather than rejected.
pub fn parse_obj<R: Read>(mut reader: R) -> io::Result<ObjDocument> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(parse_obj_str(&String::from_utf8_lossy(&bytes)))
}

fn parse_line(doc: &mut ObjDocument, line: &str) {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return;
    }

    let mut parts = trimmed.split_whitespace();
    let Some(tag) = parts.next() else {
        return;
    };
    // A bare tag carries no data at all.
    if parts.clone().next().is_none() {
        return;
    }

    match tag {
        "v" => {
            let x = lenient_f32(parts.next());
            let y = lenient_f32(parts.next());
            let z = lenient_f32(parts.next());
            doc.positions.push([x, y, z]);
        }
        "vn" => {
            let x = lenient_f32(parts.next());
            let y = lenient_f32(parts.next());
            let z = lenient_f32(parts.next());
            doc.normals.push([x, y, z]);
        }
        "vt" => {
            let u = lenient_f32(parts.next());
            let v = lenient_f32(parts.next());
            doc.texcoords.push([u, v]);
        }
        "f" => {
            let count = doc.positions.len();
            let face: Vec<u32> = parts
                .filter_map(|token| position_index(token, count))
                .collect();
            if face.len() >= 3 {
                doc.faces.push(face);
            }
        }
        _ => {
            // Ignore other directives (o/g/s/usemtl/mtllib/etc.)
        }
    }
}

fn lenient_f32(token: Option<&str>) -> f32 {
    token
        .and_then(|t| t.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Resolve the position part of a `v/vt/vn` face token to a 0-based index.
/// Zero, negative (relative) and out-of-range indices yield `None`.
fn position_index(token: &str, count: usize) -> Option<u32> {
    let raw = token.split('/').next()?.parse::<i64>().ok()?;
    if raw < 1 || raw as u64 > count as u64 {
        return None;
    }
    u32::try_from(raw - 1).ok()
}
