//! OBJ mesh loading.
//!
//! Parsing is done by `tobj`. Before parsing, face vertices that point past the declared positions,
//! texture coordinates or normals are dropped so a single bad reference costs one vertex rather than
//! the whole file. Positions and normals are converted from the file's Y-up frame to ours with
//! (x, y, z) -> (x, z, -y), and every vertex gets a height-based material.

use std::path::Path;

use crate::error::MeshError;
use crate::mesh::{Mesh, Vertex, UP};

pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = build_mesh(&text, &path.display().to_string())?;
    log::info!(
        "loaded {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Parse OBJ text that is already in memory.
pub fn parse_obj(text: &str) -> Result<Mesh, MeshError> {
    build_mesh(text, "<memory>")
}

fn build_mesh(text: &str, name: &str) -> Result<Mesh, MeshError> {
    let cleaned = drop_dangling_references(text);
    let mut reader = cleaned.as_bytes();
    let (models, _) =
        tobj::load_obj_buf(&mut reader, &tobj::GPU_LOAD_OPTIONS, |_| Ok(Default::default()))?;

    let mut mesh = Mesh::default();
    for model in &models {
        let m = &model.mesh;
        let base = mesh.vertices.len() as u32;
        let has_normals = m.normals.len() == m.positions.len();
        for (i, p) in m.positions.chunks_exact(3).enumerate() {
            let position = to_world_axes([p[0], p[1], p[2]]);
            let normal = if has_normals {
                let n = &m.normals[i * 3..i * 3 + 3];
                unit_or_up(to_world_axes([n[0], n[1], n[2]]))
            } else {
                UP
            };
            mesh.vertices.push(shade(position, normal));
        }
        mesh.indices.extend(m.indices.iter().map(|&i| base + i));
    }
    if mesh.is_empty() {
        return Err(MeshError::Empty(name.to_string()));
    }
    Ok(mesh)
}

fn to_world_axes([x, y, z]: [f32; 3]) -> [f32; 3] {
    [x, z, -y]
}

fn unit_or_up(n: [f32; 3]) -> [f32; 3] {
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > f32::EPSILON {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        UP
    }
}

/// Height-graded material: higher parts get more metallic, smoother and less occluded.
pub fn shade(position: [f32; 3], normal: [f32; 3]) -> Vertex {
    let h = ((position[1] + 1.0) * 0.5).clamp(0.0, 1.0);
    Vertex {
        position,
        normal,
        albedo: [1.0, 1.0, 1.0],
        metallic: 0.1 + h * 0.8,
        roughness: 0.2 + (1.0 - h) * 0.6,
        ao: 0.8 + h * 0.2,
    }
}

fn drop_dangling_references(text: &str) -> String {
    let mut counts = [0i64; 3];
    let mut out = String::with_capacity(text.len());
    for (line_no, line) in text.lines().enumerate() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("v") => counts[0] += 1,
            Some("vt") => counts[1] += 1,
            Some("vn") => counts[2] += 1,
            Some("f") => {
                let kept: Vec<&str> = words
                    .filter(|w| {
                        let ok = face_vertex_in_range(w, counts);
                        if !ok {
                            log::warn!("line {}: skipping face vertex '{w}'", line_no + 1);
                        }
                        ok
                    })
                    .collect();
                if kept.len() >= 3 {
                    out.push_str("f ");
                    out.push_str(&kept.join(" "));
                    out.push('\n');
                }
                continue;
            }
            _ => {}
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// `v/vt/vn` with 1-based or negative (relative) indices; empty parts are allowed.
fn face_vertex_in_range(word: &str, counts: [i64; 3]) -> bool {
    word.split('/').zip(counts).all(|(part, count)| {
        if part.is_empty() {
            return true;
        }
        match part.parse::<i64>() {
            Ok(i) if i > 0 => i <= count,
            Ok(i) if i < 0 => -i <= count,
            _ => false,
        }
    })
}
