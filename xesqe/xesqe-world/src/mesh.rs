use bytemuck::{Pod, Zeroable};

pub const UP: [f32; 3] = [0.0, 1.0, 0.0];

/// Vertex consumed by the PBR pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub albedo: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
}

/// Vertex consumed by the flat-color debug pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Indexed triangle list, clockwise front faces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }
}

/// Flat disc around the origin in the XZ plane, as a non-indexed triangle list.
pub fn light_marker(segments: u32, radius: f32, color: [f32; 3]) -> Vec<DebugVertex> {
    let segments = segments.max(3);
    let rim = |i: u32| {
        let a = i as f32 / segments as f32 * std::f32::consts::TAU;
        DebugVertex {
            position: [radius * a.cos(), 0.0, radius * a.sin()],
            color,
        }
    };
    let center = DebugVertex {
        position: [0.0; 3],
        color,
    };
    (0..segments)
        .flat_map(|i| [center, rim(i + 1), rim(i)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layouts_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        assert_eq!(std::mem::size_of::<DebugVertex>(), 24);
    }

    #[test]
    fn light_marker_is_a_closed_disc() {
        let disc = light_marker(32, 2.0, [1.0, 1.0, 0.0]);
        assert_eq!(disc.len(), 96);
        for tri in disc.chunks(3) {
            assert_eq!(tri[0].position, [0.0; 3]);
            for v in &tri[1..] {
                let [x, y, z] = v.position;
                assert!(((x * x + z * z).sqrt() - 2.0).abs() < 1e-5);
                assert_eq!(y, 0.0);
            }
        }
        let first = disc[2].position;
        let last = disc[disc.len() - 2].position;
        assert!((first[0] - last[0]).abs() < 1e-5 && (first[2] - last[2]).abs() < 1e-5);
    }
}
