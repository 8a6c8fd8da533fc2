//! Procedural height-field terrain.
//!
//! Samples lie on a regular grid centered on the origin. Row `r` runs along -Z and column `c` along +X,
//! so sample (0, 0) is the far-left corner at (-width/2, depth/2).

use crate::error::TerrainError;
use crate::mesh::{Mesh, Vertex, UP};
use crate::physics::Ground;

const AMPLITUDE: f32 = 5.0;
const FREQUENCY: f32 = 0.1;

const GRASS: [f32; 3] = [0.35, 0.55, 0.25];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainConfig {
    pub width: f32,
    pub depth: f32,
    pub rows: usize,
    pub cols: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 200.0,
            depth: 200.0,
            rows: 50,
            cols: 50,
        }
    }
}

/// Closed-form terrain height at a world position.
pub fn height_function(x: f32, z: f32) -> f32 {
    AMPLITUDE * (x * FREQUENCY).sin() * (z * FREQUENCY).cos()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    config: TerrainConfig,
    /// Row-major, `rows * cols` samples.
    heights: Vec<f32>,
}

impl Terrain {
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        if config.rows < 2 || config.cols < 2 {
            return Err(TerrainError::GridTooSmall {
                rows: config.rows,
                cols: config.cols,
            });
        }
        if !(config.width > 0.0 && config.depth > 0.0) {
            return Err(TerrainError::InvalidExtent {
                width: config.width,
                depth: config.depth,
            });
        }
        let mut terrain = Self {
            config,
            heights: Vec::new(),
        };
        terrain.heights = terrain.generate_height_map();
        Ok(terrain)
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Spacing between neighbouring samples along X and Z.
    pub fn cell_size(&self) -> (f32, f32) {
        (
            self.config.width / (self.config.cols - 1) as f32,
            self.config.depth / (self.config.rows - 1) as f32,
        )
    }

    /// World (x, z) of a grid sample.
    pub fn sample_position(&self, row: usize, col: usize) -> (f32, f32) {
        let (dx, dz) = self.cell_size();
        (
            -0.5 * self.config.width + col as f32 * dx,
            0.5 * self.config.depth - row as f32 * dz,
        )
    }

    fn generate_height_map(&self) -> Vec<f32> {
        let TerrainConfig { rows, cols, .. } = self.config;
        (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                let (x, z) = self.sample_position(row, col);
                height_function(x, z)
            })
            .collect()
    }

    pub fn sample(&self, row: usize, col: usize) -> f32 {
        self.heights[row * self.config.cols + col]
    }

    /// Bilinear height at a world position; 0 outside the grid.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let TerrainConfig {
            width,
            depth,
            rows,
            cols,
        } = self.config;
        let (dx, dz) = self.cell_size();
        let gx = (x + 0.5 * width) / dx;
        let gz = (0.5 * depth - z) / dz;
        let in_range = gx >= 0.0 && gz >= 0.0 && gx <= (cols - 1) as f32 && gz <= (rows - 1) as f32;
        if !in_range {
            return 0.0;
        }
        let c = (gx.floor() as usize).min(cols - 2);
        let r = (gz.floor() as usize).min(rows - 2);
        let tx = gx - c as f32;
        let tz = gz - r as f32;
        let near = lerp(self.sample(r, c), self.sample(r, c + 1), tx);
        let far = lerp(self.sample(r + 1, c), self.sample(r + 1, c + 1), tx);
        lerp(near, far, tz)
    }

    /// Central-difference normal of a sample; boundary samples point straight up.
    pub fn normal_at(&self, row: usize, col: usize) -> [f32; 3] {
        let TerrainConfig { rows, cols, .. } = self.config;
        if row == 0 || col == 0 || row + 1 >= rows || col + 1 >= cols {
            return UP;
        }
        let (dx, dz) = self.cell_size();
        let dhdx = (self.sample(row, col + 1) - self.sample(row, col - 1)) / (2.0 * dx);
        // z decreases as the row index grows
        let dhdz = (self.sample(row - 1, col) - self.sample(row + 1, col)) / (2.0 * dz);
        let n = glam::Vec3::new(-dhdx, 1.0, -dhdz).normalize();
        n.to_array()
    }

    /// One vertex per sample and two clockwise triangles per cell.
    pub fn to_mesh(&self) -> Mesh {
        let TerrainConfig { rows, cols, .. } = self.config;
        let mut vertices = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let (x, z) = self.sample_position(row, col);
                vertices.push(Vertex {
                    position: [x, self.sample(row, col), z],
                    normal: self.normal_at(row, col),
                    albedo: GRASS,
                    metallic: 0.0,
                    roughness: 0.9,
                    ao: 1.0,
                });
            }
        }
        let mut indices = Vec::with_capacity(6 * (rows - 1) * (cols - 1));
        for row in 0..rows - 1 {
            for col in 0..cols - 1 {
                let a = (row * cols + col) as u32;
                let b = a + 1;
                let c = a + cols as u32;
                let d = c + 1;
                indices.extend_from_slice(&[a, b, c, c, b, d]);
            }
        }
        Mesh { vertices, indices }
    }
}

impl Ground for Terrain {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        Terrain::height_at(self, x, z)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
