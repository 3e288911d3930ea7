//! Procedural base surface
//!
//! A grid plane centred on the origin in the XZ plane, optionally displaced
//! along +Y by an elevation map. Grass stacks are usually grown on it.

use glam::{UVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::mask::MaskTexture;
use crate::error::{Result, ShellError};

/// Anything that can be sampled as a height field with values in [0, 1]
pub trait ElevationMap {
    /// Value at an integer texel coordinate (wrapping is up to the map).
    /// Coordinates past `u32::MAX` wrap around before they get here.
    fn elevation_at(&self, x: u32, y: u32) -> f32;
}

impl ElevationMap for MaskTexture {
    fn elevation_at(&self, x: u32, y: u32) -> f32 {
        self.sample(x, y)
    }
}

/// Grid plane parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneSettings {
    /// Cells along x and z
    pub density: UVec2,
    /// Cell edge length
    pub scale: f32,
    /// Texel step between neighbouring vertices
    pub elevation_scale: u32,
    /// Height of a full-white texel (black maps to the negated value)
    pub elevation_intensity: f32,
}

impl Default for PlaneSettings {
    fn default() -> Self {
        Self {
            density: UVec2::new(16, 16),
            scale: 1.0,
            elevation_scale: 1,
            elevation_intensity: 1.0,
        }
    }
}

/// Generated plane geometry (triangle list)
#[derive(Debug, Clone, Default)]
pub struct PlaneMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl PlaneMesh {
    /// Flat plane
    pub fn flat(settings: &PlaneSettings) -> Result<Self> {
        Self::generate(settings, None)
    }

    /// Build the grid, sampling `elevation` at every vertex if given
    pub fn generate(settings: &PlaneSettings, elevation: Option<&dyn ElevationMap>) -> Result<Self> {
        let UVec2 { x: dx, y: dy } = settings.density;
        if dx == 0 || dy == 0 {
            return Err(ShellError::invalid("plane.density", "needs at least one cell per axis"));
        }
        if !(settings.scale > 0.0 && settings.scale.is_finite()) {
            return Err(ShellError::invalid("plane.scale", "must be > 0"));
        }

        // Indices are u32, so the whole grid has to be addressable by one
        let (Some(vertex_count), Some(index_count)) = (
            dx.checked_add(1)
                .zip(dy.checked_add(1))
                .and_then(|(vx, vy)| vx.checked_mul(vy)),
            dx.checked_mul(dy).and_then(|cells| cells.checked_mul(6)),
        ) else {
            return Err(ShellError::invalid(
                "plane.density",
                format!("{}x{} cells overflow 32-bit indices", dx, dy),
            ));
        };
        let vertex_count = vertex_count as usize;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        let half_x = dx as f32 * settings.scale * 0.5;
        let half_z = dy as f32 * settings.scale * 0.5;
        let es = settings.elevation_scale;

        for y in 0..=dy {
            for x in 0..=dx {
                let height = elevation.map_or(0.0, |map| {
                    let sample = map.elevation_at(x.wrapping_mul(es), y.wrapping_mul(es));
                    (sample - 0.5) * 2.0 * settings.elevation_intensity
                });
                positions.push(Vec3::new(
                    x as f32 * settings.scale - half_x,
                    height,
                    y as f32 * settings.scale - half_z,
                ));
                uvs.push(Vec2::new(x as f32 / dx as f32, y as f32 / dy as f32));
            }
        }

        let mut indices = Vec::with_capacity(index_count as usize);
        let row = dx + 1;
        for y in 0..dy {
            for x in 0..dx {
                let vi = y * row + x;
                indices.extend_from_slice(&[vi, vi + row, vi + 1, vi + 1, vi + row, vi + row + 1]);
            }
        }

        let normals = vertex_normals(&positions, &indices);
        Ok(Self {
            positions,
            normals,
            uvs,
            indices,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Area-weighted average of adjacent face normals
fn vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals.iter().map(|n| n.normalize_or(Vec3::Y)).collect()
}
