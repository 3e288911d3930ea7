//! Vertex types for the base surface

use bytemuck::{Pod, Zeroable};

use crate::sim::PlaneMesh;

/// Plane vertex with position, normal and uv
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl PlaneVertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Interleave a generated plane for upload
    pub fn from_mesh(mesh: &PlaneMesh) -> Vec<Self> {
        mesh.positions
            .iter()
            .zip(&mesh.normals)
            .zip(&mesh.uvs)
            .map(|((p, n), uv)| Self::new(p.to_array(), n.to_array(), uv.to_array()))
            .collect()
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PlaneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::PlaneSettings;

    #[test]
    fn test_stride_matches_attributes() {
        let layout = PlaneVertex::desc();
        assert_eq!(layout.array_stride, 32);
        let last = layout.attributes[2];
        assert_eq!(last.offset + last.format.size(), layout.array_stride);
    }

    #[test]
    fn test_from_mesh_interleaves() {
        let mesh = PlaneMesh::flat(&PlaneSettings::default()).unwrap();
        let vertices = PlaneVertex::from_mesh(&mesh);
        assert_eq!(vertices.len(), mesh.vertex_count());
        assert_eq!(vertices[0].position, mesh.positions[0].to_array());
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[0].uv, [0.0, 0.0]);
    }
}
