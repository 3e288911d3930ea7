//! GPU-side mask textures
//!
//! A mask reaches the GPU one of two ways: uploaded from a host-side
//! `MaskTexture`, or synthesized directly by a compute pass. Either way it
//! ends up as an `Rgba8Unorm` texture sampled with repeat wrap and nearest
//! filtering.

use crate::consts::{MASK_MAX_RESOLUTION, MASK_TILE};
use crate::error::Result;
use crate::sim::{MaskTexture, clamp_resolution};

/// Mask texture format (value replicated in rgb, opaque alpha)
pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Workgroups along one edge for a clamped resolution
pub fn workgroup_count(resolution: u32) -> u32 {
    resolution / MASK_TILE
}

/// Full dispatch size for a requested resolution
pub fn dispatch_size(requested: u32) -> Result<(u32, u32, u32)> {
    let groups = workgroup_count(clamp_resolution(requested)?);
    Ok((groups, groups, 1))
}

/// Shader seed for a host mask, so every regeneration dispatches a new fill
pub fn mask_seed(mask_id: u64) -> u32 {
    let folded = (mask_id as u32) ^ ((mask_id >> 32) as u32).rotate_left(16);
    folded.wrapping_add(1).wrapping_mul(0x9E37_79B9)
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaskParams {
    resolution: u32,
    seed: u32,
    _pad: [u32; 2],
}

/// Mask texture bound by the shell pipeline
pub struct GpuMask {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    resolution: u32,
    /// Id of the host mask this texture was uploaded from
    source_id: Option<u64>,
}

impl GpuMask {
    fn allocate(device: &wgpu::Device, resolution: u32, usage: wgpu::TextureUsages) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shell_mask"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MASK_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shell_mask_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            resolution,
            source_id: None,
        }
    }

    /// Upload a host-synthesized mask
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, mask: &MaskTexture) -> Self {
        let resolution = mask.resolution();
        let mut gpu = Self::allocate(
            device,
            resolution,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &mask.to_rgba8(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * resolution),
                rows_per_image: Some(resolution),
            },
            wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
        );
        gpu.source_id = Some(mask.id());
        gpu
    }

    /// Tag a compute-filled mask with the host mask it stands in for
    pub(crate) fn with_source(mut self, mask_id: u64) -> Self {
        self.source_id = Some(mask_id);
        self
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn source_id(&self) -> Option<u64> {
        self.source_id
    }
}

/// Compute pipeline filling a mask texture in one dispatch
pub struct MaskComputePass {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
}

impl MaskComputePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mask_random_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mask_random.wgsl").into()),
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mask_params"),
            size: std::mem::size_of::<MaskParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mask_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: MASK_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mask_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("mask_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            params_buffer,
        }
    }

    /// Allocate a mask and dispatch its fill.
    ///
    /// Returns as soon as the work is submitted; the texture is valid for
    /// binding immediately and wgpu orders the fill before any later use.
    pub fn synthesize(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        requested: u32,
        seed: u32,
    ) -> Result<GpuMask> {
        let resolution = clamp_resolution(requested)?;
        if resolution != requested {
            log::warn!(
                "GPU mask resolution {} clamped to {} (max {})",
                requested,
                resolution,
                MASK_MAX_RESOLUTION
            );
        }

        let mask = GpuMask::allocate(
            device,
            resolution,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&MaskParams {
                resolution,
                seed,
                _pad: [0; 2],
            }),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mask_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&mask.view),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mask_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("mask_pass"),
                timestamp_writes: None,
            });
            let groups = workgroup_count(resolution);
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups, groups, 1);
        }
        queue.submit(std::iter::once(encoder.finish()));

        log::debug!(
            "Dispatched {}x{} mask fill ({} workgroups per edge)",
            resolution,
            resolution,
            workgroup_count(resolution)
        );
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellError;

    #[test]
    fn test_workgroups_cover_mask_exactly() {
        assert_eq!(workgroup_count(96), 12);
        assert_eq!(workgroup_count(MASK_MAX_RESOLUTION), 128);
        assert_eq!(workgroup_count(96) * MASK_TILE, 96);
    }

    #[test]
    fn test_dispatch_size_uses_clamped_resolution() {
        assert_eq!(dispatch_size(100).unwrap(), (12, 12, 1));
        assert_eq!(dispatch_size(4096).unwrap(), (128, 128, 1));
        assert_eq!(dispatch_size(3).unwrap(), (1, 1, 1));
        assert!(matches!(dispatch_size(0), Err(ShellError::ZeroResolution)));
    }

    #[test]
    fn test_mask_seed_differs_per_mask() {
        let seeds: Vec<u32> = (0..64).map(mask_seed).collect();
        for (i, a) in seeds.iter().enumerate() {
            assert_ne!(*a, 0);
            assert!(seeds[i + 1..].iter().all(|b| b != a));
        }
        assert_ne!(mask_seed(1), mask_seed(1 << 32));
    }

    #[test]
    fn test_params_are_uniform_sized() {
        assert_eq!(std::mem::size_of::<MaskParams>(), 16);
    }
}
