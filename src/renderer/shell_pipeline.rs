//! Per-stack GPU resources
//!
//! Mirrors one `LayerStack` on the GPU: its mask texture, one storage
//! buffer holding every layer's uniforms, and the bind group the host's
//! shell material binds at group 0. `sync` is called once per frame after
//! the scene tick.

use wgpu::util::DeviceExt;

use super::mask_compute::{GpuMask, MaskComputePass, mask_seed};
use super::uniforms::{ShellGlobals, ShellUniform};
use crate::error::{Result, ShellError};
use crate::sim::{LayerStack, MaskTexture};

/// Storage capacity (in layers) allocated for a layer count
pub fn layer_capacity(count: usize) -> usize {
    count.max(1).next_power_of_two()
}

/// Where the GPU copy of a stack's mask comes from
pub enum MaskSource {
    /// Copy the host-synthesized texels with `write_texture`
    Upload,
    /// Refill on the GPU with a seed derived from the host mask id.
    /// The GPU texels then differ from the host copy.
    Compute(MaskComputePass),
}

impl MaskSource {
    /// Mirror `host` on the GPU, tagged with its id
    fn mirror(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        host: &MaskTexture,
    ) -> Result<GpuMask> {
        match self {
            MaskSource::Upload => Ok(GpuMask::upload(device, queue, host)),
            MaskSource::Compute(pass) => pass
                .synthesize(device, queue, host.resolution(), mask_seed(host.id()))
                .map(|mask| mask.with_source(host.id())),
        }
    }
}

pub struct ShellGpuState {
    layout: wgpu::BindGroupLayout,
    globals_buffer: wgpu::Buffer,
    layers_buffer: wgpu::Buffer,
    capacity: usize,
    source: MaskSource,
    mask: GpuMask,
    bind_group: wgpu::BindGroup,
    layer_count: u32,
}

impl ShellGpuState {
    /// Layout shared by every stack: globals, layers, mask, sampler
    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shell_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    /// Mirror a generated stack, uploading its host mask. Fails if the
    /// stack has no mask yet.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, stack: &LayerStack) -> Result<Self> {
        Self::with_source(device, queue, stack, MaskSource::Upload)
    }

    /// Mirror a generated stack, filling its mask with a compute dispatch
    /// on every regeneration instead of uploading it
    pub fn with_compute_mask(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        stack: &LayerStack,
    ) -> Result<Self> {
        let pass = MaskComputePass::new(device);
        Self::with_source(device, queue, stack, MaskSource::Compute(pass))
    }

    pub fn with_source(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        stack: &LayerStack,
        source: MaskSource,
    ) -> Result<Self> {
        let host_mask = stack.mask().ok_or(ShellError::NotGenerated)?;
        let mask = source.mirror(device, queue, host_mask)?;
        let layout = Self::bind_group_layout(device);

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shell_globals"),
            contents: bytemuck::bytes_of(&ShellGlobals::new(0.0, stack.layers().len())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let capacity = layer_capacity(stack.layers().len());
        let layers_buffer = Self::create_layers_buffer(device, capacity);
        let bind_group =
            Self::create_bind_group(device, &layout, &globals_buffer, &layers_buffer, &mask);

        let mut state = Self {
            layout,
            globals_buffer,
            layers_buffer,
            capacity,
            source,
            mask,
            bind_group,
            layer_count: 0,
        };
        state.sync(device, queue, stack, 0.0)?;
        Ok(state)
    }

    fn create_layers_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shell_layers"),
            size: (std::mem::size_of::<ShellUniform>() * capacity) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        globals: &wgpu::Buffer,
        layers: &wgpu::Buffer,
        mask: &GpuMask,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shell_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: layers.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&mask.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&mask.sampler),
                },
            ],
        })
    }

    /// Re-upload the stack's per-frame state.
    ///
    /// The mask is mirrored again only when the stack regenerated it; the
    /// layer buffer grows when the layer count outgrows it.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        stack: &LayerStack,
        time: f32,
    ) -> Result<()> {
        let host_mask = stack.mask().ok_or(ShellError::NotGenerated)?;
        let mut rebind = false;

        if self.mask.source_id() != Some(host_mask.id()) {
            self.mask = self.source.mirror(device, queue, host_mask)?;
            rebind = true;
        }

        let uniforms = ShellUniform::from_layers(stack.layers());
        if uniforms.len() > self.capacity {
            self.capacity = layer_capacity(uniforms.len());
            self.layers_buffer = Self::create_layers_buffer(device, self.capacity);
            log::debug!("Layer buffer grown to {} layers", self.capacity);
            rebind = true;
        }

        if rebind {
            self.bind_group = Self::create_bind_group(
                device,
                &self.layout,
                &self.globals_buffer,
                &self.layers_buffer,
                &self.mask,
            );
        }

        if !uniforms.is_empty() {
            queue.write_buffer(&self.layers_buffer, 0, bytemuck::cast_slice(&uniforms));
        }
        queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&ShellGlobals::new(time, uniforms.len())),
        );
        self.layer_count = uniforms.len() as u32;
        Ok(())
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn mask(&self) -> &GpuMask {
        &self.mask
    }

    /// Instance count for the stack's draw call
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_capacity_never_zero_and_grows_in_powers_of_two() {
        assert_eq!(layer_capacity(0), 1);
        assert_eq!(layer_capacity(16), 16);
        assert_eq!(layer_capacity(17), 32);
        assert_eq!(layer_capacity(64), 64);
    }
}
