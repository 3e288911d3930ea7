//! WebGPU consumer of generated stacks
//!
//! Uploads masks and layer parameters; the shading itself belongs to the
//! host's shell material.

pub mod mask_compute;
pub mod shell_pipeline;
pub mod uniforms;
pub mod vertex;

pub use mask_compute::{
    GpuMask, MASK_FORMAT, MaskComputePass, dispatch_size, mask_seed, workgroup_count,
};
pub use shell_pipeline::{MaskSource, ShellGpuState, layer_capacity};
pub use uniforms::{ShellGlobals, ShellUniform};
pub use vertex::PlaneVertex;
