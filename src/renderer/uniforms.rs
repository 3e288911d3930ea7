//! GPU layout of layer parameter blocks
//!
//! One `ShellUniform` per layer, packed into a single storage buffer that
//! the stack's instanced draw indexes by `instance_index`.

use bytemuck::{Pod, Zeroable};

use crate::consts::RIPPLE_CAPACITY;
use crate::sim::{Layer, ParameterBlock};

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

/// Per-layer parameters (std430, 240 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ShellUniform {
    pub color_min: [f32; 4],                  // offset 0
    pub color_max: [f32; 4],                  // offset 16
    pub ripples: [[f32; 4]; RIPPLE_CAPACITY], // offset 32 - xyz position, w age
    pub current_position: [f32; 4],           // offset 112 - w unused
    pub smoothed_position: [f32; 4],          // offset 128 - w unused
    pub wind: [f32; 2],                       // offset 144
    pub shell_index: u32,                     // offset 152
    pub shell_count: u32,                     // offset 156
    pub shell_height: f32,                    // offset 160
    pub height_percentage: f32,               // offset 164
    pub height_space_percentage: f32,         // offset 168
    pub radius: f32,                          // offset 172
    pub step_min: f32,                        // offset 176
    pub step_max: f32,                        // offset 180
    pub gravity: f32,                         // offset 184
    pub displacement_intensity: f32,          // offset 188
    pub displacement_speed: f32,              // offset 192
    pub displacement_scale: f32,              // offset 196
    pub local_offset_intensity: f32,          // offset 200
    pub ripple_duration: f32,                 // offset 204
    pub ripple_circle_smoothing: f32,         // offset 208
    pub ripple_ring_smoothing: f32,           // offset 212
    pub ripple_radius_multiplier: f32,        // offset 216
    pub ripple_intensity_multiplier: f32,     // offset 220
    pub mask_resolution: u32,                 // offset 224
    pub _pad: [u32; 3],                       // pad to 240 bytes
}

impl ShellUniform {
    pub fn from_block(block: &ParameterBlock) -> Self {
        let animated = &block.animated;
        let mut ripples = [[0.0; 4]; RIPPLE_CAPACITY];
        for (slot, entry) in ripples.iter_mut().zip(animated.ripples.iter()) {
            *slot = entry.to_array();
        }
        let wind = animated.wind.direction();

        Self {
            color_min: block.color_min,
            color_max: block.color_max,
            ripples,
            current_position: animated.current_position.extend(0.0).to_array(),
            smoothed_position: animated.smoothed_position.extend(0.0).to_array(),
            wind: [wind.x, wind.y],
            shell_index: block.shell_index,
            shell_count: block.shell_count,
            shell_height: block.shell_height,
            height_percentage: block.height_percentage,
            height_space_percentage: block.height_space_percentage,
            radius: block.radius,
            step_min: block.step_min,
            step_max: block.step_max,
            gravity: block.gravity,
            displacement_intensity: block.displacement.intensity,
            displacement_speed: block.displacement.speed,
            displacement_scale: block.displacement.scale,
            local_offset_intensity: block.local_offset.intensity,
            ripple_duration: block.ripple.duration,
            ripple_circle_smoothing: block.ripple.circle_smoothing,
            ripple_ring_smoothing: block.ripple.ring_smoothing,
            ripple_radius_multiplier: block.ripple.radius_multiplier,
            ripple_intensity_multiplier: block.ripple.intensity_multiplier,
            mask_resolution: block.mask.resolution(),
            _pad: [0; 3],
        }
    }

    /// Pack a whole stack in layer order
    pub fn from_layers(layers: &[Layer]) -> Vec<Self> {
        layers.iter().map(|layer| Self::from_block(&layer.params)).collect()
    }
}

/// Per-stack globals (uniform buffer)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ShellGlobals {
    pub time: f32,        // offset 0
    pub layer_count: u32, // offset 4
    pub _pad: [u32; 2],   // pad to 16 bytes
}

impl ShellGlobals {
    pub fn new(time: f32, layer_count: usize) -> Self {
        Self {
            time,
            layer_count: layer_count as u32,
            _pad: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    use crate::settings::{MaterialHandle, ModelHandle, StackSettings};
    use crate::sim::{GrassBuilder, LayerStack, TiledMaskSynthesizer, WindSample};

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<ShellUniform>(), 240);
        assert_eq!(std::mem::size_of::<ShellUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ShellGlobals>(), 16);
    }

    #[test]
    fn test_from_layers_carries_animated_state() {
        let mut settings =
            StackSettings::default().with_references(ModelHandle(1), MaterialHandle(1));
        settings.count = 3;
        settings.resolution = 16;
        let mut stack = LayerStack::with_synthesizer(
            settings,
            GrassBuilder::plain(),
            TiledMaskSynthesizer::new(4),
        );
        stack.tick(0.0, WindSample::NEUTRAL, None);
        stack.record_impact(Vec3::new(2.0, 0.0, 1.0));
        stack.tick(0.5, WindSample(Vec2::new(0.2, 0.4)), None);

        let packed = ShellUniform::from_layers(stack.layers());
        assert_eq!(packed.len(), 3);
        for (i, uniform) in packed.iter().enumerate() {
            assert_eq!(uniform.shell_index, i as u32);
            assert_eq!(uniform.shell_count, 3);
            assert_eq!(uniform.mask_resolution, 16);
            assert_eq!(uniform.wind, [0.2, 0.4]);
            assert!((uniform.ripples[0][3] - 0.5).abs() < 1e-6);
            assert_eq!(uniform.ripples[1][3], crate::consts::RIPPLE_IDLE_AGE);
        }
        assert_eq!(packed[0].height_percentage, 0.0);
        assert_eq!(packed[2].height_percentage, 1.0);
    }
}
