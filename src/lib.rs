//! Shell Texturing - layered fur/grass surfaces
//!
//! Core modules:
//! - `sim`: Layer-stack engine (mask synthesis, placement, ripples, wind, follow)
//! - `renderer`: WebGPU consumer (mask compute pass, parameter upload)
//! - `settings`: Per-stack configuration surface
//! - `error`: Error taxonomy shared by every module

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{Result, ShellError};
pub use settings::{QualityPreset, StackSettings};

/// Engine configuration constants
pub mod consts {
    /// Mask synthesis tile edge (texels); resolutions are multiples of this
    pub const MASK_TILE: u32 = 8;
    /// Largest mask resolution the synthesizer will allocate
    pub const MASK_MAX_RESOLUTION: u32 = 1024;

    /// Number of ripple slots shared by every layer of a stack
    pub const RIPPLE_CAPACITY: usize = 5;
    /// Age reported by slots that never received an impact
    pub const RIPPLE_IDLE_AGE: f32 = 1000.0;

    /// Wind target position -> planar direction scale
    pub const WIND_DAMPING: f32 = 0.1;

    /// Follow smoothing speed for position (per second)
    pub const FOLLOW_POSITION_SPEED: f32 = 1.0;
    /// Follow smoothing speed for rotation (per second)
    pub const FOLLOW_ANGLE_SPEED: f32 = 50.0;

    /// Minimum layers in a stack (placement divides by count - 1)
    pub const MIN_LAYER_COUNT: usize = 2;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Shortest signed angular distance from `from` to `to` (radians)
#[inline]
pub fn delta_angle(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Interpolate between two angles along the shortest arc.
///
/// `t` is clamped to [0, 1] so large frame deltas never overshoot. The
/// result is normalized, so chasing a spinning target stays in [-π, π).
#[inline]
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    normalize_angle(from + delta_angle(from, to) * t.clamp(0.0, 1.0))
}
