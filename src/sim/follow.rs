//! Follow smoothing toward a tracked body
//!
//! Every layer chases the body's pose with its own lerp factor. Layer 0
//! tracks fastest and the outermost layer lags most, so the stack bends as
//! a wave instead of moving rigidly with the body's raw jitter.

use glam::{EulerRot, Quat, Vec3};

use crate::consts::{FOLLOW_ANGLE_SPEED, FOLLOW_POSITION_SPEED};
use crate::lerp_angle;

/// Pose of the tracked body for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyPose {
    pub position: Vec3,
    /// Euler angles (radians, XYZ order)
    pub rotation: Vec3,
}

impl BodyPose {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    /// Build from an orientation quaternion
    pub fn from_quat(position: Vec3, orientation: Quat) -> Self {
        let (x, y, z) = orientation.to_euler(EulerRot::XYZ);
        Self {
            position,
            rotation: Vec3::new(x, y, z),
        }
    }
}

/// Smoothed pose of one layer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FollowState {
    pub position: Vec3,
    /// Euler angles (radians, XYZ order)
    pub rotation: Vec3,
}

impl FollowState {
    pub fn at(pose: BodyPose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.rotation,
        }
    }

    /// Orientation as a quaternion
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }
}

/// Per-stack follow smoothing, one state per layer
#[derive(Debug, Clone)]
pub struct FollowBlend {
    position_speed: f32,
    angle_speed: f32,
    states: Vec<FollowState>,
}

impl Default for FollowBlend {
    fn default() -> Self {
        Self::new(FOLLOW_POSITION_SPEED, FOLLOW_ANGLE_SPEED)
    }
}

impl FollowBlend {
    pub fn new(position_speed: f32, angle_speed: f32) -> Self {
        Self {
            position_speed,
            angle_speed,
            states: Vec::new(),
        }
    }

    pub fn position_speed(&self) -> f32 {
        self.position_speed
    }

    pub fn angle_speed(&self) -> f32 {
        self.angle_speed
    }

    pub fn set_speeds(&mut self, position_speed: f32, angle_speed: f32) {
        self.position_speed = position_speed;
        self.angle_speed = angle_speed;
    }

    /// Unclamped lerp factor: dt * speed * (1 - index / count)
    pub fn factor(dt: f32, speed: f32, layer_index: usize, layer_count: usize) -> f32 {
        if layer_count <= 1 {
            return dt * speed;
        }
        let percentage = layer_index as f32 / layer_count as f32;
        dt * speed * (1.0 - percentage)
    }

    /// Drop all layer states; the next update snaps to the body
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Smoothed state of a layer, if it has been updated yet
    pub fn state(&self, layer_index: usize) -> Option<&FollowState> {
        self.states.get(layer_index)
    }

    /// Chase the target pose for one layer and return its new state.
    ///
    /// The first update after a reset (or a count change) snaps every layer
    /// onto the target so a regenerated stack never sweeps in from the origin.
    pub fn update(
        &mut self,
        dt: f32,
        target: BodyPose,
        layer_index: usize,
        layer_count: usize,
    ) -> FollowState {
        let count = layer_count.max(1);
        if self.states.len() != count {
            self.states = vec![FollowState::at(target); count];
        }
        let index = layer_index.min(count - 1);

        let position_t = Self::factor(dt, self.position_speed, index, layer_count).clamp(0.0, 1.0);
        let angle_t = Self::factor(dt, self.angle_speed, index, layer_count);

        let state = &mut self.states[index];
        state.position = state.position.lerp(target.position, position_t);
        state.rotation = Vec3::new(
            lerp_angle(state.rotation.x, target.rotation.x, angle_t),
            lerp_angle(state.rotation.y, target.rotation.y, angle_t),
            lerp_angle(state.rotation.z, target.rotation.z, angle_t),
        );
        *state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::PI;

    #[test]
    fn test_single_layer_does_not_divide_by_zero() {
        assert_eq!(FollowBlend::factor(0.5, 2.0, 0, 1), 1.0);
        assert_eq!(FollowBlend::factor(0.5, 2.0, 0, 0), 1.0);
    }

    #[test]
    fn test_first_update_snaps_to_target() {
        let mut blend = FollowBlend::default();
        let pose = BodyPose::new(Vec3::new(3.0, 1.0, -2.0), Vec3::new(0.1, 0.2, 0.3));
        let state = blend.update(1.0 / 60.0, pose, 2, 4);
        assert_eq!(state.position, pose.position);
        assert_eq!(state.rotation, pose.rotation);
    }

    #[test]
    fn test_inner_layers_track_faster() {
        let mut blend = FollowBlend::new(1.0, 50.0);
        let start = BodyPose::default();
        for i in 0..4 {
            blend.update(0.0, start, i, 4);
        }

        let target = BodyPose::new(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO);
        let inner = blend.update(0.1, target, 0, 4);
        let outer = blend.update(0.1, target, 3, 4);
        assert!(inner.position.x > outer.position.x);
        assert!((inner.position.x - 1.0).abs() < 1e-5);
        assert!((outer.position.x - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_rotation_follows_short_arc() {
        let mut blend = FollowBlend::new(1.0, 5.0);
        let start = BodyPose::new(Vec3::ZERO, Vec3::new(0.0, 170.0_f32.to_radians(), 0.0));
        blend.update(0.0, start, 0, 2);

        let target = BodyPose::new(Vec3::ZERO, Vec3::new(0.0, -170.0_f32.to_radians(), 0.0));
        let state = blend.update(0.1, target, 0, 2);
        // Half of the 20° short arc: lands on ±180°, never crosses 0°
        assert!((crate::normalize_angle(state.rotation.y).abs() - PI).abs() < 1e-4);
    }

    #[test]
    fn test_large_dt_does_not_overshoot() {
        let mut blend = FollowBlend::new(100.0, 100.0);
        blend.update(0.0, BodyPose::default(), 0, 3);
        let target = BodyPose::new(Vec3::splat(1.0), Vec3::new(0.5, 0.0, 0.0));
        let state = blend.update(1.0, target, 0, 3);
        assert_eq!(state.position, target.position);
        assert!((state.rotation.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reset_resnaps() {
        let mut blend = FollowBlend::default();
        blend.update(0.0, BodyPose::default(), 0, 2);
        blend.reset();
        assert!(blend.state(0).is_none());
        let pose = BodyPose::new(Vec3::splat(4.0), Vec3::ZERO);
        assert_eq!(blend.update(0.01, pose, 1, 2).position, pose.position);
    }

    #[test]
    fn test_from_quat_roundtrips_orientation() {
        let q = Quat::from_euler(EulerRot::XYZ, 0.3, -0.2, 0.1);
        let pose = BodyPose::from_quat(Vec3::ZERO, q);
        let state = FollowState::at(pose);
        assert!(state.orientation().dot(q).abs() > 0.9999);
    }

    #[test]
    fn test_rotation_stays_bounded_while_body_spins() {
        let mut blend = FollowBlend::default();
        let dt = 1.0 / 60.0;
        // One revolution per second about y for ten minutes
        for frame in 0..60 * 600 {
            let angle = crate::normalize_angle((frame % 60) as f32 * dt * 2.0 * PI);
            let pose = BodyPose::new(Vec3::ZERO, Vec3::new(0.0, angle, 0.0));
            for layer in 0..4 {
                let state = blend.update(dt, pose, layer, 4);
                assert!(state.rotation.y.abs() <= PI, "frame {frame}: {}", state.rotation.y);
            }
        }
        let inner = blend.state(0).unwrap();
        assert!(inner.rotation.abs().max_element() <= PI);
    }

    proptest! {
        #[test]
        fn prop_innermost_factor_exceeds_outermost(
            dt in 0.001f32..0.1,
            speed in 0.1f32..100.0,
            count in 2usize..256,
        ) {
            let inner = FollowBlend::factor(dt, speed, 0, count);
            let outer = FollowBlend::factor(dt, speed, count - 1, count);
            prop_assert!(inner > outer);
        }
    }
}
