//! Scene-wide wind direction
//!
//! One writer per tick (the scene driver), any number of readers. The
//! sample is overwritten each tick; no history is kept.

use glam::{Vec2, Vec3};

use crate::consts::WIND_DAMPING;

/// Planar wind direction on the ground plane (x, z)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindSample(pub Vec2);

impl WindSample {
    /// No wind
    pub const NEUTRAL: WindSample = WindSample(Vec2::ZERO);

    pub fn direction(&self) -> Vec2 {
        self.0
    }
}

/// Derives the wind sample from a moving reference point
#[derive(Debug, Clone)]
pub struct WindField {
    damping: f32,
    sample: WindSample,
}

impl Default for WindField {
    fn default() -> Self {
        Self::new(WIND_DAMPING)
    }
}

impl WindField {
    pub fn new(damping: f32) -> Self {
        Self {
            damping,
            sample: WindSample::NEUTRAL,
        }
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping;
    }

    /// Project the reference position onto the ground plane and publish it.
    ///
    /// The vertical axis is dropped: (x, z) becomes the planar (x, y).
    pub fn update(&mut self, reference: Vec3) -> WindSample {
        self.sample = WindSample(Vec2::new(reference.x, reference.z) * self.damping);
        self.sample
    }

    /// Value published by the most recent update
    pub fn sample(&self) -> WindSample {
        self.sample
    }

    /// Back to neutral (no wind)
    pub fn reset(&mut self) {
        self.sample = WindSample::NEUTRAL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_neutral() {
        let field = WindField::default();
        assert_eq!(field.sample(), WindSample::NEUTRAL);
        assert_eq!(field.damping(), WIND_DAMPING);
    }

    #[test]
    fn test_update_projects_ground_plane() {
        let mut field = WindField::new(0.1);
        let sample = field.update(Vec3::new(10.0, 500.0, -20.0));
        assert!((sample.direction() - Vec2::new(1.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_update_overwrites_without_smoothing() {
        let mut field = WindField::new(1.0);
        field.update(Vec3::new(5.0, 0.0, 5.0));
        field.update(Vec3::new(-1.0, 0.0, 2.0));
        assert_eq!(field.sample(), WindSample(Vec2::new(-1.0, 2.0)));
        field.reset();
        assert_eq!(field.sample(), WindSample::NEUTRAL);
    }
}
