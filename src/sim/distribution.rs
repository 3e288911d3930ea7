//! Layer placement along the stack's primary axis
//!
//! The same percentage drives both height and per-layer shading, so
//! placement and appearance always agree.

use glam::Vec3;

use super::curve::DistributionCurve;
use crate::consts::MIN_LAYER_COUNT;
use crate::error::{Result, ShellError};

/// Where a single layer sits in its stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlacement {
    /// Curve output for this layer, in [0, 1]
    pub percentage: f32,
    /// lerp(0, base_height, percentage)
    pub height: f32,
    /// Offset from the base surface (primary axis * height)
    pub offset: Vec3,
}

/// Maps layer indices to placement percentages through a curve
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDistribution {
    curve: DistributionCurve,
    primary_axis: Vec3,
}

impl LayerDistribution {
    pub fn new(curve: DistributionCurve, primary_axis: Vec3) -> Self {
        Self {
            curve,
            primary_axis: primary_axis.normalize_or(Vec3::Y),
        }
    }

    pub fn curve(&self) -> &DistributionCurve {
        &self.curve
    }

    pub fn primary_axis(&self) -> Vec3 {
        self.primary_axis
    }

    /// curve(index / (count - 1))
    pub fn evaluate(&self, index: usize, count: usize) -> Result<f32> {
        if count < MIN_LAYER_COUNT {
            return Err(ShellError::LayerCountTooSmall { count });
        }
        let t = index as f32 / (count - 1) as f32;
        Ok(self.curve.evaluate(t))
    }

    /// Full placement for one layer
    pub fn place(&self, index: usize, count: usize, base_height: f32) -> Result<LayerPlacement> {
        let percentage = self.evaluate(index, count)?;
        let height = lerp(0.0, base_height, percentage);
        Ok(LayerPlacement {
            percentage,
            height,
            offset: self.primary_axis * height,
        })
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::sim::curve::Keyframe;

    #[test]
    fn test_rejects_single_layer() {
        let dist = LayerDistribution::new(DistributionCurve::linear(), Vec3::Y);
        assert!(matches!(
            dist.evaluate(0, 1),
            Err(ShellError::LayerCountTooSmall { count: 1 })
        ));
    }

    #[test]
    fn test_linear_eight_layers_span_base_height() {
        let dist = LayerDistribution::new(DistributionCurve::linear(), Vec3::Y);
        let first = dist.place(0, 8, 2.0).unwrap();
        let last = dist.place(7, 8, 2.0).unwrap();
        assert_eq!(first.height, 0.0);
        assert!((last.height - 2.0).abs() < 1e-6);
        assert!((last.offset - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_axis_is_normalized() {
        let dist = LayerDistribution::new(DistributionCurve::linear(), Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(dist.primary_axis(), Vec3::Z);
        // Degenerate axis falls back to +Y
        let dist = LayerDistribution::new(DistributionCurve::linear(), Vec3::ZERO);
        assert_eq!(dist.primary_axis(), Vec3::Y);
    }

    proptest! {
        #[test]
        fn prop_endpoints_match_curve(count in 2usize..200, exponent in 0.1f32..5.0) {
            let curve = DistributionCurve::power(exponent);
            let dist = LayerDistribution::new(curve.clone(), Vec3::Y);
            prop_assert_eq!(dist.evaluate(0, count).unwrap(), curve.evaluate(0.0));
            prop_assert_eq!(dist.evaluate(count - 1, count).unwrap(), curve.evaluate(1.0));
        }

        #[test]
        fn prop_placement_monotonic(count in 2usize..100, mid in 0.0f32..1.0) {
            let curve = DistributionCurve::keyframes(vec![
                Keyframe::new(0.0, 0.0),
                Keyframe::new(0.5, mid),
                Keyframe::new(1.0, 1.0),
            ]);
            let dist = LayerDistribution::new(curve, Vec3::Y);
            let mut prev = f32::NEG_INFINITY;
            for i in 0..count {
                let p = dist.evaluate(i, count).unwrap();
                prop_assert!(p >= prev);
                prev = p;
            }
        }
    }
}
