//! Height distribution curves
//!
//! A curve maps a normalized layer position t in [0, 1] to a placement
//! percentage in [0, 1]. Curves must be monotonic non-decreasing so outer
//! layers never sit below inner ones.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShellError};

/// A single curve control point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Monotonic placement curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionCurve {
    /// value = t
    #[default]
    Linear,
    /// value = t^exponent (exponent > 0). Above 1 packs layers near the base.
    Power { exponent: f32 },
    /// Piecewise-linear through sorted keyframes, flat outside the key range
    Keyframes { keys: Vec<Keyframe> },
}

impl DistributionCurve {
    /// Identity curve
    pub fn linear() -> Self {
        DistributionCurve::Linear
    }

    /// Ease-in power curve
    pub fn power(exponent: f32) -> Self {
        DistributionCurve::Power { exponent }
    }

    /// Keyframed curve (keys are sorted by time)
    pub fn keyframes(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        DistributionCurve::Keyframes { keys }
    }

    /// Check domain, range and monotonicity
    pub fn validate(&self) -> Result<()> {
        match self {
            DistributionCurve::Linear => Ok(()),
            DistributionCurve::Power { exponent } => {
                if exponent.is_finite() && *exponent > 0.0 {
                    Ok(())
                } else {
                    Err(ShellError::invalid(
                        "distribution.exponent",
                        format!("must be finite and > 0, got {exponent}"),
                    ))
                }
            }
            DistributionCurve::Keyframes { keys } => {
                if keys.is_empty() {
                    return Err(ShellError::invalid(
                        "distribution.keys",
                        "keyframed curve needs at least one key",
                    ));
                }
                for key in keys {
                    if !(0.0..=1.0).contains(&key.value) {
                        return Err(ShellError::CurveOutOfRange { value: key.value });
                    }
                }
                for (i, pair) in keys.windows(2).enumerate() {
                    if pair[1].time < pair[0].time {
                        return Err(ShellError::invalid(
                            "distribution.keys",
                            "keys must be sorted by time",
                        ));
                    }
                    if pair[1].value < pair[0].value {
                        return Err(ShellError::NonMonotonicCurve { index: i + 1 });
                    }
                }
                Ok(())
            }
        }
    }

    /// Evaluate at t (clamped to [0, 1])
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            DistributionCurve::Linear => t,
            DistributionCurve::Power { exponent } => t.powf(*exponent),
            DistributionCurve::Keyframes { keys } => {
                let (first, last) = match (keys.first(), keys.last()) {
                    (Some(f), Some(l)) => (f, l),
                    _ => return t,
                };
                if t <= first.time {
                    return first.value;
                }
                if t >= last.time {
                    return last.value;
                }
                // Find the segment containing t
                let seg = keys
                    .windows(2)
                    .find(|pair| t >= pair[0].time && t <= pair[1].time);
                match seg {
                    Some(pair) => {
                        let span = pair[1].time - pair[0].time;
                        if span <= f32::EPSILON {
                            pair[1].value
                        } else {
                            let u = (t - pair[0].time) / span;
                            pair[0].value + (pair[1].value - pair[0].value) * u
                        }
                    }
                    None => last.value,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_is_identity() {
        let curve = DistributionCurve::linear();
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(0.3), 0.3);
        assert_eq!(curve.evaluate(1.0), 1.0);
        // Out-of-domain input is clamped
        assert_eq!(curve.evaluate(2.0), 1.0);
    }

    #[test]
    fn test_power_packs_toward_base() {
        let curve = DistributionCurve::power(2.0);
        assert!((curve.evaluate(0.5) - 0.25).abs() < 1e-6);
        assert!(curve.validate().is_ok());
        assert!(DistributionCurve::power(0.0).validate().is_err());
    }

    #[test]
    fn test_keyframes_interpolate_and_hold() {
        let curve = DistributionCurve::keyframes(vec![
            Keyframe::new(0.2, 0.1),
            Keyframe::new(0.6, 0.5),
            Keyframe::new(1.0, 1.0),
        ]);
        assert!(curve.validate().is_ok());
        assert!((curve.evaluate(0.0) - 0.1).abs() < 1e-6);
        assert!((curve.evaluate(0.4) - 0.3).abs() < 1e-6);
        assert!((curve.evaluate(0.8) - 0.75).abs() < 1e-6);
        assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_keyframes_reject_decreasing_values() {
        let curve = DistributionCurve::keyframes(vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(0.5, 0.8),
            Keyframe::new(1.0, 0.4),
        ]);
        assert!(matches!(
            curve.validate(),
            Err(ShellError::NonMonotonicCurve { index: 2 })
        ));
    }

    #[test]
    fn test_keyframes_reject_out_of_range() {
        let curve = DistributionCurve::keyframes(vec![Keyframe::new(0.0, -0.5)]);
        assert!(matches!(
            curve.validate(),
            Err(ShellError::CurveOutOfRange { .. })
        ));
    }

    #[test]
    fn test_curve_serde_tagged() {
        let curve = DistributionCurve::power(1.5);
        let json = serde_json::to_string(&curve).unwrap();
        assert!(json.contains("\"kind\":\"power\""));
        let back: DistributionCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }
}
