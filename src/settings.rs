//! Stack configuration surface
//!
//! Everything an author can edit on a stack. Edits never regenerate
//! directly: they mark the stack dirty and the next tick rebuilds it.

use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::{FOLLOW_ANGLE_SPEED, FOLLOW_POSITION_SPEED, MIN_LAYER_COUNT};
use crate::error::{Result, ShellError};
use crate::sim::curve::DistributionCurve;

/// Opaque handle to a texture owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Opaque handle to the layer model (mesh/prefab) owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelHandle(pub u64);

/// Opaque handle to the layer material template owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialHandle(pub u64);

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    /// Mask resolution for this preset
    pub fn mask_resolution(&self) -> u32 {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 256,
            QualityPreset::High => 1024,
        }
    }

    /// Layer count for this preset
    pub fn layer_count(&self) -> usize {
        match self {
            QualityPreset::Low => 16,
            QualityPreset::Medium => 32,
            QualityPreset::High => 64,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(QualityPreset::Low),
            "medium" | "med" => Ok(QualityPreset::Medium),
            "high" => Ok(QualityPreset::High),
            other => Err(ShellError::invalid(
                "quality",
                format!("unknown preset `{other}`"),
            )),
        }
    }
}

/// Host resources every layer is instantiated from
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StackReferences {
    pub layer_model: Option<ModelHandle>,
    pub material: Option<MaterialHandle>,
}

/// Colour at the base and at the tip of the stack (RGBA)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub down: [f32; 4],
    pub up: [f32; 4],
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            down: [0.0, 0.0, 0.0, 1.0],
            up: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Animated displacement texture applied to every layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementSettings {
    pub texture: Option<TextureHandle>,
    pub intensity: f32,
    pub speed: f32,
    /// UV scale in [0, 1]
    pub scale: f32,
}

impl Default for DisplacementSettings {
    fn default() -> Self {
        Self {
            texture: None,
            intensity: 1.0,
            speed: 1.0,
            scale: 1.0,
        }
    }
}

/// Static per-texel offset texture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOffsetSettings {
    pub texture: Option<TextureHandle>,
    pub intensity: f32,
}

impl Default for LocalOffsetSettings {
    fn default() -> Self {
        Self {
            texture: None,
            intensity: 1.0,
        }
    }
}

/// Ripple behaviour and styling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleSettings {
    /// Age after which a ripple is no longer drawn
    pub duration: f32,
    pub circle_smoothing: f32,
    pub ring_smoothing: f32,
    pub radius_multiplier: f32,
    pub intensity_multiplier: f32,
    /// Age units gained per second
    pub recover_speed: f32,
    /// Fraction of stack height the contact point is raised by, in [0, 1]
    pub contact_height_multiplier: f32,
}

impl Default for RippleSettings {
    fn default() -> Self {
        Self {
            duration: 1.0,
            circle_smoothing: 0.0,
            ring_smoothing: 0.0,
            radius_multiplier: 1.0,
            intensity_multiplier: 1.0,
            recover_speed: 1.0,
            contact_height_multiplier: 1.0,
        }
    }
}

/// Follow smoothing speeds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowSettings {
    pub position_lerp_speed: f32,
    pub angle_lerp_speed: f32,
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self {
            position_lerp_speed: FOLLOW_POSITION_SPEED,
            angle_lerp_speed: FOLLOW_ANGLE_SPEED,
        }
    }
}

/// Complete configuration of one layer stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    pub references: StackReferences,

    // === Stack shape ===
    /// Requested mask resolution (clamped by the synthesizer)
    pub resolution: u32,
    /// Number of layers (>= 2)
    pub count: usize,
    /// Base height of the stack
    pub height: f32,
    /// Fraction of the height left empty above the base, in [0, 1]
    pub height_space_percentage: f32,
    /// Index -> placement curve
    pub distribution: DistributionCurve,
    /// Direction layers are stacked along
    pub primary_axis: Vec3,

    // === Mask thresholds ===
    pub radius: f32,
    /// Random step threshold at the base layer, in [0, 1]
    pub mask_init_step: f32,
    /// Random step threshold at the top layer, in [0, 1]
    pub mask_last_step: f32,
    pub gravity: f32,

    pub color: ColorSettings,
    pub displacement: DisplacementSettings,
    pub local_offset: LocalOffsetSettings,
    pub ripple: RippleSettings,
    pub follow: FollowSettings,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            references: StackReferences::default(),
            resolution: 32,
            count: 16,
            height: 1.0,
            height_space_percentage: 0.0,
            distribution: DistributionCurve::Linear,
            primary_axis: Vec3::Y,
            radius: 1.0,
            mask_init_step: 0.9,
            mask_last_step: 0.1,
            gravity: 0.0,
            color: ColorSettings::default(),
            displacement: DisplacementSettings::default(),
            local_offset: LocalOffsetSettings::default(),
            ripple: RippleSettings::default(),
            follow: FollowSettings::default(),
        }
    }
}

impl StackSettings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates resolution and layer count)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.resolution = preset.mask_resolution();
        self.count = preset.layer_count();
        log::info!(
            "Applied {} preset: {} layers, {}px mask",
            preset.as_str(),
            self.count,
            self.resolution
        );
    }

    /// Attach the host resources layers are built from
    pub fn with_references(mut self, model: ModelHandle, material: MaterialHandle) -> Self {
        self.references = StackReferences {
            layer_model: Some(model),
            material: Some(material),
        };
        self
    }

    /// Check references first, then every value range
    pub fn validate(&self) -> Result<()> {
        if self.references.layer_model.is_none() {
            return Err(ShellError::MissingReference {
                what: "layer model",
            });
        }
        if self.references.material.is_none() {
            return Err(ShellError::MissingReference { what: "material" });
        }

        if self.count < MIN_LAYER_COUNT {
            return Err(ShellError::LayerCountTooSmall { count: self.count });
        }
        if self.resolution == 0 {
            return Err(ShellError::ZeroResolution);
        }
        if !self.height.is_finite() {
            return Err(ShellError::invalid("height", "must be finite"));
        }
        if self.primary_axis.length_squared() <= f32::EPSILON {
            return Err(ShellError::invalid("primary_axis", "must be non-zero"));
        }
        self.distribution.validate()?;

        unit_range("height_space_percentage", self.height_space_percentage)?;
        unit_range("mask_init_step", self.mask_init_step)?;
        unit_range("mask_last_step", self.mask_last_step)?;
        non_negative("radius", self.radius)?;

        non_negative("displacement.intensity", self.displacement.intensity)?;
        non_negative("displacement.speed", self.displacement.speed)?;
        unit_range("displacement.scale", self.displacement.scale)?;
        non_negative("local_offset.intensity", self.local_offset.intensity)?;

        non_negative("ripple.duration", self.ripple.duration)?;
        non_negative("ripple.circle_smoothing", self.ripple.circle_smoothing)?;
        non_negative("ripple.ring_smoothing", self.ripple.ring_smoothing)?;
        non_negative("ripple.radius_multiplier", self.ripple.radius_multiplier)?;
        non_negative("ripple.intensity_multiplier", self.ripple.intensity_multiplier)?;
        non_negative("ripple.recover_speed", self.ripple.recover_speed)?;
        unit_range(
            "ripple.contact_height_multiplier",
            self.ripple.contact_height_multiplier,
        )?;

        non_negative("follow.position_lerp_speed", self.follow.position_lerp_speed)?;
        non_negative("follow.angle_lerp_speed", self.follow.angle_lerp_speed)?;
        Ok(())
    }

    /// Parse settings from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize settings to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn unit_range(field: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ShellError::invalid(field, format!("{value} is outside [0, 1]")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ShellError::invalid(field, format!("{value} must be >= 0")))
    }
}
