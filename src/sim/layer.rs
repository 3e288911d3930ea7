//! Layers and their parameter blocks
//!
//! A layer's structural fields are fixed at generation time; only the
//! `animated` subset of its parameter block is rewritten each tick.
//! Stack variants differ only in how they fill a block, which is captured
//! by the `LayerParameterBuilder` strategy.

use glam::Vec3;

use super::distribution::LayerPlacement;
use super::mask::MaskRef;
use super::ripple::RippleEntry;
use super::wind::WindSample;
use crate::consts::RIPPLE_CAPACITY;
use crate::settings::{
    DisplacementSettings, LocalOffsetSettings, MaterialHandle, ModelHandle, RippleSettings,
    StackSettings,
};

/// Per-frame state pushed to every layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedParams {
    pub ripples: [RippleEntry; RIPPLE_CAPACITY],
    pub wind: WindSample,
    /// Raw position of the tracked body (follow stacks only)
    pub current_position: Vec3,
    /// This layer's smoothed position (follow stacks only)
    pub smoothed_position: Vec3,
}

impl Default for AnimatedParams {
    fn default() -> Self {
        Self {
            ripples: [RippleEntry::IDLE; RIPPLE_CAPACITY],
            wind: WindSample::NEUTRAL,
            current_position: Vec3::ZERO,
            smoothed_position: Vec3::ZERO,
        }
    }
}

/// Uniform state consumed by the renderer for one layer
#[derive(Debug, Clone)]
pub struct ParameterBlock {
    /// Shared stack mask (never duplicated per layer)
    pub mask: MaskRef,
    pub shell_index: u32,
    pub shell_count: u32,
    pub shell_height: f32,
    pub height_percentage: f32,
    pub height_space_percentage: f32,
    pub radius: f32,
    pub color_min: [f32; 4],
    pub color_max: [f32; 4],
    pub step_min: f32,
    pub step_max: f32,
    pub gravity: f32,
    pub displacement: DisplacementSettings,
    pub local_offset: LocalOffsetSettings,
    pub ripple: RippleSettings,
    pub animated: AnimatedParams,
}

impl ParameterBlock {
    /// Fields every variant shares: mask, index, count, height, placement
    pub fn base(
        mask: MaskRef,
        index: usize,
        count: usize,
        height: f32,
        placement: &LayerPlacement,
    ) -> Self {
        Self {
            mask,
            shell_index: index as u32,
            shell_count: count as u32,
            shell_height: height,
            height_percentage: placement.percentage,
            height_space_percentage: 0.0,
            radius: 1.0,
            color_min: [0.0, 0.0, 0.0, 1.0],
            color_max: [1.0, 1.0, 1.0, 1.0],
            step_min: 0.0,
            step_max: 0.0,
            gravity: 0.0,
            displacement: DisplacementSettings::default(),
            local_offset: LocalOffsetSettings::default(),
            ripple: RippleSettings::default(),
            animated: AnimatedParams::default(),
        }
    }

    /// Colour for this layer, interpolated by height percentage
    pub fn layer_color(&self) -> [f32; 4] {
        let t = self.height_percentage;
        let mut out = [0.0; 4];
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.color_min[i] + (self.color_max[i] - self.color_min[i]) * t;
        }
        out
    }

    /// Mask step threshold for this layer, interpolated by height percentage
    pub fn step_threshold(&self) -> f32 {
        self.step_min + (self.step_max - self.step_min) * self.height_percentage
    }
}

/// Transform of one layer instance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayerTransform {
    pub position: Vec3,
    /// Euler angles (radians, XYZ order)
    pub rotation: Vec3,
}

/// One shell surface
#[derive(Debug, Clone)]
pub struct Layer {
    pub index: usize,
    pub placement: LayerPlacement,
    pub model: ModelHandle,
    pub material: MaterialHandle,
    pub transform: LayerTransform,
    pub params: ParameterBlock,
}

/// Strategy filling a layer's parameter block for one stack variant
pub trait LayerParameterBuilder {
    /// Variant name for logs
    fn name(&self) -> &'static str;

    /// Fill in variant-specific fields on top of the shared base block
    fn build(&self, index: usize, base: ParameterBlock, settings: &StackSettings) -> ParameterBlock;

    /// Whether layers chase a tracked body each tick
    fn tracks_body(&self) -> bool {
        false
    }

    /// Offset added to impact contact points before they are recorded
    fn impact_offset(&self, _settings: &StackSettings) -> Vec3 {
        Vec3::ZERO
    }
}

impl<B: LayerParameterBuilder + ?Sized> LayerParameterBuilder for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn build(&self, index: usize, base: ParameterBlock, settings: &StackSettings) -> ParameterBlock {
        (**self).build(index, base, settings)
    }

    fn tracks_body(&self) -> bool {
        (**self).tracks_body()
    }

    fn impact_offset(&self, settings: &StackSettings) -> Vec3 {
        (**self).impact_offset(settings)
    }
}

/// Plain shell: full appearance set, no extra behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainShellBuilder;

impl LayerParameterBuilder for PlainShellBuilder {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn build(&self, _index: usize, mut block: ParameterBlock, settings: &StackSettings) -> ParameterBlock {
        block.height_space_percentage = settings.height_space_percentage;
        block.radius = settings.radius;
        block.color_min = settings.color.down;
        block.color_max = settings.color.up;
        block.step_min = settings.mask_init_step;
        block.step_max = settings.mask_last_step;
        block.gravity = settings.gravity;
        block.displacement = settings.displacement;
        block.local_offset = settings.local_offset;
        block.ripple = settings.ripple;
        block.animated.ripples = [RippleEntry::IDLE; RIPPLE_CAPACITY];
        block
    }
}

/// Grass: the plain shell plus ripple impacts raised by the contact offset
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassBuilder<B = PlainShellBuilder> {
    inner: B,
}

impl GrassBuilder {
    /// Grass on top of the plain shell appearance
    pub fn plain() -> Self {
        Self::new(PlainShellBuilder)
    }
}

impl<B> GrassBuilder<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

impl<B: LayerParameterBuilder> LayerParameterBuilder for GrassBuilder<B> {
    fn name(&self) -> &'static str {
        "grass"
    }

    fn build(&self, index: usize, base: ParameterBlock, settings: &StackSettings) -> ParameterBlock {
        let mut block = self.inner.build(index, base, settings);
        // Grass layers always start with every ripple idle and no wind
        block.ripple = settings.ripple;
        block.animated.ripples = [RippleEntry::IDLE; RIPPLE_CAPACITY];
        block.animated.wind = WindSample::NEUTRAL;
        block
    }

    /// Contacts sit on the base surface; ripples are drawn part way up the blades
    fn impact_offset(&self, settings: &StackSettings) -> Vec3 {
        settings.primary_axis.normalize_or(Vec3::Y)
            * settings.height
            * settings.ripple.contact_height_multiplier
    }
}

/// Ball follow: layers chase a tracked body's pose
#[derive(Debug, Clone, Copy, Default)]
pub struct BallFollowBuilder<B = PlainShellBuilder> {
    inner: B,
}

impl BallFollowBuilder {
    /// Follow behaviour on top of the plain shell appearance
    pub fn plain() -> Self {
        Self::new(PlainShellBuilder)
    }
}

impl<B> BallFollowBuilder<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

impl<B: LayerParameterBuilder> LayerParameterBuilder for BallFollowBuilder<B> {
    fn name(&self) -> &'static str {
        "ball-follow"
    }

    fn build(&self, index: usize, base: ParameterBlock, settings: &StackSettings) -> ParameterBlock {
        let mut block = self.inner.build(index, base, settings);
        block.animated.current_position = Vec3::ZERO;
        block.animated.smoothed_position = Vec3::ZERO;
        block
    }

    fn tracks_body(&self) -> bool {
        true
    }

    fn impact_offset(&self, settings: &StackSettings) -> Vec3 {
        self.inner.impact_offset(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::sim::mask::{MaskSynthesizer, TiledMaskSynthesizer};

    fn base_block(index: usize, percentage: f32) -> ParameterBlock {
        let mask = Arc::new(TiledMaskSynthesizer::new(1).synthesize(8).unwrap());
        let placement = LayerPlacement {
            percentage,
            height: percentage * 2.0,
            offset: Vec3::Y * percentage * 2.0,
        };
        ParameterBlock::base(mask, index, 4, 2.0, &placement)
    }

    #[test]
    fn test_plain_copies_appearance() {
        let mut settings = StackSettings::default();
        settings.radius = 0.4;
        settings.gravity = -2.0;
        settings.color.up = [0.2, 0.9, 0.1, 1.0];
        let block = PlainShellBuilder.build(1, base_block(1, 0.5), &settings);
        assert_eq!(block.radius, 0.4);
        assert_eq!(block.gravity, -2.0);
        assert_eq!(block.color_max, [0.2, 0.9, 0.1, 1.0]);
        assert_eq!(block.step_min, 0.9);
        assert_eq!(block.step_max, 0.1);
        assert_eq!(block.shell_index, 1);
        assert_eq!(block.shell_count, 4);
    }

    #[test]
    fn test_same_percentage_drives_color_and_step() {
        let settings = StackSettings::default();
        let block = PlainShellBuilder.build(2, base_block(2, 0.5), &settings);
        assert_eq!(block.layer_color(), [0.5, 0.5, 0.5, 1.0]);
        assert!((block.step_threshold() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_grass_starts_idle() {
        let settings = StackSettings::default();
        let mut base = base_block(0, 0.0);
        base.animated.ripples[0] = RippleEntry { position: Vec3::ONE, age: 0.0 };
        let block = GrassBuilder::plain().build(0, base, &settings);
        assert!(block.animated.ripples.iter().all(|r| *r == RippleEntry::IDLE));
        assert_eq!(block.radius, settings.radius);
    }

    #[test]
    fn test_variants_flag_follow() {
        assert!(!PlainShellBuilder.tracks_body());
        assert!(!GrassBuilder::plain().tracks_body());
        let boxed: Box<dyn LayerParameterBuilder> = Box::new(BallFollowBuilder::plain());
        assert!(boxed.tracks_body());
        assert_eq!(boxed.name(), "ball-follow");
    }

    #[test]
    fn test_only_grass_raises_impacts() {
        let mut settings = StackSettings::default();
        settings.height = 2.0;
        settings.ripple.contact_height_multiplier = 0.5;
        assert_eq!(PlainShellBuilder.impact_offset(&settings), Vec3::ZERO);
        assert_eq!(BallFollowBuilder::plain().impact_offset(&settings), Vec3::ZERO);
        let grass: Box<dyn LayerParameterBuilder> = Box::new(GrassBuilder::plain());
        assert!((grass.impact_offset(&settings) - Vec3::Y).length() < 1e-6);
    }
}
