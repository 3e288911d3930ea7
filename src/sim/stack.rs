//! Layer stack lifecycle
//!
//! Uninitialized -> Generating -> Ready -> (edit) -> Generating -> Ready ... -> Disposed
//!
//! Configuration edits only mark the stack dirty; the next tick performs a
//! single regeneration. A regeneration builds the new mask and every new
//! parameter block before touching the current layers, then swaps them in
//! one step. Any failure leaves the previous layers in place.

use std::sync::Arc;

use glam::Vec3;

use super::distribution::LayerDistribution;
use super::follow::{BodyPose, FollowBlend};
use super::layer::{
    BallFollowBuilder, GrassBuilder, Layer, LayerParameterBuilder, LayerTransform,
    ParameterBlock, PlainShellBuilder,
};
use super::mask::{MaskRef, MaskSynthesizer, TiledMaskSynthesizer};
use super::ripple::RippleTracker;
use super::wind::WindSample;
use crate::error::{Result, ShellError};
use crate::settings::StackSettings;

/// Lifecycle phase of a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPhase {
    /// Never generated successfully
    Uninitialized,
    /// Building a new mask and layer set
    Generating,
    /// Layers are valid for rendering
    Ready,
    /// Torn down; no further regeneration
    Disposed,
}

/// A stack of shell layers sharing one mask
pub struct LayerStack {
    settings: StackSettings,
    builder: Box<dyn LayerParameterBuilder>,
    synthesizer: Box<dyn MaskSynthesizer>,

    // === Generated state (swapped wholesale) ===
    phase: StackPhase,
    layers: Vec<Layer>,
    mask: Option<MaskRef>,
    generation: u64,

    // === Animated state ===
    ripples: RippleTracker,
    follow: Option<FollowBlend>,
    wind: WindSample,

    origin: Vec3,
    dirty: bool,
}

impl std::fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStack")
            .field("variant", &self.builder.name())
            .field("phase", &self.phase)
            .field("layers", &self.layers.len())
            .field("generation", &self.generation)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl LayerStack {
    /// New stack with an entropy-seeded CPU mask synthesizer.
    ///
    /// The stack starts dirty, so the first tick generates it.
    pub fn new(settings: StackSettings, builder: impl LayerParameterBuilder + 'static) -> Self {
        Self::with_synthesizer(settings, builder, TiledMaskSynthesizer::default())
    }

    pub fn with_synthesizer(
        settings: StackSettings,
        builder: impl LayerParameterBuilder + 'static,
        synthesizer: impl MaskSynthesizer + 'static,
    ) -> Self {
        let recover_speed = settings.ripple.recover_speed;
        Self {
            settings,
            builder: Box::new(builder),
            synthesizer: Box::new(synthesizer),
            phase: StackPhase::Uninitialized,
            layers: Vec::new(),
            mask: None,
            generation: 0,
            ripples: RippleTracker::new(recover_speed),
            follow: None,
            wind: WindSample::NEUTRAL,
            origin: Vec3::ZERO,
            dirty: true,
        }
    }

    /// Plain shell stack (fur on a static surface)
    pub fn shell(settings: StackSettings) -> Self {
        Self::new(settings, PlainShellBuilder)
    }

    /// Grass stack with raised ripple impacts
    pub fn grass(settings: StackSettings) -> Self {
        Self::new(settings, GrassBuilder::plain())
    }

    /// Stack that follows a tracked body
    pub fn ball_follow(settings: StackSettings) -> Self {
        Self::new(settings, BallFollowBuilder::plain())
    }

    pub fn phase(&self) -> StackPhase {
        self.phase
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Successful regenerations so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn variant(&self) -> &'static str {
        self.builder.name()
    }

    pub fn settings(&self) -> &StackSettings {
        &self.settings
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Shared mask of the current layer set
    pub fn mask(&self) -> Option<&MaskRef> {
        self.mask.as_ref()
    }

    pub fn ripples(&self) -> &RippleTracker {
        &self.ripples
    }

    pub fn follow(&self) -> Option<&FollowBlend> {
        self.follow.as_ref()
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Move the stack base. Follow stacks ignore this and track their body.
    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
        if self.follow.is_none() {
            for layer in &mut self.layers {
                layer.transform.position = origin;
            }
        }
    }

    /// Request a regeneration on the next tick
    pub fn mark_dirty(&mut self) {
        if self.phase == StackPhase::Disposed {
            return;
        }
        if self.dirty {
            log::debug!("{} stack already dirty, edit coalesced", self.builder.name());
        }
        self.dirty = true;
    }

    /// Edit settings in place; the stack regenerates on the next tick
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut StackSettings)) {
        edit(&mut self.settings);
        self.mark_dirty();
    }

    /// Replace settings; the stack regenerates on the next tick
    pub fn set_settings(&mut self, settings: StackSettings) {
        self.settings = settings;
        self.mark_dirty();
    }

    /// Rebuild the mask and every layer from the current settings.
    ///
    /// Returns `Ok(false)` when a regeneration is already running; the
    /// request is folded into the dirty flag instead. On error the stack
    /// keeps its previous phase and layers.
    pub fn regenerate(&mut self) -> Result<bool> {
        let prior = match self.phase {
            StackPhase::Disposed => return Err(ShellError::Disposed),
            StackPhase::Generating => {
                self.dirty = true;
                log::debug!("{} stack regeneration coalesced", self.builder.name());
                return Ok(false);
            }
            phase => phase,
        };

        self.phase = StackPhase::Generating;
        let (mask, layers) = match self.build() {
            Ok(built) => built,
            Err(err) => {
                self.phase = prior;
                log::warn!(
                    "{} stack regeneration refused, keeping {} layers: {}",
                    self.builder.name(),
                    self.layers.len(),
                    err
                );
                return Err(err);
            }
        };

        // Swap: the old layers and the old mask are released here
        self.layers = layers;
        self.mask = Some(mask);

        self.ripples.set_recover_speed(self.settings.ripple.recover_speed);
        self.follow = self.builder.tracks_body().then(|| {
            FollowBlend::new(
                self.settings.follow.position_lerp_speed,
                self.settings.follow.angle_lerp_speed,
            )
        });
        self.push_animated();

        self.generation += 1;
        self.phase = StackPhase::Ready;
        log::info!(
            "Generated {} stack: {} layers, {}px mask (generation {})",
            self.builder.name(),
            self.layers.len(),
            self.mask.as_ref().map_or(0, |m| m.resolution()),
            self.generation
        );
        Ok(true)
    }

    /// Everything a regeneration needs, built without touching current state
    fn build(&mut self) -> Result<(MaskRef, Vec<Layer>)> {
        self.settings.validate()?;
        let model = self
            .settings
            .references
            .layer_model
            .ok_or(ShellError::MissingReference { what: "layer model" })?;
        let material = self
            .settings
            .references
            .material
            .ok_or(ShellError::MissingReference { what: "material" })?;

        let count = self.settings.count;
        let height = self.settings.height;
        let distribution =
            LayerDistribution::new(self.settings.distribution.clone(), self.settings.primary_axis);
        let placements = (0..count)
            .map(|index| distribution.place(index, count, height))
            .collect::<Result<Vec<_>>>()?;

        let mask: MaskRef = Arc::new(self.synthesizer.synthesize(self.settings.resolution)?);

        let transform = LayerTransform {
            position: self.origin,
            rotation: Vec3::ZERO,
        };
        let layers = placements
            .into_iter()
            .enumerate()
            .map(|(index, placement)| {
                let base = ParameterBlock::base(Arc::clone(&mask), index, count, height, &placement);
                Layer {
                    index,
                    placement,
                    model,
                    material,
                    transform,
                    params: self.builder.build(index, base, &self.settings),
                }
            })
            .collect();

        Ok((mask, layers))
    }

    /// Record an impact; the variant decides how far the contact is raised.
    ///
    /// Returns the ripple slot written.
    pub fn record_impact(&mut self, contact: Vec3) -> usize {
        let offset = self.builder.impact_offset(&self.settings);
        self.ripples.record_impact(contact + offset)
    }

    /// Per-frame update. Never fails; regeneration errors are logged.
    pub fn tick(&mut self, dt: f32, wind: WindSample, body: Option<BodyPose>) {
        if self.phase == StackPhase::Disposed {
            return;
        }

        if self.dirty {
            self.dirty = false;
            // Refusals are logged by regenerate; the previous layers stay valid
            let _ = self.regenerate();
        }
        if self.phase != StackPhase::Ready {
            return;
        }

        self.ripples.decay(dt);
        self.wind = wind;
        self.push_animated();

        let (Some(follow), Some(pose)) = (self.follow.as_mut(), body) else {
            return;
        };
        let count = self.layers.len();
        for layer in &mut self.layers {
            let state = follow.update(dt, pose, layer.index, count);
            layer.transform.position = pose.position;
            layer.transform.rotation = state.rotation;
            layer.params.animated.current_position = pose.position;
            layer.params.animated.smoothed_position = state.position;
        }
    }

    /// Copy the shared ripple snapshot and wind into every layer
    fn push_animated(&mut self) {
        let ripples = *self.ripples.snapshot();
        for layer in &mut self.layers {
            layer.params.animated.ripples = ripples;
            layer.params.animated.wind = self.wind;
        }
    }

    /// Release layers, mask and follow state. The stack cannot be reused.
    pub fn dispose(&mut self) {
        if self.phase == StackPhase::Disposed {
            return;
        }
        let released = self.layers.len();
        self.layers.clear();
        self.mask = None;
        self.follow = None;
        self.ripples.clear();
        self.dirty = false;
        self.phase = StackPhase::Disposed;
        log::info!("Disposed {} stack ({} layers)", self.builder.name(), released);
    }
}
