//! Layer-stack engine
//!
//! Everything that decides what the shells look like lives here:
//! - Mask synthesis and per-layer placement
//! - Per-frame animated state (ripples, wind, follow smoothing)
//! - Stack lifecycle and the scene tick
//!
//! No GPU or platform dependencies. The renderer only reads what this
//! module produces.

pub mod curve;
pub mod distribution;
pub mod follow;
pub mod layer;
pub mod mask;
pub mod plane;
pub mod ripple;
pub mod stack;
pub mod tick;
pub mod wind;

pub use curve::{DistributionCurve, Keyframe};
pub use distribution::{LayerDistribution, LayerPlacement};
pub use follow::{BodyPose, FollowBlend, FollowState};
pub use layer::{
    AnimatedParams, BallFollowBuilder, GrassBuilder, Layer, LayerParameterBuilder, LayerTransform,
    ParameterBlock, PlainShellBuilder,
};
pub use mask::{MaskRef, MaskSynthesizer, MaskTexture, TiledMaskSynthesizer, clamp_resolution};
pub use plane::{ElevationMap, PlaneMesh, PlaneSettings};
pub use ripple::{RippleEntry, RippleTracker};
pub use stack::{LayerStack, StackPhase};
pub use tick::{ShellScene, StackId, TickInput, tick};
pub use wind::{WindField, WindSample};
