//! Fixed timestep scene tick
//!
//! Drives every stack of a scene once per frame. The wind sample is written
//! once at the start of the tick and every stack reads that same value.

use glam::Vec3;

use super::follow::BodyPose;
use super::stack::LayerStack;
use super::wind::{WindField, WindSample};
use crate::consts::WIND_DAMPING;

/// Index of a stack inside its scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackId(pub usize);

/// Input collected from the host for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Reference point the wind is derived from (defaults to the tracked body)
    pub wind_target: Option<Vec3>,
    /// Physics body followed by follow stacks
    pub tracked_body: Option<BodyPose>,
    /// Collision contacts since the previous tick
    pub impacts: Vec<(StackId, Vec3)>,
}

/// All stacks of a scene plus the shared wind state
#[derive(Debug)]
pub struct ShellScene {
    wind: WindField,
    stacks: Vec<LayerStack>,
}

impl Default for ShellScene {
    fn default() -> Self {
        Self::new(WIND_DAMPING)
    }
}

impl ShellScene {
    pub fn new(wind_damping: f32) -> Self {
        Self {
            wind: WindField::new(wind_damping),
            stacks: Vec::new(),
        }
    }

    pub fn add_stack(&mut self, stack: LayerStack) -> StackId {
        self.stacks.push(stack);
        StackId(self.stacks.len() - 1)
    }

    pub fn stack(&self, id: StackId) -> Option<&LayerStack> {
        self.stacks.get(id.0)
    }

    pub fn stack_mut(&mut self, id: StackId) -> Option<&mut LayerStack> {
        self.stacks.get_mut(id.0)
    }

    pub fn stacks(&self) -> &[LayerStack] {
        &self.stacks
    }

    pub fn wind(&self) -> &WindField {
        &self.wind
    }

    pub fn set_wind_damping(&mut self, damping: f32) {
        self.wind.set_damping(damping);
    }

    /// Dispose every stack; ids stay valid but the stacks are inert
    pub fn dispose_all(&mut self) {
        for stack in &mut self.stacks {
            stack.dispose();
        }
    }
}

/// Advance the scene by one timestep
pub fn tick(scene: &mut ShellScene, input: &TickInput, dt: f32) {
    // Single writer: the sample computed here is what every stack sees
    let reference = input
        .wind_target
        .or_else(|| input.tracked_body.map(|body| body.position));
    let wind: WindSample = match reference {
        Some(position) => scene.wind.update(position),
        None => scene.wind.sample(),
    };

    for (id, contact) in &input.impacts {
        match scene.stacks.get_mut(id.0) {
            Some(stack) => {
                stack.record_impact(*contact);
            }
            None => log::warn!("Impact for unknown stack {:?} dropped", id),
        }
    }

    for stack in &mut scene.stacks {
        stack.tick(dt, wind, input.tracked_body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::settings::{MaterialHandle, ModelHandle, StackSettings};
    use crate::sim::layer::{BallFollowBuilder, GrassBuilder};
    use crate::sim::mask::TiledMaskSynthesizer;
    use crate::sim::stack::StackPhase;

    const DT: f32 = 1.0 / 60.0;

    fn scene() -> (ShellScene, StackId, StackId) {
        let settings = StackSettings::default().with_references(ModelHandle(1), MaterialHandle(1));
        let mut scene = ShellScene::default();
        let grass = scene.add_stack(LayerStack::with_synthesizer(
            settings.clone(),
            GrassBuilder::plain(),
            TiledMaskSynthesizer::new(1),
        ));
        let ball = scene.add_stack(LayerStack::with_synthesizer(
            settings,
            BallFollowBuilder::plain(),
            TiledMaskSynthesizer::new(2),
        ));
        (scene, grass, ball)
    }

    #[test]
    fn test_first_tick_generates_every_stack() {
        let (mut scene, grass, ball) = scene();
        tick(&mut scene, &TickInput::default(), DT);
        assert_eq!(scene.stack(grass).unwrap().phase(), StackPhase::Ready);
        assert_eq!(scene.stack(ball).unwrap().phase(), StackPhase::Ready);
    }

    #[test]
    fn test_every_stack_sees_the_same_wind() {
        let (mut scene, _, _) = scene();
        let input = TickInput {
            tracked_body: Some(BodyPose::new(Vec3::new(10.0, 3.0, 20.0), Vec3::ZERO)),
            ..Default::default()
        };
        tick(&mut scene, &input, DT);

        let expected = WindSample(Vec2::new(1.0, 2.0));
        assert!((scene.wind().sample().direction() - expected.direction()).length() < 1e-5);
        for stack in scene.stacks() {
            for layer in stack.layers() {
                assert_eq!(layer.params.animated.wind, scene.wind().sample());
            }
        }
    }

    #[test]
    fn test_explicit_wind_target_wins_and_absent_keeps_last() {
        let (mut scene, _, _) = scene();
        let input = TickInput {
            wind_target: Some(Vec3::new(-5.0, 0.0, 0.0)),
            tracked_body: Some(BodyPose::new(Vec3::new(50.0, 0.0, 50.0), Vec3::ZERO)),
            ..Default::default()
        };
        tick(&mut scene, &input, DT);
        let sample = scene.wind().sample();
        assert!((sample.direction() - Vec2::new(-0.5, 0.0)).length() < 1e-6);

        tick(&mut scene, &TickInput::default(), DT);
        assert_eq!(scene.wind().sample(), sample);
    }

    #[test]
    fn test_impacts_route_to_their_stack() {
        let (mut scene, grass, ball) = scene();
        let input = TickInput {
            impacts: vec![(grass, Vec3::new(1.0, 0.0, 1.0)), (StackId(99), Vec3::ZERO)],
            ..Default::default()
        };
        tick(&mut scene, &input, 0.0);
        assert_eq!(scene.stack(grass).unwrap().ripples().impacts_recorded(), 1);
        assert_eq!(scene.stack(ball).unwrap().ripples().impacts_recorded(), 0);
    }

    #[test]
    fn test_dirty_stack_regenerates_on_scene_tick() {
        let (mut scene, grass, _) = scene();
        tick(&mut scene, &TickInput::default(), DT);
        if let Some(stack) = scene.stack_mut(grass) {
            stack.update_settings(|s| s.count = 3);
        }
        tick(&mut scene, &TickInput::default(), DT);
        let stack = scene.stack(grass).unwrap();
        assert_eq!(stack.generation(), 2);
        assert_eq!(stack.layers().len(), 3);
    }

    #[test]
    fn test_dispose_all() {
        let (mut scene, _, _) = scene();
        tick(&mut scene, &TickInput::default(), DT);
        scene.dispose_all();
        tick(&mut scene, &TickInput::default(), DT);
        assert!(scene.stacks().iter().all(|s| s.phase() == StackPhase::Disposed));
        assert!(scene.stacks().iter().all(|s| s.layers().is_empty()));
    }
}
