//! Shell texturing headless driver
//!
//! Builds a grass field and a furry ball, drives them with synthetic
//! physics input at a fixed timestep and logs what the renderer would be
//! fed.
//!
//! Usage: `shell-texturing [low|medium|high] [seconds]`

use glam::{Quat, Vec3};

use shell_texturing::renderer::{PlaneVertex, ShellUniform};
use shell_texturing::settings::{MaterialHandle, ModelHandle};
use shell_texturing::sim::{
    BodyPose, LayerStack, PlaneMesh, PlaneSettings, ShellScene, TickInput, tick,
};
use shell_texturing::{QualityPreset, Result, StackSettings};

const TICK_RATE: f32 = 60.0;

fn run(preset: QualityPreset, seconds: f32) -> Result<()> {
    let mut grass_settings = StackSettings::from_preset(preset)
        .with_references(ModelHandle(1), MaterialHandle(1));
    grass_settings.height = 0.3;
    grass_settings.color.down = [0.05, 0.15, 0.02, 1.0];
    grass_settings.color.up = [0.45, 0.8, 0.2, 1.0];
    grass_settings.ripple.duration = 2.0;
    grass_settings.ripple.contact_height_multiplier = 0.5;

    let mut ball_settings = StackSettings::from_preset(preset)
        .with_references(ModelHandle(2), MaterialHandle(2));
    ball_settings.height = 0.15;
    ball_settings.gravity = -0.5;

    let mut scene = ShellScene::default();
    let grass = scene.add_stack(LayerStack::grass(grass_settings));
    let ball = scene.add_stack(LayerStack::ball_follow(ball_settings));

    let dt = 1.0 / TICK_RATE;
    let ticks = (seconds * TICK_RATE) as u32;
    let mut impacts = 0;

    for frame in 0..ticks {
        let t = frame as f32 * dt;
        // Ball rolling in a circle, bouncing every half second
        let bounce = (t * 2.0 * std::f32::consts::PI).sin().abs();
        let position = Vec3::new(t.cos() * 4.0, bounce, t.sin() * 4.0);
        let orientation = Quat::from_rotation_y(-t) * Quat::from_rotation_z(t * 2.0);

        let mut input = TickInput {
            tracked_body: Some(BodyPose::from_quat(position, orientation)),
            ..Default::default()
        };
        if frame % (TICK_RATE as u32 / 2) == 0 {
            input.impacts.push((grass, Vec3::new(position.x, 0.0, position.z)));
            impacts += 1;
        }
        tick(&mut scene, &input, dt);
    }

    for stack in scene.stacks() {
        let uniforms = ShellUniform::from_layers(stack.layers());
        log::info!(
            "{} stack: {:?}, {} layers, mask {}px, {} bytes of layer uniforms",
            stack.variant(),
            stack.phase(),
            stack.layers().len(),
            stack.mask().map_or(0, |m| m.resolution()),
            std::mem::size_of_val(uniforms.as_slice())
        );
    }

    if let Some(stack) = scene.stack(ball) {
        let lag: Vec<f32> = stack
            .layers()
            .iter()
            .map(|l| l.params.animated.current_position.distance(l.params.animated.smoothed_position))
            .collect();
        if let (Some(inner), Some(outer)) = (lag.first(), lag.last()) {
            log::info!(
                "Follow lag: inner layer {:.3}, outer layer {:.3} from the body",
                inner,
                outer
            );
        }
    }
    log::info!(
        "{} impacts recorded, wind {:?}",
        impacts,
        scene.wind().sample().direction()
    );

    // Ground plane displaced by the grass mask
    if let Some(mask) = scene.stack(grass).and_then(|s| s.mask()) {
        let plane = PlaneSettings {
            elevation_intensity: 0.05,
            ..Default::default()
        };
        let mesh = PlaneMesh::generate(&plane, Some(&**mask))?;
        let vertices = PlaneVertex::from_mesh(&mesh);
        log::info!(
            "Ground plane: {} vertices, {} triangles",
            vertices.len(),
            mesh.triangle_count()
        );
    }

    scene.dispose_all();
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Shell texturing (native) starting...");

    let mut args = std::env::args().skip(1);
    let preset = match args.next().map(|arg| arg.parse::<QualityPreset>()) {
        Some(Ok(preset)) => preset,
        Some(Err(e)) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
        None => QualityPreset::default(),
    };
    let seconds = args
        .next()
        .and_then(|arg| arg.parse::<f32>().ok())
        .unwrap_or(3.0);

    if let Err(e) = run(preset, seconds) {
        log::error!("Shell texturing failed: {}", e);
        std::process::exit(1);
    }
}
