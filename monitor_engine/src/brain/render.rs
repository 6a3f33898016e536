use std::f32::consts::{PI, TAU};

use glam::{Mat4, Quat, Vec3, Vec4};

use super::effect::Effect;
use super::BrainEngine;
use crate::canvas::{mix_rgb, with_alpha, Canvas};

const NODE_COLOR: [u8; 4] = [220, 240, 255, 200];
const EDGE_COLOR: [u8; 4] = [100, 170, 255, 180];
const SHELL_COLOR: [u8; 4] = [0, 215, 90, 120];
const SHELL_RADIUS: f32 = 2.5;
const SHELL_SEGMENTS: usize = 16;
const SHELL_GLOW_LAYERS: usize = 3;
const CAMERA_DISTANCE: f32 = 15.0;
const FOV_Y_DEGREES: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 50.0;
const YAW_RATE: f32 = 4.8;
const PITCH_RATE: f32 = 7.2;
const SHELL_RATE: f32 = 3.0;
/// Height the point sizes are tuned for.
const REFERENCE_HEIGHT: f32 = 480.0;

/// Slowly orbiting view of the node graph. Angles are in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub shell: f32,
}

impl OrbitCamera {
    pub fn advance(&mut self, dt: f32) {
        self.yaw = (self.yaw + YAW_RATE * dt) % 360.0;
        self.pitch = (self.pitch + PITCH_RATE * dt) % 360.0;
        self.shell = (self.shell + SHELL_RATE * dt) % 360.0;
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        let projection = Mat4::perspective_rh_gl(
            FOV_Y_DEGREES.to_radians(),
            aspect.max(1e-3),
            Z_NEAR,
            Z_FAR,
        );
        projection
            * Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DISTANCE))
            * Mat4::from_rotation_x(self.pitch.to_radians())
            * Mat4::from_rotation_y(self.yaw.to_radians())
    }

    fn shell_rotation(&self) -> Quat {
        Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), self.shell.to_radians())
    }
}

struct Projector {
    matrix: Mat4,
    width: f32,
    height: f32,
}

impl Projector {
    fn project(&self, point: Vec3) -> Option<(i32, i32)> {
        let clip = self.matrix * Vec4::new(point.x, point.y, point.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !(-1.0..=1.0).contains(&ndc.z) {
            return None;
        }
        let x = (ndc.x + 1.0) * 0.5 * self.width;
        let y = (1.0 - ndc.y) * 0.5 * self.height;
        Some((x.round() as i32, y.round() as i32))
    }
}

/// Draw the node graph, active effect and particles over `canvas`.
pub fn render_brain(canvas: &mut Canvas, engine: &BrainEngine) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let camera = engine.camera();
    let projector = Projector {
        matrix: camera.view_projection(width / height),
        width,
        height,
    };
    let scale = (height / REFERENCE_HEIGHT).max(0.5);

    draw_shell(canvas, &projector, camera);

    let topology = engine.topology();
    let nodes = engine.nodes();
    let highlight = engine.effect_color();
    let stimulus = |index: usize| nodes[index].stimulus.clamp(0.0, 1.0);

    for &(a, b) in topology.edges() {
        let (Some(start), Some(end)) = (
            projector.project(topology.nodes()[a]),
            projector.project(topology.nodes()[b]),
        ) else {
            continue;
        };
        let level = stimulus(a).max(stimulus(b));
        let rgb = mix_rgb(rgb_of(EDGE_COLOR), highlight, level);
        let alpha = EDGE_COLOR[3] as f32 + (255.0 - EDGE_COLOR[3] as f32) * level;
        let thickness = (1.0 + 2.0 * level).round() as i32;
        canvas.draw_line(start, end, thickness, with_alpha(rgb, alpha as u8));
    }

    for (index, position) in topology.nodes().iter().enumerate() {
        let Some((x, y)) = projector.project(*position) else {
            continue;
        };
        let level = stimulus(index);
        let rgb = mix_rgb(rgb_of(NODE_COLOR), highlight, level);
        let alpha = NODE_COLOR[3] as f32 + (255.0 - NODE_COLOR[3] as f32) * level;
        let radius = ((5.0 + 3.0 * level) * scale * 0.5).round() as i32;
        canvas.fill_circle(x, y, radius.max(1), with_alpha(rgb, alpha as u8));
        if level > 0.5 {
            canvas.add_glow(x, y, radius * 3, with_alpha(highlight, (110.0 * level) as u8));
        }
    }

    if let Effect::MatrixInsertion(run) = engine.effect() {
        let color = run.params().color;
        for stream in run.streams().iter().filter(|stream| stream.active) {
            let count = stream.revealed.len().max(1) as f32;
            for (slot, (_, position)) in stream.revealed.iter().enumerate() {
                if let Some((x, y)) = projector.project(*position) {
                    let alpha = 0.9 - slot as f32 / count * 0.5;
                    let radius = (2.0 * scale).round() as i32;
                    canvas.fill_circle(x, y, radius, with_alpha(color, (alpha * 255.0) as u8));
                }
            }
        }
        let pulse = 1.0 + 0.5 * ((run.elapsed() * 8.0) % 1.0);
        for ring in run.rings() {
            let Some((x, y)) = projector.project(topology.nodes()[ring.node]) else {
                continue;
            };
            let strength = ring.strength.clamp(0.0, 1.0);
            let core = (4.0 * scale).round() as i32;
            canvas.fill_circle(x, y, core, with_alpha(color, (strength * 0.9 * 255.0) as u8));
            if strength > 0.3 {
                let outer = (7.0 * scale * pulse).round() as i32;
                canvas.stroke_circle(x, y, outer, with_alpha(color, (strength * 0.4 * 255.0) as u8));
            }
        }
    }

    for particle in engine.particles().iter() {
        if let Some((x, y)) = projector.project(particle.position) {
            let alpha = (particle.alpha.clamp(0.0, 1.0) * 255.0) as u8;
            let radius = (particle.size * scale).round() as i32;
            canvas.add_glow(x, y, radius.max(1), with_alpha(particle.color, alpha));
        }
    }
}

fn draw_shell(canvas: &mut Canvas, projector: &Projector, camera: &OrbitCamera) {
    let rotation = camera.shell_rotation();
    for layer in 0..=SHELL_GLOW_LAYERS {
        let radius = SHELL_RADIUS * (1.0 + 0.06 * layer as f32);
        let alpha = SHELL_COLOR[3] as f32 / (1.0 + 2.0 * layer as f32);
        let color = with_alpha(rgb_of(SHELL_COLOR), alpha as u8);
        let point = |lat: usize, lon: usize| {
            let theta = PI * lat as f32 / SHELL_SEGMENTS as f32;
            let phi = TAU * lon as f32 / SHELL_SEGMENTS as f32;
            let local = Vec3::new(
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ) * radius;
            projector.project(rotation * local)
        };
        for lat in 0..=SHELL_SEGMENTS {
            for lon in 0..SHELL_SEGMENTS {
                let here = point(lat, lon);
                let east = point(lat, lon + 1);
                if let (Some(a), Some(b)) = (here, east) {
                    canvas.draw_line(a, b, 1, color);
                }
                if lat < SHELL_SEGMENTS && layer == 0 {
                    if let (Some(a), Some(b)) = (here, point(lat + 1, lon)) {
                        canvas.draw_line(a, b, 1, color);
                    }
                }
            }
        }
    }
}

fn rgb_of(color: [u8; 4]) -> [u8; 3] {
    [color[0], color[1], color[2]]
}

#[cfg(test)]
mod brain_render_tests {
    use super::*;
    use crate::brain::{BrainConfig, RippleParams};

    fn lit_pixels(canvas: &Canvas) -> usize {
        canvas.pixels().chunks_exact(4).filter(|px| px[3] > 0).count()
    }

    #[test]
    fn camera_orbits_over_time() {
        let mut camera = OrbitCamera::default();
        camera.advance(10.0);
        assert!((camera.yaw - 48.0).abs() < 1e-3);
        assert!((camera.pitch - 72.0).abs() < 1e-3);
        assert!((camera.shell - 30.0).abs() < 1e-3);
    }

    #[test]
    fn origin_projects_to_centre() {
        let projector = Projector {
            matrix: OrbitCamera::default().view_projection(1.0),
            width: 200.0,
            height: 200.0,
        };
        assert_eq!(projector.project(Vec3::ZERO), Some((100, 100)));
        // behind the camera
        assert_eq!(projector.project(Vec3::new(0.0, 0.0, 20.0)), None);
    }

    #[test]
    fn idle_brain_draws_shell_and_nodes() {
        let engine = BrainEngine::with_seed(BrainConfig::default(), 1);
        let mut canvas = Canvas::new(320, 240);
        render_brain(&mut canvas, &engine);
        assert!(lit_pixels(&canvas) > 500);
    }

    #[test]
    fn stimulated_nodes_take_the_effect_colour() {
        let mut engine = BrainEngine::with_seed(BrainConfig::default(), 1);
        engine.add_ripple(RippleParams {
            speed: 3.0,
            amplitude: 1.0,
            thickness: 3.0,
            color: [255, 0, 0],
            ..RippleParams::default()
        });
        for _ in 0..60 {
            engine.tick(1.0 / 60.0);
        }
        assert!(engine.max_stimulus() > 0.5);
        let mut canvas = Canvas::new(320, 240);
        render_brain(&mut canvas, &engine);
        let reddish = canvas
            .pixels()
            .chunks_exact(4)
            .filter(|px| px[3] > 0 && px[0] > 200 && px[2] < 150)
            .count();
        assert!(reddish > 0);
    }

    #[test]
    fn empty_canvas_is_ignored() {
        let engine = BrainEngine::with_seed(
            BrainConfig {
                node_count: 10,
                max_particles: 10,
            },
            1,
        );
        let mut canvas = Canvas::new(0, 0);
        render_brain(&mut canvas, &engine);
    }
}
