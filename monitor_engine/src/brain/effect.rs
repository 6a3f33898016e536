//! Effect parameters and the per-node influence of the sweeping effects.

use std::f32::consts::PI;

use glam::Vec3;
use monitor_feed::Trigger;
use rand::Rng;

use super::matrix::MatrixRun;
use super::particle::Particle;

/// Distance the wave front drags its trailing window behind it.
const WAVE_TRAIL: f32 = 3.0;
const WAVE_PERPENDICULAR_FALLOFF: f32 = 0.4;
const WAVE_MIN_FACTOR: f32 = 0.1;
const RIPPLE_GROWTH: f32 = 2.0;
const RIPPLE_MAX_RADIUS: f32 = 15.0;
const BAND_TRAVEL: f32 = 20.0;
const BAND_LEAD_IN: f32 = 10.0;
const BAND_HALF_WIDTH_FACTOR: f32 = 3.0;
const BAND_HOLD: f32 = 0.3;

/// Common shape of the three geometric sweeps (wave, ripple, band).
pub trait Sweep {
    fn duration(&self) -> f32;
    fn color(&self) -> [u8; 3];
    /// Stimulus contributed to a node at `position`, `elapsed` seconds in.
    fn influence(&self, position: Vec3, elapsed: f32) -> f32;
    /// Seconds a fresh pulse is held before the node starts decaying.
    fn hold<R: Rng>(&self, rng: &mut R) -> f32 {
        rng.gen_range(0.3..0.8)
    }
    /// Particle thrown off a strongly stimulated node.
    fn emit<R: Rng>(&self, position: Vec3, rng: &mut R) -> Particle;
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveParams {
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub duration: f32,
    pub amplitude: f32,
    pub color: [u8; 3],
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::X,
            speed: 1.0,
            duration: 3.0,
            amplitude: 1.5,
            color: [255, 100, 50],
        }
    }
}

impl WaveParams {
    pub(crate) fn sanitized(mut self) -> Self {
        let fallback = Self::default();
        self.origin = finite_vec(self.origin, fallback.origin);
        self.direction = unit_or_x(self.direction);
        self.speed = finite_or(self.speed, fallback.speed);
        self.duration = finite_or(self.duration, fallback.duration);
        self.amplitude = finite_or(self.amplitude, fallback.amplitude);
        self
    }
}

impl Sweep for WaveParams {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn color(&self) -> [u8; 3] {
        self.color
    }

    fn influence(&self, position: Vec3, elapsed: f32) -> f32 {
        let front = elapsed * self.speed;
        let tail = (front - WAVE_TRAIL).max(0.0);
        let offset = position - self.origin;
        let along = offset.dot(self.direction);
        let perpendicular = (offset - along * self.direction).length();
        let factor = (1.0 - perpendicular * WAVE_PERPENDICULAR_FALLOFF).max(0.0);
        if along < tail || along > front || factor <= WAVE_MIN_FACTOR {
            return 0.0;
        }
        let relative = if front > tail {
            (along - tail) / (front - tail)
        } else {
            0.0
        };
        (relative * PI).sin() * self.amplitude * factor
    }

    fn emit<R: Rng>(&self, position: Vec3, rng: &mut R) -> Particle {
        Particle {
            position,
            velocity: self.direction * 3.0 + jitter(rng, 1.5),
            life: rng.gen_range(0.5..1.5),
            size: rng.gen_range(1.5..3.0),
            color: self.color,
            alpha: rng.gen_range(0.6..0.9),
            gravity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RippleParams {
    pub origin: Vec3,
    pub speed: f32,
    pub duration: f32,
    pub amplitude: f32,
    pub color: [u8; 3],
    pub thickness: f32,
}

impl Default for RippleParams {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            speed: 1.0,
            duration: 3.0,
            amplitude: 1.5,
            color: [255, 100, 50],
            thickness: 1.0,
        }
    }
}

impl RippleParams {
    /// Ripple fired when the wake word is heard.
    pub fn wake() -> Self {
        Self {
            speed: 5.5,
            duration: 3.0,
            amplitude: 0.6,
            color: [82, 255, 139],
            thickness: 1.0,
            ..Self::default()
        }
    }

    pub(crate) fn sanitized(mut self) -> Self {
        let fallback = Self::default();
        self.origin = finite_vec(self.origin, fallback.origin);
        self.speed = finite_or(self.speed, fallback.speed);
        self.duration = finite_or(self.duration, fallback.duration);
        self.amplitude = finite_or(self.amplitude, fallback.amplitude);
        self.thickness = finite_or(self.thickness, fallback.thickness).max(0.0);
        self
    }
}

impl Sweep for RippleParams {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn color(&self) -> [u8; 3] {
        self.color
    }

    fn influence(&self, position: Vec3, elapsed: f32) -> f32 {
        let radius = (elapsed * self.speed * RIPPLE_GROWTH).min(RIPPLE_MAX_RADIUS);
        let inner = (radius - self.thickness).max(0.0);
        let distance = position.distance(self.origin);
        if distance < inner || distance > radius {
            return 0.0;
        }
        let relative = if self.thickness > 0.0 {
            (distance - inner) / self.thickness
        } else {
            0.0
        };
        (relative * PI).sin() * self.amplitude
    }

    fn emit<R: Rng>(&self, position: Vec3, rng: &mut R) -> Particle {
        let outward = (position - self.origin).try_normalize().unwrap_or(Vec3::Y);
        Particle {
            position,
            velocity: outward * rng.gen_range(1.5..4.5),
            life: rng.gen_range(0.5..1.5),
            size: rng.gen_range(1.5..3.0),
            color: self.color,
            alpha: rng.gen_range(0.6..0.9),
            gravity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandParams {
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub duration: f32,
    pub amplitude: f32,
    pub color: [u8; 3],
    pub band_width: f32,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::X,
            speed: 0.8,
            duration: 5.0,
            amplitude: 2.0,
            color: [255, 100, 50],
            band_width: 1.5,
        }
    }
}

impl BandParams {
    /// Upward sweep fired while the language model is thinking.
    pub fn think() -> Self {
        Self {
            origin: Vec3::new(0.0, -5.0, 0.0),
            direction: Vec3::Y,
            speed: 4.0,
            duration: 5.0,
            amplitude: 2.0,
            color: [50, 200, 255],
            band_width: 0.2,
        }
    }

    pub(crate) fn sanitized(mut self) -> Self {
        let fallback = Self::default();
        self.origin = finite_vec(self.origin, fallback.origin);
        self.direction = unit_or_x(self.direction);
        self.speed = finite_or(self.speed, fallback.speed);
        self.duration = finite_or(self.duration, fallback.duration);
        self.amplitude = finite_or(self.amplitude, fallback.amplitude);
        self.band_width = finite_or(self.band_width, fallback.band_width).max(0.0);
        self
    }

    /// Where the slab starts: behind `origin` so it enters from outside.
    pub fn entry(&self) -> Vec3 {
        self.origin - self.direction * BAND_LEAD_IN
    }

    pub fn half_width(&self) -> f32 {
        self.band_width * BAND_HALF_WIDTH_FACTOR
    }

    /// Distance travelled from the entry point after `elapsed` seconds.
    pub fn travel(&self, elapsed: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        elapsed * self.speed / self.duration * BAND_TRAVEL
    }
}

impl Sweep for BandParams {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn color(&self) -> [u8; 3] {
        self.color
    }

    fn influence(&self, position: Vec3, elapsed: f32) -> f32 {
        let projected = (position - self.entry()).dot(self.direction);
        let distance = (projected - self.travel(elapsed)).abs();
        let half = self.half_width();
        if distance > half {
            return 0.0;
        }
        let relative = if half > 0.0 { distance / half } else { 0.0 };
        (1.0 - relative).powi(2) * self.amplitude
    }

    fn hold<R: Rng>(&self, _rng: &mut R) -> f32 {
        BAND_HOLD
    }

    fn emit<R: Rng>(&self, position: Vec3, rng: &mut R) -> Particle {
        Particle {
            position,
            velocity: self.direction * rng.gen_range(3.0..6.0) + jitter(rng, 1.5),
            life: rng.gen_range(0.4..1.0),
            size: rng.gen_range(2.0..5.0),
            color: self.color,
            alpha: rng.gen_range(0.7..1.0),
            gravity: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixParams {
    /// Explicit target nodes; a random subset is chosen when `None`.
    pub targets: Option<Vec<usize>>,
    pub duration: f32,
    pub color: [u8; 3],
    pub speed: f32,
    /// Clamped to `[0.1, 1.0]`.
    pub density: f32,
}

impl Default for MatrixParams {
    fn default() -> Self {
        Self {
            targets: None,
            duration: 4.0,
            color: [0, 255, 0],
            speed: 1.0,
            density: 0.8,
        }
    }
}

impl MatrixParams {
    /// Falling glyph streams fired when a memory is stored.
    pub fn save_memory() -> Self {
        Self {
            density: 2.8,
            ..Self::default()
        }
    }

    pub(crate) fn sanitized(mut self) -> Self {
        let fallback = Self::default();
        self.duration = finite_or(self.duration, fallback.duration);
        self.speed = finite_or(self.speed, fallback.speed);
        self.density = finite_or(self.density, fallback.density).clamp(0.1, 1.0);
        self
    }
}

/// Request to change the running effect.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectCommand {
    Wave(WaveParams),
    Ripple(RippleParams),
    Band(BandParams),
    Matrix(MatrixParams),
    Clear,
}

impl From<Trigger> for EffectCommand {
    fn from(trigger: Trigger) -> Self {
        match trigger {
            Trigger::Wake => EffectCommand::Ripple(RippleParams::wake()),
            Trigger::Think => EffectCommand::Band(BandParams::think()),
            Trigger::SaveMemory => EffectCommand::Matrix(MatrixParams::save_memory()),
        }
    }
}

/// A sweep in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRun<P> {
    pub params: P,
    pub elapsed: f32,
}

impl<P> SweepRun<P> {
    pub fn new(params: P) -> Self {
        Self {
            params,
            elapsed: 0.0,
        }
    }
}

/// The single running effect of a brain engine.
#[derive(Debug, Clone, Default)]
pub enum Effect {
    #[default]
    Idle,
    Wave(SweepRun<WaveParams>),
    Ripple(SweepRun<RippleParams>),
    Band(SweepRun<BandParams>),
    MatrixInsertion(MatrixRun),
}

impl Effect {
    pub fn is_active(&self) -> bool {
        !matches!(self, Effect::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Effect::Idle => "idle",
            Effect::Wave(_) => "wave",
            Effect::Ripple(_) => "ripple",
            Effect::Band(_) => "band",
            Effect::MatrixInsertion(_) => "matrix",
        }
    }

    pub fn elapsed(&self) -> Option<f32> {
        match self {
            Effect::Idle => None,
            Effect::Wave(run) => Some(run.elapsed),
            Effect::Ripple(run) => Some(run.elapsed),
            Effect::Band(run) => Some(run.elapsed),
            Effect::MatrixInsertion(run) => Some(run.elapsed()),
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn finite_vec(value: Vec3, fallback: Vec3) -> Vec3 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn unit_or_x(direction: Vec3) -> Vec3 {
    direction.try_normalize().unwrap_or(Vec3::X)
}

pub(crate) fn jitter<R: Rng>(rng: &mut R, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

#[cfg(test)]
mod effect_tests {
    use super::*;

    #[test]
    fn wave_only_touches_nodes_behind_the_front() {
        let wave = WaveParams {
            speed: 2.0,
            amplitude: 1.0,
            ..WaveParams::default()
        };
        // front at 4, tail at 1
        assert_eq!(wave.influence(Vec3::new(5.0, 0.0, 0.0), 2.0), 0.0);
        assert_eq!(wave.influence(Vec3::new(0.5, 0.0, 0.0), 2.0), 0.0);
        let mid = wave.influence(Vec3::new(2.5, 0.0, 0.0), 2.0);
        assert!((mid - 1.0).abs() < 1e-5);
        // perpendicular falloff: 1 - 0.4 * 2.5 = 0 -> excluded
        assert_eq!(wave.influence(Vec3::new(2.5, 2.5, 0.0), 2.0), 0.0);
    }

    #[test]
    fn ripple_shell_grows_and_caps() {
        let ripple = RippleParams {
            speed: 1.0,
            amplitude: 1.0,
            thickness: 1.0,
            ..RippleParams::default()
        };
        // radius 4 after 2 s, shell spans [3, 4]
        let peak = ripple.influence(Vec3::new(3.5, 0.0, 0.0), 2.0);
        assert!((peak - 1.0).abs() < 1e-5);
        assert_eq!(ripple.influence(Vec3::new(1.0, 0.0, 0.0), 2.0), 0.0);
        // radius capped at 15
        assert!(ripple.influence(Vec3::new(14.5, 0.0, 0.0), 100.0) > 0.9);
        assert_eq!(ripple.influence(Vec3::new(15.5, 0.0, 0.0), 100.0), 0.0);
    }

    #[test]
    fn band_enters_from_behind_origin() {
        let band = BandParams::think();
        assert_eq!(band.entry(), Vec3::new(0.0, -15.0, 0.0));
        // after 1 s the slab centre has travelled 4 / 5 * 20 = 16 units
        let centre = Vec3::new(0.0, 1.0, 0.0);
        assert!((band.influence(centre, 1.0) - 2.0).abs() < 1e-4);
        let edge = Vec3::new(0.0, 1.55, 0.0);
        assert!(band.influence(edge, 1.0) < 0.1);
        assert_eq!(band.influence(Vec3::new(0.0, 3.0, 0.0), 1.0), 0.0);
    }

    #[test]
    fn degenerate_direction_falls_back_to_x() {
        let wave = WaveParams {
            direction: Vec3::ZERO,
            ..WaveParams::default()
        }
        .sanitized();
        assert_eq!(wave.direction, Vec3::X);

        let band = BandParams {
            direction: Vec3::new(f32::NAN, 0.0, 0.0),
            speed: f32::INFINITY,
            ..BandParams::default()
        }
        .sanitized();
        assert_eq!(band.direction, Vec3::X);
        assert_eq!(band.speed, BandParams::default().speed);
    }

    #[test]
    fn matrix_density_is_clamped() {
        assert_eq!(MatrixParams::save_memory().sanitized().density, 1.0);
        let sparse = MatrixParams {
            density: 0.0,
            ..MatrixParams::default()
        };
        assert_eq!(sparse.sanitized().density, 0.1);
    }

    #[test]
    fn triggers_map_to_their_effects() {
        assert!(matches!(
            EffectCommand::from(Trigger::Wake),
            EffectCommand::Ripple(RippleParams { speed, .. }) if speed == 5.5
        ));
        assert!(matches!(EffectCommand::from(Trigger::Think), EffectCommand::Band(_)));
        assert!(matches!(
            EffectCommand::from(Trigger::SaveMemory),
            EffectCommand::Matrix(_)
        ));
    }
}
