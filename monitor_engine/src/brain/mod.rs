//! Particle/effect simulation over a frozen 3D node graph.
//!
//! The engine is owned by the render thread. Other threads reach it through
//! an [`EffectQueue`]; queued commands are applied at the start of the next
//! [`BrainEngine::tick`], so node and particle state never changes mid-tick.

pub mod effect;
pub mod matrix;
pub mod particle;
pub mod render;
pub mod topology;

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use effect::{
    BandParams, Effect, EffectCommand, MatrixParams, RippleParams, Sweep, SweepRun, WaveParams,
};
pub use matrix::{HighlightRing, MatrixRun, MatrixStream};
pub use particle::{Particle, ParticlePool, REFERENCE_TICK};
pub use render::{render_brain, OrbitCamera};
pub use topology::BrainTopology;

/// Upper bound on a single simulation step, in seconds.
pub const MAX_STEP: f32 = 0.1;
/// Stimulus multiplier per reference tick once a node's hold has expired.
const NODE_DECAY: f32 = 0.95;
const EMIT_THRESHOLD: f32 = 0.5;
const EMIT_CHANCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrainConfig {
    pub node_count: usize,
    pub max_particles: usize,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            node_count: 300,
            max_particles: 800,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeState {
    pub stimulus: f32,
    /// Engine time after which the stimulus starts to decay.
    pub deadline: f32,
}

impl NodeState {
    fn pulse(&mut self, strength: f32, deadline: f32) {
        if strength > self.stimulus {
            self.stimulus = strength;
            self.deadline = deadline;
        }
    }
}

/// Cloneable, `Send` handle for queueing effect commands from other threads.
#[derive(Debug, Clone)]
pub struct EffectQueue {
    sender: Sender<EffectCommand>,
}

impl EffectQueue {
    /// Returns `false` once the engine has been dropped.
    pub fn send(&self, command: EffectCommand) -> bool {
        self.sender.send(command).is_ok()
    }
}

pub struct BrainEngine {
    topology: BrainTopology,
    nodes: Vec<NodeState>,
    particles: ParticlePool,
    effect: Effect,
    effect_color: [u8; 3],
    camera: OrbitCamera,
    now: f32,
    rng: StdRng,
    commands: Receiver<EffectCommand>,
    sender: Sender<EffectCommand>,
}

impl BrainEngine {
    pub fn new(config: BrainConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic engine for tests and headless runs.
    pub fn with_seed(config: BrainConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: BrainConfig, mut rng: StdRng) -> Self {
        let topology = BrainTopology::generate(config.node_count, &mut rng);
        log::debug!(
            "brain topology: {} nodes, {} edges",
            topology.len(),
            topology.edges().len()
        );
        let (sender, commands) = mpsc::channel();
        Self {
            nodes: vec![NodeState::default(); topology.len()],
            topology,
            particles: ParticlePool::new(config.max_particles),
            effect: Effect::Idle,
            effect_color: [255, 255, 255],
            camera: OrbitCamera::default(),
            now: 0.0,
            rng,
            commands,
            sender,
        }
    }

    pub fn queue(&self) -> EffectQueue {
        EffectQueue {
            sender: self.sender.clone(),
        }
    }

    pub fn add_wave(&mut self, params: WaveParams) {
        let params = params.sanitized();
        self.effect_color = params.color;
        self.start_effect(Effect::Wave(SweepRun::new(params)));
    }

    pub fn add_ripple(&mut self, params: RippleParams) {
        let params = params.sanitized();
        self.effect_color = params.color;
        self.start_effect(Effect::Ripple(SweepRun::new(params)));
    }

    pub fn add_band(&mut self, params: BandParams) {
        let params = params.sanitized();
        self.effect_color = params.color;
        self.start_effect(Effect::Band(SweepRun::new(params)));
    }

    pub fn add_matrix_insertion(&mut self, params: MatrixParams) {
        let params = params.sanitized();
        self.effect_color = params.color;
        let run = MatrixRun::new(params, &self.topology, &mut self.rng);
        self.start_effect(Effect::MatrixInsertion(run));
    }

    /// Stop the running effect and drop all stimulus and particles.
    pub fn clear(&mut self) {
        self.start_effect(Effect::Idle);
    }

    pub fn apply(&mut self, command: EffectCommand) {
        log::debug!("brain effect command: {command:?}");
        match command {
            EffectCommand::Wave(params) => self.add_wave(params),
            EffectCommand::Ripple(params) => self.add_ripple(params),
            EffectCommand::Band(params) => self.add_band(params),
            EffectCommand::Matrix(params) => self.add_matrix_insertion(params),
            EffectCommand::Clear => self.clear(),
        }
    }

    /// Apply queued commands in arrival order. The last one wins.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.commands.try_recv() {
                Ok(command) => {
                    self.apply(command);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    fn start_effect(&mut self, effect: Effect) {
        for node in &mut self.nodes {
            *node = NodeState::default();
        }
        self.particles.clear();
        self.effect = effect;
    }

    /// Advance the simulation by `dt` seconds (clamped to [`MAX_STEP`]).
    pub fn tick(&mut self, dt: f32) {
        self.apply_pending();
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_STEP) } else { 0.0 };
        self.now += dt;

        self.update_effect(dt);
        self.particles.update(dt);

        let decay = NODE_DECAY.powf(dt / REFERENCE_TICK);
        let now = self.now;
        for node in self.nodes.iter_mut().filter(|node| now > node.deadline) {
            node.stimulus *= decay;
        }

        self.camera.advance(dt);
    }

    fn update_effect(&mut self, dt: f32) {
        let Self {
            topology,
            nodes,
            particles,
            effect,
            now,
            rng,
            ..
        } = self;
        let still_running = match effect {
            Effect::Idle => return,
            Effect::Wave(run) => advance_sweep(run, dt, *now, topology, nodes, particles, rng),
            Effect::Ripple(run) => advance_sweep(run, dt, *now, topology, nodes, particles, rng),
            Effect::Band(run) => advance_sweep(run, dt, *now, topology, nodes, particles, rng),
            Effect::MatrixInsertion(run) => match run.advance(dt, rng, particles) {
                Some(arrivals) => {
                    for arrival in arrivals {
                        nodes[arrival.node].pulse(1.0, *now + arrival.hold);
                    }
                    true
                }
                None => false,
            },
        };
        if !still_running {
            log::debug!("brain effect {} finished", effect.name());
            *effect = Effect::Idle;
        }
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// Colour of the most recently started effect; nodes keep glowing in it
    /// while they decay.
    pub fn effect_color(&self) -> [u8; 3] {
        self.effect_color
    }

    pub fn topology(&self) -> &BrainTopology {
        &self.topology
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    pub fn stimulus(&self, node: usize) -> f32 {
        self.nodes.get(node).map_or(0.0, |state| state.stimulus)
    }

    pub fn max_stimulus(&self) -> f32 {
        self.nodes
            .iter()
            .map(|state| state.stimulus)
            .fold(0.0, f32::max)
    }

    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Seconds simulated since construction.
    pub fn now(&self) -> f32 {
        self.now
    }
}

fn advance_sweep<S: Sweep, R: Rng>(
    run: &mut SweepRun<S>,
    dt: f32,
    now: f32,
    topology: &BrainTopology,
    nodes: &mut [NodeState],
    particles: &mut ParticlePool,
    rng: &mut R,
) -> bool {
    run.elapsed += dt;
    if run.elapsed >= run.params.duration() {
        return false;
    }
    for (node, position) in nodes.iter_mut().zip(topology.nodes()) {
        let influence = run.params.influence(*position, run.elapsed);
        if influence <= 0.0 {
            continue;
        }
        if influence > EMIT_THRESHOLD && rng.gen_bool(EMIT_CHANCE) {
            particles.spawn(run.params.emit(*position, rng));
        }
        let hold = run.params.hold(rng);
        node.pulse(influence, now + hold);
    }
    true
}

#[cfg(test)]
mod brain_engine_tests {
    use super::*;
    use glam::Vec3;

    fn engine() -> BrainEngine {
        BrainEngine::with_seed(BrainConfig::default(), 42)
    }

    fn run(engine: &mut BrainEngine, seconds: f32) {
        let steps = (seconds * 60.0).round() as usize;
        for _ in 0..steps {
            engine.tick(1.0 / 60.0);
        }
    }

    #[test]
    fn ripple_stimulates_then_fades_out() {
        let mut engine = engine();
        engine.add_ripple(RippleParams {
            speed: 5.0,
            duration: 3.0,
            amplitude: 0.6,
            ..RippleParams::default()
        });
        run(&mut engine, 0.5);
        assert!(engine.is_active());
        assert!(engine.max_stimulus() > 0.1);

        run(&mut engine, 2.6);
        assert!(!engine.is_active());
        assert!(engine.max_stimulus() < 0.05);
    }

    #[test]
    fn new_trigger_resets_previous_state() {
        let mut engine = engine();
        engine.add_band(BandParams::think());
        run(&mut engine, 1.0);
        assert!(engine.max_stimulus() > 0.0);

        engine.add_wave(WaveParams::default());
        assert!(matches!(engine.effect(), Effect::Wave(_)));
        assert_eq!(engine.max_stimulus(), 0.0);
        assert_eq!(engine.particle_count(), 0);
    }

    #[test]
    fn effect_goes_idle_at_duration() {
        let mut engine = engine();
        engine.add_wave(WaveParams {
            duration: 0.5,
            ..WaveParams::default()
        });
        for _ in 0..6 {
            engine.tick(0.1);
        }
        assert!(!engine.is_active());
        assert!(engine.effect().elapsed().is_none());
    }

    #[test]
    fn particles_never_exceed_cap() {
        let mut engine = BrainEngine::with_seed(
            BrainConfig {
                node_count: 300,
                max_particles: 25,
            },
            3,
        );
        for round in 0..6 {
            if round % 2 == 0 {
                engine.add_band(BandParams {
                    amplitude: 5.0,
                    band_width: 3.0,
                    ..BandParams::think()
                });
            } else {
                engine.add_matrix_insertion(MatrixParams::save_memory());
            }
            for _ in 0..90 {
                engine.tick(1.0 / 60.0);
                assert!(engine.particle_count() <= 25);
            }
        }
    }

    #[test]
    fn queued_commands_apply_on_next_tick() {
        let mut engine = engine();
        let queue = engine.queue();
        let sender = std::thread::spawn(move || queue.send(EffectCommand::Ripple(RippleParams::wake())));
        assert!(sender.join().expect("sender thread"));
        assert!(!engine.is_active());
        engine.tick(1.0 / 60.0);
        assert!(matches!(engine.effect(), Effect::Ripple(_)));
        assert_eq!(engine.effect_color(), [82, 255, 139]);
    }

    #[test]
    fn matrix_insertion_lights_targets() {
        let mut engine = engine();
        engine.add_matrix_insertion(MatrixParams {
            targets: Some(vec![0, 1, 2]),
            ..MatrixParams::default()
        });
        run(&mut engine, 2.5);
        let lit = (0..3).filter(|node| engine.stimulus(*node) > 0.0).count();
        assert_eq!(lit, 3);
    }

    #[test]
    fn degenerate_parameters_do_not_poison_state() {
        let mut engine = engine();
        engine.add_wave(WaveParams {
            direction: Vec3::ZERO,
            speed: f32::NAN,
            ..WaveParams::default()
        });
        run(&mut engine, 1.0);
        assert!(engine.nodes().iter().all(|node| node.stimulus.is_finite()));
        engine.tick(f32::INFINITY);
        assert!(engine.now().is_finite());
    }

    #[test]
    fn large_steps_are_clamped() {
        let mut engine = engine();
        engine.tick(5.0);
        assert!((engine.now() - MAX_STEP).abs() < 1e-6);
    }
}
