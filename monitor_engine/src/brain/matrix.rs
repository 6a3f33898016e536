//! Falling glyph streams that "insert data" into selected nodes.

use glam::Vec3;
use rand::seq::index;
use rand::Rng;

use super::effect::{jitter, MatrixParams};
use super::particle::{Particle, ParticlePool, REFERENCE_TICK};
use super::topology::{BrainTopology, BRAIN_RADIUS};

const MIN_TARGETS: usize = 3;
const MAX_TARGETS: usize = 20;
const MAX_STREAMS_PER_TARGET: usize = 2;
const VISIBLE_GLYPHS: usize = 10;
const MUTATION_CHANCE: f64 = 0.03;
const BINARY_CHANCE: f64 = 0.8;
const BINARY: [char; 2] = ['0', '1'];
const MIXED: [char; 4] = ['0', '1', '丂', '乃'];
const RING_DECAY: f32 = 0.9;
const RING_CUTOFF: f32 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixStream {
    pub start: Vec3,
    pub target: usize,
    pub target_position: Vec3,
    pub glyphs: Vec<char>,
    /// Seconds before the stream starts moving.
    pub delay: f32,
    pub progress: f32,
    pub speed_factor: f32,
    /// Seconds the target keeps its highlight after arrival.
    pub lifetime: f32,
    /// Glyphs currently visible along the path with their positions.
    pub revealed: Vec<(char, Vec3)>,
    pub active: bool,
}

/// Highlight left on a node a stream arrived at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightRing {
    pub node: usize,
    pub strength: f32,
    pub deadline: f32,
    pub glyph: char,
}

/// A node a stream reached this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub node: usize,
    pub hold: f32,
}

#[derive(Debug, Clone)]
pub struct MatrixRun {
    params: MatrixParams,
    elapsed: f32,
    streams: Vec<MatrixStream>,
    rings: Vec<HighlightRing>,
}

/// Number of targets picked for a topology of `node_count` nodes.
pub fn target_budget(node_count: usize) -> usize {
    (node_count / 10).min(MAX_TARGETS).max(MIN_TARGETS).min(node_count)
}

impl MatrixRun {
    pub fn new<R: Rng>(params: MatrixParams, topology: &BrainTopology, rng: &mut R) -> Self {
        let budget = target_budget(topology.len());
        let targets: Vec<usize> = match &params.targets {
            Some(requested) => requested
                .iter()
                .copied()
                .filter(|node| *node < topology.len())
                .take(budget)
                .collect(),
            None => index::sample(rng, topology.len(), budget).into_vec(),
        };

        let per_target = ((MAX_STREAMS_PER_TARGET as f32 * params.density) as usize)
            .clamp(1, MAX_STREAMS_PER_TARGET);
        let entry = Vec3::new(0.0, BRAIN_RADIUS * 1.5, 0.0);
        let mut streams = Vec::with_capacity(targets.len() * per_target);
        for target in targets {
            for _ in 0..per_target {
                streams.push(MatrixStream {
                    start: entry
                        + Vec3::new(
                            rng.gen_range(-1.0..1.0),
                            rng.gen_range(-0.5..0.5),
                            rng.gen_range(-1.0..1.0),
                        ),
                    target,
                    target_position: topology.nodes()[target],
                    glyphs: (0..rng.gen_range(10..=20)).map(|_| random_glyph(rng)).collect(),
                    delay: rng.gen_range(0.0..1.0),
                    progress: 0.0,
                    speed_factor: rng.gen_range(0.8..1.2),
                    lifetime: rng.gen_range(1.0..2.0),
                    revealed: Vec::new(),
                    active: true,
                });
            }
        }

        Self {
            params,
            elapsed: 0.0,
            streams,
            rings: Vec::new(),
        }
    }

    pub fn params(&self) -> &MatrixParams {
        &self.params
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn streams(&self) -> &[MatrixStream] {
        &self.streams
    }

    pub fn rings(&self) -> &[HighlightRing] {
        &self.rings
    }

    /// Advance every stream. Returns `None` once the run is over, otherwise
    /// the nodes reached during this step.
    pub fn advance<R: Rng>(
        &mut self,
        dt: f32,
        rng: &mut R,
        particles: &mut ParticlePool,
    ) -> Option<Vec<Arrival>> {
        self.elapsed += dt;
        if self.elapsed >= self.params.duration {
            self.streams.clear();
            self.rings.clear();
            return None;
        }

        let mut arrivals = Vec::new();
        for stream in self.streams.iter_mut().filter(|stream| stream.active) {
            if stream.delay > 0.0 {
                stream.delay -= dt;
                continue;
            }
            stream.progress += dt * self.params.speed * stream.speed_factor;
            let t = stream.progress.min(1.0);
            if t >= 1.0 {
                stream.active = false;
                stream.revealed.clear();
                arrivals.push(Arrival {
                    node: stream.target,
                    hold: stream.lifetime,
                });
                let glyph = stream.glyphs[rng.gen_range(0..stream.glyphs.len())];
                self.rings.retain(|ring| ring.node != stream.target);
                self.rings.push(HighlightRing {
                    node: stream.target,
                    strength: 1.0,
                    deadline: self.elapsed + stream.lifetime,
                    glyph,
                });
                for _ in 0..rng.gen_range(3..=8) {
                    particles.spawn(Particle {
                        position: stream.target_position,
                        velocity: jitter(rng, 3.0),
                        life: rng.gen_range(0.3..0.6),
                        size: rng.gen_range(1.0..2.0),
                        color: self.params.color,
                        alpha: rng.gen_range(0.7..0.9),
                        gravity: false,
                    });
                }
                continue;
            }
            if t <= 0.0 {
                continue;
            }
            reveal(stream, t, rng);
        }

        let decay = RING_DECAY.powf(dt / REFERENCE_TICK);
        let elapsed = self.elapsed;
        for ring in self.rings.iter_mut().filter(|ring| elapsed > ring.deadline) {
            ring.strength *= decay;
        }
        self.rings.retain(|ring| ring.strength > RING_CUTOFF);

        Some(arrivals)
    }
}

fn reveal<R: Rng>(stream: &mut MatrixStream, t: f32, rng: &mut R) {
    stream.revealed.clear();
    let glyph_count = stream.glyphs.len();
    let spacing = 1.0 / (glyph_count as f32 + 1.0);
    for slot in 0..glyph_count.min(VISIBLE_GLYPHS) {
        let along = t - slot as f32 * spacing;
        if !(0.0..=1.0).contains(&along) {
            continue;
        }
        let position = stream.start.lerp(stream.target_position, along);
        stream.revealed.push((stream.glyphs[slot], position));
        if rng.gen_bool(MUTATION_CHANCE) {
            stream.glyphs[slot] = random_glyph(rng);
        }
    }
}

fn random_glyph<R: Rng>(rng: &mut R) -> char {
    if rng.gen_bool(BINARY_CHANCE) {
        BINARY[rng.gen_range(0..BINARY.len())]
    } else {
        MIXED[rng.gen_range(0..MIXED.len())]
    }
}

#[cfg(test)]
mod matrix_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn topology(nodes: usize) -> BrainTopology {
        BrainTopology::generate(nodes, &mut StdRng::seed_from_u64(5))
    }

    #[test]
    fn target_budget_is_bounded() {
        assert_eq!(target_budget(300), 20);
        assert_eq!(target_budget(120), 12);
        assert_eq!(target_budget(12), 3);
        assert_eq!(target_budget(2), 2);
        assert_eq!(target_budget(0), 0);
    }

    #[test]
    fn density_controls_streams_per_target() {
        let topology = topology(100);
        let mut rng = StdRng::seed_from_u64(9);
        let dense = MatrixRun::new(MatrixParams::save_memory().sanitized(), &topology, &mut rng);
        assert_eq!(dense.streams().len(), 10 * 2);
        let sparse = MatrixParams {
            density: 0.3,
            ..MatrixParams::default()
        };
        let sparse = MatrixRun::new(sparse.sanitized(), &topology, &mut rng);
        assert_eq!(sparse.streams().len(), 10);
        for stream in sparse.streams() {
            assert!((10..=20).contains(&stream.glyphs.len()));
            assert!(stream.start.y >= 8.5 && stream.start.y <= 9.5);
        }
    }

    #[test]
    fn caller_targets_are_filtered_and_capped() {
        let topology = topology(50);
        let params = MatrixParams {
            targets: Some(vec![1, 999, 2, 3, 4, 5]),
            density: 0.1,
            ..MatrixParams::default()
        };
        let run = MatrixRun::new(params, &topology, &mut StdRng::seed_from_u64(1));
        let targets: Vec<usize> = run.streams().iter().map(|stream| stream.target).collect();
        assert_eq!(targets, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn streams_arrive_and_leave_highlights() {
        let topology = topology(60);
        let mut rng = StdRng::seed_from_u64(2);
        let mut particles = ParticlePool::new(500);
        let mut run = MatrixRun::new(MatrixParams::default(), &topology, &mut rng);
        let stream_count = run.streams().len();

        let mut arrived = 0;
        for _ in 0..180 {
            match run.advance(1.0 / 60.0, &mut rng, &mut particles) {
                Some(arrivals) => arrived += arrivals.len(),
                None => break,
            }
            if arrived == stream_count {
                break;
            }
        }
        // longest path: 1 s delay + 1 / 0.8 s travel
        assert_eq!(arrived, stream_count);
        assert!(run.streams().iter().all(|stream| !stream.active));
        assert!(!run.rings().is_empty());
        assert!(particles.len() >= 3);
    }

    #[test]
    fn run_ends_after_duration() {
        let topology = topology(40);
        let mut rng = StdRng::seed_from_u64(4);
        let mut particles = ParticlePool::new(10);
        let params = MatrixParams {
            duration: 0.5,
            ..MatrixParams::default()
        };
        let mut run = MatrixRun::new(params, &topology, &mut rng);
        assert!(run.advance(0.3, &mut rng, &mut particles).is_some());
        assert!(run.advance(0.3, &mut rng, &mut particles).is_none());
        assert!(run.streams().is_empty());
    }

    #[test]
    fn revealed_glyphs_sit_on_the_path() {
        let topology = topology(30);
        let mut rng = StdRng::seed_from_u64(8);
        let mut particles = ParticlePool::new(10);
        let mut run = MatrixRun::new(MatrixParams::default(), &topology, &mut rng);
        for _ in 0..80 {
            if run.advance(1.0 / 60.0, &mut rng, &mut particles).is_none() {
                break;
            }
        }
        for stream in run.streams().iter().filter(|stream| stream.active) {
            assert!(stream.revealed.len() <= VISIBLE_GLYPHS);
            let path = stream.target_position - stream.start;
            for (_, position) in &stream.revealed {
                let offset = *position - stream.start;
                let along = offset.dot(path) / path.length_squared();
                assert!((offset - path * along).length() < 1e-3);
            }
        }
    }
}
