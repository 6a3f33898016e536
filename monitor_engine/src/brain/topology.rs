use std::collections::BTreeSet;
use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

/// Semi-axis of the ellipsoidal shell the nodes are scattered on.
pub const BRAIN_RADIUS: f32 = 6.0;
const SHELL_MIN: f32 = 0.8;
const SHELL_MAX: f32 = 1.0;
const JITTER: f32 = 0.5;
/// Push applied along X to open a gap between the hemispheres.
const HEMISPHERE_GAP: f32 = 0.5;
const ALWAYS_LINKED: usize = 3;
const OPTIONAL_LINK_CHANCE: f64 = 0.3;
const LONG_RANGE_CHANCE: f64 = 0.1;

/// Frozen node positions and undirected edges.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainTopology {
    nodes: Vec<Vec3>,
    edges: Vec<(usize, usize)>,
}

impl BrainTopology {
    pub fn generate<R: Rng>(node_count: usize, rng: &mut R) -> Self {
        let nodes: Vec<Vec3> = (0..node_count).map(|_| shell_point(rng)).collect();
        let mut edges = BTreeSet::new();

        for (index, position) in nodes.iter().enumerate() {
            let mut ranking: Vec<(usize, f32)> = nodes
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(other, candidate)| (other, position.distance_squared(*candidate)))
                .collect();
            ranking.sort_by(|a, b| a.1.total_cmp(&b.1));

            for (rank, (other, _)) in ranking.iter().take(ALWAYS_LINKED + 1).enumerate() {
                if rank < ALWAYS_LINKED || rng.gen_bool(OPTIONAL_LINK_CHANCE) {
                    edges.insert(ordered(index, *other));
                }
            }

            let far_start = ranking.len() / 2;
            if far_start < ranking.len() && rng.gen_bool(LONG_RANGE_CHANCE) {
                let pick = rng.gen_range(far_start..ranking.len());
                edges.insert(ordered(index, ranking[pick].0));
            }
        }

        Self {
            nodes,
            edges: edges.into_iter().collect(),
        }
    }

    pub fn nodes(&self) -> &[Vec3] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn shell_point<R: Rng>(rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let phi = rng.gen_range(-1.0f32..=1.0).acos();
    let radius = rng.gen_range(SHELL_MIN..=SHELL_MAX) * BRAIN_RADIUS;
    let mut point = Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
    );
    point += Vec3::new(
        rng.gen_range(-JITTER..=JITTER),
        rng.gen_range(-JITTER..=JITTER),
        rng.gen_range(-JITTER..=JITTER),
    );
    point.x += if point.x >= 0.0 {
        HEMISPHERE_GAP
    } else {
        -HEMISPHERE_GAP
    };
    point
}
