use std::collections::VecDeque;

use glam::Vec3;

/// Downward acceleration applied to particles with gravity, units/s².
pub const GRAVITY: f32 = 1.5;
/// Per-reference-tick alpha multiplier.
const ALPHA_FADE: f32 = 0.95;
/// Tick length the fade and decay factors are expressed in.
pub const REFERENCE_TICK: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    /// Units per second.
    pub velocity: Vec3,
    /// Seconds left before removal.
    pub life: f32,
    pub size: f32,
    pub color: [u8; 3],
    pub alpha: f32,
    pub gravity: bool,
}

impl Particle {
    fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        if self.gravity {
            self.velocity.y -= GRAVITY * dt;
        }
        self.life -= dt;
        self.alpha *= ALPHA_FADE.powf(dt / REFERENCE_TICK);
    }
}

/// Bounded particle population. Spawning at capacity evicts the oldest.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: VecDeque<Particle>,
    capacity: usize,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn spawn(&mut self, particle: Particle) {
        if self.capacity == 0 {
            return;
        }
        while self.particles.len() >= self.capacity {
            self.particles.pop_front();
        }
        self.particles.push_back(particle);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn update(&mut self, dt: f32) {
        for particle in self.particles.iter_mut() {
            particle.advance(dt);
        }
        self.particles.retain(|particle| particle.life > 0.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }
}

#[cfg(test)]
mod particle_pool_tests {
    use super::*;

    fn particle(life: f32) -> Particle {
        Particle {
            position: Vec3::ZERO,
            velocity: Vec3::new(1.0, 0.0, 0.0),
            life,
            size: 2.0,
            color: [255, 255, 255],
            alpha: 1.0,
            gravity: true,
        }
    }

    #[test]
    fn spawning_past_capacity_drops_oldest() {
        let mut pool = ParticlePool::new(3);
        for index in 0..5 {
            pool.spawn(particle(index as f32 + 1.0));
        }
        assert_eq!(pool.len(), 3);
        let lives: Vec<f32> = pool.iter().map(|p| p.life).collect();
        assert_eq!(lives, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn update_moves_fades_and_expires() {
        let mut pool = ParticlePool::new(4);
        pool.spawn(particle(0.5));
        pool.spawn(particle(0.05));
        pool.update(0.1);
        assert_eq!(pool.len(), 1);
        let survivor = pool.iter().next().expect("survivor");
        assert!((survivor.position.x - 0.1).abs() < 1e-6);
        assert!(survivor.velocity.y < 0.0);
        assert!(survivor.alpha < 1.0);
    }

    #[test]
    fn zero_capacity_pool_stays_empty() {
        let mut pool = ParticlePool::new(0);
        pool.spawn(particle(1.0));
        assert!(pool.is_empty());
    }
}
