use cgmath::{Vector3, Zero};
use rand::Rng;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    constants::{
        AMBIENT_CHAOS, BASE_SPIN, PARALLEL_CUTOFF, PARTICLES_PER_TASK, SPAWN_EXTENT,
        SPIN_TENSION_THRESHOLD, TENSE_SPIN, TENSION_CHAOS,
    },
    gesture::GestureState,
};

mod step;

/// Current, target and jitter state for every particle. The three buffers are
/// only ever allocated together, so their lengths always agree.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    current: Vec<Vector3<f32>>,
    target: Vec<Vector3<f32>>,
    jitter_seed: Vec<f32>,
}

impl ParticleSet {
    /// Build a set tracking a flat `[x, y, z, ...]` buffer. A trailing partial
    /// triple is ignored.
    pub fn new(points: &[f32]) -> Self {
        Self::with_rng(points, &mut rand::rng())
    }

    pub fn with_rng<R: Rng>(points: &[f32], rng: &mut R) -> Self {
        let target: Vec<Vector3<f32>> = points
            .chunks_exact(3)
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();
        let current = (0..target.len())
            .map(|_| {
                Vector3::new(
                    rng.random_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                    rng.random_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                    rng.random_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                )
            })
            .collect();
        let jitter_seed = (0..target.len()).map(|_| rng.random::<f32>()).collect();

        Self {
            current,
            target,
            jitter_seed,
        }
    }

    /// Assemble a set from explicit buffers.
    ///
    /// # Panics
    ///
    /// If the buffers differ in length.
    pub fn from_parts(
        current: Vec<Vector3<f32>>,
        target: Vec<Vector3<f32>>,
        jitter_seed: Vec<f32>,
    ) -> Self {
        assert_eq!(current.len(), target.len());
        assert_eq!(current.len(), jitter_seed.len());
        Self {
            current,
            target,
            jitter_seed,
        }
    }

    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn current(&self) -> &[Vector3<f32>] {
        &self.current
    }

    pub fn target(&self) -> &[Vector3<f32>] {
        &self.target
    }

    pub fn jitter_seed(&self) -> &[f32] {
        &self.jitter_seed
    }

    /// Center of the current positions.
    pub fn centroid(&self) -> Vector3<f32> {
        if self.current.is_empty() {
            return Vector3::zero();
        }
        self.current.iter().fold(Vector3::zero(), |acc, p| acc + *p) / self.current.len() as f32
    }
}

/// Per-tick scalars derived from the gesture snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSignals {
    /// Uniform scale applied to the target shape.
    pub expansion: f32,
    /// Amplitude of the oscillation added to every axis.
    pub chaos: f32,
}

impl From<&GestureState> for ControlSignals {
    fn from(gesture: &GestureState) -> Self {
        if gesture.is_present {
            Self {
                expansion: gesture.separation,
                chaos: gesture.tension * TENSION_CHAOS,
            }
        } else {
            Self {
                expansion: 1.0,
                chaos: AMBIENT_CHAOS,
            }
        }
    }
}

/// Rotation added per tick. Reads tension regardless of presence, so the last
/// tense reading keeps the cloud spinning after the hands leave the frame.
pub fn spin_for(gesture: &GestureState) -> f32 {
    if gesture.tension > SPIN_TENSION_THRESHOLD {
        BASE_SPIN + TENSE_SPIN
    } else {
        BASE_SPIN
    }
}

fn compute_target_threads(n_particles: usize) -> usize {
    n_particles
        .div_ceil(PARTICLES_PER_TASK)
        .clamp(1, rayon::current_num_threads().max(1))
}

fn build_pool(n_particles: usize) -> Option<ThreadPool> {
    if n_particles < PARALLEL_CUTOFF {
        return None;
    }
    let threads = compute_target_threads(n_particles);
    match ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!("Could not build simulation pool, running single threaded: {e}");
            None
        }
    }
}

/// The particle set plus the global transform it is drawn with.
pub struct Simulation {
    particles: ParticleSet,
    rotation_y: f32,
    ticks: u64,
    pool: Option<ThreadPool>,
}

impl Simulation {
    pub fn new(particles: ParticleSet) -> Self {
        let pool = build_pool(particles.len());
        Self {
            particles,
            rotation_y: 0.0,
            ticks: 0,
            pool,
        }
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    /// Swap in a whole new particle set. Rotation carries over.
    pub fn replace_particles(&mut self, particles: ParticleSet) {
        if particles.len() != self.particles.len() {
            self.pool = build_pool(particles.len());
        }
        self.particles = particles;
    }

    /// Rebuild the particle set around a new target buffer.
    pub fn load_target(&mut self, points: &[f32]) {
        self.replace_particles(ParticleSet::new(points));
    }

    /// Accumulated rotation about the y axis, in radians.
    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Advance every particle one step toward its (scaled, jittered) target.
    pub fn tick(&mut self, gesture: &GestureState, elapsed_seconds: f64) {
        let controls = ControlSignals::from(gesture);
        let phase = step::clock_phase(elapsed_seconds);
        let ParticleSet {
            current,
            target,
            jitter_seed,
        } = &mut self.particles;

        match &self.pool {
            Some(pool) => pool.install(|| {
                step::advance(current, target, jitter_seed, controls, phase)
            }),
            None => step::advance_single_threaded(
                current,
                target,
                jitter_seed,
                controls,
                phase,
            ),
        }

        self.rotation_y = (self.rotation_y + spin_for(gesture)) % std::f32::consts::TAU;
        self.ticks += 1;
    }
}
