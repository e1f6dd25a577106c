use cgmath::Vector3;
use rayon::iter::{
    IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator,
};

use crate::constants::{JITTER_FREQUENCY, JITTER_PHASE_SPREAD, PARTICLES_PER_TASK, SMOOTHING};
use crate::sim::ControlSignals;

#[inline]
fn step_particle(
    current: &mut Vector3<f32>,
    target: &Vector3<f32>,
    seed: f32,
    controls: ControlSignals,
    phase: f32,
) {
    // Same scalar offset on every axis.
    let movement = (phase + seed * JITTER_PHASE_SPREAD).sin() * controls.chaos;
    let goal = *target * controls.expansion + Vector3::new(movement, movement, movement);
    *current += (goal - *current) * SMOOTHING;
}

/// Shared jitter phase at `elapsed` seconds, reduced to `[0, TAU)` in f64
/// before narrowing.
pub fn clock_phase(elapsed: f64) -> f32 {
    (elapsed * JITTER_FREQUENCY).rem_euclid(std::f64::consts::TAU) as f32
}

pub fn advance_single_threaded(
    current: &mut [Vector3<f32>],
    target: &[Vector3<f32>],
    seeds: &[f32],
    controls: ControlSignals,
    phase: f32,
) {
    debug_assert!(current.len() == target.len() && current.len() == seeds.len());
    for ((cur, tgt), seed) in current.iter_mut().zip(target.iter()).zip(seeds.iter()) {
        step_particle(cur, tgt, *seed, controls, phase);
    }
}

pub fn advance(
    current: &mut [Vector3<f32>],
    target: &[Vector3<f32>],
    seeds: &[f32],
    controls: ControlSignals,
    phase: f32,
) {
    debug_assert!(current.len() == target.len() && current.len() == seeds.len());
    current
        .par_iter_mut()
        .zip(target.par_iter())
        .zip(seeds.par_iter())
        .with_min_len(PARTICLES_PER_TASK)
        .for_each(|((cur, tgt), seed)| step_particle(cur, tgt, *seed, controls, phase));
}
