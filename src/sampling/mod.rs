//! # Point sampling
//!
//! Weighted point sets approximating a probability measure over a continuous
//! domain. Each sampler variant is a standalone struct behind the
//! [`PointSampler`] trait; randomness is always an explicit caller-supplied
//! generator so that runs are reproducible when seeded and independent
//! otherwise. Deterministic variants simply ignore the generator.

use rand::RngCore;

mod correspondence;
mod grid;
mod mesh;
mod uniform;

pub use correspondence::CorrespondenceSampler;
pub use grid::GridSampler;
pub use mesh::{RandomMeshSampler, UniformMeshSampler};
pub use uniform::UniformSampler;

/// A sampled point together with the probability density assigned to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint<P> {
    pub point: P,
    pub weight: f64,
}

/// Ordered sequence of weighted points produced by one sampler invocation.
pub type SampleSet<P> = Vec<WeightedPoint<P>>;

/// A finite approximation of a probability measure over a continuous region.
///
/// Implementors report the measure of the region they cover and produce, per
/// call, a fresh [`SampleSet`]. Stochastic samplers draw from the supplied
/// generator; seeding that generator makes the point sequence reproducible.
pub trait PointSampler<P> {
    /// Draws a fresh sample set. Stochastic samplers consume `rng`.
    fn sample(&self, rng: &mut dyn RngCore) -> SampleSet<P>;

    /// Number of points a call to [`sample`](Self::sample) returns.
    ///
    /// For filtering samplers this is an output of construction, not a
    /// requested count; it may legitimately be zero.
    fn number_of_points(&self) -> usize;

    /// Measure (volume or area) of the region the points are drawn from.
    fn volume_of_sample_region(&self) -> f64;
}
