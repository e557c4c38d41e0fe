use nalgebra::Point;
use rand::{Rng, RngCore};

use crate::domain::BoxDomain;
use crate::sampling::{PointSampler, SampleSet, WeightedPoint};

/// Draws independent uniform samples inside an axis-aligned box.
///
/// Each point is built from per-axis independent uniform draws and carries
/// the uniform density `1 / volume`. Every call produces a fresh draw from
/// the supplied generator; seed the generator for reproducible sequences.
#[derive(Debug, Clone, Copy)]
pub struct UniformSampler<const D: usize> {
    domain: BoxDomain<D>,
    number_of_points: usize,
}

impl<const D: usize> UniformSampler<D> {
    /// A request for zero points is legal and yields an empty set.
    pub fn new(domain: BoxDomain<D>, number_of_points: usize) -> Self {
        Self { domain, number_of_points }
    }
}

impl<const D: usize> PointSampler<Point<f64, D>> for UniformSampler<D> {
    fn sample(&self, rng: &mut dyn RngCore) -> SampleSet<Point<f64, D>> {
        let weight = 1.0 / self.domain.volume();
        let origin = self.domain.origin();
        let extent = self.domain.extent();
        (0..self.number_of_points)
            .map(|_| {
                let mut point = *origin;
                for d in 0..D {
                    point[d] += rng.random::<f64>() * extent[d];
                }
                WeightedPoint { point, weight }
            })
            .collect()
    }

    fn number_of_points(&self) -> usize {
        self.number_of_points
    }

    fn volume_of_sample_region(&self) -> f64 {
        self.domain.volume()
    }
}
