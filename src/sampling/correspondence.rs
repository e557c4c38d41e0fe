use anyhow::{anyhow, Context};
use nalgebra::Point3;
use rand::RngCore;
use rayon::prelude::*;

use crate::domain::{DeformationModel, SurfaceMesh};
use crate::sampling::{PointSampler, SampleSet, WeightedPoint};

/// Importance sampler keeping only reference points with a plausible
/// correspondence on a target surface.
///
/// For every vertex `p` of the reference mesh the sampler deforms `p` by the
/// mean of the deformation model, queries the closest point on the target
/// mesh and computes the whitened (Mahalanobis) distance of the residual
/// under the model's local covariance at `p`. Points whose distance stays
/// below `threshold` survive; all survivors carry uniform weight 1.
///
/// The survivor set is computed eagerly at construction, so
/// [`number_of_points`](PointSampler::number_of_points) is an output rather
/// than an input and `sample()` is deterministic. An empty survivor set is a
/// legitimate result, not an error. Closest-point queries fan out across
/// worker threads; results are gathered in vertex-index order.
pub struct CorrespondenceSampler {
    samples: SampleSet<Point3<f64>>,
    area: f64,
}

impl CorrespondenceSampler {
    /// # Errors
    /// Fails when the reference mesh has zero area or the model's local
    /// covariance at some vertex is not positive definite (the whitened
    /// distance is undefined there).
    pub fn new<R, T>(
        reference: &R,
        target: &T,
        model: &dyn DeformationModel,
        threshold: f64,
    ) -> anyhow::Result<Self>
    where
        R: SurfaceMesh + ?Sized,
        T: SurfaceMesh + ?Sized,
    {
        let area = reference.area();
        if !(area.is_finite() && area > 0.0) {
            anyhow::bail!(
                "reference mesh surface area must be strictly positive and finite, got {}",
                area
            );
        }

        let survivors: Vec<Option<Point3<f64>>> = (0..reference.number_of_vertices())
            .into_par_iter()
            .map(|index| {
                let point = reference.vertex(index);
                let deformed = point + model.mean(&point);
                let closest = target.closest_point(&deformed);
                let residual = closest - deformed;

                let cholesky = model.cov(&point).cholesky().ok_or_else(|| {
                    anyhow!("local covariance at vertex {} is not positive definite", index)
                })?;
                let distance = residual.dot(&cholesky.solve(&residual)).max(0.0).sqrt();

                Ok(if distance < threshold { Some(point) } else { None })
            })
            .collect::<anyhow::Result<_>>()
            .context("correspondence filtering failed")?;

        let samples = survivors
            .into_iter()
            .flatten()
            .map(|point| WeightedPoint { point, weight: 1.0 })
            .collect();

        Ok(Self { samples, area })
    }
}

impl PointSampler<Point3<f64>> for CorrespondenceSampler {
    fn sample(&self, _rng: &mut dyn RngCore) -> SampleSet<Point3<f64>> {
        self.samples.clone()
    }

    fn number_of_points(&self) -> usize {
        self.samples.len()
    }

    fn volume_of_sample_region(&self) -> f64 {
        self.area
    }
}
