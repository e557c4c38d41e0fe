use anyhow::bail;
use nalgebra::Point3;
use rand::{Rng, RngCore};

use crate::domain::SurfaceMesh;
use crate::sampling::{PointSampler, SampleSet, WeightedPoint};
use crate::utils::cumulative_search;

/// Samples mesh points by uniform-at-random vertex index selection.
///
/// Vertices are drawn with equal probability regardless of how much surface
/// area surrounds them, so the point set is only approximately uniform over
/// the surface for evenly tessellated meshes. Every point carries the density
/// `1 / area`. Use [`UniformMeshSampler`] when area-correct sampling matters.
pub struct RandomMeshSampler<'a, M: SurfaceMesh + ?Sized> {
    mesh: &'a M,
    number_of_points: usize,
    area: f64,
}

impl<'a, M: SurfaceMesh + ?Sized> RandomMeshSampler<'a, M> {
    /// # Errors
    /// Fails for a mesh without vertices or with zero total area; a uniform
    /// density over a zero-measure surface is undefined.
    pub fn new(mesh: &'a M, number_of_points: usize) -> anyhow::Result<Self> {
        if mesh.number_of_vertices() == 0 {
            bail!("mesh must have at least one vertex");
        }
        let area = mesh.area();
        if !(area.is_finite() && area > 0.0) {
            bail!("mesh surface area must be strictly positive and finite, got {}", area);
        }
        Ok(Self { mesh, number_of_points, area })
    }
}

impl<M: SurfaceMesh + ?Sized> PointSampler<Point3<f64>> for RandomMeshSampler<'_, M> {
    fn sample(&self, rng: &mut dyn RngCore) -> SampleSet<Point3<f64>> {
        let weight = 1.0 / self.area;
        let vertex_count = self.mesh.number_of_vertices();
        (0..self.number_of_points)
            .map(|_| WeightedPoint {
                point: self.mesh.vertex(rng.random_range(0..vertex_count)),
                weight,
            })
            .collect()
    }

    fn number_of_points(&self) -> usize {
        self.number_of_points
    }

    fn volume_of_sample_region(&self) -> f64 {
        self.area
    }
}

/// Area-weighted uniform sampler over a triangulated surface.
///
/// The statistically correct way to approximate a uniform measure on a
/// 2-manifold: a face is chosen with probability proportional to its area by
/// lower-bound search over a cumulative area table, then a point is drawn
/// uniformly inside that triangle by barycentric sampling. Every point
/// carries the density `1 / area`.
pub struct UniformMeshSampler<'a, M: SurfaceMesh + ?Sized> {
    mesh: &'a M,
    number_of_points: usize,
    cumulative_areas: Vec<f64>,
    area: f64,
}

impl<'a, M: SurfaceMesh + ?Sized> UniformMeshSampler<'a, M> {
    /// Builds the cumulative area table once; sampling reuses it per draw.
    ///
    /// # Errors
    /// Fails for a mesh without faces, with a negative or non-finite face
    /// area, or with zero total area.
    pub fn new(mesh: &'a M, number_of_points: usize) -> anyhow::Result<Self> {
        if mesh.number_of_faces() == 0 {
            bail!("mesh must have at least one face");
        }
        let mut cumulative_areas = Vec::with_capacity(mesh.number_of_faces());
        let mut total = 0.0;
        for face in 0..mesh.number_of_faces() {
            let face_area = mesh.face_area(face);
            if !(face_area.is_finite() && face_area >= 0.0) {
                bail!("face {} has invalid area {}", face, face_area);
            }
            total += face_area;
            cumulative_areas.push(total);
        }
        if total <= 0.0 {
            bail!("mesh surface area must be strictly positive, got {}", total);
        }
        Ok(Self { mesh, number_of_points, cumulative_areas, area: total })
    }

    fn random_point_in_face(&self, face: usize, rng: &mut dyn RngCore) -> Point3<f64> {
        let mut u: f64 = rng.random();
        let mut v: f64 = rng.random();
        // Fold draws from the unit square back into the lower triangle.
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        self.mesh.point_in_face(face, [1.0 - u - v, u, v])
    }
}

impl<M: SurfaceMesh + ?Sized> PointSampler<Point3<f64>> for UniformMeshSampler<'_, M> {
    fn sample(&self, rng: &mut dyn RngCore) -> SampleSet<Point3<f64>> {
        let weight = 1.0 / self.area;
        (0..self.number_of_points)
            .map(|_| {
                let draw = rng.random::<f64>() * self.area;
                let face = cumulative_search(&self.cumulative_areas, draw);
                WeightedPoint { point: self.random_point_in_face(face, rng), weight }
            })
            .collect()
    }

    fn number_of_points(&self) -> usize {
        self.number_of_points
    }

    fn volume_of_sample_region(&self) -> f64 {
        self.area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TriMesh;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    /// Two faces with areas 0.5 and 4.0 so area weighting is observable.
    fn lopsided_mesh() -> TriMesh {
        TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 0.0, 8.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_random_mesh_sampler_draws_vertices() {
        let mesh = lopsided_mesh();
        let sampler = RandomMeshSampler::new(&mesh, 50).unwrap();
        let samples = sampler.sample(&mut StdRng::seed_from_u64(3));

        assert_eq!(samples.len(), 50);
        for wp in &samples {
            assert!((0..mesh.number_of_vertices()).any(|i| mesh.vertex(i) == wp.point));
            assert_relative_eq!(wp.weight, 1.0 / mesh.area());
        }
    }

    #[test]
    fn test_uniform_mesh_sampler_reproducible_per_seed() {
        let mesh = lopsided_mesh();
        let sampler = UniformMeshSampler::new(&mesh, 100).unwrap();

        let a = sampler.sample(&mut StdRng::seed_from_u64(99));
        let b = sampler.sample(&mut StdRng::seed_from_u64(99));
        let c = sampler.sample(&mut StdRng::seed_from_u64(100));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_uniform_mesh_sampler_respects_face_areas() {
        let mesh = lopsided_mesh();
        let sampler = UniformMeshSampler::new(&mesh, 2000).unwrap();
        let samples = sampler.sample(&mut StdRng::seed_from_u64(5));

        // Points on the small face stay at z == 0; the large face is tilted.
        let on_small = samples.iter().filter(|wp| wp.point[2] == 0.0).count();
        let expected = 2000.0 * 0.5 / mesh.area();
        let observed = on_small as f64;
        // Loose binomial bound, ~5 sigma.
        assert!((observed - expected).abs() < 150.0, "observed {}", observed);
    }

    #[test]
    fn test_uniform_weight_identity() {
        let mesh = lopsided_mesh();
        let sampler = UniformMeshSampler::new(&mesh, 64).unwrap();
        let samples = sampler.sample(&mut StdRng::seed_from_u64(1));
        let total: f64 = samples
            .iter()
            .map(|wp| wp.weight * sampler.volume_of_sample_region())
            .sum();
        assert_relative_eq!(total, 64.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_mesh_rejected() {
        let degenerate = TriMesh::new(
            vec![Point3::origin(), Point3::origin(), Point3::origin()],
            vec![[0, 1, 2]],
        )
        .unwrap();
        assert!(UniformMeshSampler::new(&degenerate, 10).is_err());
        assert!(RandomMeshSampler::new(&degenerate, 10).is_err());
    }
}
