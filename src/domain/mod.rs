//! # Domain collaborators
//!
//! Geometric regions the samplers draw points from: axis-aligned boxes,
//! regular grids, and triangulated surfaces. Meshes are reached through the
//! [`SurfaceMesh`] trait so callers can plug in their own representation;
//! [`TriMesh`] is a minimal indexed implementation sufficient for tests and
//! small models. Every region guarantees a strictly positive measure at
//! construction time.

use anyhow::bail;
use nalgebra::{Matrix3, Point, Point3, SVector, Vector3};

/// Axis-aligned box region with strictly positive volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxDomain<const D: usize> {
    origin: Point<f64, D>,
    extent: SVector<f64, D>,
}

impl<const D: usize> BoxDomain<D> {
    /// Creates a box spanning `origin..origin + extent`.
    ///
    /// # Errors
    /// Fails if any extent component is not strictly positive or not finite
    /// (a zero-measure region cannot carry a uniform density).
    pub fn new(origin: Point<f64, D>, extent: SVector<f64, D>) -> anyhow::Result<Self> {
        if extent.iter().any(|&e| !(e.is_finite() && e > 0.0)) {
            bail!("box extent must be strictly positive and finite on every axis, got {:?}", extent);
        }
        Ok(Self { origin, extent })
    }

    pub fn origin(&self) -> &Point<f64, D> {
        &self.origin
    }

    pub fn extent(&self) -> &SVector<f64, D> {
        &self.extent
    }

    pub fn volume(&self) -> f64 {
        self.extent.iter().product()
    }
}

/// Regular grid: `size[d]` points along axis `d`, starting at `origin` with
/// per-axis `spacing`. Points are enumerated in row-major order with axis 0
/// varying fastest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularGrid<const D: usize> {
    origin: Point<f64, D>,
    spacing: SVector<f64, D>,
    size: [usize; D],
}

impl<const D: usize> RegularGrid<D> {
    /// # Errors
    /// Fails if any axis has zero points or a non-positive spacing.
    pub fn new(
        origin: Point<f64, D>,
        spacing: SVector<f64, D>,
        size: [usize; D],
    ) -> anyhow::Result<Self> {
        if size.iter().any(|&s| s == 0) {
            bail!("grid must have at least one point along every axis, got {:?}", size);
        }
        if spacing.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
            bail!("grid spacing must be strictly positive and finite, got {:?}", spacing);
        }
        Ok(Self { origin, spacing, size })
    }

    pub fn number_of_points(&self) -> usize {
        self.size.iter().product()
    }

    /// Volume of the region covered by the grid cells.
    pub fn volume(&self) -> f64 {
        (0..D).map(|d| self.size[d] as f64 * self.spacing[d]).product()
    }

    /// Decodes a linear index into the corresponding grid point.
    ///
    /// # Panics
    /// Panics if `index >= number_of_points()`.
    pub fn point(&self, index: usize) -> Point<f64, D> {
        assert!(
            index < self.number_of_points(),
            "grid point index {} out of range (grid has {} points)",
            index,
            self.number_of_points()
        );
        let mut remainder = index;
        let mut point = self.origin;
        for d in 0..D {
            let i = remainder % self.size[d];
            remainder /= self.size[d];
            point[d] += i as f64 * self.spacing[d];
        }
        point
    }
}

/// Triangulated 2-manifold collaborator.
///
/// The sampling code only needs measure queries, barycentric interpolation
/// inside a face and closest-point lookup; how the mesh stores its topology
/// is the implementor's business.
pub trait SurfaceMesh: Sync {
    fn number_of_vertices(&self) -> usize;

    fn vertex(&self, index: usize) -> Point3<f64>;

    fn number_of_faces(&self) -> usize;

    fn face_area(&self, index: usize) -> f64;

    /// Total surface area.
    fn area(&self) -> f64 {
        (0..self.number_of_faces()).map(|f| self.face_area(f)).sum()
    }

    /// Point at barycentric coordinates `bary` (summing to 1) inside `face`.
    fn point_in_face(&self, face: usize, bary: [f64; 3]) -> Point3<f64>;

    /// Closest point on the surface to `query`.
    fn closest_point(&self, query: &Point3<f64>) -> Point3<f64>;
}

/// Minimal indexed triangle mesh.
#[derive(Debug, Clone)]
pub struct TriMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
}

impl TriMesh {
    /// # Errors
    /// Fails when a face references a vertex index out of range.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> anyhow::Result<Self> {
        for (i, face) in faces.iter().enumerate() {
            if face.iter().any(|&v| v >= vertices.len()) {
                bail!(
                    "face {} references vertex out of range (mesh has {} vertices)",
                    i,
                    vertices.len()
                );
            }
        }
        Ok(Self { vertices, faces })
    }

    fn face_corners(&self, index: usize) -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        let [a, b, c] = self.faces[index];
        (self.vertices[a], self.vertices[b], self.vertices[c])
    }
}

impl SurfaceMesh for TriMesh {
    fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn vertex(&self, index: usize) -> Point3<f64> {
        self.vertices[index]
    }

    fn number_of_faces(&self) -> usize {
        self.faces.len()
    }

    fn face_area(&self, index: usize) -> f64 {
        let (a, b, c) = self.face_corners(index);
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    fn point_in_face(&self, face: usize, bary: [f64; 3]) -> Point3<f64> {
        let (a, b, c) = self.face_corners(face);
        Point3::from(bary[0] * a.coords + bary[1] * b.coords + bary[2] * c.coords)
    }

    fn closest_point(&self, query: &Point3<f64>) -> Point3<f64> {
        let mut best = self
            .vertices
            .first()
            .copied()
            .unwrap_or_else(Point3::origin);
        let mut best_dist = (query - best).norm_squared();
        for face in 0..self.faces.len() {
            let (a, b, c) = self.face_corners(face);
            let candidate = closest_point_on_triangle(query, &a, &b, &c);
            let dist = (query - candidate).norm_squared();
            if dist < best_dist {
                best_dist = dist;
                best = candidate;
            }
        }
        best
    }
}

/// Exact projection of `p` onto triangle `abc` (interior, edge or vertex).
fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Gaussian-process view of a deformation field, as needed by the
/// correspondence sampler: the mean deformation at a point and the local
/// marginal covariance of the process there.
pub trait DeformationModel: Sync {
    fn mean(&self, point: &Point3<f64>) -> Vector3<f64>;

    fn cov(&self, point: &Point3<f64>) -> Matrix3<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> TriMesh {
        TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_box_volume_and_preconditions() {
        let b = BoxDomain::new(Point::from([0.0, 0.0]), SVector::from([2.0, 3.0])).unwrap();
        assert_relative_eq!(b.volume(), 6.0);

        assert!(BoxDomain::new(Point::from([0.0]), SVector::from([0.0])).is_err());
        assert!(BoxDomain::new(Point::from([0.0]), SVector::from([-1.0])).is_err());
    }

    #[test]
    fn test_grid_enumeration() {
        let g = RegularGrid::new(
            Point::from([1.0, 2.0]),
            SVector::from([0.5, 1.0]),
            [3, 2],
        )
        .unwrap();
        assert_eq!(g.number_of_points(), 6);
        assert_relative_eq!(g.volume(), 3.0);
        assert_relative_eq!(g.point(0), Point::from([1.0, 2.0]));
        assert_relative_eq!(g.point(1), Point::from([1.5, 2.0]));
        assert_relative_eq!(g.point(3), Point::from([1.0, 3.0]));
        assert_relative_eq!(g.point(5), Point::from([2.0, 3.0]));
    }

    #[test]
    fn test_grid_preconditions() {
        assert!(RegularGrid::new(Point::from([0.0]), SVector::from([1.0]), [0]).is_err());
        assert!(RegularGrid::new(Point::from([0.0]), SVector::from([0.0]), [2]).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_grid_point_index_out_of_range_panics() {
        let g = RegularGrid::new(Point::from([0.0]), SVector::from([1.0]), [3]).unwrap();
        g.point(3);
    }

    #[test]
    fn test_mesh_area() {
        let mesh = unit_square();
        assert_relative_eq!(mesh.area(), 1.0);
        assert_relative_eq!(mesh.face_area(0), 0.5);
    }

    #[test]
    fn test_point_in_face_barycentric() {
        let mesh = unit_square();
        let centroid = mesh.point_in_face(0, [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        assert_relative_eq!(centroid, Point3::new(2.0 / 3.0, 1.0 / 3.0, 0.0), epsilon = 1e-12);
        let corner = mesh.point_in_face(1, [1.0, 0.0, 0.0]);
        assert_relative_eq!(corner, Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_closest_point_projects_onto_interior() {
        let mesh = unit_square();
        let p = mesh.closest_point(&Point3::new(0.25, 0.25, 2.0));
        assert_relative_eq!(p, Point3::new(0.25, 0.25, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_closest_point_snaps_to_edge_and_vertex() {
        let mesh = unit_square();
        let edge = mesh.closest_point(&Point3::new(0.5, -1.0, 0.0));
        assert_relative_eq!(edge, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
        let vertex = mesh.closest_point(&Point3::new(-1.0, -1.0, 0.0));
        assert_relative_eq!(vertex, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_bad_face_index_rejected() {
        let vertices = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(TriMesh::new(vertices, vec![[0, 1, 2]]).is_err());
    }
}
