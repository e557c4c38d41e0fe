//! # Kernel-matrix assembly
//!
//! Turns a pairwise covariance function and a finite point set into a dense
//! symmetric matrix. Only the upper triangle is evaluated (kernel calls
//! dominate the cost for large point sets); the lower triangle is mirrored
//! afterwards. Assembly is a pure function of its inputs: the same points and
//! kernel produce bit-identical matrices.

use anyhow::bail;
use nalgebra::{DMatrix, Point};
use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::sampling::SampleSet;

/// Symmetric scalar covariance function of two points.
pub trait ScalarKernel<P>: Sync {
    fn eval(&self, x: &P, y: &P) -> f64;
}

/// Symmetric matrix-valued covariance function; `eval` returns the
/// `dim() x dim()` block for a pair of points.
pub trait MatrixValuedKernel<P>: Sync {
    fn dim(&self) -> usize;

    fn eval(&self, x: &P, y: &P) -> DMatrix<f64>;
}

/// Gaussian (squared-exponential) kernel `exp(-|x - y|^2 / scale^2)`.
#[derive(Debug, Clone, Copy)]
pub struct GaussianKernel<const D: usize> {
    scale: f64,
}

impl<const D: usize> GaussianKernel<D> {
    /// # Errors
    /// Fails for a non-positive or non-finite bandwidth.
    pub fn new(scale: f64) -> anyhow::Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            bail!("kernel scale must be strictly positive and finite, got {}", scale);
        }
        Ok(Self { scale })
    }
}

impl<const D: usize> ScalarKernel<Point<f64, D>> for GaussianKernel<D> {
    fn eval(&self, x: &Point<f64, D>, y: &Point<f64, D>) -> f64 {
        (-(x - y).norm_squared() / (self.scale * self.scale)).exp()
    }
}

/// Lifts a scalar kernel to a matrix-valued one with `k(x, y) * I` blocks,
/// modelling output components that vary independently but share one spatial
/// correlation structure.
#[derive(Debug, Clone, Copy)]
pub struct DiagonalKernel<K> {
    kernel: K,
    dim: usize,
}

impl<K> DiagonalKernel<K> {
    pub fn new(kernel: K, dim: usize) -> Self {
        Self { kernel, dim }
    }
}

impl<P, K: ScalarKernel<P>> MatrixValuedKernel<P> for DiagonalKernel<K> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval(&self, x: &P, y: &P) -> DMatrix<f64> {
        DMatrix::identity(self.dim, self.dim) * self.kernel.eval(x, y)
    }
}

/// Builds the dense `n x n` kernel matrix over `points`.
///
/// Rows are assembled in parallel; within row `i` only columns `j >= i` are
/// evaluated and the lower triangle is filled by mirroring. A single
/// non-finite kernel value aborts the whole build; no partial matrix is
/// returned.
pub fn kernel_matrix<P, K>(points: &[P], kernel: &K) -> anyhow::Result<Array2<f64>>
where
    P: Sync,
    K: ScalarKernel<P> + ?Sized,
{
    let n = points.len();
    let mut matrix = Array2::zeros((n, n));
    matrix
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for j in i..n {
                row[j] = kernel.eval(&points[i], &points[j]);
            }
        });

    check_upper_triangle_finite(&matrix)?;
    mirror_lower_triangle(&mut matrix);
    Ok(matrix)
}

/// Builds the `(n * d) x (n * d)` block kernel matrix for a matrix-valued
/// kernel of output dimension `d`; block `(i, j)` is `kernel.eval(p_i, p_j)`.
///
/// Symmetry is exploited at the block level: only blocks with `j >= i` are
/// evaluated and the strict lower block triangle is mirrored, which is valid
/// because a symmetric kernel satisfies `k(x, y) = k(y, x)^T`.
pub fn block_kernel_matrix<P, K>(points: &[P], kernel: &K) -> anyhow::Result<Array2<f64>>
where
    P: Sync,
    K: MatrixValuedKernel<P> + ?Sized,
{
    let n = points.len();
    let d = kernel.dim();
    if d == 0 {
        bail!("matrix-valued kernel output dimension must be at least 1");
    }
    let mut matrix = Array2::zeros((n * d, n * d));
    matrix
        .axis_chunks_iter_mut(Axis(0), d)
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut rows)| {
            for j in i..n {
                let block = kernel.eval(&points[i], &points[j]);
                for r in 0..d {
                    for c in 0..d {
                        rows[[r, j * d + c]] = block[(r, c)];
                    }
                }
            }
        });

    check_upper_triangle_finite(&matrix)?;
    mirror_lower_triangle(&mut matrix);
    Ok(matrix)
}

/// Builds the kernel matrix over a weighted sample, scaling entry `(i, j)` by
/// `sqrt(w_i * w_j)` so the matrix discretizes the kernel integral operator
/// under the sampling measure.
pub fn weighted_kernel_matrix<P, K>(
    samples: &SampleSet<P>,
    kernel: &K,
) -> anyhow::Result<Array2<f64>>
where
    P: Sync + Clone,
    K: ScalarKernel<P> + ?Sized,
{
    if let Some(bad) = samples.iter().position(|wp| !(wp.weight.is_finite() && wp.weight >= 0.0)) {
        bail!("sample weight at index {} must be finite and non-negative", bad);
    }
    let n = samples.len();
    let mut matrix = Array2::zeros((n, n));
    matrix
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for j in i..n {
                let scale = (samples[i].weight * samples[j].weight).sqrt();
                row[j] = scale * kernel.eval(&samples[i].point, &samples[j].point);
            }
        });

    check_upper_triangle_finite(&matrix)?;
    mirror_lower_triangle(&mut matrix);
    Ok(matrix)
}

fn check_upper_triangle_finite(matrix: &Array2<f64>) -> anyhow::Result<()> {
    if let Some(((i, j), value)) = matrix
        .indexed_iter()
        .find(|&((i, j), value)| j >= i && !value.is_finite())
    {
        bail!("kernel evaluation produced non-finite value {} for pair ({}, {})", value, i, j);
    }
    Ok(())
}

fn mirror_lower_triangle(matrix: &mut Array2<f64>) {
    let n = matrix.nrows();
    for i in 1..n {
        for j in 0..i {
            matrix[[i, j]] = matrix[[j, i]];
        }
    }
}
