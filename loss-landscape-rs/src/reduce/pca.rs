//! Principal directions of a centered trajectory.
//!
//! The trajectory is a T×D matrix with T (recorded steps) far smaller than D
//! (parameters), so the decomposition runs on the T×T Gram matrix `X·Xᵀ`
//! instead of a D×D covariance. Its eigenvectors `u` are the left singular
//! vectors of `X`; the right singular vectors (the directions we want) are
//! recovered as `v = Xᵀ·u / σ`.

use nalgebra::{DMatrix, SymmetricEigen};
use tracing::{debug, warn};

use super::{utils, Basis, CenteredTrajectory, DirectionPair, DirectionStrategy};
use crate::error::{LandscapeError, Result};

/// Top-2 principal directions of the centered trajectory.
#[derive(Debug, Clone)]
pub struct PcaDirections {
    /// Eigenvalues at or below `rank_tolerance × total variance` count as zero.
    rank_tolerance: f64,
}

impl Default for PcaDirections {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-10,
        }
    }
}

impl PcaDirections {
    /// Set the relative tolerance used to detect a rank-deficient trajectory.
    #[must_use]
    pub fn with_rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = tolerance;
        self
    }
}

impl DirectionStrategy for PcaDirections {
    fn name(&self) -> &'static str {
        "pca"
    }

    fn min_steps(&self) -> usize {
        2
    }

    fn derive(&self, centered: &CenteredTrajectory) -> Result<Basis> {
        let dim = centered.dim();
        if dim < 2 {
            return Err(LandscapeError::InsufficientDimensions { min: 2, got: dim });
        }

        let rows = centered.rows();
        let n = rows.len();
        let gram = DMatrix::<f64>::from_fn(n, n, |i, j| dot_f64(&rows[i], &rows[j]));
        let eigen = SymmetricEigen::new(gram);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        // Trace of the Gram matrix: sum of all squared singular values.
        let total: f64 = eigen.eigenvalues.iter().map(|l| l.max(0.0)).sum();

        let mut directions: Vec<Vec<f64>> = Vec::with_capacity(2);
        let mut variances = [0.0f32; 2];

        for (k, &idx) in order.iter().take(2).enumerate() {
            let lambda = eigen.eigenvalues[idx].max(0.0);
            if total <= 0.0 || lambda <= self.rank_tolerance * total {
                break;
            }

            let sigma = lambda.sqrt();
            let u = eigen.eigenvectors.column(idx);
            let mut v = vec![0.0f64; dim];
            for (row, &ui) in rows.iter().zip(u.iter()) {
                for (vj, &xj) in v.iter_mut().zip(row) {
                    *vj += ui * f64::from(xj);
                }
            }
            for vj in &mut v {
                *vj /= sigma;
            }
            normalize_f64(&mut v);
            utils::fix_sign(&mut v);

            directions.push(v);
            variances[k] = (lambda / total) as f32;
        }

        if directions.len() < 2 {
            warn!(
                "Trajectory spans {} direction(s); completing the PCA basis with orthogonal axes",
                directions.len()
            );
        }
        while directions.len() < 2 {
            let completion = orthogonal_completion(&directions, dim);
            directions.push(completion);
        }

        debug!(
            "PCA singular values: {:?}",
            order
                .iter()
                .take(2)
                .map(|&i| eigen.eigenvalues[i].max(0.0).sqrt())
                .collect::<Vec<_>>()
        );

        let to_f32 = |v: &[f64]| v.iter().map(|&x| x as f32).collect::<Vec<f32>>();
        Ok(Basis {
            directions: DirectionPair::new(to_f32(&directions[0]), to_f32(&directions[1])),
            pc_variances: Some(variances),
            seed: None,
        })
    }
}

fn dot_f64(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

fn normalize_f64(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 1e-300 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Unit vector orthogonal to every (orthonormal) vector in `basis`.
///
/// Picks the standard axis with the largest residual after projecting out
/// `basis`, which is at least `1 - len/dim` and therefore well-conditioned.
fn orthogonal_completion(basis: &[Vec<f64>], dim: usize) -> Vec<f64> {
    let residual = |k: usize| 1.0 - basis.iter().map(|b| b[k] * b[k]).sum::<f64>();
    let axis = (0..dim).fold(0, |best, k| {
        if residual(k) > residual(best) {
            k
        } else {
            best
        }
    });

    let mut v = vec![0.0f64; dim];
    v[axis] = 1.0;
    for b in basis {
        let proj = b[axis];
        for (vi, bi) in v.iter_mut().zip(b) {
            *vi -= proj * bi;
        }
    }
    normalize_f64(&mut v);
    utils::fix_sign(&mut v);
    v
}
