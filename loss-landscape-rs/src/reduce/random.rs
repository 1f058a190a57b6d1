//! Random orthonormal directions.
//!
//! Two Gaussian vectors are drawn from a seeded ChaCha stream, the second is
//! orthogonalized against the first, and both are normalized. The same seed
//! always gives the same pair.

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use super::{utils, Basis, CenteredTrajectory, DirectionPair, DirectionStrategy};
use crate::error::{LandscapeError, Result};

/// Seeded random orthonormal directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDirections {
    seed: Option<u64>,
}

impl RandomDirections {
    /// Create a strategy; `None` draws a fresh seed per call.
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    /// Generate the direction pair for dimension `dim` from `seed`.
    pub fn generate(dim: usize, seed: u64) -> DirectionPair {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut dir1 = gaussian(dim, &mut rng);
        let mut dir2 = gaussian(dim, &mut rng);

        normalize_and_orthogonalize(&mut dir1, &mut dir2);
        DirectionPair::new(dir1, dir2)
    }
}

impl DirectionStrategy for RandomDirections {
    fn name(&self) -> &'static str {
        "random"
    }

    fn min_steps(&self) -> usize {
        2
    }

    fn derive(&self, centered: &CenteredTrajectory) -> Result<Basis> {
        let dim = centered.dim();
        if dim < 2 {
            return Err(LandscapeError::InsufficientDimensions { min: 2, got: dim });
        }

        let seed = self.seed.unwrap_or_else(|| {
            let drawn = rand::thread_rng().gen::<u64>();
            debug!("No seed given for random directions, drew {}", drawn);
            drawn
        });

        Ok(Basis {
            directions: Self::generate(dim, seed),
            pc_variances: None,
            seed: Some(seed),
        })
    }
}

fn gaussian(dim: usize, rng: &mut ChaCha8Rng) -> Vec<f32> {
    (0..dim)
        .map(|_| {
            let val: f64 = StandardNormal.sample(rng);
            val as f32
        })
        .collect()
}

/// Normalize `dir1`, then Gram–Schmidt `dir2` against it and normalize.
fn normalize_and_orthogonalize(dir1: &mut [f32], dir2: &mut [f32]) {
    utils::normalize(dir1);
    utils::orthogonalize(dir2, dir1);
    utils::normalize(dir2);
}
