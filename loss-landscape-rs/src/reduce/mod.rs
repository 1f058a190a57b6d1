//! Dimensionality reduction of parameter trajectories.
//!
//! A trajectory living in D-dimensional parameter space is re-expressed in a
//! 2D basis. Every method follows the same three stages:
//!
//! 1. **Center** every step on the reference point (the final step), so the
//!    trained parameters land on the origin.
//! 2. **Derive** two directions with a [`DirectionStrategy`]:
//!    - [`PcaDirections`]: top two principal directions of the centered steps
//!    - [`RandomDirections`]: seeded Gaussian directions, orthonormalized
//!    - [`CustomDirections`]: caller-supplied directions, untouched
//! 3. **Project** each centered step onto the directions by dot product.
//!
//! # Example
//!
//! ```
//! use loss_landscape_rs::{DimensionReducer, ReductionMethod, Trajectory};
//!
//! let trajectory = Trajectory::from_parameters(vec![
//!     vec![0.0, 0.0, 0.0],
//!     vec![1.0, 0.5, 0.0],
//!     vec![2.0, 0.8, 0.1],
//! ])?;
//!
//! let reduction = DimensionReducer::new(ReductionMethod::Pca).reduce(&trajectory)?;
//! assert_eq!(reduction.path.len(), 3);
//! assert_eq!(reduction.path.last().unwrap().xy(), (0.0, 0.0));
//! # Ok::<(), loss_landscape_rs::LandscapeError>(())
//! ```

mod custom;
mod pca;
mod random;

pub use custom::CustomDirections;
pub use pca::PcaDirections;
pub use random::RandomDirections;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ReductionKind;
use crate::error::{LandscapeError, Result};
use crate::path::{Path2D, PathPoint};
use crate::trajectory::Trajectory;

/// Two direction vectors spanning the 2D plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionPair {
    /// First axis.
    pub dir1: Vec<f32>,
    /// Second axis.
    pub dir2: Vec<f32>,
}

impl DirectionPair {
    /// Create a direction pair.
    pub fn new(dir1: Vec<f32>, dir2: Vec<f32>) -> Self {
        Self { dir1, dir2 }
    }

    /// Check that both directions have `expected` components.
    pub fn check_dim(&self, expected: usize) -> Result<()> {
        for dir in [&self.dir1, &self.dir2] {
            if dir.len() != expected {
                return Err(LandscapeError::DirectionShapeMismatch {
                    expected,
                    got: dir.len(),
                });
            }
        }
        Ok(())
    }

    /// Map a 2D coordinate back into parameter space: `origin + x·dir1 + y·dir2`.
    ///
    /// Writes into `out` so grid evaluation can reuse one buffer.
    pub fn reconstruct_into(&self, origin: &[f32], x: f32, y: f32, out: &mut [f32]) {
        for (((w, &o), &d1), &d2) in out
            .iter_mut()
            .zip(origin)
            .zip(&self.dir1)
            .zip(&self.dir2)
        {
            *w = o + x * d1 + y * d2;
        }
    }
}

/// A trajectory with the reference point subtracted from every step.
#[derive(Debug, Clone)]
pub struct CenteredTrajectory {
    rows: Vec<Vec<f32>>,
    steps: Vec<usize>,
    dim: usize,
}

impl CenteredTrajectory {
    /// Center `trajectory` on its final step.
    pub fn new(trajectory: &Trajectory) -> Result<Self> {
        let reference = trajectory
            .reference()
            .ok_or(LandscapeError::EmptyTrajectory)?;
        let rows = trajectory
            .steps()
            .iter()
            .map(|s| {
                s.flat_w
                    .iter()
                    .zip(&reference.flat_w)
                    .map(|(w, r)| w - r)
                    .collect()
            })
            .collect();
        let steps = trajectory.steps().iter().map(|s| s.step).collect();

        Ok(Self {
            rows,
            steps,
            dim: reference.flat_w.len(),
        })
    }

    /// Centered steps, one row per trajectory step.
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// Parameter dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no steps.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Project every centered step onto `directions`.
    pub fn project(&self, directions: &DirectionPair) -> Path2D {
        self.rows
            .iter()
            .zip(&self.steps)
            .map(|(row, &step)| {
                PathPoint::new(
                    step,
                    utils::dot(row, &directions.dir1),
                    utils::dot(row, &directions.dir2),
                )
            })
            .collect()
    }
}

/// Directions produced by a strategy, with method-specific extras.
#[derive(Debug, Clone)]
pub struct Basis {
    /// The two basis directions.
    pub directions: DirectionPair,
    /// Fraction of trajectory variance per axis (PCA only).
    pub pc_variances: Option<[f32; 2]>,
    /// Seed the directions were drawn with (random only).
    pub seed: Option<u64>,
}

impl Basis {
    /// A basis with no extras.
    pub fn plain(directions: DirectionPair) -> Self {
        Self {
            directions,
            pc_variances: None,
            seed: None,
        }
    }
}

/// Produces a 2D basis from a centered trajectory.
pub trait DirectionStrategy {
    /// Method name for logging.
    fn name(&self) -> &'static str;

    /// Minimum number of trajectory steps this strategy needs.
    fn min_steps(&self) -> usize;

    /// Derive the basis.
    fn derive(&self, centered: &CenteredTrajectory) -> Result<Basis>;
}

/// Reduction method with its method-specific inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ReductionMethod {
    /// Principal component analysis.
    Pca,
    /// Seeded random directions.
    Random {
        /// Seed; drawn at random and reported back when absent.
        seed: Option<u64>,
    },
    /// Caller-supplied directions.
    Custom(DirectionPair),
}

impl ReductionMethod {
    /// Build a method from its config kind.
    ///
    /// `custom` requires `directions`; other kinds ignore them.
    pub fn from_kind(
        kind: ReductionKind,
        seed: Option<u64>,
        directions: Option<DirectionPair>,
    ) -> Result<Self> {
        match kind {
            ReductionKind::Pca => Ok(Self::Pca),
            ReductionKind::Random => Ok(Self::Random { seed }),
            ReductionKind::Custom => directions.map(Self::Custom).ok_or_else(|| {
                LandscapeError::invalid_config("custom reduction requires two directions")
            }),
        }
    }

    /// Config kind of this method.
    pub fn kind(&self) -> ReductionKind {
        match self {
            Self::Pca => ReductionKind::Pca,
            Self::Random { .. } => ReductionKind::Random,
            Self::Custom(_) => ReductionKind::Custom,
        }
    }

    /// The strategy implementing this method.
    pub fn strategy(&self) -> Box<dyn DirectionStrategy + '_> {
        match self {
            Self::Pca => Box::new(PcaDirections::default()),
            Self::Random { seed } => Box::new(RandomDirections::new(*seed)),
            Self::Custom(pair) => Box::new(CustomDirections::new(pair)),
        }
    }
}

/// Output of a reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    /// The trajectory in the 2D basis.
    pub path: Path2D,
    /// The basis directions in parameter space.
    pub directions: DirectionPair,
    /// Fraction of variance explained per axis (PCA only).
    pub pc_variances: Option<[f32; 2]>,
    /// Seed used for random directions.
    pub seed: Option<u64>,
}

/// Projects trajectories onto a 2D basis.
#[derive(Debug, Clone)]
pub struct DimensionReducer {
    method: ReductionMethod,
}

impl DimensionReducer {
    /// Create a reducer for `method`.
    pub fn new(method: ReductionMethod) -> Self {
        Self { method }
    }

    /// The configured method.
    pub fn method(&self) -> &ReductionMethod {
        &self.method
    }

    /// Reduce a trajectory to a 2D path.
    ///
    /// # Errors
    ///
    /// - [`LandscapeError::EmptyTrajectory`] when there are no steps
    /// - [`LandscapeError::InsufficientSteps`] when PCA or random get fewer than 2
    /// - [`LandscapeError::DirectionShapeMismatch`] for custom directions of the wrong size
    pub fn reduce(&self, trajectory: &Trajectory) -> Result<Reduction> {
        if trajectory.is_empty() {
            return Err(LandscapeError::EmptyTrajectory);
        }

        let strategy = self.method.strategy();
        if trajectory.len() < strategy.min_steps() {
            return Err(LandscapeError::InsufficientSteps {
                min: strategy.min_steps(),
                got: trajectory.len(),
            });
        }

        let start = Instant::now();
        let centered = CenteredTrajectory::new(trajectory)?;
        let basis = strategy.derive(&centered)?;
        let path = centered.project(&basis.directions);

        info!(
            "Reduced {} steps of dimension {} with {} in {:?}",
            centered.len(),
            centered.dim(),
            strategy.name(),
            start.elapsed()
        );
        if let Some([v1, v2]) = basis.pc_variances {
            info!("Explained variance: PC1 {:.4}, PC2 {:.4}", v1, v2);
        }

        Ok(Reduction {
            path,
            directions: basis.directions,
            pc_variances: basis.pc_variances,
            seed: basis.seed,
        })
    }

    /// Project several named trajectories onto one shared basis.
    ///
    /// Each trajectory is centered on its own final step. Useful for comparing
    /// optimizers that started from the same initialization.
    pub fn project_many(
        trajectories: &[(String, Trajectory)],
        directions: &DirectionPair,
    ) -> Result<Vec<(String, Path2D)>> {
        let reducer = Self::new(ReductionMethod::Custom(directions.clone()));
        trajectories
            .iter()
            .map(|(name, trajectory)| {
                let reduction = reducer.reduce(trajectory)?;
                Ok((name.clone(), reduction.path))
            })
            .collect()
    }
}

/// Vector helpers shared by the strategies.
pub(crate) mod utils {
    #[inline]
    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    /// Scale `v` to unit length; a zero vector is left as is.
    pub fn normalize(v: &mut [f32]) {
        let norm = dot(v, v).sqrt();
        if norm.is_normal() {
            let inv = norm.recip();
            v.iter_mut().for_each(|x| *x *= inv);
        }
    }

    /// Remove the component of `v` along the unit vector `u`.
    pub fn orthogonalize(v: &mut [f32], u: &[f32]) {
        let along = dot(v, u);
        v.iter_mut().zip(u).for_each(|(vi, &ui)| *vi -= along * ui);
    }

    /// Flip `v` so its largest-magnitude component is positive.
    pub fn fix_sign(v: &mut [f64]) {
        let pivot = v
            .iter()
            .copied()
            .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < 0.0 {
            for x in v.iter_mut() {
                *x = -*x;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::TrajectoryStep;

    fn three_step() -> Trajectory {
        Trajectory::from_parameters(vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![1.0, 1.0, 0.0, 0.0],
            vec![2.0, 2.0, 0.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_trajectory_rejected() {
        let reducer = DimensionReducer::new(ReductionMethod::Pca);
        assert!(matches!(
            reducer.reduce(&Trajectory::default()),
            Err(LandscapeError::EmptyTrajectory)
        ));
    }

    #[test]
    fn test_single_step_needs_custom() {
        let single = Trajectory::from_parameters(vec![vec![1.0, 2.0]]).unwrap();

        for method in [ReductionMethod::Pca, ReductionMethod::Random { seed: Some(1) }] {
            assert!(matches!(
                DimensionReducer::new(method).reduce(&single),
                Err(LandscapeError::InsufficientSteps { min: 2, got: 1 })
            ));
        }

        let pair = DirectionPair::new(vec![1.0, 0.0], vec![0.0, 1.0]);
        let reduction = DimensionReducer::new(ReductionMethod::Custom(pair))
            .reduce(&single)
            .unwrap();
        assert_eq!(reduction.path.to_pairs(), vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_projection_carries_step_ids() {
        let steps = vec![
            TrajectoryStep::new(100, vec![1.0, 0.0], 1.0, 0.1),
            TrajectoryStep::new(250, vec![0.0, 0.0], 0.5, 0.9),
        ];
        let trajectory = Trajectory::new(steps).unwrap();
        let pair = DirectionPair::new(vec![1.0, 0.0], vec![0.0, 1.0]);
        let reduction = DimensionReducer::new(ReductionMethod::Custom(pair))
            .reduce(&trajectory)
            .unwrap();

        let ids: Vec<usize> = reduction.path.points().iter().map(|p| p.step).collect();
        assert_eq!(ids, vec![100, 250]);
        assert_eq!(reduction.path.points()[0].xy(), (1.0, 0.0));
    }

    #[test]
    fn test_reconstruct_inverts_projection_for_orthonormal_basis() {
        let pair = DirectionPair::new(vec![0.6, 0.8, 0.0], vec![0.0, 0.0, 1.0]);
        let origin = vec![1.0, 1.0, 1.0];
        let mut out = vec![0.0; 3];
        pair.reconstruct_into(&origin, 2.0, -1.0, &mut out);

        let delta: Vec<f32> = out.iter().zip(&origin).map(|(w, o)| w - o).collect();
        assert!((utils::dot(&delta, &pair.dir1) - 2.0).abs() < 1e-6);
        assert!((utils::dot(&delta, &pair.dir2) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_kind_requires_custom_directions() {
        assert!(ReductionMethod::from_kind(ReductionKind::Custom, None, None).is_err());
        assert_eq!(
            ReductionMethod::from_kind(ReductionKind::Random, Some(4), None).unwrap(),
            ReductionMethod::Random { seed: Some(4) }
        );
        assert_eq!(ReductionMethod::Pca.kind(), ReductionKind::Pca);
    }

    #[test]
    fn test_project_many_shares_basis() {
        let pair = DirectionPair::new(vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, 1.0, 0.0]);
        let other = Trajectory::from_parameters(vec![
            vec![0.0, 0.0, 3.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ])
        .unwrap();
        let paths = DimensionReducer::project_many(
            &[("sgd".to_string(), three_step()), ("adam".to_string(), other)],
            &pair,
        )
        .unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].0, "sgd");
        assert_eq!(paths[0].1.to_pairs()[0], (-2.0, 0.0));
        assert_eq!(paths[1].1.to_pairs()[0], (0.0, 3.0));
    }

    #[test]
    fn test_normalize_leaves_zero_vector() {
        let mut zero = vec![0.0f32; 3];
        utils::normalize(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);

        let mut v = vec![3.0f32, 4.0];
        utils::normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);

        let mut w = vec![1.0f32, 1.0];
        utils::orthogonalize(&mut w, &v);
        assert!(utils::dot(&w, &v).abs() < 1e-6);
    }

    #[test]
    fn test_fix_sign() {
        let mut v = vec![0.1, -0.9, 0.3];
        utils::fix_sign(&mut v);
        assert_eq!(v, vec![-0.1, 0.9, -0.3]);
    }
}
