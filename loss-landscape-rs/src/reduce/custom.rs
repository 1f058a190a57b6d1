//! Caller-supplied directions.

use super::{Basis, CenteredTrajectory, DirectionPair, DirectionStrategy};
use crate::error::Result;

/// Uses the given directions verbatim: no normalization, no orthogonalization.
#[derive(Debug, Clone, Copy)]
pub struct CustomDirections<'a> {
    pair: &'a DirectionPair,
}

impl<'a> CustomDirections<'a> {
    /// Wrap a direction pair.
    pub fn new(pair: &'a DirectionPair) -> Self {
        Self { pair }
    }
}

impl DirectionStrategy for CustomDirections<'_> {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn min_steps(&self) -> usize {
        1
    }

    fn derive(&self, centered: &CenteredTrajectory) -> Result<Basis> {
        self.pair.check_dim(centered.dim())?;
        Ok(Basis::plain(self.pair.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LandscapeError;
    use crate::trajectory::Trajectory;

    fn centered() -> CenteredTrajectory {
        let trajectory =
            Trajectory::from_parameters(vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 0.0]]).unwrap();
        CenteredTrajectory::new(&trajectory).unwrap()
    }

    #[test]
    fn test_directions_kept_bit_for_bit() {
        let pair = DirectionPair::new(vec![3.0, 0.1, -7.5], vec![1.0, 1.0, 1.0]);
        let basis = CustomDirections::new(&pair).derive(&centered()).unwrap();
        assert_eq!(basis.directions, pair);
        assert!(basis.pc_variances.is_none());
        assert!(basis.seed.is_none());
    }

    #[test]
    fn test_shape_mismatch() {
        let pair = DirectionPair::new(vec![1.0, 0.0, 0.0], vec![0.0, 1.0]);
        assert!(matches!(
            CustomDirections::new(&pair).derive(&centered()),
            Err(LandscapeError::DirectionShapeMismatch {
                expected: 3,
                got: 2
            })
        ));
    }
}
