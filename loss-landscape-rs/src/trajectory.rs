//! Recorded parameter trajectories.
//!
//! A [`Trajectory`] is the ordered sequence of flattened parameter snapshots
//! taken during training. Order is temporal and carries meaning: the last
//! step is the reference point every projection is centered on.

use serde::{Deserialize, Serialize};

use crate::error::{LandscapeError, Result};

/// A single recorded training step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// Training step identifier.
    pub step: usize,
    /// Every trainable parameter, flattened in a fixed order.
    pub flat_w: Vec<f32>,
    /// Training loss recorded at this step.
    pub loss: f32,
    /// Training accuracy recorded at this step.
    pub accuracy: f32,
}

impl TrajectoryStep {
    /// Create a new step.
    pub fn new(step: usize, flat_w: Vec<f32>, loss: f32, accuracy: f32) -> Self {
        Self {
            step,
            flat_w,
            loss,
            accuracy,
        }
    }
}

/// An ordered, dimension-consistent sequence of [`TrajectoryStep`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TrajectoryStep>", into = "Vec<TrajectoryStep>")]
pub struct Trajectory {
    steps: Vec<TrajectoryStep>,
}

impl Trajectory {
    /// Build a trajectory, checking that every step has the same dimension
    /// and only finite parameters.
    ///
    /// An empty trajectory is accepted here; operations that need steps
    /// report [`LandscapeError::EmptyTrajectory`] themselves.
    pub fn new(steps: Vec<TrajectoryStep>) -> Result<Self> {
        if let Some(first) = steps.first() {
            let expected = first.flat_w.len();
            for (i, step) in steps.iter().enumerate() {
                check_step(i, step, expected)?;
            }
        }
        Ok(Self { steps })
    }

    /// Build a trajectory from bare parameter vectors.
    ///
    /// Step ids are assigned `0..n`; loss and accuracy are zero.
    pub fn from_parameters(params: Vec<Vec<f32>>) -> Result<Self> {
        let steps = params
            .into_iter()
            .enumerate()
            .map(|(i, flat_w)| TrajectoryStep::new(i, flat_w, 0.0, 0.0))
            .collect();
        Self::new(steps)
    }

    /// Append a step, rejecting a dimension change or non-finite parameters.
    pub fn push(&mut self, step: TrajectoryStep) -> Result<()> {
        let expected = self.dim().unwrap_or(step.flat_w.len());
        check_step(self.steps.len(), &step, expected)?;
        self.steps.push(step);
        Ok(())
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the trajectory has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parameter dimension, `None` when empty.
    pub fn dim(&self) -> Option<usize> {
        self.steps.first().map(|s| s.flat_w.len())
    }

    /// All steps in temporal order.
    pub fn steps(&self) -> &[TrajectoryStep] {
        &self.steps
    }

    /// The final step, used as the projection origin.
    pub fn reference(&self) -> Option<&TrajectoryStep> {
        self.steps.last()
    }

    /// Recorded losses in temporal order.
    pub fn losses(&self) -> Vec<f32> {
        self.steps.iter().map(|s| s.loss).collect()
    }

    /// Recorded accuracies in temporal order.
    pub fn accuracies(&self) -> Vec<f32> {
        self.steps.iter().map(|s| s.accuracy).collect()
    }

    /// Down-sample to at most `max_frames` steps.
    ///
    /// Steps are picked every `len / max_frames` positions counting back from
    /// the final step, so the reference step always survives and order is
    /// kept.
    pub fn sample(&self, max_frames: usize) -> Result<Self> {
        if max_frames == 0 {
            return Err(LandscapeError::invalid_config("max_frames must be at least 1"));
        }
        let len = self.steps.len();
        if max_frames >= len {
            return Ok(self.clone());
        }

        let interval = len / max_frames;
        let mut picked: Vec<TrajectoryStep> = (0..len)
            .rev()
            .step_by(interval)
            .take(max_frames)
            .map(|i| self.steps[i].clone())
            .collect();
        picked.reverse();

        tracing::debug!(
            "Sampled {} of {} trajectory steps (interval {})",
            picked.len(),
            len,
            interval
        );
        Ok(Self { steps: picked })
    }
}

fn check_step(position: usize, step: &TrajectoryStep, expected: usize) -> Result<()> {
    if step.flat_w.len() != expected {
        return Err(LandscapeError::InconsistentDimension {
            step: position,
            expected,
            got: step.flat_w.len(),
        });
    }
    if let Some(index) = step.flat_w.iter().position(|w| !w.is_finite()) {
        return Err(LandscapeError::NonFiniteParameters {
            step: position,
            index,
        });
    }
    Ok(())
}

impl TryFrom<Vec<TrajectoryStep>> for Trajectory {
    type Error = LandscapeError;

    fn try_from(steps: Vec<TrajectoryStep>) -> Result<Self> {
        Self::new(steps)
    }
}

impl From<Trajectory> for Vec<TrajectoryStep> {
    fn from(trajectory: Trajectory) -> Self {
        trajectory.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_trajectory(n: usize) -> Trajectory {
        let steps = (0..n)
            .map(|i| TrajectoryStep::new(i * 10, vec![i as f32, 0.0], 1.0 / (i + 1) as f32, 0.5))
            .collect();
        Trajectory::new(steps).unwrap()
    }

    #[test]
    fn test_inconsistent_dimension_rejected() {
        let result = Trajectory::from_parameters(vec![vec![0.0, 1.0], vec![0.0]]);
        assert!(matches!(
            result,
            Err(LandscapeError::InconsistentDimension {
                step: 1,
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_push_checks_dimension() {
        let mut trajectory = linear_trajectory(2);
        assert!(trajectory
            .push(TrajectoryStep::new(99, vec![1.0, 2.0, 3.0], 0.1, 0.9))
            .is_err());
        assert!(trajectory
            .push(TrajectoryStep::new(99, vec![1.0, 2.0], 0.1, 0.9))
            .is_ok());
        assert_eq!(trajectory.len(), 3);
    }

    #[test]
    fn test_non_finite_parameters_rejected() {
        let result =
            Trajectory::from_parameters(vec![vec![0.0, f32::NAN, 1.0], vec![1.0, 2.0, 0.5]]);
        assert!(matches!(
            result,
            Err(LandscapeError::NonFiniteParameters { step: 0, index: 1 })
        ));

        let mut trajectory = linear_trajectory(2);
        let result = trajectory.push(TrajectoryStep::new(5, vec![f32::INFINITY, 0.0], 0.1, 0.9));
        assert!(matches!(
            result,
            Err(LandscapeError::NonFiniteParameters { step: 2, index: 0 })
        ));
        assert_eq!(trajectory.len(), 2);

        let mut empty = Trajectory::default();
        assert!(empty
            .push(TrajectoryStep::new(0, vec![0.0, f32::NEG_INFINITY], 1.0, 0.0))
            .is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_serde_rejects_non_finite_parameters() {
        // serde_json cannot encode NaN, so overflow to infinity instead.
        let json = r#"[
            {"step": 0, "flat_w": [0.0, 1e39], "loss": 1.0, "accuracy": 0.1},
            {"step": 1, "flat_w": [0.5, 0.0], "loss": 0.5, "accuracy": 0.2}
        ]"#;
        let err = serde_json::from_str::<Trajectory>(json).unwrap_err();
        assert!(err.to_string().contains("non-finite parameter at step 0"));
    }

    #[test]
    fn test_empty_trajectory() {
        let trajectory = Trajectory::default();
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.dim(), None);
        assert!(trajectory.reference().is_none());
    }

    #[test]
    fn test_sample_keeps_reference_and_order() {
        let trajectory = linear_trajectory(10);
        let sampled = trajectory.sample(3).unwrap();

        // interval = 10 / 3 = 3, picked from the end: 9, 6, 3
        let ids: Vec<usize> = sampled.steps().iter().map(|s| s.step).collect();
        assert_eq!(ids, vec![30, 60, 90]);
        assert_eq!(sampled.reference(), trajectory.reference());
    }

    #[test]
    fn test_sample_noop_when_short() {
        let trajectory = linear_trajectory(4);
        assert_eq!(trajectory.sample(300).unwrap(), trajectory);
        assert!(trajectory.sample(0).is_err());
    }

    #[test]
    fn test_serde_validates_dimensions() {
        let json = r#"[
            {"step": 0, "flat_w": [0.0, 1.0], "loss": 1.0, "accuracy": 0.1},
            {"step": 1, "flat_w": [0.5], "loss": 0.5, "accuracy": 0.2}
        ]"#;
        assert!(serde_json::from_str::<Trajectory>(json).is_err());

        let trajectory = linear_trajectory(3);
        let json = serde_json::to_string(&trajectory).unwrap();
        let back: Trajectory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trajectory);
    }
}
