//! End-to-end landscape computation and the serialized report.
//!
//! [`LossLandscape::compute`] chains the pipeline: cap the trajectory at
//! `max_frames`, reduce it to a 2D path, then evaluate the loss grid around
//! it. [`LandscapeReport`] is the flat, serializable view consumed by
//! renderers.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LandscapeConfig;
use crate::error::Result;
use crate::grid::{GridMinimum, LossGrid, LossGridBuilder};
use crate::model::ParameterModel;
use crate::reduce::{DimensionReducer, DirectionPair, Reduction, ReductionMethod};
use crate::trajectory::Trajectory;

/// A reduced trajectory together with the loss surface around it.
#[derive(Debug, Clone)]
pub struct LossLandscape {
    /// Path and basis.
    pub reduction: Reduction,
    /// Evaluated loss grid.
    pub grid: LossGrid,
    /// Recorded loss per path point.
    pub loss_path: Vec<f32>,
    /// Recorded accuracy per path point.
    pub accuracy_path: Vec<f32>,
}

impl LossLandscape {
    /// Compute the landscape for a recorded trajectory.
    ///
    /// The basis comes from `config.method` and `config.seed`; `directions`
    /// is required for the custom method and ignored otherwise. The model's
    /// parameters are unchanged on return.
    pub fn compute<M>(
        trajectory: &Trajectory,
        model: &mut M,
        data: &M::Dataset,
        directions: Option<DirectionPair>,
        config: &LandscapeConfig,
    ) -> Result<Self>
    where
        M: ParameterModel + ?Sized,
    {
        config.validate()?;
        let method = ReductionMethod::from_kind(config.method, config.seed, directions)?;

        let sampled = match config.max_frames {
            Some(max_frames) => trajectory.sample(max_frames)?,
            None => trajectory.clone(),
        };

        let reduction = DimensionReducer::new(method).reduce(&sampled)?;
        let grid = LossGridBuilder::new(config.grid.clone()).build(
            &sampled,
            model,
            data,
            &reduction.path,
            &reduction.directions,
        )?;

        info!(
            "Landscape ready: {} path points, {}x{} grid",
            reduction.path.len(),
            grid.resolution(),
            grid.resolution()
        );

        Ok(Self {
            loss_path: sampled.losses(),
            accuracy_path: sampled.accuracies(),
            reduction,
            grid,
        })
    }

    /// Flat serializable view.
    pub fn report(&self) -> LandscapeReport {
        LandscapeReport::from(self)
    }
}

/// Serializable landscape output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeReport {
    /// `[x, y]` per path point.
    pub path_2d: Vec<(f32, f32)>,
    /// The two basis directions.
    pub reduced_dirs: DirectionPair,
    /// Variance fraction per axis, PCA only.
    pub pcvariances: Option<[f32; 2]>,
    /// `[row][col] -> (x, y)`.
    pub coords: Vec<Vec<(f32, f32)>>,
    /// `ln(loss + ε)` per lattice point.
    pub loss_values_log_2d: Vec<Vec<f32>>,
    /// Where the trained parameters sit in the plane.
    pub true_optim_point: (f32, f32),
    /// Recorded loss at the trained parameters.
    pub loss_min: f32,
    /// Recorded loss per path point.
    pub loss_path: Vec<f32>,
    /// Recorded accuracy per path point.
    pub accuracy_path: Vec<f32>,
    /// Lowest loss on the lattice.
    pub grid_minimum: GridMinimum,
    /// Seed of random directions.
    pub seed: Option<u64>,
}

impl From<&LossLandscape> for LandscapeReport {
    fn from(landscape: &LossLandscape) -> Self {
        let grid = &landscape.grid;
        Self {
            path_2d: landscape.reduction.path.to_pairs(),
            reduced_dirs: landscape.reduction.directions.clone(),
            pcvariances: landscape.reduction.pc_variances,
            coords: grid.coords.to_rows(),
            loss_values_log_2d: grid.loss_values_log_2d.clone(),
            true_optim_point: grid.true_optim_point,
            loss_min: grid.loss_min,
            loss_path: landscape.loss_path.clone(),
            accuracy_path: landscape.accuracy_path.clone(),
            grid_minimum: grid.grid_minimum,
            seed: landscape.reduction.seed,
        }
    }
}

impl LandscapeReport {
    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read a report written by [`Self::write_json`].
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, ReductionKind};
    use crate::error::LandscapeError;
    use crate::model::LossFnModel;

    fn bowl(w: &[f32]) -> f32 {
        w.iter().map(|x| x * x).sum::<f32>() + 0.01
    }

    fn descent() -> Trajectory {
        let params = (0..20)
            .map(|i| {
                let t = 1.0 - i as f32 / 19.0;
                vec![2.0 * t, t * t, 0.3 * t, 0.0]
            })
            .collect();
        Trajectory::from_parameters(params).unwrap()
    }

    #[test]
    fn test_compute_caps_frames_and_aligns_paths() {
        let config = LandscapeConfig::default()
            .with_max_frames(Some(5))
            .with_grid(GridConfig::default().with_resolution(6));
        let mut model = LossFnModel::new(vec![0.0; 4], bowl);
        let landscape =
            LossLandscape::compute(&descent(), &mut model, &(), None, &config).unwrap();

        assert_eq!(landscape.reduction.path.len(), 5);
        assert_eq!(landscape.loss_path.len(), 5);
        assert_eq!(landscape.accuracy_path.len(), 5);
        assert_eq!(landscape.reduction.path.last().unwrap().step, 19);
        assert_eq!(landscape.grid.resolution(), 6);
    }

    #[test]
    fn test_report_keys() {
        let config = LandscapeConfig::default()
            .with_method(ReductionKind::Random)
            .with_seed(11)
            .with_grid(GridConfig::default().with_resolution(4));
        let mut model = LossFnModel::new(vec![0.0; 4], bowl);
        let landscape =
            LossLandscape::compute(&descent(), &mut model, &(), None, &config).unwrap();

        let value = serde_json::to_value(landscape.report()).unwrap();
        for key in [
            "path_2d",
            "reduced_dirs",
            "pcvariances",
            "coords",
            "loss_values_log_2d",
            "true_optim_point",
            "loss_min",
            "loss_path",
            "accuracy_path",
            "grid_minimum",
            "seed",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["seed"], 11);
        assert!(value["pcvariances"].is_null());
        assert_eq!(value["coords"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_config_method_is_honored() {
        let trajectory = descent();
        let grid = GridConfig::default().with_resolution(4);

        let random = LandscapeConfig::default()
            .with_method(ReductionKind::Random)
            .with_seed(7)
            .with_grid(grid.clone());
        let mut model = LossFnModel::new(vec![0.0; 4], bowl);
        let landscape =
            LossLandscape::compute(&trajectory, &mut model, &(), None, &random).unwrap();
        assert_eq!(landscape.reduction.seed, Some(7));
        assert!(landscape.reduction.pc_variances.is_none());
        let expected = ReductionMethod::Random { seed: Some(7) };
        let direct = DimensionReducer::new(expected).reduce(&trajectory).unwrap();
        assert_eq!(landscape.reduction.directions, direct.directions);

        let pca = LandscapeConfig::default().with_grid(grid.clone());
        let landscape = LossLandscape::compute(&trajectory, &mut model, &(), None, &pca).unwrap();
        assert!(landscape.reduction.pc_variances.is_some());
        assert!(landscape.reduction.seed.is_none());

        let pair = DirectionPair::new(vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, 1.0, 0.0]);
        let custom = LandscapeConfig::default()
            .with_method(ReductionKind::Custom)
            .with_grid(grid);
        let landscape =
            LossLandscape::compute(&trajectory, &mut model, &(), Some(pair.clone()), &custom)
                .unwrap();
        assert_eq!(landscape.reduction.directions, pair);
        assert!(matches!(
            LossLandscape::compute(&trajectory, &mut model, &(), None, &custom),
            Err(LandscapeError::InvalidConfig(_))
        ));
    }
}
