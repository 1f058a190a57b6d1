//! Loss grid over the 2D basis.
//!
//! Every lattice point `(x, y)` is mapped back to parameter space as
//! `reference + x·dir1 + y·dir2`, loaded into the model, and evaluated over
//! the full dataset. The grid therefore costs `resolution²` forward passes,
//! run strictly one after another on the single model instance.
//!
//! The model's parameters are restored to what they were before the build,
//! on success and on failure.

mod bounds;

pub use bounds::{GridBounds, GridCoordinates};

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GridConfig;
use crate::error::{LandscapeError, Result};
use crate::model::{with_checkpoint, ParameterModel};
use crate::path::Path2D;
use crate::reduce::DirectionPair;
use crate::trajectory::Trajectory;

/// The lowest loss found on the lattice.
///
/// Distinct from the true optimum: this depends on grid resolution and
/// placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMinimum {
    /// Row index (y).
    pub row: usize,
    /// Column index (x).
    pub col: usize,
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Raw loss at this point.
    pub loss: f32,
}

/// Evaluated loss surface around a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossGrid {
    /// Lattice coordinates.
    pub coords: GridCoordinates,
    /// Raw loss per lattice point, `[row][col]`.
    pub loss_values_2d: Vec<Vec<f32>>,
    /// `ln(loss + log_epsilon)` per lattice point, `[row][col]`.
    pub loss_values_log_2d: Vec<Vec<f32>>,
    /// Projection of the reference point (the trained parameters).
    pub true_optim_point: (f32, f32),
    /// Loss recorded by training at the reference point.
    pub loss_min: f32,
    /// Lowest loss found on the lattice.
    pub grid_minimum: GridMinimum,
    /// Epsilon used by the log transform.
    pub log_epsilon: f32,
}

impl LossGrid {
    /// Points per axis.
    pub fn resolution(&self) -> usize {
        self.coords.resolution()
    }

    /// Invert the log transform.
    pub fn raw_loss(&self, log_value: f32) -> f32 {
        (f64::from(log_value).exp() - f64::from(self.log_epsilon)) as f32
    }

    /// Bilinearly interpolated raw loss at `(x, y)`, `None` outside the grid.
    pub fn loss_at(&self, x: f32, y: f32) -> Option<f32> {
        let ((col, tx), (row, ty)) = self.coords.cell(x, y)?;
        let surface = &self.loss_values_2d;
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let lower = lerp(surface[row][col], surface[row][col + 1], tx);
        let upper = lerp(surface[row + 1][col], surface[row + 1][col + 1], tx);
        Some(lerp(lower, upper, ty))
    }

    /// Highest raw loss on the lattice.
    pub fn max_loss(&self) -> f32 {
        self.loss_values_2d
            .iter()
            .flat_map(|row| row.iter())
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Builds a [`LossGrid`] by evaluating a model across the 2D basis.
#[derive(Debug, Clone, Default)]
pub struct LossGridBuilder {
    config: GridConfig,
}

impl LossGridBuilder {
    /// Create a builder.
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    /// Grid configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Evaluate the loss grid.
    ///
    /// `path` must be the projection of `trajectory` onto `directions`; the
    /// grid is centered on the trajectory's final step.
    ///
    /// # Errors
    ///
    /// - [`LandscapeError::DirectionDimensionMismatch`] if a direction does not
    ///   match the model's parameter count
    /// - [`LandscapeError::Evaluation`] if any forward pass fails or yields a
    ///   non-finite or negative loss
    /// - [`LandscapeError::DegenerateGrid`] if the bounds collapse
    pub fn build<M>(
        &self,
        trajectory: &Trajectory,
        model: &mut M,
        data: &M::Dataset,
        path: &Path2D,
        directions: &DirectionPair,
    ) -> Result<LossGrid>
    where
        M: ParameterModel + ?Sized,
    {
        self.config.validate()?;

        let reference = trajectory
            .reference()
            .ok_or(LandscapeError::EmptyTrajectory)?;
        let true_optim = path.last().ok_or(LandscapeError::EmptyTrajectory)?;

        let num_params = model.num_params();
        for dir in [&directions.dir1, &directions.dir2] {
            if dir.len() != num_params {
                return Err(LandscapeError::DirectionDimensionMismatch {
                    expected: num_params,
                    got: dir.len(),
                });
            }
        }
        if reference.flat_w.len() != num_params {
            return Err(LandscapeError::ParameterCountMismatch {
                expected: num_params,
                got: reference.flat_w.len(),
            });
        }

        let bounds = GridBounds::around(path, &self.config)?;
        let coords = bounds.lattice(self.config.resolution);
        let res = coords.resolution();

        info!(
            "Evaluating {}x{} loss grid over x=[{:.4}, {:.4}], y=[{:.4}, {:.4}]",
            res, res, bounds.x.0, bounds.x.1, bounds.y.0, bounds.y.1
        );
        let start = Instant::now();

        let loss_values_2d = with_checkpoint(model, |m| {
            let mut params = vec![0.0f32; num_params];
            let mut surface = Vec::with_capacity(res);

            for (row, &y) in coords.ys().iter().enumerate() {
                let mut values = Vec::with_capacity(res);
                for &x in coords.xs() {
                    directions.reconstruct_into(&reference.flat_w, x, y, &mut params);
                    m.load_flat_params(&params)?;
                    let eval = m.evaluate(data)?;
                    values.push(checked_loss(eval.loss, x, y)?);
                }
                debug!("Grid row {}/{} evaluated", row + 1, res);
                surface.push(values);
            }
            Ok(surface)
        })?;

        let epsilon = self.config.log_epsilon;
        let loss_values_log_2d = loss_values_2d
            .iter()
            .map(|row| row.iter().map(|&l| log_loss(l, epsilon)).collect())
            .collect();
        let grid_minimum = locate_minimum(&coords, &loss_values_2d);

        info!(
            "Loss grid done in {:?}: grid minimum {:.6} at ({:.4}, {:.4}), trained loss {:.6}",
            start.elapsed(),
            grid_minimum.loss,
            grid_minimum.x,
            grid_minimum.y,
            reference.loss
        );

        Ok(LossGrid {
            coords,
            loss_values_2d,
            loss_values_log_2d,
            true_optim_point: true_optim.xy(),
            loss_min: reference.loss,
            grid_minimum,
            log_epsilon: epsilon,
        })
    }
}

fn checked_loss(loss: f32, x: f32, y: f32) -> Result<f32> {
    if loss.is_finite() && loss >= 0.0 {
        Ok(loss)
    } else {
        Err(LandscapeError::evaluation(format!(
            "loss {loss} at grid point ({x}, {y}) is not a finite non-negative value"
        )))
    }
}

fn log_loss(loss: f32, epsilon: f32) -> f32 {
    (f64::from(loss) + f64::from(epsilon)).ln() as f32
}

fn locate_minimum(coords: &GridCoordinates, surface: &[Vec<f32>]) -> GridMinimum {
    let mut best = GridMinimum {
        row: 0,
        col: 0,
        x: coords.xs()[0],
        y: coords.ys()[0],
        loss: f32::INFINITY,
    };
    for (row, values) in surface.iter().enumerate() {
        for (col, &loss) in values.iter().enumerate() {
            if loss < best.loss {
                let (x, y) = coords.point(row, col);
                best = GridMinimum {
                    row,
                    col,
                    x,
                    y,
                    loss,
                };
            }
        }
    }
    best
}
