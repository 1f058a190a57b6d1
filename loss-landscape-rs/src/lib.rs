//! # loss-landscape-rs
//!
//! Visualize how a model moved through parameter space during training.
//!
//! Training records a [`Trajectory`]: one flattened parameter snapshot per
//! step, plus the loss and accuracy at that step. This crate turns it into
//! something plottable in two stages:
//!
//! 1. **Reduce** the trajectory to a 2D path with a [`DimensionReducer`],
//!    using PCA, seeded random directions, or caller-supplied directions.
//!    The final step (the trained parameters) lands on the origin.
//! 2. **Evaluate** the loss on a regular grid around that path with a
//!    [`LossGridBuilder`]. Each grid point is mapped back to parameter space
//!    and run through the model over the full dataset.
//!
//! [`LossLandscape::compute`] runs both stages and [`LandscapeReport`] is the
//! JSON-ready output.
//!
//! ## Quick Start
//!
//! ```
//! use loss_landscape_rs::model::LossFnModel;
//! use loss_landscape_rs::{GridConfig, LandscapeConfig, LossLandscape, Trajectory};
//!
//! let trajectory = Trajectory::from_parameters(vec![
//!     vec![2.0, 1.0, 0.5],
//!     vec![1.0, 0.4, 0.2],
//!     vec![0.0, 0.0, 0.0],
//! ])?;
//! let mut model = LossFnModel::new(vec![0.0; 3], |w: &[f32]| w.iter().map(|x| x * x).sum());
//!
//! let config = LandscapeConfig::default().with_grid(GridConfig::default().with_resolution(8));
//! let landscape = LossLandscape::compute(&trajectory, &mut model, &(), None, &config)?;
//!
//! assert_eq!(landscape.grid.loss_values_log_2d.len(), 8);
//! assert_eq!(landscape.grid.true_optim_point, (0.0, 0.0));
//! # Ok::<(), loss_landscape_rs::LandscapeError>(())
//! ```
//!
//! ## Modules
//!
//! - [`trajectory`]: recorded training steps
//! - [`reduce`]: 2D basis derivation and projection
//! - [`grid`]: loss grid bounds, lattice and evaluation
//! - [`model`]: the [`ParameterModel`] seam and a candle MLP
//! - [`landscape`]: end-to-end pipeline and report
//! - [`config`]: configuration types
//! - [`error`]: error types and result alias

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod grid;
pub mod landscape;
pub mod model;
pub mod path;
pub mod reduce;
pub mod trajectory;

pub use config::{GridConfig, LandscapeConfig, ReductionKind};
pub use error::{LandscapeError, Result};
pub use grid::{GridBounds, GridCoordinates, GridMinimum, LossGrid, LossGridBuilder};
pub use landscape::{LandscapeReport, LossLandscape};
pub use model::{evaluate_at, ClassificationDataset, Evaluation, MlpClassifier, ParameterModel};
pub use path::{Path2D, PathPoint};
pub use reduce::{DimensionReducer, DirectionPair, Reduction, ReductionMethod};
pub use trajectory::{Trajectory, TrajectoryStep};
