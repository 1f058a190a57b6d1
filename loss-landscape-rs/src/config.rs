//! Configuration types for landscape construction.
//!
//! - [`GridConfig`]: loss grid resolution, padding and log transform settings
//! - [`ReductionKind`]: which 2D basis to derive from the trajectory
//! - [`LandscapeConfig`]: end-to-end settings used by [`crate::LossLandscape`]

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LandscapeError, Result};

/// Configuration for the loss grid.
///
/// # Example
///
/// ```
/// use loss_landscape_rs::GridConfig;
///
/// let config = GridConfig::default()
///     .with_resolution(20)
///     .with_margin(0.3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of lattice points per axis. The grid costs `resolution²`
    /// full-dataset forward passes.
    pub resolution: usize,

    /// Padding on each side, as a fraction of the path's extent on that axis.
    pub margin: f32,

    /// Absolute padding used when the path has no extent on an axis.
    pub fallback_margin: f32,

    /// Offset added before taking the log of a loss value.
    pub log_epsilon: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: 30,
            margin: 0.2,
            fallback_margin: 1.0,
            log_epsilon: 1e-8,
        }
    }
}

impl GridConfig {
    /// Set the grid resolution.
    #[must_use]
    pub const fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the relative margin.
    #[must_use]
    pub const fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Set the absolute margin used for degenerate axes.
    #[must_use]
    pub const fn with_fallback_margin(mut self, margin: f32) -> Self {
        self.fallback_margin = margin;
        self
    }

    /// Set the log transform epsilon.
    #[must_use]
    pub const fn with_log_epsilon(mut self, epsilon: f32) -> Self {
        self.log_epsilon = epsilon;
        self
    }

    /// Check that the configuration describes a usable grid.
    pub fn validate(&self) -> Result<()> {
        if self.resolution < 2 {
            return Err(LandscapeError::invalid_config(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !(self.margin.is_finite() && self.margin > 0.0) {
            return Err(LandscapeError::invalid_config(format!(
                "margin must be positive, got {}",
                self.margin
            )));
        }
        if !(self.fallback_margin.is_finite() && self.fallback_margin > 0.0) {
            return Err(LandscapeError::invalid_config(format!(
                "fallback_margin must be positive, got {}",
                self.fallback_margin
            )));
        }
        if !(self.log_epsilon.is_finite() && self.log_epsilon > 0.0) {
            return Err(LandscapeError::invalid_config(format!(
                "log_epsilon must be positive, got {}",
                self.log_epsilon
            )));
        }
        Ok(())
    }
}

/// Method used to derive the 2D basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionKind {
    /// Top two principal directions of the centered trajectory.
    #[default]
    Pca,
    /// Two seeded Gaussian directions, orthonormalized.
    Random,
    /// Caller-supplied directions, used verbatim.
    Custom,
}

impl ReductionKind {
    /// Lowercase name used in configs and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pca => "pca",
            Self::Random => "random",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReductionKind {
    type Err = LandscapeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pca" => Ok(Self::Pca),
            "random" => Ok(Self::Random),
            "custom" => Ok(Self::Custom),
            other => Err(LandscapeError::invalid_config(format!(
                "unknown reduction method '{other}', expected pca, random or custom"
            ))),
        }
    }
}

/// End-to-end configuration for [`crate::LossLandscape::compute`].
///
/// # Example
///
/// ```
/// use loss_landscape_rs::{LandscapeConfig, ReductionKind};
///
/// let config = LandscapeConfig::default()
///     .with_method(ReductionKind::Random)
///     .with_seed(7)
///     .with_max_frames(None);
/// assert_eq!(config.seed, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeConfig {
    /// Basis derivation method.
    pub method: ReductionKind,

    /// Seed for the random method.
    pub seed: Option<u64>,

    /// Maximum number of trajectory steps kept for the path (`None` keeps all).
    pub max_frames: Option<usize>,

    /// Loss grid settings.
    pub grid: GridConfig,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            method: ReductionKind::Pca,
            seed: None,
            max_frames: Some(300),
            grid: GridConfig::default(),
        }
    }
}

impl LandscapeConfig {
    /// Set the reduction method.
    #[must_use]
    pub const fn with_method(mut self, method: ReductionKind) -> Self {
        self.method = method;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the frame cap.
    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Set the grid configuration.
    #[must_use]
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Validate all nested settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_frames == Some(0) {
            return Err(LandscapeError::invalid_config("max_frames must be at least 1"));
        }
        self.grid.validate()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
