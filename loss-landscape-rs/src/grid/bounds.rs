//! Grid extent and lattice construction.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GridConfig;
use crate::error::{LandscapeError, Result};
use crate::path::Path2D;

/// Axis extent below which the path counts as a single point on that axis.
const DEGENERATE_EXTENT: f32 = 1e-6;

/// Rectangular region covered by the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// `(x_min, x_max)`
    pub x: (f32, f32),
    /// `(y_min, y_max)`
    pub y: (f32, f32),
}

impl GridBounds {
    /// Bounds that strictly contain `path`, padded per `config`.
    ///
    /// Each axis is padded by `margin × extent` on both sides. An axis with no
    /// extent is padded by `fallback_margin` instead.
    pub fn around(path: &Path2D, config: &GridConfig) -> Result<Self> {
        // min/max folds skip NaN, so reject non-finite points up front.
        if let Some(p) = path
            .points()
            .iter()
            .find(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            let axis = if p.x.is_finite() { "y" } else { "x" };
            return Err(LandscapeError::DegenerateGrid {
                axis,
                min: f32::NAN,
                max: f32::NAN,
            });
        }

        let ((x_lo, x_hi), (y_lo, y_hi)) = path.bounds().ok_or(LandscapeError::EmptyTrajectory)?;
        Ok(Self {
            x: padded_axis("x", x_lo, x_hi, config)?,
            y: padded_axis("y", y_lo, y_hi, config)?,
        })
    }

    /// Whether `(x, y)` lies strictly inside the bounds.
    pub fn contains_strictly(&self, x: f32, y: f32) -> bool {
        x > self.x.0 && x < self.x.1 && y > self.y.0 && y < self.y.1
    }

    /// Evenly spaced `resolution × resolution` lattice over the bounds.
    pub fn lattice(&self, resolution: usize) -> GridCoordinates {
        GridCoordinates {
            xs: linspace(self.x.0, self.x.1, resolution),
            ys: linspace(self.y.0, self.y.1, resolution),
        }
    }
}

fn padded_axis(axis: &'static str, lo: f32, hi: f32, config: &GridConfig) -> Result<(f32, f32)> {
    let extent = hi - lo;
    let pad = if extent > DEGENERATE_EXTENT {
        extent * config.margin
    } else {
        warn!(
            "Path has no extent on the {} axis, padding by {}",
            axis, config.fallback_margin
        );
        config.fallback_margin
    };

    let (min, max) = (lo - pad, hi + pad);
    if !(min.is_finite() && max.is_finite()) || max <= min {
        return Err(LandscapeError::DegenerateGrid { axis, min, max });
    }
    Ok((min, max))
}

fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f32;
            let mut values: Vec<f32> = (0..n).map(|i| start + i as f32 * step).collect();
            values[n - 1] = end;
            values
        }
    }
}

/// The `R × R` lattice of 2D coordinates.
///
/// Row `r`, column `c` is the point `(xs[c], ys[r])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCoordinates {
    xs: Vec<f32>,
    ys: Vec<f32>,
}

impl GridCoordinates {
    /// Lattice values along x (columns).
    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    /// Lattice values along y (rows).
    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    /// Points per axis.
    pub fn resolution(&self) -> usize {
        self.xs.len()
    }

    /// Total number of lattice points.
    pub fn len(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    /// Whether the lattice is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The coordinate at `(row, col)`.
    pub fn point(&self, row: usize, col: usize) -> (f32, f32) {
        (self.xs[col], self.ys[row])
    }

    /// All points, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.ys
            .iter()
            .flat_map(move |&y| self.xs.iter().map(move |&x| (x, y)))
    }

    /// Points as nested rows, `[row][col] -> (x, y)`.
    pub fn to_rows(&self) -> Vec<Vec<(f32, f32)>> {
        self.ys
            .iter()
            .map(|&y| self.xs.iter().map(|&x| (x, y)).collect())
            .collect()
    }

    /// The lattice cell containing `(x, y)`, `None` outside the grid.
    ///
    /// Returns `((col, tx), (row, ty))`: the lower corner indices and the
    /// fractional offsets in `[0, 1]` towards `col + 1` and `row + 1`.
    pub fn cell(&self, x: f32, y: f32) -> Option<((usize, f32), (usize, f32))> {
        Some((axis_cell(&self.xs, x)?, axis_cell(&self.ys, y)?))
    }

    /// The region spanned by the lattice.
    pub fn bounds(&self) -> Option<GridBounds> {
        Some(GridBounds {
            x: (*self.xs.first()?, *self.xs.last()?),
            y: (*self.ys.first()?, *self.ys.last()?),
        })
    }
}

fn axis_cell(values: &[f32], v: f32) -> Option<(usize, f32)> {
    let (&first, &last) = (values.first()?, values.last()?);
    if values.len() < 2 || !(first..=last).contains(&v) {
        return None;
    }

    let upper = values.partition_point(|&t| t < v).clamp(1, values.len() - 1);
    let lower = upper - 1;
    let span = values[upper] - values[lower];
    let offset = if span > 0.0 {
        (v - values[lower]) / span
    } else {
        0.0
    };
    Some((lower, offset))
}
