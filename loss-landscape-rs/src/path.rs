//! Trajectories re-expressed in a 2D basis.
//!
//! Each [`PathPoint`] keeps the training step it came from, so consumers never
//! have to rely on positional alignment with the source trajectory.

use serde::{Deserialize, Serialize};

/// A trajectory step projected onto the 2D basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Training step this point was projected from
    pub step: usize,
    /// Coordinate along the first direction
    pub x: f32,
    /// Coordinate along the second direction
    pub y: f32,
}

impl PathPoint {
    /// Create a new path point.
    pub fn new(step: usize, x: f32, y: f32) -> Self {
        Self { step, x, y }
    }

    /// The `(x, y)` pair.
    pub fn xy(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Ordered 2D path, one point per trajectory step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path2D {
    points: Vec<PathPoint>,
}

impl Path2D {
    /// Wrap projected points.
    pub fn new(points: Vec<PathPoint>) -> Self {
        Self { points }
    }

    /// All points in temporal order.
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The final point (the projected reference).
    pub fn last(&self) -> Option<&PathPoint> {
        self.points.last()
    }

    /// Points as bare `(x, y)` pairs.
    pub fn to_pairs(&self) -> Vec<(f32, f32)> {
        self.points.iter().map(PathPoint::xy).collect()
    }

    /// Axis-aligned bounds as `((x_min, x_max), (y_min, y_max))`.
    pub fn bounds(&self) -> Option<((f32, f32), (f32, f32))> {
        let first = self.points.first()?;
        let init = ((first.x, first.x), (first.y, first.y));
        Some(self.points.iter().fold(init, |((x0, x1), (y0, y1)), p| {
            ((x0.min(p.x), x1.max(p.x)), (y0.min(p.y), y1.max(p.y)))
        }))
    }

    /// Total length of the path in the plane.
    pub fn path_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| {
                let dx = w[1].x - w[0].x;
                let dy = w[1].y - w[0].y;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    /// Straight-line distance from the first to the last point.
    pub fn net_displacement(&self) -> f32 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => {
                let dx = last.x - first.x;
                let dy = last.y - first.y;
                (dx * dx + dy * dy).sqrt()
            }
            _ => 0.0,
        }
    }

    /// Net displacement over path length.
    ///
    /// Close to 1.0 for direct paths, lower when the optimizer wandered.
    pub fn efficiency(&self) -> f32 {
        let length = self.path_length();
        if length < 1e-10 {
            return 1.0;
        }
        self.net_displacement() / length
    }
}

impl FromIterator<PathPoint> for Path2D {
    fn from_iter<I: IntoIterator<Item = PathPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_path() -> Path2D {
        Path2D::new(vec![
            PathPoint::new(0, 0.0, 0.0),
            PathPoint::new(1, 1.0, 0.0),
            PathPoint::new(2, 1.0, 1.0),
        ])
    }

    #[test]
    fn test_path_length() {
        assert!((l_path().path_length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_efficiency() {
        let path = l_path();
        let expected = 2.0f32.sqrt() / 2.0;
        assert!((path.efficiency() - expected).abs() < 1e-5);

        let still = Path2D::new(vec![PathPoint::new(0, 3.0, 3.0)]);
        assert!((still.efficiency() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds() {
        let path = Path2D::new(vec![
            PathPoint::new(0, -2.0, 0.5),
            PathPoint::new(1, 3.0, -1.0),
            PathPoint::new(2, 0.0, 0.0),
        ]);
        assert_eq!(path.bounds(), Some(((-2.0, 3.0), (-1.0, 0.5))));
        assert_eq!(Path2D::default().bounds(), None);
    }

    #[test]
    fn test_serializes_as_point_list() {
        let json = serde_json::to_string(&l_path()).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"step\":2"));
    }
}
