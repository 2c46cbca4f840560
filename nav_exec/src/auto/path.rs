//! # Path
//!
//! This module defines the path used by the navigation system.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ordered list of waypoints in the map frame.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Path {
    pub points_m: Vec<Point2<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        Self { points_m: Vec::new() }
    }

    /// Create a path with only the start and end points.
    pub fn direct(start_m: Point2<f64>, end_m: Point2<f64>) -> Self {
        Self {
            points_m: vec![start_m, end_m],
        }
    }

    pub fn from_points(points_m: Vec<Point2<f64>>) -> Self {
        Self { points_m }
    }

    /// Total length of the path in meters, `0` for a path of fewer than two points.
    pub fn get_length(&self) -> f64 {
        self.get_length_from(0)
    }

    /// Length of the path from the point at `index` to the end.
    pub fn get_length_from(&self, index: usize) -> f64 {
        if index >= self.points_m.len() {
            return 0.0;
        }

        self.points_m[index..]
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    pub fn get_num_points(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }

    pub fn first(&self) -> Option<&Point2<f64>> {
        self.points_m.first()
    }

    pub fn last(&self) -> Option<&Point2<f64>> {
        self.points_m.last()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_length() {
        let p = Path::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
            Point2::new(3.0, 5.0),
        ]);

        assert_eq!(p.get_length(), 6.0);
        assert_eq!(p.get_length_from(1), 1.0);
        assert_eq!(p.get_length_from(2), 0.0);
        assert_eq!(p.get_length_from(7), 0.0);
        assert_eq!(Path::new_empty().get_length(), 0.0);
    }
}
