//! # Polygons
//!
//! Forbidden areas are simple polygons in the map frame. The obstacle index
//! inflates them by the robot's safety radius, and the navigation controller
//! measures its distance to their edges for the emergency stop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A closed polygon of at least three vertices. The closing edge from the last
/// vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices_m: Vec<Point2<f64>>,
}

/// Axis aligned bounding box, `(min, max)` corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_m: Point2<f64>,
    pub max_m: Point2<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Polygon {
    /// Build a polygon from its vertices.
    ///
    /// Returns `None` if there are fewer than three vertices or any vertex is
    /// not finite.
    pub fn new(vertices_m: Vec<Point2<f64>>) -> Option<Self> {
        if vertices_m.len() < 3 {
            return None;
        }
        if vertices_m.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return None;
        }

        Some(Self { vertices_m })
    }

    /// Build a polygon from `[x, y]` pairs, as carried by telecommands and map files.
    pub fn from_pairs(pairs: &[[f64; 2]]) -> Option<Self> {
        Self::new(pairs.iter().map(|p| Point2::new(p[0], p[1])).collect())
    }

    /// Convert a list of raw vertex lists, dropping any which aren't valid polygons.
    pub fn from_pair_lists(lists: &[Vec<[f64; 2]>]) -> Vec<Self> {
        lists.iter().filter_map(|l| Self::from_pairs(l)).collect()
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices_m
    }

    /// Iterate over the edges of the polygon, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (&Point2<f64>, &Point2<f64>)> {
        let n = self.vertices_m.len();
        (0..n).map(move |i| (&self.vertices_m[i], &self.vertices_m[(i + 1) % n]))
    }

    /// Even-odd point in polygon test.
    pub fn contains(&self, point_m: &Point2<f64>) -> bool {
        let mut inside = false;

        for (a, b) in self.edges() {
            if (a.y > point_m.y) != (b.y > point_m.y) {
                let x_cross = a.x + (point_m.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if point_m.x < x_cross {
                    inside = !inside;
                }
            }
        }

        inside
    }

    /// Distance from the point to the nearest edge of the polygon.
    pub fn distance_to_boundary(&self, point_m: &Point2<f64>) -> f64 {
        self.edges()
            .map(|(a, b)| distance_to_segment(point_m, a, b))
            .fold(std::f64::INFINITY, f64::min)
    }

    /// Returns true if the point lies within the polygon buffered by `radius_m`,
    /// i.e. the Minkowski sum of the polygon and a disk of that radius.
    pub fn inflated_contains(&self, point_m: &Point2<f64>, radius_m: f64) -> bool {
        self.contains(point_m) || self.distance_to_boundary(point_m) <= radius_m
    }

    pub fn aabb(&self) -> Aabb {
        let mut min_m = self.vertices_m[0];
        let mut max_m = self.vertices_m[0];

        for v in self.vertices_m.iter().skip(1) {
            min_m.x = min_m.x.min(v.x);
            min_m.y = min_m.y.min(v.y);
            max_m.x = max_m.x.max(v.x);
            max_m.y = max_m.y.max(v.y);
        }

        Aabb { min_m, max_m }
    }
}

impl Aabb {
    /// Grow the box by `margin_m` on every side.
    pub fn grown(&self, margin_m: f64) -> Self {
        Self {
            min_m: Point2::new(self.min_m.x - margin_m, self.min_m.y - margin_m),
            max_m: Point2::new(self.max_m.x + margin_m, self.max_m.y + margin_m),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    // Degenerate segment
    if len_sq == 0.0 {
        return (p - a).norm();
    }

    let t = ((p - a).dot(&ab) / len_sq).max(0.0).min(1.0);
    let closest = a + ab * t;

    (p - closest).norm()
}

#[cfg(test)]
mod test {
    use super::*;

    fn square() -> Polygon {
        Polygon::from_pairs(&[[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0]]).unwrap()
    }

    #[test]
    fn test_degenerate_rejected() {
        assert!(Polygon::from_pairs(&[[0.0, 0.0], [1.0, 1.0]]).is_none());
        assert!(Polygon::from_pairs(&[[0.0, 0.0], [1.0, 1.0], [std::f64::NAN, 0.0]]).is_none());

        let lists = vec![
            vec![[0.0, 0.0], [1.0, 0.0]],
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
        ];
        assert_eq!(Polygon::from_pair_lists(&lists).len(), 1);
    }

    #[test]
    fn test_contains() {
        let sq = square();

        assert!(sq.contains(&Point2::new(1.5, 1.5)));
        assert!(!sq.contains(&Point2::new(0.5, 1.5)));
        assert!(!sq.contains(&Point2::new(2.5, 2.5)));

        // Concave polygon, the notch is outside
        let u = Polygon::from_pairs(&[
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 3.0],
            [2.0, 3.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 3.0],
            [0.0, 3.0],
        ])
        .unwrap();
        assert!(!u.contains(&Point2::new(1.5, 2.0)));
        assert!(u.contains(&Point2::new(0.5, 2.0)));
    }

    #[test]
    fn test_distance_to_boundary() {
        let sq = square();

        assert!((sq.distance_to_boundary(&Point2::new(1.5, 1.5)) - 0.5).abs() < 1e-12);
        assert!((sq.distance_to_boundary(&Point2::new(0.0, 1.5)) - 1.0).abs() < 1e-12);
        assert!((sq.distance_to_boundary(&Point2::new(3.0, 3.0)) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_inflated_contains() {
        let sq = square();

        assert!(sq.inflated_contains(&Point2::new(0.8, 1.5), 0.25));
        assert!(!sq.inflated_contains(&Point2::new(0.7, 1.5), 0.25));
        // Rounded corners
        assert!(!sq.inflated_contains(&Point2::new(0.8, 0.8), 0.25));
        assert!(sq.inflated_contains(&Point2::new(0.85, 0.85), 0.25));
    }

    #[test]
    fn test_aabb() {
        let bb = square().aabb().grown(0.5);

        assert_eq!(bb.min_m, Point2::new(0.5, 0.5));
        assert_eq!(bb.max_m, Point2::new(2.5, 2.5));
    }
}
