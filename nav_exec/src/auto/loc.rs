//! # Localisation
//!
//! The robot has no external localisation source, its pose is dead-reckoned by
//! the navigation controller's kinematic update.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pose of the robot in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in meters.
    pub position_m: Point2<f64>,

    /// Heading in degrees, counter-clockwise from the +ve x axis, in `[0, 360)`.
    pub heading_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    pub fn new(position_m: Point2<f64>, heading_deg: f64) -> Self {
        Self {
            position_m,
            heading_deg: util::maths::wrap_360(heading_deg),
        }
    }

    /// Unit vector pointing along the heading.
    pub fn forward(&self) -> Vector2<f64> {
        let h = self.heading_deg.to_radians();
        Vector2::new(h.cos(), h.sin())
    }

    /// Bearing from this pose's position to the target, in degrees `[0, 360)`.
    pub fn bearing_to(&self, target_m: &Point2<f64>) -> f64 {
        let d = target_m - self.position_m;
        util::maths::wrap_360(d.y.atan2(d.x).to_degrees())
    }

    /// Signed heading error to face the target, in `(-180, 180]` degrees.
    pub fn heading_err_to(&self, target_m: &Point2<f64>) -> f64 {
        util::maths::ang_err_deg(self.heading_deg, self.bearing_to(target_m))
    }

    pub fn distance_to(&self, target_m: &Point2<f64>) -> f64 {
        (target_m - self.position_m).norm()
    }
}
