//! # Motion law and kinematics
//!
//! Converts heading and distance errors into normalised forward/turn commands, maps those onto
//! differential drive wheel outputs, and integrates the resulting motion.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use util::maths::{clamp, signed_sat, wrap_360};

use super::params::DriveLawParams;
use crate::auto::{loc::Pose, map::GridParams};
use crate::params::RobotParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Normalised motion command. Forward and turn of `1.0` correspond to 100% on the wheels.
/// Positive turn is counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionCmd {
    pub forward: f64,
    pub turn: f64,
}

/// Wheel outputs in percent, `[-100, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelDemand {
    pub left_pct: f64,
    pub right_pct: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCmd {
    pub fn new(forward: f64, turn: f64) -> Self {
        Self { forward, turn }
    }

    pub fn turn_only(turn: f64) -> Self {
        Self { forward: 0.0, turn }
    }

    /// Map onto wheel outputs, `left = forward - turn`, `right = forward + turn`, then clamp both
    /// to `limit_pct`.
    pub fn to_wheels(&self, limit_pct: f64) -> WheelDemand {
        let limit = limit_pct.abs().min(100.0);
        WheelDemand {
            left_pct: clamp((self.forward - self.turn) * 100.0, -limit, limit),
            right_pct: clamp((self.forward + self.turn) * 100.0, -limit, limit),
        }
    }
}

impl WheelDemand {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Effective forward command of this demand.
    pub fn forward_cmd(&self) -> f64 {
        (self.left_pct + self.right_pct) / 200.0
    }

    /// Effective turn command of this demand.
    pub fn turn_cmd(&self) -> f64 {
        (self.right_pct - self.left_pct) / 200.0
    }

    pub fn max_abs_pct(&self) -> f64 {
        self.left_pct.abs().max(self.right_pct.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.left_pct == 0.0 && self.right_pct == 0.0
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Proportional turn-then-drive law.
///
/// While the heading error exceeds the law's tolerance the robot turns on the spot. Otherwise it
/// drives forward proportionally to `dist_m`, with a small trim turn for residual error.
/// `forward_scale` multiplies the forward limit (the speed multiplier).
pub fn drive_law(
    heading_err_deg: f64,
    dist_m: f64,
    law: &DriveLawParams,
    forward_scale: f64,
) -> MotionCmd {
    let abs_err = heading_err_deg.abs();

    if abs_err > law.angle_tol_deg {
        return MotionCmd::turn_only(signed_sat(
            abs_err / law.turn_err_div_deg,
            law.max_turn_cmd,
            heading_err_deg,
        ));
    }

    let forward = (law.max_forward_cmd * forward_scale).min(dist_m.max(0.0) / law.forward_dist_div_m);

    let turn = if law.max_trim_cmd > 0.0 && abs_err > law.trim_threshold_deg {
        signed_sat(abs_err / law.trim_err_div_deg, law.max_trim_cmd, heading_err_deg)
    } else {
        0.0
    };

    MotionCmd::new(forward, turn)
}

/// Advance the pose by one step of the given wheel demand.
///
/// The heading is updated first, then the position moves along the new heading. The position is
/// limited to the map bounds less the robot's radius.
pub fn integrate(
    pose: &Pose,
    demand: &WheelDemand,
    robot: &RobotParams,
    grid: &GridParams,
    dt_s: f64,
) -> Pose {
    let heading_deg = wrap_360(
        pose.heading_deg + robot.max_turn_rate_degs * demand.turn_cmd() * dt_s,
    );

    let dist_m = robot.max_forward_speed_ms * demand.forward_cmd() * dt_s;
    let heading_rad = heading_deg.to_radians();

    let radius_m = robot.width_m / 2.0;
    let position_m = Point2::new(
        clamp(
            pose.position_m.x + dist_m * heading_rad.cos(),
            radius_m,
            grid.width_m - radius_m,
        ),
        clamp(
            pose.position_m.y + dist_m * heading_rad.sin(),
            radius_m,
            grid.height_m - radius_m,
        ),
    );

    Pose {
        position_m,
        heading_deg,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::nav_ctrl::NavCtrlParams;

    #[test]
    fn test_to_wheels_clamped() {
        let w = MotionCmd::new(0.25, 0.1).to_wheels(30.0);
        assert!((w.left_pct - 15.0).abs() < 1e-9);
        assert_eq!(w.right_pct, 30.0);

        let w = MotionCmd::turn_only(-0.5).to_wheels(30.0);
        assert_eq!(w, WheelDemand { left_pct: 30.0, right_pct: -30.0 });
        assert!((w.turn_cmd() + 0.3).abs() < 1e-12);
        assert_eq!(w.forward_cmd(), 0.0);
    }

    #[test]
    fn test_drive_law() {
        let law = NavCtrlParams::default().cruise;

        // Large error, turn on the spot, saturated
        let c = drive_law(-90.0, 2.0, &law, 1.0);
        assert_eq!(c, MotionCmd::turn_only(-0.5));

        // Moderate error, proportional turn
        let c = drive_law(6.0, 2.0, &law, 1.0);
        assert!((c.turn - 0.2).abs() < 1e-12);
        assert_eq!(c.forward, 0.0);

        // Aligned, forward saturates at cruise scaled by the multiplier
        let c = drive_law(0.0, 2.0, &law, 2.0);
        assert!((c.forward - 0.3).abs() < 1e-12);
        assert_eq!(c.turn, 0.0);

        // Close to the target, proportional forward with trim
        let c = drive_law(2.0, 0.15, &law, 1.0);
        assert!((c.forward - 0.1).abs() < 1e-12);
        assert!((c.turn - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_integrate() {
        let robot = RobotParams::default();
        let grid = GridParams::default();
        let pose = Pose::new(Point2::new(3.0, 6.0), 90.0);

        // 20% on both wheels for 1 s at 1 m/s full scale
        let w = WheelDemand { left_pct: 20.0, right_pct: 20.0 };
        let p = integrate(&pose, &w, &robot, &grid, 1.0);
        assert!((p.position_m - Point2::new(3.0, 6.2)).norm() < 1e-9);
        assert_eq!(p.heading_deg, 90.0);

        // Spin on the spot
        let w = WheelDemand { left_pct: -10.0, right_pct: 10.0 };
        let p = integrate(&pose, &w, &robot, &grid, 1.0);
        assert_eq!(p.position_m, pose.position_m);
        assert!((p.heading_deg - 99.0).abs() < 1e-9);

        // Clamped at the map edge
        let pose = Pose::new(Point2::new(3.0, 11.8), 90.0);
        let w = WheelDemand { left_pct: 30.0, right_pct: 30.0 };
        let p = integrate(&pose, &w, &robot, &grid, 1.0);
        assert!((p.position_m.y - (12.0 - 0.175)).abs() < 1e-9);
    }
}
