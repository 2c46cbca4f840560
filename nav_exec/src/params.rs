//! # Navigation executable parameters
//!
//! All tunable constants of the navigation stack, loaded once from `nav.toml` and injected into
//! the controller at construction.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::auto::{
    loc::Pose,
    map::GridParams,
    nav::PathPlannerParams,
    nav_ctrl::NavCtrlParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the whole navigation stack.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavParams {
    pub map: GridParams,
    pub robot: RobotParams,
    pub planner: PathPlannerParams,
    pub ctrl: NavCtrlParams,
    pub gpio: GpioParams,
}

/// Physical properties of the robot and its home pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotParams {
    /// Width of the robot's body
    pub width_m: f64,

    /// Safety margin around forbidden areas used when planning
    pub inflation_radius_m: f64,

    /// Position the robot starts from and returns to
    pub home_position_m: [f64; 2],

    pub home_heading_deg: f64,

    /// Forward speed at 100% on both wheels
    pub max_forward_speed_ms: f64,

    /// Turn rate at +/-100% on the wheels
    pub max_turn_rate_degs: f64,
}

/// Pin assignment of the GPIO motor driver. Pins use BCM numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioParams {
    pub left_direction_pin: u8,
    pub left_brake_pin: u8,
    pub right_direction_pin: u8,
    pub right_brake_pin: u8,

    /// Left motor on hardware PWM channel 0, right motor on channel 1.
    pub pwm_frequency_hz: f64,

    pub left_inverted: bool,
    pub right_inverted: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RobotParams {
    fn default() -> Self {
        Self {
            width_m: 0.35,
            inflation_radius_m: 0.35,
            home_position_m: [5.7, 11.5],
            home_heading_deg: 270.0,
            max_forward_speed_ms: 1.0,
            max_turn_rate_degs: 90.0,
        }
    }
}

impl Default for GpioParams {
    fn default() -> Self {
        Self {
            left_direction_pin: 5,
            left_brake_pin: 6,
            right_direction_pin: 16,
            right_brake_pin: 20,
            pwm_frequency_hz: 1000.0,
            left_inverted: false,
            right_inverted: true,
        }
    }
}

impl RobotParams {
    pub fn home_m(&self) -> Point2<f64> {
        Point2::new(self.home_position_m[0], self.home_position_m[1])
    }

    pub fn home_pose(&self) -> Pose {
        Pose::new(self.home_m(), self.home_heading_deg)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let params: NavParams = util::params::from_toml_str(
            r#"
            [robot]
            home_position_m = [1.0, 2.0]

            [ctrl]
            dwell_time_s = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(params.robot.home_m(), Point2::new(1.0, 2.0));
        assert_eq!(params.robot.home_heading_deg, 270.0);
        assert_eq!(params.ctrl.dwell_time_s, 5.0);
        assert_eq!(params.ctrl.wheel_limit_pct, 30.0);
        assert_eq!(params.map, GridParams::default());
    }
}
