//! # Navigation controller parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the [`super::NavCtrl`] phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavCtrlParams {
    /// Hard limit on the magnitude of either wheel output during autonomous phases, in percent.
    pub wheel_limit_pct: f64,

    /// Tighter wheel limit applied during the final approach, in percent.
    pub final_approach_wheel_limit_pct: f64,

    /// Arrival tolerance for intermediate waypoints of the outbound leg.
    pub waypoint_tol_m: f64,

    /// Arrival tolerance for the waypoint preceding the destination.
    pub pre_destination_tol_m: f64,

    /// Arrival tolerance for waypoints of the return leg.
    pub return_waypoint_tol_m: f64,

    /// Time without getting closer to a waypoint after which it is skipped.
    pub waypoint_stall_timeout_s: f64,

    /// Smallest reduction in distance that counts as progress towards a waypoint.
    pub stall_progress_m: f64,

    /// Distance before the destination at which a staging waypoint is inserted.
    pub final_approach_dist_m: f64,

    /// Success tolerance of the final approach.
    pub final_approach_tol_m: f64,

    /// Watchdog on the final approach, after which success is forced.
    pub final_approach_timeout_s: f64,

    /// Y error above which the final approach may translate along Y first.
    pub y_priority_min_m: f64,

    /// Time spent stationary at the destination.
    pub dwell_time_s: f64,

    /// Tolerance on the home heading.
    pub final_angle_tol_deg: f64,

    /// Turn command used while adjusting the final angle.
    pub final_angle_turn_cmd: f64,

    /// Distance to a forbidden area edge below which the robot stops.
    pub emergency_dist_m: f64,

    /// Time the robot stays stopped before resuming.
    pub emergency_cooldown_s: f64,

    /// Time after resuming during which the proximity check is suppressed.
    pub emergency_grace_s: f64,

    /// Allowed range of the speed multiplier.
    pub speed_multiplier_range: [f64; 2],

    /// Motion law for travelling between waypoints. The forward limit is scaled by the speed
    /// multiplier.
    pub cruise: DriveLawParams,

    /// Motion law for the final approach along the bearing to the destination.
    pub approach_bearing: DriveLawParams,

    /// Motion law for the final approach when translating along Y.
    pub approach_y: DriveLawParams,
}

/// A proportional turn-then-drive law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveLawParams {
    /// Heading error above which the robot turns on the spot.
    pub angle_tol_deg: f64,

    /// Maximum turn command when turning on the spot.
    pub max_turn_cmd: f64,

    /// Turn command = heading error / this.
    pub turn_err_div_deg: f64,

    /// Maximum forward command.
    pub max_forward_cmd: f64,

    /// Forward command = remaining distance / this.
    pub forward_dist_div_m: f64,

    /// Heading error above which a trim turn is added while driving forward.
    pub trim_threshold_deg: f64,

    /// Maximum trim turn command, zero disables trim.
    pub max_trim_cmd: f64,

    /// Trim command = heading error / this.
    pub trim_err_div_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NavCtrlParams {
    fn default() -> Self {
        Self {
            wheel_limit_pct: 30.0,
            final_approach_wheel_limit_pct: 15.0,
            waypoint_tol_m: 0.12,
            pre_destination_tol_m: 0.15,
            return_waypoint_tol_m: 0.08,
            waypoint_stall_timeout_s: 10.0,
            stall_progress_m: 0.01,
            final_approach_dist_m: 0.3,
            final_approach_tol_m: 0.05,
            final_approach_timeout_s: 15.0,
            y_priority_min_m: 0.02,
            dwell_time_s: 2.0,
            final_angle_tol_deg: 1.0,
            final_angle_turn_cmd: 0.15,
            emergency_dist_m: 0.2,
            emergency_cooldown_s: 2.0,
            emergency_grace_s: 3.0,
            speed_multiplier_range: [1.0, 2.0],
            cruise: DriveLawParams {
                angle_tol_deg: 3.0,
                max_turn_cmd: 0.5,
                turn_err_div_deg: 30.0,
                max_forward_cmd: 0.15,
                forward_dist_div_m: 1.5,
                trim_threshold_deg: 1.5,
                max_trim_cmd: 0.1,
                trim_err_div_deg: 40.0,
            },
            approach_bearing: DriveLawParams {
                angle_tol_deg: 2.0,
                max_turn_cmd: 0.1,
                turn_err_div_deg: 60.0,
                max_forward_cmd: 0.08,
                forward_dist_div_m: 0.8,
                trim_threshold_deg: 0.5,
                max_trim_cmd: 0.05,
                trim_err_div_deg: 80.0,
            },
            approach_y: DriveLawParams {
                angle_tol_deg: 1.0,
                max_turn_cmd: 0.12,
                turn_err_div_deg: 50.0,
                max_forward_cmd: 0.1,
                forward_dist_div_m: 0.6,
                trim_threshold_deg: 0.5,
                max_trim_cmd: 0.0,
                trim_err_div_deg: 80.0,
            },
        }
    }
}
