//! # Navigation status
//!
//! The snapshot returned by [`super::NavCtrl::get_navigation_status`], along with the externally
//! visible state and the conditions the controller surfaces.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::{self, Display};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::route::Leg;
use crate::auto::nav::PlanOutcome;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavStatus {
    pub state: NavState,

    /// Fraction of the route's waypoints reached, in `[0, 1]`.
    pub progress: f64,

    pub estimated_time_remaining_s: f64,

    pub current_target: Option<Point2<f64>>,

    pub position_m: Point2<f64>,

    pub heading_deg: f64,

    pub is_returning_to_base: bool,

    pub is_paused_at_destination: bool,

    pub navigation_active: bool,

    pub autonomous: bool,

    pub speed_multiplier: f64,

    pub destination: Option<Point2<f64>>,

    pub last_event: Option<NavEvent>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// State of the navigation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavState {
    Idle,
    NavigatingToDestination,
    FinalApproach,
    PausedAtDestination,
    ReturningToBase,
    AdjustingFinalAngle,
    Completed,
    EmergencyStop,
}

/// A non-fatal condition surfaced through the status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum NavEvent {
    /// A leg could not be planned to the exact goal.
    PlanningDegraded { leg: Leg, outcome: PlanOutcome },

    /// A phase watchdog forced its completion.
    PhaseTimeout { phase: NavState, elapsed_s: f64 },

    /// The robot came too close to a forbidden area and was stopped.
    EmergencyCondition { distance_m: f64 },

    /// A command was rejected.
    InvalidCommand { reason: String },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavState::Idle => "IDLE",
            NavState::NavigatingToDestination => "NAVIGATING_TO_DESTINATION",
            NavState::FinalApproach => "FINAL_APPROACH",
            NavState::PausedAtDestination => "PAUSED_AT_DESTINATION",
            NavState::ReturningToBase => "RETURNING_TO_BASE",
            NavState::AdjustingFinalAngle => "ADJUSTING_FINAL_ANGLE",
            NavState::Completed => "COMPLETED",
            NavState::EmergencyStop => "EMERGENCY_STOP",
        }
    }

    /// True in `Idle` and `Completed`, the states which accept a new route.
    pub fn is_inactive(&self) -> bool {
        matches!(self, NavState::Idle | NavState::Completed)
    }
}

impl Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl NavEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NavEvent::PlanningDegraded { .. } => "PlanningDegraded",
            NavEvent::PhaseTimeout { .. } => "PhaseTimeout",
            NavEvent::EmergencyCondition { .. } => "EmergencyCondition",
            NavEvent::InvalidCommand { .. } => "InvalidCommand",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(
            serde_json::to_string(&NavState::PausedAtDestination).unwrap(),
            "\"PAUSED_AT_DESTINATION\""
        );
        assert_eq!(NavState::AdjustingFinalAngle.to_string(), "ADJUSTING_FINAL_ANGLE");

        let s: NavState = serde_json::from_str("\"EMERGENCY_STOP\"").unwrap();
        assert_eq!(s, NavState::EmergencyStop);
    }

    #[test]
    fn test_event_json() {
        let e = NavEvent::EmergencyCondition { distance_m: 0.1 };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["kind"], "EmergencyCondition");
        assert_eq!(v["distance_m"], 0.1);
    }
}
