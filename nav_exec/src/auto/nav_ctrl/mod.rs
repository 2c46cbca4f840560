//! # Navigation controller
//!
//! This module implements the [`NavCtrl`] state machine, which drives the robot from its home pose
//! to a destination and back again. A round trip is broken down into a number of phases:
//!
//! - `Navigating` - Following the outbound leg of the route waypoint by waypoint.
//! - `FinalApproach` - Slowly closing on the exact destination.
//! - `Paused` - Dwelling at the destination.
//! - `Returning` - Following the return leg back to base.
//! - `AdjustingFinalAngle` - Rotating on the spot to the home heading.
//! - `EmergencyStop` - Stopped because a forbidden area is too close, holding the interrupted
//!   phase until the cool-down has elapsed.
//!
//! Outside of a round trip the controller is either `IDLE` or `COMPLETED`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod emergency;
mod final_angle;
mod final_approach;
pub mod motion;
mod navigate;
mod params;
mod pause;
pub mod route;
pub mod status;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub mod states {
    pub use super::emergency::Emergency;
    pub use super::final_angle::FinalAngle;
    pub use super::final_approach::FinalApproach;
    pub use super::navigate::Navigate;
    pub use super::pause::Pause;
}

pub use self::{
    motion::{MotionCmd, WheelDemand},
    params::{DriveLawParams, NavCtrlParams},
    route::{Leg, LegReport, PlannedRoute},
    status::{NavEvent, NavState, NavStatus},
};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use log::{info, trace, warn};
use nalgebra::Point2;
use states::*;
use thiserror::Error;

use crate::{
    auto::{
        loc::Pose,
        map::{ObstacleIndex, Polygon},
        nav::PathPlanner,
    },
    motor_driver::MotorDriver,
    params::NavParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Navigation controller
///
/// Owns the motor driver, the planner and the live navigation session. The caller is expected to
/// call [`NavCtrl::tick`] at a fixed cadence.
pub struct NavCtrl<D: MotorDriver> {
    params: NavParams,

    driver: D,

    planner: PathPlanner,

    /// The forbidden areas the current obstacle index was built from.
    forbidden_areas: Vec<Polygon>,

    pose: Pose,

    /// The live round trip, `None` when idle or completed.
    session: Option<NavSession>,

    /// Reported state while no session is active, either `Idle` or `Completed`.
    inactive_state: NavState,

    autonomous: bool,

    speed_multiplier: f64,

    last_event: Option<NavEvent>,

    last_demand: WheelDemand,
}

/// State of one round trip.
#[derive(Debug, Clone)]
struct NavSession {
    route: PlannedRoute,

    /// Index of the waypoint currently targeted.
    path_index: usize,

    /// Time left during which the proximity check is suppressed.
    grace_remaining_s: f64,

    phase: NavPhase,

    /// Mode to return to once the session ends.
    restore_autonomous: bool,
}

/// Data a phase needs for one step.
pub struct StepCtx<'a> {
    pub params: &'a NavCtrlParams,
    pub pose: &'a Pose,
    pub route: &'a PlannedRoute,
    pub speed_multiplier: f64,
    pub home_heading_deg: f64,
    pub max_turn_rate_degs: f64,
    pub dt_s: f64,
}

/// Output of a phase's step function.
pub struct StepOutput {
    /// Action to perform on the session
    pub action: PhaseAction,

    /// What to do with the motors this cycle
    pub drive: DriveCmd,

    /// Condition to surface in the status
    pub event: Option<NavEvent>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a command is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavCmdError {
    #[error("A navigation is already in progress")]
    AlreadyNavigating,

    #[error("Manual commands are not accepted in autonomous mode")]
    ManualWhileAutonomous,

    #[error("Manual command values must be finite, got forward = {0}, turn = {1}")]
    InvalidManualCmd(f64, f64),

    #[error("Speed multiplier must be finite, got {0}")]
    InvalidSpeedMultiplier(f64),

    #[error("The route is inconsistent: its destination index does not address the destination")]
    InvalidRoute,
}

#[derive(Debug, Clone)]
pub enum NavPhase {
    Navigating(Navigate),
    FinalApproach(FinalApproach),
    Paused(Pause),
    Returning(Navigate),
    AdjustingFinalAngle(FinalAngle),
    EmergencyStop(Emergency),
}

/// Actions that can be performed on the session at the end of a phase's step function.
#[derive(Debug)]
pub enum PhaseAction {
    None,
    Transition(NavPhase),

    /// Leave an emergency stop and resume the given phase.
    Resume(NavPhase),

    /// End the round trip.
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCmd {
    Stop,
    Motion {
        cmd: MotionCmd,
        wheel_limit_pct: f64,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<D: MotorDriver> NavCtrl<D> {
    /// Create a new controller at the home pose with no forbidden areas.
    pub fn new(params: NavParams, driver: D) -> Self {
        let index = ObstacleIndex::rebuild(
            params.map,
            &[],
            params.robot.inflation_radius_m,
            params.robot.width_m,
        );
        let planner = PathPlanner::new(Arc::new(index), params.planner);
        let pose = params.robot.home_pose();
        let speed_multiplier = params.ctrl.speed_multiplier_range[0];

        Self {
            params,
            driver,
            planner,
            forbidden_areas: Vec::new(),
            pose,
            session: None,
            inactive_state: NavState::Idle,
            autonomous: false,
            speed_multiplier,
            last_event: None,
            last_demand: WheelDemand::zero(),
        }
    }

    // ---- COMMANDS ----

    /// Plan a route from the current pose to `destination_m` and back to `base_m`, and start
    /// following it.
    pub fn navigate_to_and_return(
        &mut self,
        destination_m: Point2<f64>,
        base_m: Point2<f64>,
    ) -> Result<(), NavCmdError> {
        if self.session.is_some() {
            return Err(self.reject(NavCmdError::AlreadyNavigating));
        }

        let route = self.plan_route(destination_m, base_m);
        self.begin_route(route)
    }

    /// Plan a route from the current pose without touching the controller's state.
    pub fn plan_route(&self, destination_m: Point2<f64>, base_m: Point2<f64>) -> PlannedRoute {
        PlannedRoute::plan(
            &self.planner,
            self.pose.position_m,
            destination_m,
            base_m,
            self.params.ctrl.final_approach_dist_m,
        )
    }

    /// Start following a route planned with [`NavCtrl::plan_route`].
    ///
    /// The controller is autonomous while the route is followed. When the session ends the mode
    /// in force before it started is restored.
    pub fn begin_route(&mut self, route: PlannedRoute) -> Result<(), NavCmdError> {
        if self.session.is_some() {
            return Err(self.reject(NavCmdError::AlreadyNavigating));
        }
        if !route.is_valid() {
            return Err(self.reject(NavCmdError::InvalidRoute));
        }

        info!(
            "Starting navigation to ({:.3}, {:.3}), {} waypoints, base ({:.3}, {:.3})",
            route.destination_m.x,
            route.destination_m.y,
            route.path.get_num_points(),
            route.base_m.x,
            route.base_m.y
        );

        for (leg, report) in [(Leg::Outbound, &route.outbound), (Leg::Return, &route.ret)].iter() {
            if report.outcome.is_degraded() {
                self.last_event = Some(NavEvent::PlanningDegraded {
                    leg: *leg,
                    outcome: report.outcome,
                });
            }
        }

        self.session = Some(NavSession {
            route,
            path_index: 0,
            grace_remaining_s: 0.0,
            phase: NavPhase::Navigating(Navigate::outbound()),
            restore_autonomous: self.autonomous,
        });
        self.autonomous = true;

        info!(
            "Navigation state change to: {}",
            NavState::NavigatingToDestination
        );

        Ok(())
    }

    /// Stop, drop any session and return to the home pose in `IDLE`. Forbidden areas are kept.
    pub fn reset_to_initial_state(&mut self) {
        self.finalize();

        self.pose = self.params.robot.home_pose();
        self.inactive_state = NavState::Idle;
        self.last_event = None;

        info!(
            "Reset to home ({:.3}, {:.3}) heading {:.1} deg, {} forbidden areas kept",
            self.pose.position_m.x,
            self.pose.position_m.y,
            self.pose.heading_deg,
            self.forbidden_areas.len()
        );
    }

    /// Set the speed multiplier, clamped into the configured range.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<(), NavCmdError> {
        if !multiplier.is_finite() {
            return Err(self.reject(NavCmdError::InvalidSpeedMultiplier(multiplier)));
        }

        let [min, max] = self.params.ctrl.speed_multiplier_range;
        let clamped = util::maths::clamp(multiplier, min, max);
        if clamped != multiplier {
            warn!(
                "Speed multiplier {} outside [{}, {}], clamped to {}",
                multiplier, min, max, clamped
            );
        }

        self.speed_multiplier = clamped;
        info!("Speed multiplier set to {}", clamped);

        Ok(())
    }

    /// Replace the forbidden areas and rebuild the obstacle index. An active route is kept as
    /// planned.
    pub fn set_forbidden_areas(&mut self, areas: Vec<Polygon>) {
        let index = ObstacleIndex::rebuild(
            self.params.map,
            &areas,
            self.params.robot.inflation_radius_m,
            self.params.robot.width_m,
        );

        info!(
            "{} forbidden areas set, {} of {} cells blocked",
            areas.len(),
            index.num_blocked(),
            index.num_cells()
        );

        self.planner.set_index(Arc::new(index));
        self.forbidden_areas = areas;
    }

    /// Switch between autonomous and manual mode. Leaving autonomous mode ends any active route.
    /// Enabling it during a route keeps it enabled after the route ends.
    pub fn set_autonomous_mode(&mut self, autonomous: bool) {
        if !autonomous {
            if self.session.is_some() {
                warn!("Autonomous mode disabled, ending the active navigation");
            }
            self.finalize();
        } else if let Some(ref mut session) = self.session {
            session.restore_autonomous = true;
        }

        self.autonomous = autonomous;
        info!("Autonomous mode: {}", autonomous);
    }

    /// Drive the wheels directly. Only accepted in manual mode, which a finished or reset route
    /// returns to unless autonomous mode was set before it.
    pub fn move_manual(&mut self, forward: f64, turn: f64) -> Result<(), NavCmdError> {
        if self.autonomous {
            return Err(self.reject(NavCmdError::ManualWhileAutonomous));
        }
        if !forward.is_finite() || !turn.is_finite() {
            return Err(self.reject(NavCmdError::InvalidManualCmd(forward, turn)));
        }

        let demand = MotionCmd::new(forward, turn).to_wheels(100.0);
        self.send_demand(demand);

        Ok(())
    }

    /// Stop and release the motor driver.
    pub fn cleanup(&mut self) {
        self.finalize();

        if let Err(e) = self.driver.cleanup() {
            warn!("Motor driver cleanup failed: {}", e);
        }
    }

    // ---- CYCLE ----

    /// Run one control cycle of `dt_s` seconds.
    pub fn tick(&mut self, dt_s: f64) {
        let session = match self.session.as_mut() {
            Some(s) => s,
            None => return,
        };

        // Proximity check
        if session.phase.is_moving() {
            if session.grace_remaining_s > 0.0 {
                session.grace_remaining_s = (session.grace_remaining_s - dt_s).max(0.0);
            } else if let Some(distance_m) =
                nearest_area_distance(&self.forbidden_areas, &self.pose.position_m)
            {
                if distance_m < self.params.ctrl.emergency_dist_m {
                    warn!(
                        "Forbidden area {:.3} m away at ({:.3}, {:.3}), emergency stop",
                        distance_m, self.pose.position_m.x, self.pose.position_m.y
                    );

                    let interrupted = std::mem::replace(
                        &mut session.phase,
                        NavPhase::AdjustingFinalAngle(FinalAngle::new()),
                    );
                    session.phase = NavPhase::EmergencyStop(Emergency::new(interrupted));
                    info!("Navigation state change to: {}", NavState::EmergencyStop);

                    self.last_event = Some(NavEvent::EmergencyCondition { distance_m });
                    self.apply_drive(DriveCmd::Stop, dt_s);
                    return;
                }
            }
        }

        let ctx = StepCtx {
            params: &self.params.ctrl,
            pose: &self.pose,
            route: &session.route,
            speed_multiplier: self.speed_multiplier,
            home_heading_deg: self.params.robot.home_heading_deg,
            max_turn_rate_degs: self.params.robot.max_turn_rate_degs,
            dt_s,
        };

        let output = session.phase.step(&ctx, &mut session.path_index);

        if let Some(event) = output.event {
            self.last_event = Some(event);
        }

        match output.action {
            PhaseAction::None => (),
            PhaseAction::Transition(phase) => {
                info!("Navigation state change to: {}", phase.state());
                session.phase = phase;
            }
            PhaseAction::Resume(phase) => {
                info!("Navigation state change to: {}", phase.state());
                session.grace_remaining_s = self.params.ctrl.emergency_grace_s;
                session.phase = phase;
            }
            PhaseAction::Finalize => {
                self.finalize();
                return;
            }
        }

        self.apply_drive(output.drive, dt_s);
    }

    // ---- QUERIES ----

    pub fn state(&self) -> NavState {
        match self.session {
            Some(ref s) => s.phase.state(),
            None => self.inactive_state,
        }
    }

    pub fn get_navigation_status(&self) -> NavStatus {
        let mut status = NavStatus {
            state: self.state(),
            progress: 0.0,
            estimated_time_remaining_s: 0.0,
            current_target: None,
            position_m: self.pose.position_m,
            heading_deg: self.pose.heading_deg,
            is_returning_to_base: false,
            is_paused_at_destination: false,
            navigation_active: self.session.is_some(),
            autonomous: self.autonomous,
            speed_multiplier: self.speed_multiplier,
            destination: None,
            last_event: self.last_event.clone(),
        };

        let session = match self.session {
            Some(ref s) => s,
            None => {
                if self.inactive_state == NavState::Completed {
                    status.progress = 1.0;
                }
                return status;
            }
        };

        let route = &session.route;
        let path = &route.path;
        let phase = session.phase.effective();

        if path.get_num_points() > 1 {
            status.progress =
                (session.path_index as f64 / (path.get_num_points() - 1) as f64).min(1.0);
        }

        status.destination = Some(route.destination_m);
        status.is_returning_to_base = matches!(phase, NavPhase::Returning(_));
        status.is_paused_at_destination = matches!(phase, NavPhase::Paused(_));

        let ctrl = &self.params.ctrl;
        let (target, remaining_dist_m, remaining_dwell_s) = match phase {
            NavPhase::Navigating(_) | NavPhase::Returning(_) => {
                match path.points_m.get(session.path_index) {
                    Some(t) => (
                        Some(*t),
                        self.pose.distance_to(t) + path.get_length_from(session.path_index),
                        if matches!(phase, NavPhase::Navigating(_)) {
                            ctrl.dwell_time_s
                        } else {
                            0.0
                        },
                    ),
                    None => (None, 0.0, 0.0),
                }
            }
            NavPhase::FinalApproach(_) => (
                Some(route.destination_m),
                self.pose.distance_to(&route.destination_m)
                    + path.get_length_from(route.destination_index),
                ctrl.dwell_time_s,
            ),
            NavPhase::Paused(p) => (
                Some(route.destination_m),
                path.get_length_from(route.destination_index),
                p.remaining_s(ctrl.dwell_time_s),
            ),
            NavPhase::AdjustingFinalAngle(_) | NavPhase::EmergencyStop(_) => (None, 0.0, 0.0),
        };

        let cruise_speed_ms = ctrl.cruise.max_forward_cmd
            * self.speed_multiplier
            * self.params.robot.max_forward_speed_ms;

        status.current_target = target;
        status.estimated_time_remaining_s = if cruise_speed_ms > 0.0 {
            remaining_dist_m / cruise_speed_ms + remaining_dwell_s
        } else {
            remaining_dwell_s
        };

        status
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Override the pose, for example from an external localisation fix.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn params(&self) -> &NavParams {
        &self.params
    }

    pub fn route(&self) -> Option<&PlannedRoute> {
        self.session.as_ref().map(|s| &s.route)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn obstacle_index(&self) -> &Arc<ObstacleIndex> {
        self.planner.index()
    }

    pub fn forbidden_areas(&self) -> &[Polygon] {
        &self.forbidden_areas
    }

    /// The wheel demand sent on the last cycle.
    pub fn last_demand(&self) -> &WheelDemand {
        &self.last_demand
    }

    // ---- INTERNAL ----

    /// Stop the motors and end any active session as `COMPLETED`, restoring the mode from
    /// before the session.
    fn finalize(&mut self) {
        self.stop_motors();

        if let Some(session) = self.session.take() {
            self.autonomous = session.restore_autonomous;
            self.inactive_state = NavState::Completed;
            info!("Navigation state change to: {}", NavState::Completed);
        }
    }

    fn reject(&mut self, err: NavCmdError) -> NavCmdError {
        warn!("Command rejected: {}", err);
        self.last_event = Some(NavEvent::InvalidCommand {
            reason: err.to_string(),
        });
        err
    }

    fn apply_drive(&mut self, drive: DriveCmd, dt_s: f64) {
        match drive {
            DriveCmd::Stop => self.stop_motors(),
            DriveCmd::Motion {
                cmd,
                wheel_limit_pct,
            } => {
                let limit_pct = wheel_limit_pct.min(self.params.ctrl.wheel_limit_pct);
                let demand = cmd.to_wheels(limit_pct);

                self.send_demand(demand);
                self.pose = motion::integrate(
                    &self.pose,
                    &demand,
                    &self.params.robot,
                    &self.params.map,
                    dt_s,
                );

                trace!(
                    "cmd {:?} -> wheels ({:.1}, {:.1}) -> pose ({:.3}, {:.3}, {:.2})",
                    cmd,
                    demand.left_pct,
                    demand.right_pct,
                    self.pose.position_m.x,
                    self.pose.position_m.y,
                    self.pose.heading_deg
                );
            }
        }
    }

    fn send_demand(&mut self, demand: WheelDemand) {
        if let Err(e) = self.driver.set_speed(demand.left_pct, demand.right_pct) {
            warn!("Motor driver rejected demand {:?}: {}", demand, e);
        }
        self.last_demand = demand;
    }

    fn stop_motors(&mut self) {
        if let Err(e) = self.driver.stop() {
            warn!("Motor driver failed to stop: {}", e);
        }
        self.last_demand = WheelDemand::zero();
    }
}

impl NavPhase {
    pub fn state(&self) -> NavState {
        match self {
            NavPhase::Navigating(_) => NavState::NavigatingToDestination,
            NavPhase::FinalApproach(_) => NavState::FinalApproach,
            NavPhase::Paused(_) => NavState::PausedAtDestination,
            NavPhase::Returning(_) => NavState::ReturningToBase,
            NavPhase::AdjustingFinalAngle(_) => NavState::AdjustingFinalAngle,
            NavPhase::EmergencyStop(_) => NavState::EmergencyStop,
        }
    }

    /// True for the phases in which the robot moves and the proximity check runs.
    pub fn is_moving(&self) -> bool {
        !matches!(self, NavPhase::Paused(_) | NavPhase::EmergencyStop(_))
    }

    /// The phase the session is logically in, looking through an emergency stop.
    pub fn effective(&self) -> &NavPhase {
        match self {
            NavPhase::EmergencyStop(e) => e.interrupted().map_or(self, |p| p.effective()),
            _ => self,
        }
    }

    pub fn step(&mut self, ctx: &StepCtx, path_index: &mut usize) -> StepOutput {
        match self {
            NavPhase::Navigating(s) | NavPhase::Returning(s) => s.step(ctx, path_index),
            NavPhase::FinalApproach(s) => s.step(ctx),
            NavPhase::Paused(s) => s.step(ctx, path_index),
            NavPhase::AdjustingFinalAngle(s) => s.step(ctx),
            NavPhase::EmergencyStop(s) => s.step(ctx),
        }
    }
}

#[cfg(test)]
impl<'a> StepCtx<'a> {
    /// Context for the default robot on a 0.1 s cycle.
    pub(crate) fn for_test(
        params: &'a NavCtrlParams,
        pose: &'a Pose,
        route: &'a PlannedRoute,
    ) -> Self {
        let robot = crate::params::RobotParams::default();
        Self {
            params,
            pose,
            route,
            speed_multiplier: 1.0,
            home_heading_deg: robot.home_heading_deg,
            max_turn_rate_degs: robot.max_turn_rate_degs,
            dt_s: 0.1,
        }
    }
}

impl StepOutput {
    /// Stop the motors and move to the given phase.
    pub fn transition(phase: NavPhase) -> Self {
        Self {
            action: PhaseAction::Transition(phase),
            drive: DriveCmd::Stop,
            event: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Distance to the nearest forbidden area edge, `None` without any areas.
fn nearest_area_distance(areas: &[Polygon], point_m: &Point2<f64>) -> Option<f64> {
    areas
        .iter()
        .map(|a| a.distance_to_boundary(point_m))
        .fold(None, |min, d| match min {
            Some(m) if m <= d => Some(m),
            _ => Some(d),
        })
}
