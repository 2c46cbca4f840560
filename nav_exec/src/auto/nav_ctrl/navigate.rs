//! # Waypoint following
//!
//! Used for both legs of a route. On the outbound leg the phase hands over to
//! [`FinalApproach`] once the waypoint before the destination is reached. On the return leg it
//! hands over to [`FinalAngle`] once the path is exhausted.
//!
//! A waypoint the robot stops closing on for `waypoint_stall_timeout_s`, for example one beyond
//! the map edge, is skipped and reported as a [`NavEvent::PhaseTimeout`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Point2;

use super::{
    motion::drive_law,
    route::Leg,
    states::{FinalAngle, FinalApproach},
    DriveCmd, NavEvent, NavPhase, NavState, PhaseAction, StepCtx, StepOutput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Navigate {
    leg: Leg,

    /// Waypoint the progress watchdog is tracking.
    watched_index: Option<usize>,

    /// Closest the robot has come to the watched waypoint.
    best_dist_m: f64,

    /// Time since the robot last got closer to the watched waypoint.
    stalled_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Navigate {
    pub fn outbound() -> Self {
        Self::new(Leg::Outbound)
    }

    pub fn returning() -> Self {
        Self::new(Leg::Return)
    }

    fn new(leg: Leg) -> Self {
        Self {
            leg,
            watched_index: None,
            best_dist_m: std::f64::INFINITY,
            stalled_s: 0.0,
        }
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    pub fn state(&self) -> NavState {
        match self.leg {
            Leg::Outbound => NavState::NavigatingToDestination,
            Leg::Return => NavState::ReturningToBase,
        }
    }

    pub fn step(&mut self, ctx: &StepCtx, path_index: &mut usize) -> StepOutput {
        match self.leg {
            Leg::Outbound => self.step_outbound(ctx, path_index),
            Leg::Return => self.step_return(ctx, path_index),
        }
    }

    fn step_outbound(&mut self, ctx: &StepCtx, path_index: &mut usize) -> StepOutput {
        let dest_index = ctx.route.destination_index;

        // Several waypoints can be consumed in one cycle
        let target = loop {
            if *path_index >= dest_index {
                return StepOutput::transition(NavPhase::FinalApproach(FinalApproach::new()));
            }

            let target = ctx.route.path.points_m[*path_index];
            let dist_m = ctx.pose.distance_to(&target);

            if *path_index + 1 == dest_index && dist_m < ctx.params.pre_destination_tol_m {
                debug!("Reached pre-destination waypoint {}", path_index);
                *path_index = dest_index;
                return StepOutput::transition(NavPhase::FinalApproach(FinalApproach::new()));
            }

            if dist_m < ctx.params.waypoint_tol_m {
                debug!("Reached waypoint {}", path_index);
                *path_index += 1;
                continue;
            }

            break target;
        };

        if let Some(event) = self.check_progress(ctx, *path_index, &target) {
            *path_index += 1;
            if *path_index >= dest_index {
                return StepOutput {
                    event: Some(event),
                    ..StepOutput::transition(NavPhase::FinalApproach(FinalApproach::new()))
                };
            }
            return skip(event);
        }

        self.cruise_to(ctx, &target)
    }

    fn step_return(&mut self, ctx: &StepCtx, path_index: &mut usize) -> StepOutput {
        let num_points = ctx.route.path.get_num_points();

        while *path_index < num_points
            && ctx.pose.distance_to(&ctx.route.path.points_m[*path_index])
                < ctx.params.return_waypoint_tol_m
        {
            debug!("Reached return waypoint {}", path_index);
            *path_index += 1;
        }

        if *path_index >= num_points {
            return StepOutput::transition(NavPhase::AdjustingFinalAngle(FinalAngle::new()));
        }

        let target = ctx.route.path.points_m[*path_index];

        if let Some(event) = self.check_progress(ctx, *path_index, &target) {
            *path_index += 1;
            if *path_index >= num_points {
                return StepOutput {
                    event: Some(event),
                    ..StepOutput::transition(NavPhase::AdjustingFinalAngle(FinalAngle::new()))
                };
            }
            return skip(event);
        }

        self.cruise_to(ctx, &target)
    }

    /// Progress watchdog on the targeted waypoint. Returns the timeout event once the robot has
    /// not got closer to it for the stall timeout.
    fn check_progress(
        &mut self,
        ctx: &StepCtx,
        index: usize,
        target: &Point2<f64>,
    ) -> Option<NavEvent> {
        let dist_m = ctx.pose.distance_to(target);

        if self.watched_index != Some(index) {
            self.watched_index = Some(index);
            self.best_dist_m = dist_m;
            self.stalled_s = 0.0;
            return None;
        }

        if dist_m < self.best_dist_m - ctx.params.stall_progress_m {
            self.best_dist_m = dist_m;
            self.stalled_s = 0.0;
            return None;
        }

        self.stalled_s += ctx.dt_s;
        if self.stalled_s < ctx.params.waypoint_stall_timeout_s {
            return None;
        }

        warn!(
            "No progress towards waypoint {} ({:.3}, {:.3}) for {:.1} s, {:.3} m away, skipping it",
            index, target.x, target.y, self.stalled_s, dist_m
        );

        Some(NavEvent::PhaseTimeout {
            phase: self.state(),
            elapsed_s: self.stalled_s,
        })
    }

    fn cruise_to(&self, ctx: &StepCtx, target: &Point2<f64>) -> StepOutput {
        let cmd = drive_law(
            ctx.pose.heading_err_to(target),
            ctx.pose.distance_to(target),
            &ctx.params.cruise,
            ctx.speed_multiplier,
        );

        StepOutput {
            action: PhaseAction::None,
            drive: DriveCmd::Motion {
                cmd,
                wheel_limit_pct: ctx.params.wheel_limit_pct,
            },
            event: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Stop for this cycle and carry on with the next waypoint.
fn skip(event: NavEvent) -> StepOutput {
    StepOutput {
        action: PhaseAction::None,
        drive: DriveCmd::Stop,
        event: Some(event),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{loc::Pose, nav_ctrl::{NavCtrlParams, PlannedRoute}};

    /// Step until the phase reports an event, returning the number of steps taken and the output.
    fn step_until_event(
        nav: &mut Navigate,
        ctx: &StepCtx,
        path_index: &mut usize,
        max_steps: usize,
    ) -> Option<(usize, StepOutput)> {
        for i in 1..=max_steps {
            let out = nav.step(ctx, path_index);
            if out.event.is_some() {
                return Some((i, out));
            }
        }
        None
    }

    #[test]
    fn test_waypoint_advance() {
        let params = NavCtrlParams::default();
        let route = PlannedRoute::from_pairs(&[[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [1.0, 1.0]], 2);
        let mut nav = Navigate::outbound();
        let mut path_index = 0;

        let pose = Pose::new(Point2::new(1.05, 1.0), 0.0);
        let out = nav.step(&StepCtx::for_test(&params, &pose, &route), &mut path_index);
        assert_eq!(path_index, 1);
        assert!(matches!(out.action, PhaseAction::None));
        match out.drive {
            DriveCmd::Motion { cmd, wheel_limit_pct } => {
                assert!((cmd.forward - 0.15).abs() < 1e-9);
                assert_eq!(cmd.turn, 0.0);
                assert_eq!(wheel_limit_pct, params.wheel_limit_pct);
            }
            d => panic!("Unexpected drive {:?}", d),
        }

        // Pre-destination waypoint has the wider tolerance
        let pose = Pose::new(Point2::new(1.86, 1.0), 0.0);
        let out = nav.step(&StepCtx::for_test(&params, &pose, &route), &mut path_index);
        assert_eq!(path_index, 2);
        assert!(matches!(
            out.action,
            PhaseAction::Transition(NavPhase::FinalApproach(_))
        ));
    }

    #[test]
    fn test_stalled_waypoint_skipped() {
        let params = NavCtrlParams::default();
        let route = PlannedRoute::from_pairs(
            &[[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0], [1.0, 1.0]],
            3,
        );
        let pose = Pose::new(Point2::new(1.5, 1.0), 0.0);
        let ctx = StepCtx::for_test(&params, &pose, &route);
        let mut nav = Navigate::outbound();
        let mut path_index = 1;

        let (steps, out) = step_until_event(&mut nav, &ctx, &mut path_index, 200).unwrap();

        assert!(steps >= 100 && steps <= 103);
        assert_eq!(path_index, 2);
        assert!(matches!(out.action, PhaseAction::None));
        assert_eq!(out.drive, DriveCmd::Stop);
        match out.event {
            Some(NavEvent::PhaseTimeout { phase, elapsed_s }) => {
                assert_eq!(phase, NavState::NavigatingToDestination);
                assert!(elapsed_s >= params.waypoint_stall_timeout_s);
            }
            e => panic!("Unexpected event {:?}", e),
        }

        // The watchdog starts over on the next waypoint
        let out = nav.step(&ctx, &mut path_index);
        assert!(out.event.is_none());
        assert!(matches!(out.drive, DriveCmd::Motion { .. }));
    }

    #[test]
    fn test_slow_progress_not_stalled() {
        let params = NavCtrlParams::default();
        let route = PlannedRoute::from_pairs(&[[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [1.0, 1.0]], 2);
        let mut nav = Navigate::outbound();
        let mut path_index = 1;

        // Half the progress threshold per step, for longer than the stall timeout
        for i in 0..130 {
            let pose = Pose::new(Point2::new(1.2 + 0.005 * i as f64, 1.0), 0.0);
            let out = nav.step(&StepCtx::for_test(&params, &pose, &route), &mut path_index);
            assert!(out.event.is_none());
            assert_eq!(path_index, 1);
        }
    }

    #[test]
    fn test_stalled_base_ends_return() {
        let params = NavCtrlParams::default();
        let route = PlannedRoute::from_pairs(&[[1.0, 1.0], [3.0, 1.0], [5.0, 1.0]], 1);
        let pose = Pose::new(Point2::new(4.0, 1.0), 90.0);
        let ctx = StepCtx::for_test(&params, &pose, &route);
        let mut nav = Navigate::returning();
        let mut path_index = 2;

        let (_, out) = step_until_event(&mut nav, &ctx, &mut path_index, 200).unwrap();

        assert_eq!(path_index, 3);
        assert!(matches!(
            out.action,
            PhaseAction::Transition(NavPhase::AdjustingFinalAngle(_))
        ));
        assert!(matches!(
            out.event,
            Some(NavEvent::PhaseTimeout {
                phase: NavState::ReturningToBase,
                ..
            })
        ));
    }
}
