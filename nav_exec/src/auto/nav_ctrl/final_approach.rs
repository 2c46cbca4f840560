//! # Final approach
//!
//! Slow, high precision closing on the exact destination. When the dominant error is along Y the
//! robot first squares up to face along Y and translates, otherwise it drives along the bearing.
//! The Y priority rule is an empirically tuned heuristic and is not guaranteed to give the
//! shortest approach.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use util::maths::ang_err_deg;

use super::{
    motion::drive_law, states::Pause, DriveCmd, NavEvent, NavPhase, NavState, PhaseAction,
    StepCtx, StepOutput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FinalApproach {
    /// Time spent in this phase, excluding emergency stops.
    elapsed_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FinalApproach {
    pub fn new() -> Self {
        Self { elapsed_s: 0.0 }
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    pub fn step(&mut self, ctx: &StepCtx) -> StepOutput {
        let params = ctx.params;
        let target = ctx.route.destination_m;
        let err = target - ctx.pose.position_m;
        let dist_m = err.norm();

        if dist_m <= params.final_approach_tol_m {
            info!(
                "Arrived at destination ({:.3}, {:.3}) after {:.1} s of final approach, error {:.3} m",
                target.x, target.y, self.elapsed_s, dist_m
            );
            return StepOutput::transition(NavPhase::Paused(Pause::new()));
        }

        if self.elapsed_s >= params.final_approach_timeout_s {
            warn!(
                "Final approach timed out after {:.1} s with {:.3} m remaining, accepting arrival",
                self.elapsed_s, dist_m
            );
            return StepOutput {
                event: Some(NavEvent::PhaseTimeout {
                    phase: NavState::FinalApproach,
                    elapsed_s: self.elapsed_s,
                }),
                ..StepOutput::transition(NavPhase::Paused(Pause::new()))
            };
        }

        self.elapsed_s += ctx.dt_s;

        let cmd = if err.y.abs() > err.x.abs() && err.y.abs() > params.y_priority_min_m {
            let target_heading_deg = if err.y > 0.0 { 90.0 } else { 270.0 };
            drive_law(
                ang_err_deg(ctx.pose.heading_deg, target_heading_deg),
                err.y.abs(),
                &params.approach_y,
                1.0,
            )
        } else {
            drive_law(
                ctx.pose.heading_err_to(&target),
                dist_m,
                &params.approach_bearing,
                1.0,
            )
        };

        StepOutput {
            action: PhaseAction::None,
            drive: DriveCmd::Motion {
                cmd,
                wheel_limit_pct: params.final_approach_wheel_limit_pct,
            },
            event: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{loc::Pose, nav_ctrl::{NavCtrlParams, PlannedRoute}};
    use nalgebra::Point2;

    fn route() -> PlannedRoute {
        PlannedRoute::from_pairs(&[[1.0, 1.0], [3.0, 3.0], [1.0, 1.0]], 1)
    }

    fn motion(out: &StepOutput) -> (f64, f64, f64) {
        match out.drive {
            DriveCmd::Motion { cmd, wheel_limit_pct } => (cmd.forward, cmd.turn, wheel_limit_pct),
            d => panic!("Unexpected drive {:?}", d),
        }
    }

    #[test]
    fn test_y_priority() {
        let params = NavCtrlParams::default();
        let route = route();

        // Squares up to face +y before translating
        let pose = Pose::new(Point2::new(3.0, 2.8), 0.0);
        let out = FinalApproach::new().step(&StepCtx::for_test(&params, &pose, &route));
        let (forward, turn, limit) = motion(&out);
        assert_eq!(forward, 0.0);
        assert!((turn - params.approach_y.max_turn_cmd).abs() < 1e-9);
        assert_eq!(limit, params.final_approach_wheel_limit_pct);

        let pose = Pose::new(Point2::new(3.0, 2.8), 90.0);
        let out = FinalApproach::new().step(&StepCtx::for_test(&params, &pose, &route));
        let (forward, turn, _) = motion(&out);
        assert!((forward - params.approach_y.max_forward_cmd).abs() < 1e-9);
        assert_eq!(turn, 0.0);

        // Facing -y when the destination is below
        let pose = Pose::new(Point2::new(3.0, 3.2), 0.0);
        let out = FinalApproach::new().step(&StepCtx::for_test(&params, &pose, &route));
        let (_, turn, _) = motion(&out);
        assert!((turn + params.approach_y.max_turn_cmd).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_approach() {
        let params = NavCtrlParams::default();
        let route = route();
        let pose = Pose::new(Point2::new(2.8, 3.0), 0.0);

        let out = FinalApproach::new().step(&StepCtx::for_test(&params, &pose, &route));
        let (forward, turn, _) = motion(&out);
        assert!((forward - params.approach_bearing.max_forward_cmd).abs() < 1e-9);
        assert_eq!(turn, 0.0);
    }

    #[test]
    fn test_arrival() {
        let params = NavCtrlParams::default();
        let route = route();
        let pose = Pose::new(Point2::new(3.0, 2.97), 45.0);

        let out = FinalApproach::new().step(&StepCtx::for_test(&params, &pose, &route));
        assert!(matches!(out.action, PhaseAction::Transition(NavPhase::Paused(_))));
        assert_eq!(out.drive, DriveCmd::Stop);
        assert!(out.event.is_none());
    }

    #[test]
    fn test_timeout() {
        let params = NavCtrlParams::default();
        let route = route();
        let pose = Pose::new(Point2::new(2.8, 3.0), 0.0);
        let ctx = StepCtx::for_test(&params, &pose, &route);
        let mut phase = FinalApproach::new();

        let mut steps = 0;
        let out = loop {
            steps += 1;
            let out = phase.step(&ctx);
            if !matches!(out.action, PhaseAction::None) || steps > 200 {
                break out;
            }
        };

        assert!(steps >= 150 && steps <= 153);
        assert!(matches!(out.action, PhaseAction::Transition(NavPhase::Paused(_))));
        assert_eq!(out.drive, DriveCmd::Stop);
        match out.event {
            Some(NavEvent::PhaseTimeout { phase, elapsed_s }) => {
                assert_eq!(phase, NavState::FinalApproach);
                assert!(elapsed_s >= params.final_approach_timeout_s);
            }
            e => panic!("Unexpected event {:?}", e),
        }
    }
}
