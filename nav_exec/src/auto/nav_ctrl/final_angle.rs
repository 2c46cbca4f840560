//! # Final heading adjustment
//!
//! Rotates on the spot towards the home heading at a fixed slow rate. The last step of the spin
//! is shortened so that it lands on the home heading rather than overshooting it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use util::maths::ang_err_deg;

use super::{motion::MotionCmd, DriveCmd, PhaseAction, StepCtx, StepOutput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FinalAngle;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FinalAngle {
    pub fn new() -> Self {
        Self
    }

    pub fn step(&mut self, ctx: &StepCtx) -> StepOutput {
        let err_deg = ang_err_deg(ctx.pose.heading_deg, ctx.home_heading_deg);

        if err_deg.abs() <= ctx.params.final_angle_tol_deg {
            info!(
                "Final heading {:.2} deg reached (error {:.2} deg)",
                ctx.pose.heading_deg, err_deg
            );
            return StepOutput {
                action: PhaseAction::Finalize,
                drive: DriveCmd::Stop,
                event: None,
            };
        }

        // Rotation a full-rate step would produce, shortened to the remaining error
        let full_step_deg = ctx.params.final_angle_turn_cmd * ctx.max_turn_rate_degs * ctx.dt_s;
        let step_deg = full_step_deg.min(err_deg.abs());
        let turn = if full_step_deg > 0.0 {
            err_deg.signum() * ctx.params.final_angle_turn_cmd * step_deg / full_step_deg
        } else {
            0.0
        };

        StepOutput {
            action: PhaseAction::None,
            drive: DriveCmd::Motion {
                cmd: MotionCmd::turn_only(turn),
                wheel_limit_pct: ctx.params.wheel_limit_pct,
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

    fn turn(params: &NavCtrlParams, heading_deg: f64) -> StepOutput {
        let route = PlannedRoute::from_pairs(&[[1.0, 1.0], [3.0, 3.0], [1.0, 1.0]], 1);
        let pose = Pose::new(Point2::new(1.0, 1.0), heading_deg);
        FinalAngle::new().step(&StepCtx::for_test(params, &pose, &route))
    }

    fn turn_cmd(out: &StepOutput) -> f64 {
        match out.drive {
            DriveCmd::Motion { cmd, .. } => {
                assert_eq!(cmd.forward, 0.0);
                cmd.turn
            }
            d => panic!("Unexpected drive {:?}", d),
        }
    }

    #[test]
    fn test_turn_direction() {
        let params = NavCtrlParams::default();

        // Home heading is 270
        assert!((turn_cmd(&turn(&params, 260.0)) - 0.15).abs() < 1e-9);
        assert!((turn_cmd(&turn(&params, 280.0)) + 0.15).abs() < 1e-9);
        assert!((turn_cmd(&turn(&params, 10.0)) + 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_last_step_shortened() {
        let mut params = NavCtrlParams::default();
        params.final_angle_tol_deg = 0.1;

        // 0.15 * 90 deg/s * 0.1 s = 1.35 deg per full step
        let turn = turn_cmd(&turn(&params, 269.5));
        assert!((turn - 0.15 * 0.5 / 1.35).abs() < 1e-9);
    }

    #[test]
    fn test_within_tolerance() {
        let params = NavCtrlParams::default();
        let out = turn(&params, 269.5);

        assert!(matches!(out.action, PhaseAction::Finalize));
        assert_eq!(out.drive, DriveCmd::Stop);
    }
}
