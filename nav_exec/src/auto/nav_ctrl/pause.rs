//! # Dwell at the destination

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{
    states::{FinalAngle, Navigate},
    DriveCmd, NavPhase, PhaseAction, StepCtx, StepOutput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Pause {
    elapsed_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pause {
    pub fn new() -> Self {
        Self { elapsed_s: 0.0 }
    }

    /// Dwell time still to be spent, in seconds.
    pub fn remaining_s(&self, dwell_time_s: f64) -> f64 {
        (dwell_time_s - self.elapsed_s).max(0.0)
    }

    pub fn step(&mut self, ctx: &StepCtx, path_index: &mut usize) -> StepOutput {
        self.elapsed_s += ctx.dt_s;

        if self.elapsed_s < ctx.params.dwell_time_s {
            return StepOutput {
                action: PhaseAction::None,
                drive: DriveCmd::Stop,
                event: None,
            };
        }

        // Arm the first return waypoint
        *path_index = ctx.route.destination_index + 1;

        if ctx.route.num_return_points() == 0 {
            StepOutput::transition(NavPhase::AdjustingFinalAngle(FinalAngle::new()))
        } else {
            StepOutput::transition(NavPhase::Returning(Navigate::returning()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{loc::Pose, nav_ctrl::{NavCtrlParams, PlannedRoute}};
    use nalgebra::Point2;

    /// Step until the dwell ends, returning the number of steps taken and the output.
    fn dwell(ctx: &StepCtx, path_index: &mut usize) -> (usize, StepOutput) {
        let mut pause = Pause::new();
        let mut steps = 0;
        loop {
            steps += 1;
            let out = pause.step(ctx, path_index);
            if !matches!(out.action, PhaseAction::None) || steps > 100 {
                return (steps, out);
            }
            assert_eq!(out.drive, DriveCmd::Stop);
            assert_eq!(*path_index, ctx.route.destination_index);
        }
    }

    #[test]
    fn test_dwell_then_return() {
        let params = NavCtrlParams::default();
        let route = PlannedRoute::from_pairs(&[[1.0, 1.0], [3.0, 3.0], [1.0, 1.0]], 1);
        let pose = Pose::new(Point2::new(3.0, 3.0), 0.0);
        let mut path_index = 1;

        let (steps, out) = dwell(&StepCtx::for_test(&params, &pose, &route), &mut path_index);

        assert!(steps >= 20 && steps <= 21);
        assert_eq!(path_index, 2);
        assert!(matches!(out.action, PhaseAction::Transition(NavPhase::Returning(_))));
    }

    #[test]
    fn test_no_return_leg() {
        let params = NavCtrlParams::default();
        let route = PlannedRoute::from_pairs(&[[1.0, 1.0], [3.0, 3.0]], 1);
        let pose = Pose::new(Point2::new(3.0, 3.0), 0.0);
        let mut path_index = 1;

        let (_, out) = dwell(&StepCtx::for_test(&params, &pose, &route), &mut path_index);

        assert!(matches!(
            out.action,
            PhaseAction::Transition(NavPhase::AdjustingFinalAngle(_))
        ));
    }

    #[test]
    fn test_remaining() {
        let mut pause = Pause::new();
        assert_eq!(pause.remaining_s(2.0), 2.0);
        pause.elapsed_s = 2.5;
        assert_eq!(pause.remaining_s(2.0), 0.0);
    }
}
