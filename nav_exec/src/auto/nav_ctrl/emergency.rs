//! # Emergency stop
//!
//! Entered from any moving phase when the robot comes too close to a forbidden area. The
//! interrupted phase is held here, frozen, and resumed once the cool-down has elapsed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use super::{DriveCmd, NavPhase, PhaseAction, StepCtx, StepOutput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Emergency {
    elapsed_s: f64,

    /// The phase to resume, `None` once it has been handed back.
    resume: Option<Box<NavPhase>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Emergency {
    pub fn new(interrupted: NavPhase) -> Self {
        Self {
            elapsed_s: 0.0,
            resume: Some(Box::new(interrupted)),
        }
    }

    /// The phase that will be resumed.
    pub fn interrupted(&self) -> Option<&NavPhase> {
        self.resume.as_deref()
    }

    pub fn step(&mut self, ctx: &StepCtx) -> StepOutput {
        self.elapsed_s += ctx.dt_s;

        if self.elapsed_s < ctx.params.emergency_cooldown_s {
            return StepOutput {
                action: PhaseAction::None,
                drive: DriveCmd::Stop,
                event: None,
            };
        }

        match self.resume.take() {
            Some(phase) => {
                info!("Emergency cool-down over, resuming {}", phase.state());
                StepOutput {
                    action: PhaseAction::Resume(*phase),
                    drive: DriveCmd::Stop,
                    event: None,
                }
            }
            None => StepOutput {
                action: PhaseAction::Finalize,
                drive: DriveCmd::Stop,
                event: None,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{
        loc::Pose,
        nav_ctrl::{states::Navigate, NavCtrlParams, PlannedRoute},
    };
    use nalgebra::Point2;

    #[test]
    fn test_cooldown_then_resume() {
        let params = NavCtrlParams::default();
        let route = PlannedRoute::from_pairs(&[[1.0, 1.0], [3.0, 3.0], [1.0, 1.0]], 1);
        let pose = Pose::new(Point2::new(2.0, 2.0), 45.0);
        let ctx = StepCtx::for_test(&params, &pose, &route);

        let mut emergency = Emergency::new(NavPhase::Navigating(Navigate::outbound()));

        // Cool-down of 2 s at 0.1 s per step
        for _ in 0..19 {
            let out = emergency.step(&ctx);
            assert!(matches!(out.action, PhaseAction::None));
            assert_eq!(out.drive, DriveCmd::Stop);
            assert!(matches!(emergency.interrupted(), Some(NavPhase::Navigating(_))));
        }

        let mut out = emergency.step(&ctx);
        if matches!(out.action, PhaseAction::None) {
            out = emergency.step(&ctx);
        }
        assert!(matches!(out.action, PhaseAction::Resume(NavPhase::Navigating(_))));
        assert_eq!(out.drive, DriveCmd::Stop);
        assert!(emergency.interrupted().is_none());

        // Nothing left to resume
        let out = emergency.step(&ctx);
        assert!(matches!(out.action, PhaseAction::Finalize));
    }
}
