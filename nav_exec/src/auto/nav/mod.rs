//! # Navigation module
//!
//! Global path planning over the obstacle grid.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod path_planner;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use path_planner::{LegPlan, PathPlanner, PathPlannerParams, PlanOutcome};
