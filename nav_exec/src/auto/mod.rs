//! # Autonomy module
//!
//! Contains everything the robot needs to move itself about the map.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Robot pose
pub mod loc;

/// Forbidden areas and the obstacle grid
pub mod map;

/// Global path planning
pub mod nav;

/// Navigation state machine
pub mod nav_ctrl;

/// Paths made of waypoints
pub mod path;
