//! # Navigation library
//!
//! This library allows other crates in the workspace, the executable and the benchmarks to access
//! items defined inside the navigation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy - localisation, mapping, path planning and the navigation state machine
pub mod auto;

/// Map repository - loads forbidden areas and points of interest
pub mod map_repo;

/// Motor driver - drives the left and right wheel motors
pub mod motor_driver;

/// Parameters of the navigation stack
pub mod params;

/// Telecommand processor - applies TCs to the navigation controller
pub mod tc_processor;
