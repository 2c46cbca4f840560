//! # Map module
//!
//! The map of the robot's operating area: forbidden area polygons and the
//! obstacle grid derived from them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod obstacle_index;
mod polygon;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use obstacle_index::{GridCell, GridParams, ObstacleIndex};
pub use polygon::{distance_to_segment, Aabb, Polygon};
