//! # Route planning
//!
//! A route is the outbound leg (pose to destination) and the return leg (destination to base)
//! joined into one path.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Point2;
use serde::Serialize;

use crate::auto::{
    nav::{LegPlan, PathPlanner, PlanOutcome},
    path::Path,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A fully planned out-and-back route.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedRoute {
    /// The combined path. The first point is the start pose and the last is the base.
    pub path: Path,

    /// Index in `path` of the exact destination.
    pub destination_index: usize,

    pub destination_m: Point2<f64>,

    pub base_m: Point2<f64>,

    pub outbound: LegReport,

    #[serde(rename = "return")]
    pub ret: LegReport,
}

/// Summary of one planned leg.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LegReport {
    pub outcome: PlanOutcome,
    pub cost_m: Option<f64>,
    pub num_expanded: usize,
    pub num_points: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which leg of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Leg {
    Outbound,
    Return,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PlannedRoute {
    /// Plan the outbound and return legs independently and join them.
    ///
    /// Each leg is smoothed according to the planner's parameters, its endpoints are pinned to the
    /// exact requested coordinates, and only then is it optimized so that every shortcut is
    /// checked from the pinned endpoints. The outbound leg gets a staging
    /// waypoint `staging_dist_m` before the destination if its last segment is longer than that.
    pub fn plan(
        planner: &PathPlanner,
        start_m: Point2<f64>,
        destination_m: Point2<f64>,
        base_m: Point2<f64>,
        staging_dist_m: f64,
    ) -> Self {
        let out_plan = planner.plan(&start_m, &destination_m);
        let ret_plan = planner.plan(&destination_m, &base_m);

        let outbound = LegReport::from(&out_plan);
        let ret = LegReport::from(&ret_plan);

        for (leg, report) in [(Leg::Outbound, &outbound), (Leg::Return, &ret)].iter() {
            if report.outcome.is_degraded() {
                warn!("{:?} leg planning degraded: {:?}", leg, report.outcome);
            }
        }

        let mut out_points = finish_leg(planner, out_plan.path, start_m, destination_m);
        insert_staging_point(&mut out_points, staging_dist_m);

        let ret_points = finish_leg(planner, ret_plan.path, destination_m, base_m);

        let destination_index = out_points.len() - 1;

        // Join dropping the duplicated seam point
        let mut points_m = out_points;
        points_m.extend(ret_points.into_iter().skip(1));

        debug!(
            "Route planned: {} points, destination at index {}",
            points_m.len(),
            destination_index
        );

        Self {
            path: Path::from_points(points_m),
            destination_index,
            destination_m,
            base_m,
            outbound,
            ret,
        }
    }

    /// Returns true if the route is internally consistent.
    pub fn is_valid(&self) -> bool {
        self.destination_index < self.path.get_num_points()
            && self.path.points_m[self.destination_index] == self.destination_m
            && self.path.last() == Some(&self.base_m)
    }

    /// Number of waypoints on the return leg, excluding the destination.
    pub fn num_return_points(&self) -> usize {
        self.path.get_num_points() - self.destination_index - 1
    }
}

#[cfg(test)]
impl PlannedRoute {
    /// Route over the given points with both legs reported as found.
    pub(crate) fn from_pairs(points: &[[f64; 2]], destination_index: usize) -> Self {
        let points_m: Vec<_> = points.iter().map(|p| Point2::new(p[0], p[1])).collect();
        let report = LegReport {
            outcome: PlanOutcome::Found,
            cost_m: None,
            num_expanded: 0,
            num_points: points_m.len(),
        };

        Self {
            destination_m: points_m[destination_index],
            base_m: points_m[points_m.len() - 1],
            path: Path::from_points(points_m),
            destination_index,
            outbound: report,
            ret: report,
        }
    }
}

impl From<&LegPlan> for LegReport {
    fn from(plan: &LegPlan) -> Self {
        Self {
            outcome: plan.outcome,
            cost_m: plan.cost_m,
            num_expanded: plan.num_expanded,
            num_points: plan.path.get_num_points(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Post-process a planned leg and pin its endpoints. Always returns at least two points.
fn finish_leg(
    planner: &PathPlanner,
    path: Path,
    start_m: Point2<f64>,
    end_m: Point2<f64>,
) -> Vec<Point2<f64>> {
    let mut path = path;

    if planner.params().smooth_paths {
        path = planner.smooth_path(&path);
    }

    let mut points = path.points_m;
    if points.len() < 2 {
        return vec![start_m, end_m];
    }

    points[0] = start_m;
    let last = points.len() - 1;
    points[last] = end_m;

    if planner.params().optimize_paths {
        points = planner.optimize_path(&Path::from_points(points)).points_m;
    }

    points
}

/// Insert a waypoint `dist_m` before the last point along the last segment, if the segment is
/// longer than `dist_m`.
fn insert_staging_point(points: &mut Vec<Point2<f64>>, dist_m: f64) {
    if points.len() < 2 || dist_m <= 0.0 {
        return;
    }

    let end = points[points.len() - 1];
    let prev = points[points.len() - 2];
    let seg = end - prev;
    let len = seg.norm();

    if len > dist_m {
        let staging = end - seg * (dist_m / len);
        points.insert(points.len() - 1, staging);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{
        map::{GridParams, ObstacleIndex, Polygon},
        nav::PathPlannerParams,
    };
    use std::sync::Arc;

    fn planner(polys: &[Polygon]) -> PathPlanner {
        PathPlanner::new(
            Arc::new(ObstacleIndex::rebuild(GridParams::default(), polys, 0.35, 0.35)),
            PathPlannerParams::default(),
        )
    }

    #[test]
    fn test_destination_index_exact() {
        let p = planner(&[Polygon::from_pairs(&[[2.0, 7.0], [4.5, 7.0], [4.5, 8.0], [2.0, 8.0]])
            .unwrap()]);
        let start = Point2::new(5.7, 11.5);
        let base = Point2::new(5.7, 11.5);

        for dest in [
            Point2::new(4.0, 6.0),
            Point2::new(1.23, 2.71),
            Point2::new(3.0, 7.5),
            Point2::new(9.0, 3.0),
        ]
        .iter()
        {
            let route = PlannedRoute::plan(&p, start, *dest, base, 0.3);

            assert!(route.is_valid());
            assert_eq!(route.path.points_m[route.destination_index], *dest);
            assert_eq!(route.path.points_m[0], start);
            assert_eq!(route.path.last(), Some(&base));
        }
    }

    #[test]
    fn test_staging_point() {
        let p = planner(&[]);
        let route = PlannedRoute::plan(
            &p,
            Point2::new(5.7, 11.5),
            Point2::new(4.0, 6.0),
            Point2::new(5.7, 11.5),
            0.3,
        );

        assert_eq!(route.outbound.outcome, PlanOutcome::Found);
        let staging = route.path.points_m[route.destination_index - 1];
        assert!(((staging - route.destination_m).norm() - 0.3).abs() < 1e-9);
        assert!(route.num_return_points() >= 1);
    }

    #[test]
    fn test_shortcuts_checked_from_pinned_start() {
        let block = Polygon::from_pairs(&[[2.0, 2.0], [2.2, 2.0], [2.2, 2.2], [2.0, 2.2]]).unwrap();
        let p = PathPlanner::new(
            Arc::new(ObstacleIndex::rebuild(GridParams::default(), &[block], 0.0, 0.0)),
            PathPlannerParams {
                smooth_paths: false,
                optimize_paths: true,
            },
        );

        // The planned start cell centre sees the end clear along y = 2.55, the exact start does
        // not
        let start = Point2::new(1.05, 1.55);
        let end = Point2::new(3.05, 2.55);
        let planned = Path::from_points(vec![Point2::new(1.05, 2.55), Point2::new(1.55, 2.55), end]);
        assert!(!p.index().segment_is_clear(&start, &end));

        let points = finish_leg(&p, planned, start, end);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0], start);
        assert_eq!(points[2], end);
        for w in points.windows(2) {
            assert!(p.index().segment_is_clear(&w[0], &w[1]));
        }
    }

    #[test]
    fn test_short_hop_has_no_staging() {
        let mut points = vec![Point2::new(1.0, 1.0), Point2::new(1.2, 1.0)];
        insert_staging_point(&mut points, 0.3);
        assert_eq!(points.len(), 2);

        let mut points = vec![Point2::new(1.0, 1.0), Point2::new(2.0, 1.0)];
        insert_staging_point(&mut points, 0.3);
        assert_eq!(points.len(), 3);
        assert!((points[1] - Point2::new(1.7, 1.0)).norm() < 1e-12);
    }
}
