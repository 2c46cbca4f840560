//! Plans minimum cost paths through an [`ObstacleIndex`], using an A* algorithm.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

use log::{debug, trace, warn};
use nalgebra::Point2;
use ndarray::Array2;
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::auto::{
    map::{GridCell, ObstacleIndex},
    path::Path,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const CARDINAL_COST: f64 = 1.0;
const DIAGONAL_COST: f64 = std::f64::consts::SQRT_2;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A* planner over the obstacle grid.
///
/// Cloning the planner is cheap, the obstacle index is shared.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    index: Arc<ObstacleIndex>,
    params: PathPlannerParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPlannerParams {
    /// Apply 1:2:1 smoothing to planned legs.
    pub smooth_paths: bool,

    /// Remove waypoints whose neighbours have a clear line of sight.
    pub optimize_paths: bool,
}

/// The result of planning one leg.
#[derive(Debug, Clone, Serialize)]
pub struct LegPlan {
    /// The path, always at least two points.
    pub path: Path,

    pub outcome: PlanOutcome,

    /// Cost of the A* path in meters, `None` for direct fallbacks.
    pub cost_m: Option<f64>,

    /// Number of nodes expanded by the search.
    pub num_expanded: usize,
}

/// An A* node
#[derive(Debug, Clone, Copy)]
struct Node {
    cell: GridCell,

    /// Total estimated cost, `g + h`.
    f: NotNan<f64>,

    /// Heuristic part of the cost.
    h: NotNan<f64>,

    /// Insertion order, used to break ties.
    seq: u64,
}

/// Internal search result, shared by [`PathPlanner::find_path`] and [`PathPlanner::plan`].
struct Search {
    path: Option<Path>,
    outcome: PlanOutcome,
    cost_m: Option<f64>,
    num_expanded: usize,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// How a leg was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanOutcome {
    /// A* found a path to the requested goal.
    Found,

    /// The goal (or start) was blocked, A* found a path to the nearest free cell instead.
    Rerouted,

    /// The start or goal is outside the map, a direct line is used.
    OutsideMap,

    /// No free cell could be found near the goal (or start), a direct line is used.
    NoSafeCell,

    /// A* exhausted the grid without reaching the goal, a direct line is used.
    NoPath,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for PathPlannerParams {
    fn default() -> Self {
        Self {
            smooth_paths: false,
            optimize_paths: true,
        }
    }
}

impl PathPlanner {
    pub fn new(index: Arc<ObstacleIndex>, params: PathPlannerParams) -> Self {
        Self { index, params }
    }

    pub fn index(&self) -> &Arc<ObstacleIndex> {
        &self.index
    }

    pub fn params(&self) -> &PathPlannerParams {
        &self.params
    }

    /// Swap in a newly built obstacle index.
    pub fn set_index(&mut self, index: Arc<ObstacleIndex>) {
        self.index = index;
    }

    /// Find a path from `start_m` to `goal_m`.
    ///
    /// - If the goal is outside the map the direct path `[start, goal]` is returned.
    /// - If the goal is blocked the nearest free cell is used as the goal, or the direct path is
    ///   returned if there isn't one.
    /// - Returns `None` if A* cannot reach the goal.
    pub fn find_path(&self, start_m: &Point2<f64>, goal_m: &Point2<f64>) -> Option<Path> {
        self.search(start_m, goal_m).path
    }

    /// Plan a leg, substituting the direct line if there is no path.
    pub fn plan(&self, start_m: &Point2<f64>, goal_m: &Point2<f64>) -> LegPlan {
        let search = self.search(start_m, goal_m);

        match search.path {
            Some(path) => LegPlan {
                path,
                outcome: search.outcome,
                cost_m: search.cost_m,
                num_expanded: search.num_expanded,
            },
            None => {
                warn!(
                    "No path from ({:.2}, {:.2}) to ({:.2}, {:.2}), using a direct line",
                    start_m.x, start_m.y, goal_m.x, goal_m.y
                );
                LegPlan {
                    path: Path::direct(*start_m, *goal_m),
                    outcome: PlanOutcome::NoPath,
                    cost_m: None,
                    num_expanded: search.num_expanded,
                }
            }
        }
    }

    /// Breadth first search outward from `cell` for the nearest unblocked cell, using 8-connected
    /// moves. Visits each grid cell at most once.
    pub fn nearest_free_cell(&self, cell: &GridCell) -> Option<GridCell> {
        if !self.index.contains_cell(cell) {
            return None;
        }

        let mut visited = Array2::from_elem((self.index.num_cols(), self.index.num_rows()), false);
        let mut queue = VecDeque::new();

        visited[[cell.col as usize, cell.row as usize]] = true;
        queue.push_back(*cell);

        while let Some(current) = queue.pop_front() {
            if !self.index.is_blocked(&current) {
                return Some(current);
            }

            for n in current.neighbours().iter() {
                if !self.index.contains_cell(n) {
                    continue;
                }
                let idx = [n.col as usize, n.row as usize];
                if !visited[idx] {
                    visited[idx] = true;
                    queue.push_back(*n);
                }
            }
        }

        None
    }

    /// Greedily remove interior waypoints whose bracketing segment is obstacle free.
    ///
    /// From each kept waypoint the path jumps to the furthest later waypoint with a clear line
    /// of sight. The first and last points are always kept.
    pub fn optimize_path(&self, path: &Path) -> Path {
        let points = &path.points_m;
        if points.len() <= 2 {
            return path.clone();
        }

        let mut optimized = vec![points[0]];
        let mut anchor = 0;

        while anchor < points.len() - 1 {
            let mut next = anchor + 1;
            for j in (anchor + 2..points.len()).rev() {
                if self.index.segment_is_clear(&points[anchor], &points[j]) {
                    next = j;
                    break;
                }
            }

            optimized.push(points[next]);
            anchor = next;
        }

        trace!(
            "Optimized path from {} to {} points",
            points.len(),
            optimized.len()
        );

        Path::from_points(optimized)
    }

    /// Replace each interior point with the 1:2:1 weighted average of itself and its
    /// neighbours. Endpoints are preserved exactly.
    pub fn smooth_path(&self, path: &Path) -> Path {
        let points = &path.points_m;
        if points.len() <= 2 {
            return path.clone();
        }

        let mut smoothed = Vec::with_capacity(points.len());
        smoothed.push(points[0]);
        for w in points.windows(3) {
            smoothed.push(Point2::from(
                (w[0].coords + w[1].coords * 2.0 + w[2].coords) / 4.0,
            ));
        }
        smoothed.push(points[points.len() - 1]);

        Path::from_points(smoothed)
    }

    fn search(&self, start_m: &Point2<f64>, goal_m: &Point2<f64>) -> Search {
        let direct = |outcome| Search {
            path: Some(Path::direct(*start_m, *goal_m)),
            outcome,
            cost_m: None,
            num_expanded: 0,
        };

        let mut start = self.index.cell_of(start_m);
        let mut goal = self.index.cell_of(goal_m);

        if !self.index.contains_cell(&goal) || !self.index.contains_cell(&start) {
            warn!(
                "Plan from ({:.2}, {:.2}) to ({:.2}, {:.2}) leaves the map, using a direct line",
                start_m.x, start_m.y, goal_m.x, goal_m.y
            );
            return direct(PlanOutcome::OutsideMap);
        }

        let mut outcome = PlanOutcome::Found;

        if self.index.is_blocked(&goal) {
            match self.nearest_free_cell(&goal) {
                Some(c) => {
                    debug!("Goal cell {:?} blocked, rerouting to {:?}", goal, c);
                    goal = c;
                    outcome = PlanOutcome::Rerouted;
                }
                None => {
                    warn!("No free cell near the goal, using a direct line");
                    return direct(PlanOutcome::NoSafeCell);
                }
            }
        }

        // A blocked start (e.g. leaving a forbidden area) escapes to the nearest free cell first
        let mut start_prefix = None;
        if self.index.is_blocked(&start) {
            match self.nearest_free_cell(&start) {
                Some(c) => {
                    debug!("Start cell {:?} blocked, escaping via {:?}", start, c);
                    start_prefix = Some(*start_m);
                    start = c;
                    outcome = PlanOutcome::Rerouted;
                }
                None => {
                    warn!("No free cell near the start, using a direct line");
                    return direct(PlanOutcome::NoSafeCell);
                }
            }
        }

        let (cells, cost, num_expanded) = self.astar(&start, &goal);

        let cells = match cells {
            Some(c) => c,
            None => {
                return Search {
                    path: None,
                    outcome: PlanOutcome::NoPath,
                    cost_m: None,
                    num_expanded,
                }
            }
        };

        let mut points_m: Vec<Point2<f64>> = start_prefix.into_iter().collect();
        points_m.extend(cells.iter().map(|c| self.index.cell_centre(c)));

        // Start and goal in the same cell
        if points_m.len() < 2 {
            points_m = vec![*start_m, *goal_m];
        }

        Search {
            path: Some(Path::from_points(points_m)),
            outcome,
            cost_m: Some(cost * self.index.params().grid_res_m),
            num_expanded,
        }
    }

    /// Run A* between two unblocked cells, returning the cells of the path (start first), its
    /// cost in cells and the number of expanded nodes.
    fn astar(&self, start: &GridCell, goal: &GridCell) -> (Option<Vec<GridCell>>, f64, usize) {
        let dim = (self.index.num_cols(), self.index.num_rows());
        let mut g_score = Array2::from_elem(dim, std::f64::INFINITY);
        let mut came_from: Array2<Option<GridCell>> = Array2::from_elem(dim, None);
        let mut closed = Array2::from_elem(dim, false);

        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;
        let mut num_expanded = 0;

        let idx = |c: &GridCell| [c.col as usize, c.row as usize];

        g_score[idx(start)] = 0.0;
        heap.extend(Node::new(*start, 0.0, heuristic(start, goal), seq));

        while let Some(node) = heap.pop() {
            let current = node.cell;
            if closed[idx(&current)] {
                continue;
            }
            closed[idx(&current)] = true;
            num_expanded += 1;

            if current == *goal {
                let mut cells = vec![current];
                let mut c = current;
                while let Some(prev) = came_from[idx(&c)] {
                    cells.push(prev);
                    c = prev;
                }
                cells.reverse();

                trace!("A* reached goal after {} expansions", num_expanded);
                return (Some(cells), g_score[idx(goal)], num_expanded);
            }

            let g_current = g_score[idx(&current)];

            for n in current.neighbours().iter() {
                if self.index.is_blocked(n) || closed[idx(n)] {
                    continue;
                }

                let diagonal = n.col != current.col && n.row != current.row;

                // No cutting corners between blocked cells
                if diagonal
                    && (self.index.is_blocked(&GridCell::new(n.col, current.row))
                        || self.index.is_blocked(&GridCell::new(current.col, n.row)))
                {
                    continue;
                }

                let step = if diagonal { DIAGONAL_COST } else { CARDINAL_COST };
                let tentative = g_current + step;

                if tentative < g_score[idx(n)] {
                    g_score[idx(n)] = tentative;
                    came_from[idx(n)] = Some(current);
                    seq += 1;
                    heap.extend(Node::new(*n, tentative, heuristic(n, goal), seq));
                }
            }
        }

        (None, std::f64::INFINITY, num_expanded)
    }
}

impl PlanOutcome {
    /// Returns true for anything other than a path to the exact requested goal.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, PlanOutcome::Found)
    }

    /// Returns true if the leg is a direct line rather than a planned path.
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            PlanOutcome::OutsideMap | PlanOutcome::NoSafeCell | PlanOutcome::NoPath
        )
    }
}

impl Node {
    /// Returns `None` if either cost is NaN.
    fn new(cell: GridCell, g: f64, h: f64, seq: u64) -> Option<Self> {
        Some(Self {
            cell,
            f: NotNan::new(g + h).ok()?,
            h: NotNan::new(h).ok()?,
            seq,
        })
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Note that we flip the order here so that the heap will be a min-heap, not a max-heap.
        // Ties on f prefer the lower heuristic, then the earlier inserted node.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Euclidean distance between cells, in cells.
fn heuristic(a: &GridCell, b: &GridCell) -> f64 {
    (((a.col - b.col).pow(2) + (a.row - b.row).pow(2)) as f64).sqrt()
}
