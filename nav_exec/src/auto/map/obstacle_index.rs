//! # Obstacle Index
//!
//! A grid of blocked cells derived from the forbidden areas and the map
//! boundary. The index is immutable once built; a change to the forbidden
//! areas builds a whole new index.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use nalgebra::Point2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::Polygon;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Tolerance added before flooring coordinates into cells so that points lying
/// on a cell boundary up to floating point error land in the upper cell.
const CELL_EPSILON: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Width of the map (x), in meters.
    pub width_m: f64,

    /// Height of the map (y), in meters.
    pub height_m: f64,

    /// Side length of one cell, in meters.
    pub grid_res_m: f64,
}

/// Integer cell coordinate, `(col, row)` = `floor(position / grid_res)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub col: i64,
    pub row: i64,
}

/// Set of blocked cells.
#[derive(Debug, Clone)]
pub struct ObstacleIndex {
    params: GridParams,

    /// Inflation radius the index was built with.
    inflation_radius_m: f64,

    /// Blocked flags indexed `[[col, row]]`.
    blocked: Array2<bool>,

    num_blocked: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for GridParams {
    fn default() -> Self {
        Self {
            width_m: 6.0,
            height_m: 12.0,
            grid_res_m: 0.1,
        }
    }
}

impl GridParams {
    pub fn num_cols(&self) -> usize {
        (self.width_m / self.grid_res_m).round().max(0.0) as usize
    }

    pub fn num_rows(&self) -> usize {
        (self.height_m / self.grid_res_m).round().max(0.0) as usize
    }
}

impl GridCell {
    pub fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }

    /// The eight neighbouring cells, cardinals first.
    pub fn neighbours(&self) -> [GridCell; 8] {
        let (c, r) = (self.col, self.row);
        [
            GridCell::new(c + 1, r),
            GridCell::new(c - 1, r),
            GridCell::new(c, r + 1),
            GridCell::new(c, r - 1),
            GridCell::new(c + 1, r + 1),
            GridCell::new(c + 1, r - 1),
            GridCell::new(c - 1, r + 1),
            GridCell::new(c - 1, r - 1),
        ]
    }
}

impl ObstacleIndex {
    /// Build the index from the given forbidden areas.
    ///
    /// - `inflation_radius_m` is the buffer applied to every polygon.
    /// - `robot_width_m` sets the boundary band width,
    ///   `ceil((robot_width / 2) / grid_res)` cells along every map edge.
    pub fn rebuild(
        params: GridParams,
        polygons: &[Polygon],
        inflation_radius_m: f64,
        robot_width_m: f64,
    ) -> Self {
        let num_cols = params.num_cols();
        let num_rows = params.num_rows();
        let mut blocked = Array2::from_elem((num_cols, num_rows), false);

        // Boundary band
        let band = ((robot_width_m.max(0.0) / 2.0) / params.grid_res_m - CELL_EPSILON)
            .ceil()
            .max(0.0) as usize;
        for ((col, row), b) in blocked.indexed_iter_mut() {
            if col < band || row < band || col + band >= num_cols || row + band >= num_rows {
                *b = true;
            }
        }

        let radius_m = inflation_radius_m.max(0.0);
        let mut index = Self {
            params,
            inflation_radius_m: radius_m,
            blocked,
            num_blocked: 0,
        };

        // Rasterise each inflated polygon over its bounding box
        for poly in polygons {
            let bb = poly.aabb().grown(radius_m);
            let min_cell = index.cell_of(&bb.min_m);
            let max_cell = index.cell_of(&bb.max_m);

            let col_range = min_cell.col.max(0)..=max_cell.col.min(num_cols as i64 - 1);
            for col in col_range {
                for row in min_cell.row.max(0)..=max_cell.row.min(num_rows as i64 - 1) {
                    let cell = GridCell::new(col, row);
                    let idx = [col as usize, row as usize];
                    if !index.blocked[idx]
                        && poly.inflated_contains(&index.cell_centre(&cell), radius_m)
                    {
                        index.blocked[idx] = true;
                    }
                }
            }
        }

        index.num_blocked = index.blocked.iter().filter(|b| **b).count();

        debug!(
            "ObstacleIndex rebuilt: {} polygons, {}x{} cells, {} blocked (band {})",
            polygons.len(),
            num_cols,
            num_rows,
            index.num_blocked,
            band
        );

        index
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    pub fn inflation_radius_m(&self) -> f64 {
        self.inflation_radius_m
    }

    pub fn num_cols(&self) -> usize {
        self.blocked.dim().0
    }

    pub fn num_rows(&self) -> usize {
        self.blocked.dim().1
    }

    pub fn num_cells(&self) -> usize {
        self.blocked.len()
    }

    /// Number of blocked cells in the grid.
    pub fn num_blocked(&self) -> usize {
        self.num_blocked
    }

    /// Get the cell containing the given point. The cell may be outside the grid.
    pub fn cell_of(&self, point_m: &Point2<f64>) -> GridCell {
        GridCell::new(
            (point_m.x / self.params.grid_res_m + CELL_EPSILON).floor() as i64,
            (point_m.y / self.params.grid_res_m + CELL_EPSILON).floor() as i64,
        )
    }

    /// World position of the centre of the cell.
    pub fn cell_centre(&self, cell: &GridCell) -> Point2<f64> {
        Point2::new(
            (cell.col as f64 + 0.5) * self.params.grid_res_m,
            (cell.row as f64 + 0.5) * self.params.grid_res_m,
        )
    }

    pub fn contains_cell(&self, cell: &GridCell) -> bool {
        cell.col >= 0
            && cell.row >= 0
            && (cell.col as usize) < self.num_cols()
            && (cell.row as usize) < self.num_rows()
    }

    /// Returns true if the cell is blocked. Cells outside the grid are blocked.
    pub fn is_blocked(&self, cell: &GridCell) -> bool {
        if !self.contains_cell(cell) {
            return true;
        }

        self.blocked[[cell.col as usize, cell.row as usize]]
    }

    /// Returns true if every cell the segment `a`-`b` passes through is
    /// unblocked.
    ///
    /// Cells are walked with a grid traversal. Where the segment passes
    /// exactly through a cell corner both side cells are also checked, so a
    /// diagonal cannot squeeze between two blocked cells.
    pub fn segment_is_clear(&self, a_m: &Point2<f64>, b_m: &Point2<f64>) -> bool {
        let res = self.params.grid_res_m;
        let mut cell = self.cell_of(a_m);
        let end = self.cell_of(b_m);

        if self.is_blocked(&cell) {
            return false;
        }

        let d = b_m - a_m;
        let step_col: i64 = if d.x > 0.0 { 1 } else if d.x < 0.0 { -1 } else { 0 };
        let step_row: i64 = if d.y > 0.0 { 1 } else if d.y < 0.0 { -1 } else { 0 };

        // Parametric distance along the segment to the next column/row boundary,
        // and the distance between boundaries.
        let (mut t_max_x, t_delta_x) = if step_col != 0 {
            let boundary = (cell.col + if step_col > 0 { 1 } else { 0 }) as f64 * res;
            ((boundary - a_m.x) / d.x, res / d.x.abs())
        } else {
            (std::f64::INFINITY, std::f64::INFINITY)
        };
        let (mut t_max_y, t_delta_y) = if step_row != 0 {
            let boundary = (cell.row + if step_row > 0 { 1 } else { 0 }) as f64 * res;
            ((boundary - a_m.y) / d.y, res / d.y.abs())
        } else {
            (std::f64::INFINITY, std::f64::INFINITY)
        };

        // A segment crosses at most this many cell boundaries
        let max_steps = (end.col - cell.col).abs() + (end.row - cell.row).abs() + 2;

        for _ in 0..max_steps {
            if cell == end || t_max_x.min(t_max_y) > 1.0 {
                break;
            }

            if (t_max_x - t_max_y).abs() < CELL_EPSILON {
                // Corner crossing
                let side_a = GridCell::new(cell.col + step_col, cell.row);
                let side_b = GridCell::new(cell.col, cell.row + step_row);
                if self.is_blocked(&side_a) || self.is_blocked(&side_b) {
                    return false;
                }
                cell = GridCell::new(cell.col + step_col, cell.row + step_row);
                t_max_x += t_delta_x;
                t_max_y += t_delta_y;
            } else if t_max_x < t_max_y {
                cell.col += step_col;
                t_max_x += t_delta_x;
            } else {
                cell.row += step_row;
                t_max_y += t_delta_y;
            }

            if self.is_blocked(&cell) {
                return false;
            }
        }

        !self.is_blocked(&end)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn grid() -> GridParams {
        GridParams {
            width_m: 6.0,
            height_m: 12.0,
            grid_res_m: 0.1,
        }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::from_pairs(&[[x0, y0], [x1, y0], [x1, y1], [x0, y1]]).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let idx = ObstacleIndex::rebuild(grid(), &[], 0.35, 0.0);

        assert_eq!(idx.num_cols(), 60);
        assert_eq!(idx.num_rows(), 120);
        assert_eq!(idx.num_blocked(), 0);
        assert_eq!(idx.cell_of(&Point2::new(0.3, 0.75)), GridCell::new(3, 7));
        assert!((idx.cell_centre(&GridCell::new(3, 7)) - Point2::new(0.35, 0.75)).norm() < 1e-12);
    }

    #[test]
    fn test_boundary_band() {
        // ceil(0.175 / 0.1) = 2 cells on each edge
        let idx = ObstacleIndex::rebuild(grid(), &[], 0.35, 0.35);

        assert!(idx.is_blocked(&GridCell::new(0, 50)));
        assert!(idx.is_blocked(&GridCell::new(1, 50)));
        assert!(!idx.is_blocked(&GridCell::new(2, 50)));
        assert!(idx.is_blocked(&GridCell::new(58, 50)));
        assert!(!idx.is_blocked(&GridCell::new(57, 50)));
        assert!(idx.is_blocked(&GridCell::new(30, 119)));
        assert!(idx.is_blocked(&GridCell::new(30, 0)));
        assert_eq!(idx.num_blocked(), 60 * 120 - 56 * 116);

        // Outside the grid
        assert!(idx.is_blocked(&GridCell::new(-1, 5)));
        assert!(idx.is_blocked(&GridCell::new(5, 120)));
    }

    #[test]
    fn test_polygon_inflation() {
        let poly = square(2.0, 5.0, 3.0, 6.0);
        let idx = ObstacleIndex::rebuild(grid(), &[poly.clone()], 0.35, 0.0);

        // Inside the polygon
        assert!(idx.is_blocked(&idx.cell_of(&Point2::new(2.5, 5.5))));
        // Within the buffer
        assert!(idx.is_blocked(&idx.cell_of(&Point2::new(1.75, 5.5))));
        // Beyond the buffer
        assert!(!idx.is_blocked(&idx.cell_of(&Point2::new(1.55, 5.5))));
        // Rounded corner of the buffer, 0.35 diagonal from (2, 5) is outside
        assert!(!idx.is_blocked(&idx.cell_of(&Point2::new(1.75, 4.75))));

        // Every blocked cell centre is within the inflated polygon
        for col in 0..idx.num_cols() as i64 {
            for row in 0..idx.num_rows() as i64 {
                let cell = GridCell::new(col, row);
                assert_eq!(
                    idx.is_blocked(&cell),
                    poly.inflated_contains(&idx.cell_centre(&cell), 0.35)
                );
            }
        }
    }

    #[test]
    fn test_inflation_monotonic() {
        let polys = vec![
            square(1.0, 1.0, 2.0, 2.0),
            Polygon::from_pairs(&[[3.0, 7.0], [5.0, 8.0], [3.5, 10.0]]).unwrap(),
        ];

        let mut last = 0;
        for i in 0..12 {
            let r = i as f64 * 0.05;
            let idx = ObstacleIndex::rebuild(grid(), &polys, r, 0.35);
            assert!(
                idx.num_blocked() >= last,
                "radius {} blocked {} < {}",
                r,
                idx.num_blocked(),
                last
            );
            last = idx.num_blocked();
        }
    }

    #[test]
    fn test_degenerate_polygons_skipped() {
        let polys = Polygon::from_pair_lists(&[vec![[1.0, 1.0], [2.0, 2.0]]]);
        let idx = ObstacleIndex::rebuild(grid(), &polys, 0.35, 0.0);

        assert_eq!(idx.num_blocked(), 0);
    }

    #[test]
    fn test_segment_is_clear() {
        let idx = ObstacleIndex::rebuild(grid(), &[square(2.0, 5.0, 3.0, 6.0)], 0.0, 0.0);

        // Passes straight through the square
        assert!(!idx.segment_is_clear(&Point2::new(1.0, 5.5), &Point2::new(4.0, 5.5)));
        // Passes below
        assert!(idx.segment_is_clear(&Point2::new(1.0, 4.5), &Point2::new(4.0, 4.5)));
        // Diagonal clipping the corner
        assert!(!idx.segment_is_clear(&Point2::new(1.55, 4.55), &Point2::new(2.45, 5.45)));
        // Vertical, clear
        assert!(idx.segment_is_clear(&Point2::new(1.05, 1.0), &Point2::new(1.05, 11.0)));
        // Single cell
        assert!(idx.segment_is_clear(&Point2::new(1.05, 1.05), &Point2::new(1.06, 1.07)));
        // Ends inside
        assert!(!idx.segment_is_clear(&Point2::new(1.0, 5.5), &Point2::new(2.5, 5.5)));
    }

    #[test]
    fn test_segment_corner_squeeze() {
        // Two blocked cells touching at a corner, (10, 10) and (11, 11)
        let a = square(1.0, 1.0, 1.1, 1.1);
        let b = square(1.1, 1.1, 1.2, 1.2);
        let idx = ObstacleIndex::rebuild(grid(), &[a, b], 0.0, 0.0);
        assert!(idx.is_blocked(&GridCell::new(10, 10)));
        assert!(idx.is_blocked(&GridCell::new(11, 11)));
        assert!(!idx.is_blocked(&GridCell::new(11, 10)));

        // Diagonal through the shared corner from cell (11, 10) to (10, 11)
        assert!(!idx.segment_is_clear(&Point2::new(1.15, 1.05), &Point2::new(1.05, 1.15)));
    }
}
