use super::{CellState, OccupancyGrid};
use crate::geometry::Cell;


/// Width in pixels of a painted path
pub const PATH_SIZE: usize = 3;
/// Width in pixels of a painted start/goal marker
pub const POINT_SIZE: usize = 5;


impl OccupancyGrid {

    /// Copy of the grid with the path and both endpoints painted on it
    pub fn with_path(&self, path: &[Cell], start: Cell, goal: Cell) -> OccupancyGrid {
        self.with_path_value(CellState::Path, path, start, goal)
    }

    /// Copy of the grid with the path painted using an arbitrary state
    pub fn with_path_value(&self, value: CellState, path: &[Cell], start: Cell, goal: Cell) -> OccupancyGrid {
        let mut overlay = self.clone();
        overlay.paint_path(value, path);
        overlay.paint_endpoints(start, goal);
        overlay
    }

    /// Copy of the grid showing every travelled cell underneath the path
    pub fn debug_overlay(&self, path: &[Cell], travelled: &[Cell], start: Cell, goal: Cell) -> OccupancyGrid {
        let mut overlay = self.clone();
        for &cell in travelled {
            overlay.set(cell, CellState::Travelled);
        }
        overlay.paint_path(CellState::Path, path);
        overlay.paint_endpoints(start, goal);
        overlay
    }

    fn paint_path(&mut self, value: CellState, path: &[Cell]) {
        for &cell in path {
            self.set(cell, value);
            self.paint_point(cell, PATH_SIZE);
        }
    }

    fn paint_endpoints(&mut self, start: Cell, goal: Cell) {
        self.set(start, CellState::NavPoint);
        self.set(goal, CellState::NavPoint);
        self.paint_point(start, POINT_SIZE);
        self.paint_point(goal, POINT_SIZE);
    }

    /// Spread the state of `center` over a square of `size` pixels.
    /// An obstacle centre inflates its surroundings instead of copying itself.
    fn paint_point(&mut self, center: Cell, size: usize) {
        let Some(value) = self.get(center) else {
            return;
        };
        let half = (size / 2) as i32;

        for y in center.y - half..=center.y + half {
            for x in center.x - half..=center.x + half {
                let target = Cell::new(x, y);
                match self.get(target) {
                    None => {}
                    Some(current) => {
                        if value == CellState::Obstacle && current != CellState::Obstacle {
                            self.set(target, CellState::Inflated);
                        } else {
                            self.set(target, value);
                        }
                    }
                }
            }
        }
    }
}
