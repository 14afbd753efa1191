use log::debug;

use super::{CellState, OccupancyGrid};
use crate::geometry::Cell;


impl OccupancyGrid {

    /// Grow every non-open cell by a square buffer to account for the robot footprint
    /// Buffer cells become `Inflated`, original obstacles are kept.
    /// A buffer smaller than 2 only hardens the cell itself into an obstacle.
    pub fn inflate(&self, buffer_size: usize) -> OccupancyGrid {
        let mut inflated = self.clone();
        let half = (buffer_size / 2) as i32;

        for (cell, state) in self.iter() {
            if state == CellState::Open {
                continue;
            }
            if half == 0 {
                inflated.set(cell, CellState::Obstacle);
                continue;
            }
            for y in cell.y - half..=cell.y + half {
                for x in cell.x - half..=cell.x + half {
                    let target = Cell::new(x, y);
                    match inflated.get(target) {
                        Some(CellState::Obstacle) | None => {}
                        Some(_) => {
                            inflated.set(target, CellState::Inflated);
                        }
                    }
                }
            }
        }

        debug!("[Grid] inflated by {buffer_size}: {} -> {} open cells",
            self.open_cells().len(), inflated.open_cells().len());
        inflated
    }

    /// Undo inflation: every `Inflated` cell becomes open space again
    pub fn remove_inflation(&self) -> OccupancyGrid {
        let mut restored = self.clone();
        for (cell, state) in self.iter() {
            if state == CellState::Inflated {
                restored.set(cell, CellState::Open);
            }
        }
        restored
    }
}
