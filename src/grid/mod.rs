mod inflation;
mod overlay;

pub use overlay::{PATH_SIZE, POINT_SIZE};

use crate::errors::MapError;
use crate::geometry::Cell;


/// State of a single grid cell
/// The discriminants match the integer codes used by map files and overlays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellState {
    Inflated = -2,
    Obstacle = -1,
    #[default]
    Open = 0,
    NavPoint = 1,
    Travelled = 2,
    Path = 3,
}

impl CellState {

    /// Integer code of this state
    pub fn code(self) -> i32 {
        self as i32
    }

    /// State from an integer code, None for unknown codes
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -2 => Some(CellState::Inflated),
            -1 => Some(CellState::Obstacle),
            0 => Some(CellState::Open),
            1 => Some(CellState::NavPoint),
            2 => Some(CellState::Travelled),
            3 => Some(CellState::Path),
            _ => None,
        }
    }
}


/// Rectangular occupancy grid with physical metadata
/// Cloning deep-copies the cells, inflation and overlays always return a new grid
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    pub resolution: f32, // meters per pixel
    pub m_width: f32, // real-world width in meters
    pub m_height: f32, // real-world height in meters
    cells: Vec<CellState>, // row-major
}

impl OccupancyGrid {

    /// Create an all-open grid
    pub fn new(width: usize, height: usize, resolution: f32) -> Result<Self, MapError> {
        let len = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            resolution,
            m_width: resolution * width as f32,
            m_height: resolution * height as f32,
            cells: vec![CellState::Open; len],
        })
    }

    /// Create a grid from a row-major buffer of states
    pub fn from_cells(width: usize, height: usize, resolution: f32, cells: Vec<CellState>) -> Result<Self, MapError> {
        let expected = cell_count(width, height)?;
        if cells.len() != expected {
            return Err(MapError::Dimensions { expected, found: cells.len() });
        }
        Ok(Self {
            width,
            height,
            resolution,
            m_width: resolution * width as f32,
            m_height: resolution * height as f32,
            cells,
        })
    }

    /// Create a grid from rows of integer codes
    /// Unknown codes are treated as obstacles
    pub fn from_codes<R: AsRef<[i32]>>(rows: &[R], resolution: f32) -> Result<Self, MapError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);

        let mut cells = Vec::with_capacity(width * height);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(MapError::Dimensions { expected: width * height, found: cells.len() + row.len() });
            }
            cells.extend(row.iter().map(|&c| CellState::from_code(c).unwrap_or(CellState::Obstacle)));
        }

        Self::from_cells(width, height, resolution, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check that a cell lies inside the grid
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.y as usize * self.width + cell.x as usize)
        } else {
            None
        }
    }

    /// State of a cell, None when out of bounds
    pub fn get(&self, cell: Cell) -> Option<CellState> {
        self.index(cell).map(|i| self.cells[i])
    }

    /// Set the state of a cell, ignoring out of bounds cells
    /// Returns true if the cell was written
    pub fn set(&mut self, cell: Cell, state: CellState) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.cells[i] = state;
                true
            }
            None => false,
        }
    }

    /// True if the cell is inside the grid and free space
    pub fn is_open(&self, cell: Cell) -> bool {
        self.get(cell) == Some(CellState::Open)
    }

    /// Iterate over (cell, state) in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Cell, CellState)> + '_ {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(i, &state)| {
            (Cell::new((i % width) as i32, (i / width) as i32), state)
        })
    }

    /// All open cells in row-major order
    pub fn open_cells(&self) -> Vec<Cell> {
        self.iter()
            .filter(|&(_, state)| state == CellState::Open)
            .map(|(cell, _)| cell)
            .collect()
    }

    /// Rows of integer codes, mostly useful for debugging
    pub fn to_codes(&self) -> Vec<Vec<i32>> {
        self.cells.chunks(self.width.max(1)).map(|row| row.iter().map(|s| s.code()).collect()).collect()
    }

    /// Convert a robot pose (meters) to a pixel
    /// The map frame is rotated 90 degrees clockwise relative to the image
    pub fn pose_to_pixel(&self, x: f32, y: f32) -> Cell {
        let (x_res, y_res) = self.pixel_resolution();
        Cell::new(
            (y / -x_res).round() as i32 + (self.width / 2) as i32,
            (x / y_res).round() as i32 + (self.height / 2) as i32,
        )
    }

    /// Convert a pixel to a robot pose (meters)
    /// The inverse rotation of [`OccupancyGrid::pose_to_pixel`]
    pub fn pixel_to_pose(&self, px: Cell) -> (f32, f32) {
        let (x_res, y_res) = self.pixel_resolution();
        (
            x_res * (px.y - (self.width / 2) as i32) as f32,
            -y_res * (px.x - (self.height / 2) as i32) as f32,
        )
    }

    fn pixel_resolution(&self) -> (f32, f32) {
        (self.m_width / self.width as f32, self.m_height / self.height as f32)
    }
}


/// Number of cells of a width x height grid
fn cell_count(width: usize, height: usize) -> Result<usize, MapError> {
    width.checked_mul(height).ok_or(MapError::TooLarge { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_codes() {
        let grid = OccupancyGrid::from_codes(&[[0, -1, 0], [-2, 0, 7]], 0.05).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(Cell::new(1, 0)), Some(CellState::Obstacle));
        assert_eq!(grid.get(Cell::new(0, 1)), Some(CellState::Inflated));
        // unknown code
        assert_eq!(grid.get(Cell::new(2, 1)), Some(CellState::Obstacle));
        assert_eq!(grid.get(Cell::new(3, 0)), None);
        assert_eq!(grid.open_cells(), vec![Cell::new(0, 0), Cell::new(2, 0), Cell::new(1, 1)]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows: Vec<Vec<i32>> = vec![vec![0, 0], vec![0]];
        assert!(matches!(OccupancyGrid::from_codes(&rows, 1.0), Err(MapError::Dimensions { .. })));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        assert!(matches!(
            OccupancyGrid::new(usize::MAX, 2, 1.0),
            Err(MapError::TooLarge { width: usize::MAX, height: 2 })
        ));
        assert!(matches!(
            OccupancyGrid::from_cells(usize::MAX, 3, 1.0, Vec::new()),
            Err(MapError::TooLarge { .. })
        ));
        assert!(matches!(
            OccupancyGrid::from_cells(2, 2, 1.0, vec![CellState::Open; 3]),
            Err(MapError::Dimensions { expected: 4, found: 3 })
        ));
    }

    #[test]
    fn test_clone_is_deep() {
        let grid = OccupancyGrid::new(4, 4, 0.1).unwrap();
        let mut copy = grid.clone();
        copy.set(Cell::new(1, 1), CellState::Obstacle);
        assert!(grid.is_open(Cell::new(1, 1)));
        assert!(!copy.is_open(Cell::new(1, 1)));
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut grid = OccupancyGrid::new(2, 2, 0.1).unwrap();
        assert!(!grid.set(Cell::new(-1, 0), CellState::Obstacle));
        assert!(!grid.set(Cell::new(0, 2), CellState::Obstacle));
        assert_eq!(grid.open_cells().len(), 4);
    }

    #[test]
    fn test_pose_pixel_round_trip() {
        let grid = OccupancyGrid::new(10, 10, 0.05).unwrap();
        for cell in [Cell::new(0, 0), Cell::new(5, 5), Cell::new(9, 0), Cell::new(3, 7)] {
            let (x, y) = grid.pixel_to_pose(cell);
            assert_eq!(grid.pose_to_pixel(x, y), cell);
        }
        // centre of the image is the origin
        assert_eq!(grid.pixel_to_pose(Cell::new(5, 5)), (0.0, 0.0));
    }

    #[test]
    fn test_state_codes() {
        for state in [CellState::Inflated, CellState::Obstacle, CellState::Open,
                      CellState::NavPoint, CellState::Travelled, CellState::Path] {
            assert_eq!(CellState::from_code(state.code()), Some(state));
        }
        assert_eq!(CellState::from_code(9), None);
    }
}
