use std::fmt;
use num_traits::{Num, Signed, Float};


/// Manhattan distance
pub fn manhattan_distance<T>(x1: T, y1: T, x2: T, y2: T) -> T
where
    T: Num + Copy + Signed,
    {
    (x1 - x2).abs() + (y1 - y2).abs()
}

/// Euclidean distance
pub fn euclidean<T>(x1: T, y1: T, x2: T, y2: T) -> T
where
    T: Float,
    {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}


/// Grid coordinate (x, y) := (column, row)
/// Ordering is column-major: by x, then by y
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Straight-line distance between two cells
    pub fn distance(&self, other: &Cell) -> f64 {
        euclidean(self.x as f64, self.y as f64, other.x as f64, other.y as f64)
    }

    /// Number of orthogonal steps between two cells, ignoring obstacles
    pub fn manhattan(&self, other: &Cell) -> i32 {
        manhattan_distance(self.x, self.y, other.x, other.y)
    }

    /// True if the cells touch orthogonally or diagonally
    pub fn is_adjacent(&self, other: &Cell) -> bool {
        self != other && (self.x - other.x).abs() <= 1 && (self.y - other.y).abs() <= 1
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}
