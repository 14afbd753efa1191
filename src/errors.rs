use thiserror::Error;

use crate::geometry::Cell;


/// Errors raised while planning a path
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathPlannerError {
    /// Start or goal is not a node of the graph (obstacle or out of bounds)
    #[error("invalid endpoint {0}: not an open cell of the graph")]
    InvalidEndpoint(Cell),

    /// Search finished without reaching the goal
    #[error("goal is unreachable from start")]
    Unreachable,

    /// Deadline passed before the goal was reached
    #[error("search exceeded its timeout")]
    TimedOut,

    /// Sampling planner exhausted its iteration budget
    #[error("goal not reached within the iteration budget")]
    GoalNotReached,

    #[error("unrecognized algorithm: {0}")]
    UnknownAlgorithm(String),
}


/// Errors raised while building or loading an occupancy grid
#[derive(Debug, Error)]
pub enum MapError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("map yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("map image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("parse error: {0}")]
    Parse(String),

    /// width x height overflows usize
    #[error("grid of {width}x{height} cells is too large")]
    TooLarge { width: usize, height: usize },

    /// Rows of differing length, or a buffer that does not match width x height
    #[error("grid is not rectangular: expected {expected} cells, found {found}")]
    Dimensions { expected: usize, found: usize },
}
