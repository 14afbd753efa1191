pub mod errors;
mod collections;
pub mod geometry;
pub mod grid;
pub mod graph;
pub mod solver;
pub mod graph_algos;
pub mod sampling_algos;
pub mod planner;
pub mod worker;
pub mod map_io;

pub use errors::{MapError, PathPlannerError};
pub use geometry::Cell;
pub use graph::{Graph, build_graph};
pub use grid::{CellState, OccupancyGrid};
pub use planner::{AlgoResult, Algorithm, AlgorithmSelection, PlannerConfig, run_algorithm, run_selection};
pub use solver::{PlannedPath, Route, SolveStatus, Solver};
