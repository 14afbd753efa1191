use std::time::{Duration, Instant};

use crate::errors::PathPlannerError;
use crate::geometry::Cell;
use crate::planner::Algorithm;


/// How a call to `solve` ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// Goal reached, or the search space was exhausted
    Completed,
    /// The deadline passed; partial state is kept
    TimedOut,
    /// Iteration or expansion budget used up before reaching the goal
    BudgetExhausted,
}


/// Path reconstructed from a solver's parent links
/// An empty path means no path; `cost` is whatever the solver recorded for the goal
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub path: Vec<Cell>,
    pub cost: f64,
}

impl Route {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}


/// Successful planning outcome
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedPath {
    pub path: Vec<Cell>,
    pub cost: f64,
    pub travelled: Vec<Cell>,
}


/// Wall-clock deadline polled by the solvers
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self { started: Instant::now(), timeout }
    }

    pub(crate) fn expired(&self) -> bool {
        self.started.elapsed() >= self.timeout
    }
}


/// A path planner over a [`crate::graph::Graph`]
pub trait Solver {

    /// Which algorithm this is
    fn algorithm(&self) -> Algorithm;

    /// Run the search from start to goal, polling the deadline once per step
    /// Fails only when an endpoint is not a graph node
    fn solve(&mut self, start: Cell, goal: Cell, timeout: Duration) -> Result<SolveStatus, PathPlannerError>;

    /// Walk parent links back from the goal
    fn reconstruct_path(&self, start: Cell, goal: Cell) -> Route;

    /// Cells the search touched, for debug overlays
    fn travelled_nodes(&self) -> Vec<Cell>;

    /// True once the goal has a recorded route back to the start
    fn goal_reached(&self) -> bool;

    /// Solve and fold the outcome into a tagged result
    fn plan(&mut self, start: Cell, goal: Cell, timeout: Duration) -> Result<PlannedPath, PathPlannerError> {
        let status = self.solve(start, goal, timeout)?;
        let Route { path, cost } = self.reconstruct_path(start, goal);

        if path.is_empty() {
            return Err(match status {
                SolveStatus::Completed => PathPlannerError::Unreachable,
                SolveStatus::TimedOut => PathPlannerError::TimedOut,
                SolveStatus::BudgetExhausted => PathPlannerError::GoalNotReached,
            });
        }

        Ok(PlannedPath { path, cost, travelled: self.travelled_nodes() })
    }
}
