use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::errors::PathPlannerError;
use crate::geometry::Cell;
use crate::graph::Graph;
use crate::graph_algos::{a_star::AStar, bfs::Bfs};
use crate::sampling_algos::rrt_star::{RrtStar, RrtStarConfig};
use crate::solver::Solver;

const MILLIS_IN_SEC: u64 = 1000;
const SECS_IN_MIN: u64 = 60;
const MINS_IN_HOUR: u64 = 60;


/// Available planners
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Bfs,
    AStar,
    RrtStar,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Bfs, Algorithm::AStar, Algorithm::RrtStar];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Bfs => "BFS",
            Algorithm::AStar => "A*",
            Algorithm::RrtStar => "RRT*",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}


/// One algorithm, or all of them in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmSelection {
    Single(Algorithm),
    All,
}

impl AlgorithmSelection {
    pub fn algorithms(self) -> Vec<Algorithm> {
        match self {
            AlgorithmSelection::Single(algorithm) => vec![algorithm],
            AlgorithmSelection::All => Algorithm::ALL.to_vec(),
        }
    }
}

impl FromStr for AlgorithmSelection {
    type Err = PathPlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bfs" => Ok(AlgorithmSelection::Single(Algorithm::Bfs)),
            "a-star" | "a*" | "astar" => Ok(AlgorithmSelection::Single(Algorithm::AStar)),
            "rrt-star" | "rrt*" | "rrtstar" => Ok(AlgorithmSelection::Single(Algorithm::RrtStar)),
            "all" => Ok(AlgorithmSelection::All),
            _ => Err(PathPlannerError::UnknownAlgorithm(s.to_string())),
        }
    }
}


/// Settings shared by every planning run
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    pub timeout: Duration, // per algorithm, not per selection
    pub max_iterations: usize, // RRT* only
    pub inflate_size: usize,
    pub seed: Option<u64>, // fixed RRT* seed, OS entropy when None
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(600_000),
            max_iterations: 10_000,
            inflate_size: 3,
            seed: None,
        }
    }
}

impl PlannerConfig {
    pub fn rrt_star(&self) -> RrtStarConfig {
        RrtStarConfig::with_max_iterations(self.max_iterations)
    }
}


/// Outcome of one algorithm run
/// An empty path means the goal was not reached, `cost` is then meaningless
#[derive(Clone, Debug, PartialEq)]
pub struct AlgoResult {
    pub algorithm: Algorithm,
    pub elapsed: Duration,
    pub path: Vec<Cell>,
    pub cost: f64,
    pub travelled: Vec<Cell>,
    pub goal_reached: bool,
    pub timed_out: bool,
}

impl AlgoResult {
    pub fn found_path(&self) -> bool {
        !self.path.is_empty()
    }
}


fn run_solver<S: Solver>(mut solver: S, start: Cell, goal: Cell, timeout: Duration) -> Result<AlgoResult, PathPlannerError> {
    let started = Instant::now();
    let status = solver.solve(start, goal, timeout)?;
    let elapsed = started.elapsed();

    let route = solver.reconstruct_path(start, goal);
    let timed_out = elapsed >= timeout;
    if timed_out {
        warn!("[{}] exceeded timeout of {timeout:?}", solver.algorithm());
    }
    debug!("[{}] finished with {status:?} in {elapsed:?}", solver.algorithm());

    Ok(AlgoResult {
        algorithm: solver.algorithm(),
        elapsed,
        path: route.path,
        cost: route.cost,
        travelled: solver.travelled_nodes(),
        goal_reached: solver.goal_reached(),
        timed_out,
    })
}

/// Run one algorithm on a graph and time it
pub fn run_algorithm(
    graph: &Graph,
    algorithm: Algorithm,
    start: Cell,
    goal: Cell,
    config: &PlannerConfig,
) -> Result<AlgoResult, PathPlannerError> {
    info!("[{algorithm}] planning {start} -> {goal} over {} nodes", graph.len());
    match algorithm {
        Algorithm::Bfs => run_solver(Bfs::new(graph), start, goal, config.timeout),
        Algorithm::AStar => run_solver(AStar::new(graph), start, goal, config.timeout),
        Algorithm::RrtStar => {
            let solver = match config.seed {
                Some(seed) => RrtStar::with_seed(graph, config.rrt_star(), seed),
                None => RrtStar::new(graph, config.rrt_star()),
            };
            run_solver(solver, start, goal, config.timeout)
        }
    }
}

/// Run the selected algorithms one after another
/// `on_progress(completed, total)` fires before the first run and after each one
pub fn run_selection<F>(
    graph: &Graph,
    selection: AlgorithmSelection,
    start: Cell,
    goal: Cell,
    config: &PlannerConfig,
    mut on_progress: F,
) -> Result<Vec<AlgoResult>, PathPlannerError>
where
    F: FnMut(usize, usize),
{
    graph.validate_endpoints(start, goal)?;

    let algorithms = selection.algorithms();
    let total = algorithms.len();
    let mut results = Vec::with_capacity(total);
    on_progress(0, total);

    for (i, algorithm) in algorithms.into_iter().enumerate() {
        results.push(run_algorithm(graph, algorithm, start, goal, config)?);
        on_progress(i + 1, total);
    }
    Ok(results)
}

/// One line per run that went over the timeout, empty when none did
pub fn timeout_report(results: &[AlgoResult], timeout: Duration) -> String {
    let (value, unit) = format_duration(timeout);
    results.iter()
        .filter(|r| r.timed_out)
        .map(|r| format!("   - {} Computation exceeded {value} {unit}\n", r.algorithm))
        .collect()
}


/// Duration as a value in the largest fitting unit: ms, s or mins
pub fn format_duration(duration: Duration) -> (f32, &'static str) {
    let mut value = duration.as_millis() as f32;
    if value <= MILLIS_IN_SEC as f32 {
        return (value, "ms");
    }
    value /= MILLIS_IN_SEC as f32;
    if value > SECS_IN_MIN as f32 {
        (value / SECS_IN_MIN as f32, "mins")
    } else {
        (value, "s")
    }
}

/// Inverse of `format_duration`, also accepts hrs
pub fn to_millis(value: f32, unit: &str) -> Option<u64> {
    let multiplier = match unit {
        "ms" => 1,
        "s" => MILLIS_IN_SEC,
        "mins" => MILLIS_IN_SEC * SECS_IN_MIN,
        "hrs" => MILLIS_IN_SEC * SECS_IN_MIN * MINS_IN_HOUR,
        _ => return None,
    };
    Some((value as f64 * multiplier as f64).round() as u64)
}
