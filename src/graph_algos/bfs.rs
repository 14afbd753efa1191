use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, trace, warn};

use super::shortest_path;
use crate::errors::PathPlannerError;
use crate::geometry::Cell;
use crate::graph::Graph;
use crate::planner::Algorithm;
use crate::solver::{Deadline, Route, SolveStatus, Solver};


/// Breadth-first search
/// https://en.wikipedia.org/wiki/Breadth-first_search
///
/// Nodes are expanded in FIFO order and each node keeps the distance of the
/// first time it was discovered. With 1/2 edge weights that is not always the
/// cheapest distance: BFS minimises hops, not cost.
pub struct Bfs<'a> {
    graph: &'a Graph,
    visited: Vec<bool>, // indexed by graph order
    dist: Vec<u32>, // distance at discovery, 0 for undiscovered nodes
    parent: Vec<Option<usize>>,
    goal: Option<usize>,
}

impl<'a> Bfs<'a> {

    pub fn new(graph: &'a Graph) -> Self {
        let n = graph.len();
        Self {
            graph,
            visited: vec![false; n],
            dist: vec![0; n],
            parent: vec![None; n],
            goal: None,
        }
    }

    fn reset(&mut self) {
        self.visited.fill(false);
        self.dist.fill(0);
        self.parent.fill(None);
        self.goal = None;
    }

    /// Distance recorded for a cell, 0 if it was never discovered
    pub fn distance(&self, cell: Cell) -> Option<u32> {
        self.graph.node_index(cell).map(|i| self.dist[i])
    }
}

impl Solver for Bfs<'_> {

    fn algorithm(&self) -> Algorithm {
        Algorithm::Bfs
    }

    fn solve(&mut self, start: Cell, goal: Cell, timeout: Duration) -> Result<SolveStatus, PathPlannerError> {
        self.graph.validate_endpoints(start, goal)?;
        self.reset();
        debug!("[BFS] solve: start={start} goal={goal}");

        let deadline = Deadline::new(timeout);
        let graph = self.graph;
        let (Some(start_index), Some(goal_index)) = (graph.node_index(start), graph.node_index(goal)) else {
            return Err(PathPlannerError::InvalidEndpoint(start));
        };

        self.goal = Some(goal_index);
        let mut queue: VecDeque<usize> = VecDeque::from([start_index]);
        self.visited[start_index] = true;

        while let Some(current) = queue.pop_front() {

            if deadline.expired() {
                warn!("[BFS] timed out after {timeout:?} with {} nodes queued", queue.len());
                return Ok(SolveStatus::TimedOut);
            }

            // goal distance is fixed once discovered, no need to drain the queue
            if current == goal_index {
                debug!("[BFS] goal reached, distance {}", self.dist[goal_index]);
                return Ok(SolveStatus::Completed);
            }

            for &(child, weight) in graph.edges_at(current) {
                let Some(child_index) = graph.node_index(child) else {
                    continue;
                };
                if self.visited[child_index] {
                    continue;
                }
                trace!("[BFS] discover {child} from {:?}", graph.node_at(current));
                self.visited[child_index] = true;
                self.parent[child_index] = Some(current);
                self.dist[child_index] = self.dist[current] + weight;
                queue.push_back(child_index);
            }
        }

        debug!("[BFS] queue exhausted, goal {}", if self.visited[goal_index] { "reached" } else { "unreachable" });
        Ok(SolveStatus::Completed)
    }

    fn reconstruct_path(&self, start: Cell, goal: Cell) -> Route {
        let (Some(start_index), Some(goal_index)) = (self.graph.node_index(start), self.graph.node_index(goal)) else {
            return Route { path: Vec::new(), cost: 0.0 };
        };

        let indices = shortest_path(start_index, goal_index, |i| self.parent[i], self.graph.len());
        Route {
            path: indices.into_iter().filter_map(|i| self.graph.node_at(i)).collect(),
            cost: self.dist[goal_index] as f64,
        }
    }

    /// Every discovered node, in graph order
    fn travelled_nodes(&self) -> Vec<Cell> {
        self.visited.iter()
            .enumerate()
            .filter(|&(_, &v)| v)
            .filter_map(|(i, _)| self.graph.node_at(i))
            .collect()
    }

    fn goal_reached(&self) -> bool {
        self.goal.is_some_and(|i| self.visited[i])
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellState, OccupancyGrid};

    fn corridor() -> Graph {
        // 5x3 grid with a wall in the middle column except the bottom row
        let mut grid = OccupancyGrid::new(5, 3, 1.0).unwrap();
        grid.set(Cell::new(2, 0), CellState::Obstacle);
        grid.set(Cell::new(2, 1), CellState::Obstacle);
        Graph::from_grid(&grid)
    }

    #[test]
    fn test_bfs_finds_path() {
        let graph = corridor();
        let mut bfs = Bfs::new(&graph);
        let status = bfs.solve(Cell::new(0, 0), Cell::new(4, 0), Duration::from_secs(5)).unwrap();
        assert_eq!(status, SolveStatus::Completed);

        let route = bfs.reconstruct_path(Cell::new(0, 0), Cell::new(4, 0));
        assert_eq!(route.path.first(), Some(&Cell::new(0, 0)));
        assert_eq!(route.path.last(), Some(&Cell::new(4, 0)));
        assert!(route.path.contains(&Cell::new(2, 2)));
        for pair in route.path.windows(2) {
            assert!(graph.edge_weight(pair[0], pair[1]).is_some());
        }
    }

    #[test]
    fn test_bfs_uniform_weights_manhattan() {
        // single row: only orthogonal edges
        let graph = Graph::from_grid(&OccupancyGrid::new(8, 1, 1.0).unwrap());
        let mut bfs = Bfs::new(&graph);
        bfs.solve(Cell::new(0, 0), Cell::new(7, 0), Duration::from_secs(5)).unwrap();
        let route = bfs.reconstruct_path(Cell::new(0, 0), Cell::new(7, 0));
        assert_eq!(route.path.len(), 8);
        assert_eq!(route.cost, 7.0);
    }

    #[test]
    fn test_bfs_unreachable_goal() {
        let mut grid = OccupancyGrid::new(5, 1, 1.0).unwrap();
        grid.set(Cell::new(2, 0), CellState::Obstacle);
        let graph = Graph::from_grid(&grid);

        let mut bfs = Bfs::new(&graph);
        let status = bfs.solve(Cell::new(0, 0), Cell::new(4, 0), Duration::from_secs(5)).unwrap();
        assert_eq!(status, SolveStatus::Completed);

        let route = bfs.reconstruct_path(Cell::new(0, 0), Cell::new(4, 0));
        assert!(route.is_empty());
        // stale distance, callers must check the path
        assert_eq!(route.cost, 0.0);
        assert_eq!(bfs.travelled_nodes(), vec![Cell::new(0, 0), Cell::new(1, 0)]);

        let result = Bfs::new(&graph).plan(Cell::new(0, 0), Cell::new(4, 0), Duration::from_secs(5));
        assert_eq!(result, Err(PathPlannerError::Unreachable));
    }

    #[test]
    fn test_bfs_invalid_endpoint() {
        let graph = corridor();
        let mut bfs = Bfs::new(&graph);
        assert_eq!(
            bfs.solve(Cell::new(2, 0), Cell::new(4, 0), Duration::from_secs(5)),
            Err(PathPlannerError::InvalidEndpoint(Cell::new(2, 0)))
        );
        assert_eq!(
            bfs.solve(Cell::new(0, 0), Cell::new(9, 9), Duration::from_secs(5)),
            Err(PathPlannerError::InvalidEndpoint(Cell::new(9, 9)))
        );
    }

    #[test]
    fn test_bfs_zero_timeout() {
        let graph = Graph::from_grid(&OccupancyGrid::new(30, 30, 1.0).unwrap());
        let mut bfs = Bfs::new(&graph);
        let status = bfs.solve(Cell::new(0, 0), Cell::new(29, 29), Duration::ZERO).unwrap();
        assert_eq!(status, SolveStatus::TimedOut);
        assert_eq!(bfs.travelled_nodes(), vec![Cell::new(0, 0)]);
        assert_eq!(
            Bfs::new(&graph).plan(Cell::new(0, 0), Cell::new(29, 29), Duration::ZERO),
            Err(PathPlannerError::TimedOut)
        );
    }

    #[test]
    fn test_bfs_start_is_goal() {
        let graph = corridor();
        let mut bfs = Bfs::new(&graph);
        let planned = bfs.plan(Cell::new(1, 1), Cell::new(1, 1), Duration::from_secs(5)).unwrap();
        assert_eq!(planned.path, vec![Cell::new(1, 1)]);
        assert_eq!(planned.cost, 0.0);
    }
}
