use std::{
    collections::BinaryHeap,
    cmp::Ordering,
    time::Duration,
};

use log::{debug, trace, warn};

use super::shortest_path;
use crate::errors::PathPlannerError;
use crate::geometry::Cell;
use crate::graph::Graph;
use crate::planner::Algorithm;
use crate::solver::{Deadline, Route, SolveStatus, Solver};


/// Entry of the open list
/// Ordering: lowest f_cost first, ties go to the entry that joined the open list last
#[derive(Debug)]
struct Node {
    index: usize, // position of the cell in graph order
    f_cost: f64, // Total cost = cost + h(n) aka estimated cost
    seq: u64, // when the cell joined the open list
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f_cost.total_cmp(&self.f_cost)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}
impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Node {}


/// A* Algorithm
/// https://en.wikipedia.org/wiki/A*_search_algorithm
///
/// Uses the straight-line distance to the goal as heuristic. The open list is
/// a binary heap with lazy deletion: improving a node that is already open
/// pushes a fresh entry carrying its original join order, and outdated
/// entries are skipped when popped.
pub struct AStar<'a> {
    graph: &'a Graph,
    dist: Vec<f64>, // cost from start, infinity until discovered
    h: Vec<f64>, // heuristic to the goal
    parent: Vec<Option<usize>>,
    open: Vec<Option<u64>>, // join order while on the open list
    travelled: Vec<Cell>,
    goal: Option<usize>,
}

impl<'a> AStar<'a> {

    pub fn new(graph: &'a Graph) -> Self {
        let n = graph.len();
        Self {
            graph,
            dist: vec![f64::INFINITY; n],
            h: vec![0.0; n],
            parent: vec![None; n],
            open: vec![None; n],
            travelled: Vec::new(),
            goal: None,
        }
    }

    fn reset(&mut self, goal: Cell) {
        self.dist.fill(f64::INFINITY);
        self.parent.fill(None);
        self.open.fill(None);
        self.travelled.clear();
        for (i, node) in self.graph.nodes().enumerate() {
            self.h[i] = euclidean_heuristic(node, goal);
        }
    }

    fn f_score(&self, index: usize) -> f64 {
        self.dist[index] + self.h[index]
    }

    /// Pop the open node with the lowest f_cost, skipping outdated heap entries
    fn pop_min(&mut self, heap: &mut BinaryHeap<Node>) -> Option<usize> {
        while let Some(Node { index, f_cost, seq }) = heap.pop() {
            if self.open[index] == Some(seq) && f_cost == self.f_score(index) {
                self.open[index] = None;
                return Some(index);
            }
        }
        None
    }
}

impl Solver for AStar<'_> {

    fn algorithm(&self) -> Algorithm {
        Algorithm::AStar
    }

    /// Expand nodes by f_cost until the goal is popped
    /// Also stops after as many expansions as there are nodes, or on timeout
    fn solve(&mut self, start: Cell, goal: Cell, timeout: Duration) -> Result<SolveStatus, PathPlannerError> {
        self.graph.validate_endpoints(start, goal)?;
        self.reset(goal);
        debug!("[AStar] solve: start={start} goal={goal}");

        let deadline = Deadline::new(timeout);
        let graph = self.graph;
        let (Some(start_index), Some(goal_index)) = (graph.node_index(start), graph.node_index(goal)) else {
            return Err(PathPlannerError::InvalidEndpoint(start));
        };
        self.goal = Some(goal_index);

        let mut heap: BinaryHeap<Node> = BinaryHeap::new();
        let mut next_seq: u64 = 0;
        let mut open_len: usize = 0;

        self.dist[start_index] = 0.0;
        self.open[start_index] = Some(next_seq);
        heap.push(Node { index: start_index, f_cost: self.f_score(start_index), seq: next_seq });
        next_seq += 1;
        open_len += 1;

        let mut kill_count = 0;
        let status = loop {
            if open_len == 0 {
                debug!("[AStar] open list exhausted after {kill_count} expansions");
                break SolveStatus::Completed;
            }
            if kill_count >= graph.len() {
                debug!("[AStar] expansion limit {kill_count} reached");
                break SolveStatus::BudgetExhausted;
            }
            if deadline.expired() {
                warn!("[AStar] timed out after {timeout:?}, {kill_count} expansions");
                break SolveStatus::TimedOut;
            }

            let Some(current) = self.pop_min(&mut heap) else {
                break SolveStatus::Completed;
            };
            open_len -= 1;

            if current == goal_index {
                debug!("[AStar] goal reached after {kill_count} expansions, cost {}", self.dist[current]);
                break SolveStatus::Completed;
            }

            for &(child, weight) in graph.edges_at(current) {
                let Some(child_index) = graph.node_index(child) else {
                    continue;
                };

                // new cost to reach this node = edge cost + node cost
                let new_dist = self.dist[current] + weight as f64;
                let new_cost = new_dist + self.h[child_index];
                if new_cost >= self.f_score(child_index) {
                    continue;
                }

                self.dist[child_index] = new_dist;
                self.parent[child_index] = Some(current);

                // an open node keeps its place in the list
                let seq = match self.open[child_index] {
                    Some(seq) => seq,
                    None => {
                        let seq = next_seq;
                        next_seq += 1;
                        open_len += 1;
                        self.open[child_index] = Some(seq);
                        self.travelled.push(child);
                        trace!("[AStar] open {child} f={new_cost:.3}");
                        seq
                    }
                };
                heap.push(Node { index: child_index, f_cost: new_cost, seq });
            }

            kill_count += 1;
        };

        Ok(status)
    }

    fn reconstruct_path(&self, start: Cell, goal: Cell) -> Route {
        let (Some(start_index), Some(goal_index)) = (self.graph.node_index(start), self.graph.node_index(goal)) else {
            return Route { path: Vec::new(), cost: f64::INFINITY };
        };

        let indices = shortest_path(start_index, goal_index, |i| self.parent[i], self.graph.len());
        Route {
            path: indices.into_iter().filter_map(|i| self.graph.node_at(i)).collect(),
            cost: self.dist[goal_index],
        }
    }

    /// Nodes in the order they first joined the open list (the start is not included)
    fn travelled_nodes(&self) -> Vec<Cell> {
        self.travelled.clone()
    }

    fn goal_reached(&self) -> bool {
        self.goal.is_some_and(|i| self.dist[i].is_finite())
    }
}

/// Straight-line distance between two cells
fn euclidean_heuristic(a: Cell, b: Cell) -> f64 {
    a.distance(&b)
}



#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_algos::bfs::Bfs;
    use crate::grid::{CellState, OccupancyGrid};

    fn path_cost(graph: &Graph, path: &[Cell]) -> u32 {
        path.windows(2).map(|p| graph.edge_weight(p[0], p[1]).unwrap()).sum()
    }

    #[test]
    fn test_a_star_open_grid() {
        let graph = Graph::from_grid(&OccupancyGrid::new(20, 10, 0.05).unwrap());
        let start = Cell::new(0, 0);
        let goal = Cell::new(19, 9);

        let mut a_star = AStar::new(&graph);
        let planned = a_star.plan(start, goal, Duration::from_secs(5)).unwrap();
        assert_eq!(planned.path.first(), Some(&start));
        assert_eq!(planned.path.last(), Some(&goal));
        assert_eq!(planned.cost, path_cost(&graph, &planned.path) as f64);

        let mut bfs = Bfs::new(&graph);
        let bfs_path = bfs.plan(start, goal, Duration::from_secs(5)).unwrap();
        assert!(planned.cost <= bfs_path.cost);
        // diagonals cost 2, so the cheapest route is any monotone staircase
        assert_eq!(planned.cost, 28.0);
    }

    #[test]
    fn test_a_star_avoids_wall() {
        // wall across column 3 with a gap at the bottom
        let mut grid = OccupancyGrid::new(7, 5, 1.0).unwrap();
        for y in 0..4 {
            grid.set(Cell::new(3, y), CellState::Obstacle);
        }
        let graph = Graph::from_grid(&grid);

        let mut a_star = AStar::new(&graph);
        let planned = a_star.plan(Cell::new(0, 0), Cell::new(6, 0), Duration::from_secs(5)).unwrap();
        assert!(planned.path.contains(&Cell::new(3, 4)));
        for pair in planned.path.windows(2) {
            assert!(graph.edge_weight(pair[0], pair[1]).is_some(), "{} -> {}", pair[0], pair[1]);
        }
        assert_eq!(planned.cost, path_cost(&graph, &planned.path) as f64);
    }

    #[test]
    fn test_a_star_handles_unreachable_goal() {
        let mut grid = OccupancyGrid::new(5, 3, 1.0).unwrap();
        for y in 0..3 {
            grid.set(Cell::new(2, y), CellState::Obstacle);
        }
        let graph = Graph::from_grid(&grid);

        let mut a_star = AStar::new(&graph);
        let result = a_star.plan(Cell::new(0, 1), Cell::new(4, 1), Duration::from_secs(5));
        assert_eq!(result, Err(PathPlannerError::Unreachable));
        assert!(!a_star.goal_reached());
        assert_eq!(a_star.reconstruct_path(Cell::new(0, 1), Cell::new(4, 1)).cost, f64::INFINITY);
    }

    #[test]
    fn test_travelled_excludes_start_and_is_ordered() {
        let graph = Graph::from_grid(&OccupancyGrid::new(3, 1, 1.0).unwrap());
        let mut a_star = AStar::new(&graph);
        a_star.solve(Cell::new(0, 0), Cell::new(2, 0), Duration::from_secs(5)).unwrap();
        assert_eq!(a_star.travelled_nodes(), vec![Cell::new(1, 0), Cell::new(2, 0)]);
    }

    #[test]
    fn test_tie_break_prefers_latest_open_node() {
        // Diamond graph where B and C tie on f; C joined last and is expanded first
        let mut graph = Graph::new();
        let a = Cell::new(0, 1);
        let b = Cell::new(1, 0);
        let c = Cell::new(1, 2);
        let d = Cell::new(2, 1);
        graph.add_edge(a, b, 1);
        graph.add_edge(a, c, 1);
        graph.add_edge(b, d, 1);
        graph.add_edge(c, d, 1);
        graph.add_node(d);

        let mut a_star = AStar::new(&graph);
        let planned = a_star.plan(a, d, Duration::from_secs(5)).unwrap();
        assert_eq!(planned.path, vec![a, c, d]);
        assert_eq!(planned.cost, 2.0);
    }

    #[test]
    fn test_a_star_zero_timeout() {
        let graph = Graph::from_grid(&OccupancyGrid::new(30, 30, 1.0).unwrap());
        let mut a_star = AStar::new(&graph);
        let status = a_star.solve(Cell::new(0, 0), Cell::new(29, 29), Duration::ZERO).unwrap();
        assert_eq!(status, SolveStatus::TimedOut);
        assert!(a_star.travelled_nodes().is_empty());
    }

    #[test]
    fn test_a_star_is_deterministic() {
        let graph = Graph::from_grid(&OccupancyGrid::new(15, 15, 1.0).unwrap());
        let run = || {
            let mut a_star = AStar::new(&graph);
            let planned = a_star.plan(Cell::new(1, 2), Cell::new(13, 11), Duration::from_secs(5)).unwrap();
            (planned.path, planned.cost, planned.travelled)
        };
        assert_eq!(run(), run());
    }
}
