use std::time::Duration;

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::collections::FxHashMap;
use crate::errors::PathPlannerError;
use crate::geometry::Cell;
use crate::graph::Graph;
use crate::graph_algos::shortest_path;
use crate::planner::Algorithm;
use crate::solver::{Deadline, Route, SolveStatus, Solver};


/// Value of pi used when steering in `Steering::DegreeScaled` mode
const STEER_PI: f32 = 3.14159;


/// How the heading towards a sample is turned into a one-cell step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Steering {
    /// Heading is scaled by 180/pi before taking cos/sin.
    /// The step still has unit length, but its direction is scrambled
    /// relative to the sample. Kept for parity with existing results.
    #[default]
    DegreeScaled,
    /// Step straight along the heading
    Direct,
}


/// RRT* tuning
#[derive(Clone, Debug, PartialEq)]
pub struct RrtStarConfig {
    pub max_iterations: usize,
    pub goal_sample_rate: f64, // probability of sampling the goal itself
    pub goal_radius: f64, // a new node this close to the goal finishes the search
    pub neighbor_radius: f64, // strict radius for choose-parent and rewiring
    pub steering: Steering,
}

impl Default for RrtStarConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            goal_sample_rate: 0.2,
            goal_radius: 1.5,
            neighbor_radius: 2.0,
            steering: Steering::default(),
        }
    }
}

impl RrtStarConfig {
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self { max_iterations, ..Self::default() }
    }
}


/// RRT* Algorithm over the open cells of a graph
/// http://roboticsproceedings.org/rss06/p34.pdf
///
/// Every iteration samples a cell, steps one cell from the nearest tree node
/// towards it, picks the cheapest parent among nearby tree nodes and rewires
/// those neighbors through the new node. Rewiring updates only the rewired
/// node's cost, never its descendants.
pub struct RrtStar<'a, R: Rng = StdRng> {
    graph: &'a Graph,
    config: RrtStarConfig,
    rng: R,
    valid_nodes: Vec<Cell>, // sampling reservoir, recently drawn cells move to the back
    node_list: Vec<Cell>, // tree nodes in insertion order, may repeat
    cost: FxHashMap<Cell, f64>, // path length from start through the tree
    parent: FxHashMap<Cell, Cell>,
    travelled: Vec<Cell>,
    goal_reached: bool,
}

impl<'a> RrtStar<'a, StdRng> {

    /// Create a new RRT* instance seeded from the OS
    pub fn new(graph: &'a Graph, config: RrtStarConfig) -> Self {
        Self::with_rng(graph, config, StdRng::from_os_rng())
    }

    /// Create a reproducible RRT* instance
    pub fn with_seed(graph: &'a Graph, config: RrtStarConfig, seed: u64) -> Self {
        Self::with_rng(graph, config, StdRng::seed_from_u64(seed))
    }
}

impl<'a, R: Rng> RrtStar<'a, R> {

    pub fn with_rng(graph: &'a Graph, config: RrtStarConfig, rng: R) -> Self {
        Self {
            graph,
            config,
            rng,
            valid_nodes: graph.nodes().collect(),
            node_list: Vec::new(),
            cost: FxHashMap::default(),
            parent: FxHashMap::default(),
            travelled: Vec::new(),
            goal_reached: false,
        }
    }

    /// Tree edges as (child, parent)
    pub fn edges(&self) -> Vec<(Cell, Cell)> {
        self.parent.iter().map(|(&child, &parent)| (child, parent)).collect()
    }

    /// Sample a cell: the goal with `goal_sample_rate`, otherwise a cell from the reservoir
    fn random_node(&mut self, goal: Cell) -> Cell {
        let r: f64 = self.rng.random();
        if r > self.config.goal_sample_rate && !self.valid_nodes.is_empty() {
            let idx = self.rng.random_range(0..self.valid_nodes.len());
            let node = self.valid_nodes.remove(idx);
            self.valid_nodes.push(node);
            node
        } else {
            goal
        }
    }

    /// Closest tree node, first one wins on ties
    fn nearest_node(&self, target: Cell) -> Cell {
        let mut nearest = self.node_list[0];
        let mut min_dist = f64::INFINITY;
        for &node in &self.node_list {
            let dist = target.distance(&node);
            if dist < min_dist {
                nearest = node;
                min_dist = dist;
            }
        }
        nearest
    }

    /// One-cell step from `from` in the direction of `to`
    fn steer(&self, from: Cell, to: Cell) -> Cell {
        let theta = ((to.y - from.y) as f32).atan2((to.x - from.x) as f32);
        let angle = match self.config.steering {
            Steering::DegreeScaled => theta as f64 * 180.0 / STEER_PI as f64,
            Steering::Direct => theta as f64,
        };
        Cell::new(
            (from.x as f64 + angle.cos()).round() as i32,
            (from.y as f64 + angle.sin()).round() as i32,
        )
    }

    /// Tree nodes strictly within the neighbor radius
    fn find_neighbors(&self, node: Cell) -> Vec<Cell> {
        self.node_list.iter()
            .copied()
            .filter(|n| n.distance(&node) < self.config.neighbor_radius)
            .collect()
    }

    fn cost_of(&self, node: Cell) -> f64 {
        self.cost.get(&node).copied().unwrap_or(0.0)
    }

    /// True if walking parent links up from `node` meets `ancestor`
    fn descends_from(&self, node: Cell, ancestor: Cell) -> bool {
        let mut current = node;
        for _ in 0..=self.parent.len() {
            if current == ancestor {
                return true;
            }
            match self.parent.get(&current) {
                Some(&parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Attach `new_node` to the cheapest of `nearest` and its neighbors
    /// Candidates below `new_node` are skipped so the tree stays acyclic when
    /// a cell is sampled twice. Returns false when no candidate is left.
    fn choose_parent(&mut self, neighbors: &[Cell], nearest: Cell, new_node: Cell) -> bool {
        let mut best: Option<(Cell, f64)> = None;
        for &n in std::iter::once(&nearest).chain(neighbors) {
            if self.descends_from(n, new_node) {
                continue;
            }
            let cost = self.cost_of(n) + new_node.distance(&n);
            if best.is_none_or(|(_, min_cost)| cost < min_cost) {
                best = Some((n, cost));
            }
        }

        let Some((parent, cost)) = best else {
            return false;
        };
        self.cost.insert(new_node, cost);
        self.parent.insert(new_node, parent);
        true
    }

    /// Reparent neighbors through `new_node` when that is strictly cheaper
    fn rewire(&mut self, new_node: Cell, neighbors: &[Cell]) {
        let base = self.cost_of(new_node);
        for &n in neighbors {
            let cost = base + new_node.distance(&n);
            if cost < self.cost_of(n) && !self.descends_from(new_node, n) {
                trace!("[RRT*] rewire {n} through {new_node}");
                self.parent.insert(n, new_node);
                self.cost.insert(n, cost);
            }
        }
    }

    /// Grow the tree by one admissible node
    fn extend(&mut self, nearest: Cell, new_node: Cell) {
        let neighbors = self.find_neighbors(new_node);
        if !self.choose_parent(&neighbors, nearest, new_node) {
            // already in the tree above every candidate, keep its link
            trace!("[RRT*] {new_node} kept its parent");
        }
        self.node_list.push(new_node);
        self.rewire(new_node, &neighbors);
        self.travelled.push(new_node);
    }

    /// Link the goal below `new_node` unless it is already in the tree that way
    fn connect_goal(&mut self, new_node: Cell, goal: Cell) {
        self.goal_reached = true;
        if new_node == goal || self.parent.get(&new_node) == Some(&goal) {
            return;
        }
        let cost = self.cost_of(new_node) + new_node.distance(&goal);
        self.parent.insert(goal, new_node);
        self.cost.insert(goal, cost);
    }
}

impl<R: Rng> Solver for RrtStar<'_, R> {

    fn algorithm(&self) -> Algorithm {
        Algorithm::RrtStar
    }

    fn solve(&mut self, start: Cell, goal: Cell, timeout: Duration) -> Result<SolveStatus, PathPlannerError> {
        self.graph.validate_endpoints(start, goal)?;
        debug!("[RRT*] solve: start={start} goal={goal} max_iterations={}", self.config.max_iterations);

        self.node_list = vec![start];
        self.cost.clear();
        self.parent.clear();
        self.travelled.clear();
        self.cost.insert(start, 0.0);
        self.goal_reached = start == goal;
        if self.goal_reached {
            return Ok(SolveStatus::Completed);
        }

        let deadline = Deadline::new(timeout);
        for iteration in 0..self.config.max_iterations {

            if deadline.expired() {
                warn!("[RRT*] timed out after {timeout:?} at iteration {iteration}");
                return Ok(SolveStatus::TimedOut);
            }

            let random_node = self.random_node(goal);
            let nearest = self.nearest_node(random_node);
            let new_node = self.steer(nearest, random_node);
            trace!("[RRT*] {iteration}: sample={random_node} nearest={nearest} new={new_node}");

            // cells off the graph still use up the iteration
            if !self.graph.is_node_valid(new_node) {
                continue;
            }
            self.extend(nearest, new_node);

            if new_node.distance(&goal) <= self.config.goal_radius {
                self.connect_goal(new_node, goal);
                debug!("[RRT*] goal reached at iteration {iteration}, cost {:.3}", self.cost_of(goal));
                return Ok(SolveStatus::Completed);
            }
        }

        debug!("[RRT*] goal not reached within {} iterations", self.config.max_iterations);
        Ok(SolveStatus::BudgetExhausted)
    }

    /// Path through the tree; empty when the goal was not reached
    /// The cost is the goal's recorded cost, 0 when it has none
    fn reconstruct_path(&self, start: Cell, goal: Cell) -> Route {
        let path = shortest_path(start, goal, |n| self.parent.get(&n).copied(), self.parent.len() + 1);
        Route { path, cost: self.cost_of(goal) }
    }

    /// Every node added to the tree, in insertion order
    fn travelled_nodes(&self) -> Vec<Cell> {
        self.travelled.clone()
    }

    fn goal_reached(&self) -> bool {
        self.goal_reached
    }
}
