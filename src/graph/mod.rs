use log::debug;

use crate::collections::FxIndexMap;
use crate::errors::PathPlannerError;
use crate::geometry::Cell;
use crate::grid::{CellState, OccupancyGrid};


/// Edge weight between orthogonal neighbors
pub const ORTHOGONAL_WEIGHT: u32 = 1;
/// Edge weight between diagonal neighbors
/// Integer stand-in for sqrt(2), kept as 2 so costs stay integral
pub const DIAGONAL_WEIGHT: u32 = 2;

/// Neighbor offsets in expansion order: up, down, left, right, then the diagonals
const NEIGHBOR_OFFSETS: [(i32, i32, u32); 8] = [
    (0, -1, ORTHOGONAL_WEIGHT),
    (0, 1, ORTHOGONAL_WEIGHT),
    (-1, 0, ORTHOGONAL_WEIGHT),
    (1, 0, ORTHOGONAL_WEIGHT),
    (-1, -1, DIAGONAL_WEIGHT),
    (1, -1, DIAGONAL_WEIGHT),
    (-1, 1, DIAGONAL_WEIGHT),
    (1, 1, DIAGONAL_WEIGHT),
];


/// Weighted, directed adjacency structure keyed by cell
/// N: node - an open cell
/// The Vec holds (neighbor, edge weight) in expansion order
///
/// Graphs built from a grid keep their nodes sorted by cell, which fixes the
/// iteration order every solver relies on.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: FxIndexMap<Cell, Vec<(Cell, u32)>>,
    pub root: Option<Cell>, // start
    pub end: Option<Cell>, // goal
}

impl Graph {

    pub fn new() -> Self {
        Self::default()
    }

    /// Build the 8-connected graph of an occupancy grid
    /// Only `Open` cells become nodes, and an edge exists when both ends are open
    pub fn from_grid(grid: &OccupancyGrid) -> Self {
        let mut graph = Graph::new();

        for (cell, state) in grid.iter() {
            if state != CellState::Open {
                continue;
            }

            for (dx, dy, weight) in NEIGHBOR_OFFSETS {
                let neighbor = Cell::new(cell.x + dx, cell.y + dy);
                if grid.is_open(neighbor) {
                    graph.add_edge(cell, neighbor, weight);
                }
            }

            // isolated cells are still nodes
            if !graph.is_node_valid(cell) {
                graph.add_node(cell);
            }
        }

        graph.nodes.sort_keys();
        debug!("[Graph] built {} nodes from {}x{} grid", graph.len(), grid.width(), grid.height());
        graph
    }

    /// True if the cell is a node, i.e. it was open when the graph was built
    pub fn is_node_valid(&self, node: Cell) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Register a node without edges, keeping any edges it already has
    pub fn add_node(&mut self, node: Cell) {
        self.nodes.entry(node).or_default();
    }

    /// Add a directed edge; the reverse edge must be added separately
    pub fn add_edge(&mut self, parent: Cell, child: Cell, weight: u32) {
        self.nodes.entry(parent).or_default().push((child, weight));
    }

    /// Outgoing edges of a node, empty for unknown cells
    pub fn edges(&self, parent: Cell) -> &[(Cell, u32)] {
        self.nodes.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outgoing edges without their weights
    pub fn neighbors(&self, parent: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.edges(parent).iter().map(|&(child, _)| child)
    }

    /// Weight of the edge parent -> child, if any
    pub fn edge_weight(&self, parent: Cell, child: Cell) -> Option<u32> {
        self.edges(parent).iter().find(|(c, _)| *c == child).map(|&(_, w)| w)
    }

    /// Nodes in graph order
    pub fn nodes(&self) -> impl Iterator<Item = Cell> + '_ {
        self.nodes.keys().copied()
    }

    /// Position of a node in graph order
    pub fn node_index(&self, node: Cell) -> Option<usize> {
        self.nodes.get_index_of(&node)
    }

    /// Node at a position in graph order
    pub fn node_at(&self, index: usize) -> Option<Cell> {
        self.nodes.get_index(index).map(|(&cell, _)| cell)
    }

    /// Edges of the node at a position in graph order
    pub(crate) fn edges_at(&self, index: usize) -> &[(Cell, u32)] {
        self.nodes.get_index(index).map(|(_, edges)| edges.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set start and goal, both must be nodes
    pub fn set_endpoints(&mut self, start: Cell, goal: Cell) -> Result<(), PathPlannerError> {
        self.validate_endpoints(start, goal)?;
        self.root = Some(start);
        self.end = Some(goal);
        Ok(())
    }

    /// Fail fast on endpoints that are not nodes
    pub fn validate_endpoints(&self, start: Cell, goal: Cell) -> Result<(), PathPlannerError> {
        for endpoint in [start, goal] {
            if !self.is_node_valid(endpoint) {
                return Err(PathPlannerError::InvalidEndpoint(endpoint));
            }
        }
        Ok(())
    }
}

/// Build the planning graph of an occupancy grid
pub fn build_graph(grid: &OccupancyGrid) -> Graph {
    Graph::from_grid(grid)
}
