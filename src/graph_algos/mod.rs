pub mod bfs;
pub mod a_star;
mod shortest_path;

pub(crate) use shortest_path::shortest_path;
