/// Construct the path from the start node to the goal node by walking parent links backwards
/// Returns the ordered path as a vector of nodes from start to goal
/// parent_of: returns the parent of a node, None if no parent was recorded
/// max_steps: upper bound on the path length, protects against parent cycles
///
/// An empty vector means the walk never reached `start`.
pub(crate) fn shortest_path<N, P>(start: N, goal: N, parent_of: P, max_steps: usize) -> Vec<N>
where
    N: Copy + PartialEq,
    P: Fn(N) -> Option<N>,
{
    if start == goal {
        return vec![start];
    }

    let mut path = vec![goal];
    let mut current = goal;

    // Trace back from goal to start
    for _ in 0..max_steps {
        match parent_of(current) {
            Some(parent) => {
                path.push(parent);
                if parent == start {
                    // The path is in reverse order, so reverse it
                    path.reverse();
                    return path;
                }
                current = parent;
            }
            None => return Vec::new(),
        }
    }

    // more steps than nodes: the parent links loop
    Vec::new()
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_path_reconstruction() {
        // A -> C -> D
        let parents = HashMap::from([("C", "A"), ("D", "C"), ("B", "A")]);
        let path = shortest_path("A", "D", |n| parents.get(n).copied(), 10);
        assert_eq!(path, vec!["A", "C", "D"]);

        let path_to_b = shortest_path("A", "B", |n| parents.get(n).copied(), 10);
        assert_eq!(path_to_b, vec!["A", "B"]);
    }

    #[test]
    fn test_missing_parent_is_empty_path() {
        let parents = HashMap::from([("D", "C")]);
        assert!(shortest_path("A", "D", |n| parents.get(n).copied(), 10).is_empty());
    }

    #[test]
    fn test_start_is_goal() {
        let parents: HashMap<&str, &str> = HashMap::new();
        assert_eq!(shortest_path("A", "A", |n| parents.get(n).copied(), 10), vec!["A"]);
    }

    #[test]
    fn test_parent_cycle_is_empty_path() {
        let parents = HashMap::from([("D", "C"), ("C", "D")]);
        assert!(shortest_path("A", "D", |n| parents.get(n).copied(), 10).is_empty());
    }

    #[test]
    fn test_origin_is_a_valid_parent() {
        // (0, 0) is an ordinary node, not an end-of-path marker
        let parents = HashMap::from([((1, 1), (0, 0)), ((0, 0), (0, 1))]);
        let path = shortest_path((0, 1), (1, 1), |n| parents.get(&n).copied(), 10);
        assert_eq!(path, vec![(0, 1), (0, 0), (1, 1)]);
    }
}
