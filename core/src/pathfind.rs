//! Breadth-first path finding over the city map.
//!
//! Every edge has unit cost, so BFS yields a minimum-hop-count path.
//! Tie-breaking among equal-length paths follows the connection-table
//! order via CityMap::neighbors — stable, but not a contract.

use crate::map::CityMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// Shortest path from `start` to `end` by hop count, or None when either
/// endpoint is unknown or the endpoints lie in disconnected components.
/// `start == end` yields the trivial one-node path; callers that consider
/// that invalid must reject it before querying.
pub fn find_path(map: &CityMap, start: &str, end: &str) -> Option<Vec<String>> {
    if !map.contains(start) || !map.contains(end) {
        return None;
    }
    if start == end {
        return Some(vec![start.to_string()]);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        for neighbor in map.neighbors(node) {
            if !visited.insert(neighbor) {
                continue;
            }
            parent.insert(neighbor, node);
            if neighbor == end {
                return Some(backtrack(&parent, start, end));
            }
            queue.push_back(neighbor);
        }
    }
    None
}

fn backtrack(parent: &HashMap<&str, &str>, start: &str, end: &str) -> Vec<String> {
    let mut path = vec![end.to_string()];
    let mut node = end;
    while node != start {
        node = parent[node];
        path.push(node.to_string());
    }
    path.reverse();
    path
}
