//! Cycle detection and reachability.
//!
//! Both functions build a [`DiGraphMap`] from the edge list they are given
//! and walk it with an explicit worklist, so deep chains never touch the
//! call stack. A visited set guarantees termination even when the input
//! already contains unrelated cycles.

use petgraph::graphmap::{DiGraphMap, NodeTrait};
use std::collections::{HashSet, VecDeque};

fn build<N, I>(edges: I) -> DiGraphMap<N, ()>
where
    N: NodeTrait,
    I: IntoIterator<Item = (N, N)>,
{
    let mut graph = DiGraphMap::new();
    for (source, target) in edges {
        graph.add_edge(source, target, ());
    }
    graph
}

/// Returns `true` if adding `from -> to` to `edges` would create a cycle.
///
/// That is the case exactly when `to` already reaches `from`. The walk is a
/// depth-first search seeded with `to`.
///
/// `from == to` is a self-reference and must be rejected by the caller
/// before asking; for completeness it reports `true`.
///
/// # Examples
///
/// ```
/// use trellis::graph::would_create_cycle;
///
/// let edges = [(1, 2), (2, 3)];
/// assert!(would_create_cycle(edges, 3, 1));
/// assert!(!would_create_cycle(edges, 1, 3));
/// ```
pub fn would_create_cycle<N, I>(edges: I, from: N, to: N) -> bool
where
    N: NodeTrait,
    I: IntoIterator<Item = (N, N)>,
{
    let graph = build(edges);
    let mut visited = HashSet::new();
    let mut stack = vec![to];

    while let Some(node) = stack.pop() {
        if node == from {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        if graph.contains_node(node) {
            stack.extend(graph.neighbors(node).filter(|next| !visited.contains(next)));
        }
    }

    false
}

/// Every node transitively reachable from `start`, with its depth.
///
/// Breadth-first, so each node is reported once at its shortest distance
/// (1 = direct successor). `start` itself is never reported, even when it
/// sits on a cycle. `max_depth` stops the walk after that many hops.
pub fn reachable<N, I>(edges: I, start: N, max_depth: Option<usize>) -> Vec<(N, usize)>
where
    N: NodeTrait,
    I: IntoIterator<Item = (N, N)>,
{
    let graph = build(edges);
    if !graph.contains_node(start) {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0usize)]);

    while let Some((node, depth)) = queue.pop_front() {
        if max_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        let mut next: Vec<N> = graph.neighbors(node).collect();
        next.sort_unstable();
        for target in next {
            if visited.insert(target) {
                result.push((target, depth + 1));
                queue.push_back((target, depth + 1));
            }
        }
    }

    result
}
