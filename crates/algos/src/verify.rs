//! Serial reference implementations used to validate kernel results.
//!
//! Every checker is an independent, textbook implementation of the same
//! problem and intentionally avoids the code paths of the parallel
//! kernels.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::time::Instant;

use log::info;

use crate::prelude::*;
use crate::sssp::INFINITE_DISTANCE;

/// Hop distance from `source` to every node via a serial BFS; unreached
/// nodes are `-1`.
pub fn bfs_depths<NI, G>(graph: &G, source: NI) -> Vec<i64>
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighbors<NI>,
{
    let mut depths = vec![-1_i64; graph.node_count().index()];
    depths[source.index()] = 0;

    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(u) = queue.pop_front() {
        let depth = depths[u.index()];
        for &v in graph.out_neighbors(u) {
            if depths[v.index()] == -1 {
                depths[v.index()] = depth + 1;
                queue.push_back(v);
            }
        }
    }

    depths
}

/// Checks a BFS parent tree against a serial traversal.
///
/// Every reached node must be reachable at the depth implied by its parent
/// chain, the parent edge must exist in the graph and unreached nodes must
/// agree with the serial result.
pub fn verify_bfs_tree<NI, G>(graph: &G, source: NI, parent: &[Option<NI>]) -> bool
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighbors<NI>,
{
    let start = Instant::now();
    let depths = bfs_depths(graph, source);

    let mut ok = true;
    for u in 0..graph.node_count().index() {
        match parent[u] {
            Some(p) if u == source.index() => {
                if p != source {
                    info!("source parent is {p:?}");
                    ok = false;
                }
            }
            Some(p) => {
                if depths[u] == -1 {
                    info!("node {u} claims parent but is unreachable");
                    ok = false;
                } else if depths[p.index()] + 1 != depths[u] {
                    info!("parent of {u} is not one level closer to the source");
                    ok = false;
                } else if !graph.out_neighbors(p).any(|&v| v.index() == u) {
                    info!("missing parent edge for node {u}");
                    ok = false;
                }
            }
            None => {
                if depths[u] != -1 {
                    info!("node {u} was not reached but is reachable");
                    ok = false;
                }
            }
        }
    }

    info!("Verified BFS tree in {:?}", start.elapsed());
    ok
}

/// Shortest distances from `source` via a serial Dijkstra.
pub fn dijkstra<NI, G>(graph: &G, source: NI) -> Vec<u32>
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighborsWithValues<NI, u32>,
{
    let start = Instant::now();

    let node_count = graph.node_count().index();

    let mut distances = vec![INFINITE_DISTANCE; node_count];
    distances[source.index()] = 0;

    let mut queue = BinaryHeap::new();
    queue.push(Reverse((0_u32, source.index())));

    while let Some(Reverse((cost, node))) = queue.pop() {
        if cost == distances[node] {
            for Target { target, value } in graph.out_neighbors_with_values(NI::new(node)) {
                let new_distance = cost + value;
                if new_distance < distances[target.index()] {
                    distances[target.index()] = new_distance;
                    queue.push(Reverse((new_distance, target.index())));
                }
            }
        }
    }

    info!("Computed Dijkstra in {:?}", start.elapsed());

    distances
}

/// Checks delta-stepping distances against the Dijkstra oracle.
pub fn verify_sssp<NI, G>(graph: &G, source: NI, distances: &[u32]) -> bool
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighborsWithValues<NI, u32>,
{
    let expected = dijkstra(graph, source);

    let mismatches = distances
        .iter()
        .zip(expected.iter())
        .enumerate()
        .filter(|(_, (actual, expected))| actual != expected)
        .inspect(|(node, (actual, expected))| {
            info!("mismatch for node {node}: actual = {actual}, expected = {expected}");
        })
        .count();

    mismatches == 0
}

/// Checks a component labeling against serial BFS reachability.
///
/// Two nodes must carry the same label exactly when they are connected by
/// an undirected path; for directed graphs edges are traversed in both
/// directions.
pub fn verify_components<NI, G>(graph: &G, components: &[NI]) -> bool
where
    NI: Idx + std::hash::Hash,
    G: Graph<NI> + DirectedNeighbors<NI>,
{
    use ahash::AHashMap;

    let start = Instant::now();
    let node_count = graph.node_count().index();

    let mut reference = vec![usize::MAX; node_count];
    let mut next_label = 0;

    for root in 0..node_count {
        if reference[root] != usize::MAX {
            continue;
        }
        reference[root] = next_label;
        let mut queue = VecDeque::new();
        queue.push_back(NI::new(root));
        while let Some(u) = queue.pop_front() {
            let out = graph.out_neighbors(u);
            let inc = graph.in_neighbors(u);
            for &v in out.chain(inc) {
                if reference[v.index()] == usize::MAX {
                    reference[v.index()] = next_label;
                    queue.push_back(v);
                }
            }
        }
        next_label += 1;
    }

    // the two labelings must be related by a bijection
    let mut forward = AHashMap::<usize, NI>::new();
    let mut backward = AHashMap::<NI, usize>::new();

    let mut ok = true;
    for u in 0..node_count {
        let expected = *forward.entry(reference[u]).or_insert(components[u]);
        if expected != components[u] {
            info!("node {u} is labeled inconsistently with its component");
            ok = false;
        }
        let expected = *backward.entry(components[u]).or_insert(reference[u]);
        if expected != reference[u] {
            info!("label of node {u} spans more than one component");
            ok = false;
        }
    }

    info!("Verified components in {:?}", start.elapsed());
    ok
}

/// Counts triangles by intersecting the full neighbor lists of every edge.
/// Each triangle is seen three times per orientation, hence the division
/// by six.
pub fn count_triangles_naive<NI: Idx>(graph: &UndirectedCsrGraph<NI>) -> u64 {
    let node_count = graph.node_count().index();
    let mut total = 0_u64;

    for u in 0..node_count {
        let u = NI::new(u);
        for &v in graph.neighbors(u) {
            let mut left = graph.neighbors(u).as_slice();
            let mut right = graph.neighbors(v).as_slice();
            while let (Some(&x), Some(&y)) = (left.first(), right.first()) {
                match x.cmp(&y) {
                    std::cmp::Ordering::Less => left = &left[1..],
                    std::cmp::Ordering::Greater => right = &right[1..],
                    std::cmp::Ordering::Equal => {
                        total += 1;
                        left = &left[1..];
                        right = &right[1..];
                    }
                }
            }
        }
    }

    total / 6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depths_on_a_path() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (1, 2), (2, 3)])
            .build();

        assert_eq!(bfs_depths(&graph, 0), vec![0, 1, 2, 3]);
        assert_eq!(bfs_depths(&graph, 2), vec![-1, -1, 0, 1]);
    }

    #[test]
    fn dijkstra_on_weighted_graph() {
        let graph: DirectedCsrGraph<u32, u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Sorted)
            .edges_with_values(vec![(0, 1, 4), (0, 2, 2), (2, 1, 1), (1, 3, 5)])
            .build();

        assert_eq!(dijkstra(&graph, 0), vec![0, 3, 2, 8]);
    }

    #[test]
    fn naive_triangle_count_on_clique() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)])
            .build();

        assert_eq!(count_triangles_naive(&graph), 4);
    }
}
