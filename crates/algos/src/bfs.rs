//! Direction-optimizing breadth-first search.
//!
//! The traversal alternates between two step kinds. The top-down step scans
//! the outgoing edges of the current frontier and claims unvisited children
//! with a compare-and-swap. The bottom-up step scans the incoming edges of
//! all unvisited nodes and looks for any parent in the current frontier
//! bitmap, which is cheaper once the frontier covers a large share of the
//! graph. The switch heuristic follows Beamer's scout count: it tracks how
//! many edges the frontier is about to scan and flips direction when that
//! exceeds a fixed fraction of the unexplored edges.

use log::info;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::prelude::*;

const TD_CHUNK_SIZE: usize = 64;
const BU_CHUNK_SIZE: usize = 1024;

#[derive(Copy, Clone, Debug)]
pub struct BfsConfig {
    /// Scout-count divisor for the top-down to bottom-up switch.
    pub alpha: i64,
    /// Node-count divisor for the bottom-up to top-down switch.
    pub beta: i64,
}

impl Default for BfsConfig {
    fn default() -> Self {
        Self {
            alpha: 15,
            beta: 18,
        }
    }
}

impl BfsConfig {
    pub fn new(alpha: i64, beta: i64) -> Self {
        Self { alpha, beta }
    }
}

/// Computes a BFS parent tree from `source`.
///
/// `parent[source] == Some(source)`; unreached nodes stay `None`. The
/// parent of every other reached node is a neighbor one level closer to the
/// source.
///
/// Unvisited nodes are encoded as the negated out-degree while the
/// traversal runs, which lets the top-down step account the scout count
/// from the value it replaces.
pub fn bfs<NI, G>(graph: &G, source: NI, config: BfsConfig) -> Vec<Option<NI>>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + EdgeSlots<NI> + Sync,
{
    let start = Instant::now();

    let node_count = graph.node_count().index();

    let parent = init_parent(graph);
    parent[source.index()].store(source.index() as i64, Ordering::SeqCst);

    let mut queue = SlidingQueue::with_capacity(node_count);
    queue.push(source);
    queue.slide_window();

    let mut front = Bitmap::new(node_count);
    let mut next = Bitmap::new(node_count);

    let mut edges_to_check = graph.out_slot_count().index() as i64;
    let mut scout_count = graph.out_degree(source).index() as i64;

    while !queue.is_empty() {
        if scout_count > edges_to_check / config.alpha {
            queue_to_bitmap(&queue, &front);
            let mut awake_count = queue.len() as i64;
            queue.slide_window();
            loop {
                let old_awake_count = awake_count;
                awake_count = bu_step(graph, &parent, &front, &mut next);
                front.swap(&mut next);
                if awake_count < old_awake_count && awake_count <= node_count as i64 / config.beta
                {
                    break;
                }
            }
            bitmap_to_queue(node_count, &front, &mut queue);
            scout_count = 1;
        } else {
            edges_to_check -= scout_count;
            scout_count = td_step(graph, &parent, &queue);
            queue.slide_window();
        }
    }

    info!("Computed BFS in {:?}", start.elapsed());

    parent
        .into_iter()
        .map(|p| {
            let p = p.into_inner();
            (p >= 0).then(|| NI::new(p as usize))
        })
        .collect()
}

// Unvisited nodes hold their negated out-degree (-1 for isolated nodes).
fn init_parent<NI, G>(graph: &G) -> Vec<Atomic<i64>>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + Sync,
{
    let node_count = graph.node_count().index();
    let mut parent = Vec::with_capacity(node_count);
    (0..node_count)
        .into_par_iter()
        .map(|u| {
            let degree = graph.out_degree(NI::new(u)).index() as i64;
            Atomic::new(if degree != 0 { -degree } else { -1 })
        })
        .collect_into_vec(&mut parent);
    parent
}

// Claims unvisited children of the frontier and returns the summed
// out-degrees of the newly claimed nodes.
fn td_step<NI, G>(graph: &G, parent: &[Atomic<i64>], queue: &SlidingQueue<NI>) -> i64
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighbors<NI> + Sync,
{
    let window = queue.window();
    let next_chunk = AtomicUsize::new(0);
    let scout_count = AtomicI64::new(0);

    rayon::scope(|s| {
        for _ in 0..rayon::current_num_threads() {
            s.spawn(|_| {
                let mut lqueue = QueueBuffer::new(queue);
                let mut local_scout = 0_i64;

                loop {
                    let chunk_start = next_chunk.fetch_add(TD_CHUNK_SIZE, Ordering::AcqRel);
                    if chunk_start >= window.len() {
                        break;
                    }
                    let chunk_end = usize::min(chunk_start + TD_CHUNK_SIZE, window.len());

                    for &u in &window[chunk_start..chunk_end] {
                        for &v in graph.out_neighbors(u) {
                            let curr_val = parent[v.index()].load(Ordering::Acquire);
                            if curr_val < 0
                                && parent[v.index()]
                                    .compare_exchange(
                                        curr_val,
                                        u.index() as i64,
                                        Ordering::AcqRel,
                                        Ordering::Relaxed,
                                    )
                                    .is_ok()
                            {
                                lqueue.push(v);
                                local_scout += -curr_val;
                            }
                        }
                    }
                }

                lqueue.flush();
                scout_count.fetch_add(local_scout, Ordering::AcqRel);
            });
        }
    });

    scout_count.load(Ordering::Acquire)
}

// Scans the incoming edges of all unvisited nodes for a frontier parent and
// returns the number of awakened nodes.
fn bu_step<NI, G>(graph: &G, parent: &[Atomic<i64>], front: &Bitmap, next: &mut Bitmap) -> i64
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighbors<NI> + Sync,
{
    next.reset();
    let next = &*next;

    (0..parent.len())
        .into_par_iter()
        .chunks(BU_CHUNK_SIZE)
        .map(|chunk| {
            let mut awake_count = 0_i64;
            for u in chunk {
                if parent[u].load(Ordering::Acquire) < 0 {
                    for &v in graph.in_neighbors(NI::new(u)) {
                        if front.get(v.index()) {
                            parent[u].store(v.index() as i64, Ordering::Release);
                            awake_count += 1;
                            next.set_atomic(u);
                            break;
                        }
                    }
                }
            }
            awake_count
        })
        .sum()
}

fn queue_to_bitmap<NI: Idx>(queue: &SlidingQueue<NI>, bitmap: &Bitmap) {
    queue
        .window()
        .par_iter()
        .for_each(|&u| bitmap.set_atomic(u.index()));
}

fn bitmap_to_queue<NI: Idx>(node_count: usize, bitmap: &Bitmap, queue: &mut SlidingQueue<NI>) {
    {
        let queue = &*queue;
        (0..node_count)
            .into_par_iter()
            .chunks(BU_CHUNK_SIZE)
            .for_each(|chunk| {
                let mut lqueue = QueueBuffer::new(queue);
                for u in chunk {
                    if bitmap.get(u) {
                        lqueue.push(NI::new(u));
                    }
                }
                lqueue.flush();
            });
    }
    queue.slide_window();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clique_has_source_as_parent() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)])
            .build();

        let actual = bfs(&graph, 0, BfsConfig::default());

        assert_eq!(actual, vec![Some(0), Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn directed_path() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (1, 2), (2, 3), (3, 4)])
            .build();

        let actual = bfs(&graph, 0, BfsConfig::default());

        assert_eq!(actual, vec![Some(0), Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn unreachable_nodes_stay_unvisited() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3), (5, 5)])
            .build();

        let actual = bfs(&graph, 0, BfsConfig::default());

        assert_eq!(actual[4], None);
        assert_eq!(actual[5], None);
    }

    #[test]
    fn isolated_source_reaches_nothing() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (1, 2)])
            .build();

        let actual = bfs(&graph, 2, BfsConfig::default());

        assert_eq!(actual, vec![None, None, Some(2)]);
    }

    #[test]
    fn bottom_up_agrees_with_top_down() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edge_list(uniform_edge_list(8, 8))
            .build();

        // alpha = i64::MAX keeps the scout threshold at zero, forcing the
        // bottom-up path from the first level on.
        let bottom_up = bfs(&graph, 0, BfsConfig::new(i64::MAX, 18));
        let top_down = bfs(&graph, 0, BfsConfig::default());

        let depths = crate::verify::bfs_depths(&graph, 0);
        for (u, parent) in bottom_up.iter().enumerate() {
            match (parent, top_down[u]) {
                (Some(_), Some(_)) | (None, None) => {}
                _ => panic!("reachability disagrees for node {u}"),
            }
            if let Some(p) = parent {
                if u != 0 {
                    assert_eq!(depths[u], depths[p.index()] + 1);
                }
            }
        }
    }
}
