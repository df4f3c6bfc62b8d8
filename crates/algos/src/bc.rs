//! Approximate betweenness centrality (Brandes).
//!
//! Scores are accumulated over a sample of source nodes. Each source
//! contributes two phases: a parallel breadth-first search that counts
//! shortest paths and marks tree-successor edges in a bitmap, and a
//! back-propagation sweep that walks the discovered depth levels from the
//! deepest to the source and pulls dependency deltas along the marked
//! edges.
//!
//! The successor bitmap is indexed by the absolute slot of each neighbor
//! within the flat outgoing target array, so no per-edge state has to be
//! allocated besides one bit.

use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use crate::prelude::*;

const CHUNK_SIZE: usize = 64;

#[derive(Copy, Clone, Debug)]
pub struct BetweennessConfig {
    /// Number of sampled sources.
    pub num_sources: usize,
    /// Fixed source node; sources are sampled randomly if unset.
    pub source: Option<usize>,
}

impl Default for BetweennessConfig {
    fn default() -> Self {
        Self {
            num_sources: 1,
            source: None,
        }
    }
}

impl BetweennessConfig {
    pub fn new(num_sources: usize, source: Option<usize>) -> Self {
        Self {
            num_sources,
            source,
        }
    }
}

/// Computes partial betweenness scores over the configured sources.
///
/// The returned scores are the raw dependency sums; normalization by the
/// maximum score is left to the caller.
pub fn betweenness<NI, G>(graph: &G, config: BetweennessConfig) -> Vec<f32>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + EdgeSlots<NI> + Sync,
{
    let start = Instant::now();

    let node_count = graph.node_count().index();
    let slot_count = graph.out_slot_count().index();

    let mut scores = vec![0_f32; node_count];
    if node_count == 0 || slot_count == 0 {
        return scores;
    }

    let mut succ = Bitmap::new(slot_count);
    let mut depths: Vec<Atomic<i64>> = Vec::with_capacity(node_count);
    depths.resize_with(node_count, || Atomic::new(-1));
    let mut path_counts: Vec<AtomicU64> = Vec::with_capacity(node_count);
    path_counts.resize_with(node_count, || AtomicU64::new(0));
    let mut deltas = ParVec::<f32>::uninit(node_count).expect("delta allocation failed");
    let mut queue = SlidingQueue::<NI>::with_capacity(node_count);

    let mut rng = SmallRng::seed_from_u64(RAND_SEED);

    for iteration in 0..config.num_sources {
        let source = match config.source {
            Some(source) => source,
            None => pick_source(graph, &mut rng),
        };
        info!("Source {source} for iteration {iteration}");

        depths.par_iter().for_each(|d| d.store(-1, Ordering::Relaxed));
        path_counts
            .par_iter()
            .for_each(|c| c.store(0, Ordering::Relaxed));
        deltas.fill(0.0);
        succ.reset();
        queue.reset();

        depths[source].store(0, Ordering::Relaxed);
        path_counts[source].store(1, Ordering::Relaxed);
        queue.push(NI::new(source));
        queue.slide_window();

        let depth_index = path_counting_bfs(graph, &depths, &path_counts, &succ, &mut queue);

        back_propagate(graph, &succ, &path_counts, &queue, &depth_index, &mut deltas, &mut scores);
    }

    info!("Computed betweenness centrality in {:?}", start.elapsed());

    scores
}

/// Divides all scores by the largest one.
pub fn normalize_by_max(scores: &mut [f32]) {
    let biggest = scores.iter().cloned().fold(0.0_f32, f32::max);
    if biggest > 0.0 {
        scores.par_iter_mut().for_each(|score| *score /= biggest);
    }
}

fn pick_source<NI, G>(graph: &G, rng: &mut SmallRng) -> usize
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI>,
{
    let node_count = graph.node_count().index();
    loop {
        let candidate = rng.gen_range(0..node_count);
        if graph.out_degree(NI::new(candidate)).index() > 0 {
            return candidate;
        }
    }
}

// Level-synchronous BFS that counts shortest paths into `path_counts`,
// marks tree-successor edges in `succ` and records the storage position of
// every depth level. Entry `d` of the result is the queue position where
// the nodes of depth `d` start; the final entry marks the end.
fn path_counting_bfs<NI, G>(
    graph: &G,
    depths: &[Atomic<i64>],
    path_counts: &[AtomicU64],
    succ: &Bitmap,
    queue: &mut SlidingQueue<NI>,
) -> Vec<usize>
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighbors<NI> + EdgeSlots<NI> + Sync,
{
    let mut depth_index = vec![queue.window_start()];
    let mut depth = 0_i64;

    while !queue.is_empty() {
        depth += 1;
        forward_step(graph, depths, path_counts, succ, queue, depth);
        queue.slide_window();
        depth_index.push(queue.window_start());
    }

    depth_index
}

fn forward_step<NI, G>(
    graph: &G,
    depths: &[Atomic<i64>],
    path_counts: &[AtomicU64],
    succ: &Bitmap,
    queue: &SlidingQueue<NI>,
    depth: i64,
) where
    NI: Idx,
    G: Graph<NI> + DirectedNeighbors<NI> + EdgeSlots<NI> + Sync,
{
    let window = queue.window();
    let next_chunk = AtomicUsize::new(0);

    rayon::scope(|s| {
        for _ in 0..rayon::current_num_threads() {
            s.spawn(|_| {
                let mut lqueue = QueueBuffer::new(queue);

                loop {
                    let chunk_start = next_chunk.fetch_add(CHUNK_SIZE, Ordering::AcqRel);
                    if chunk_start >= window.len() {
                        break;
                    }
                    let chunk_end = usize::min(chunk_start + CHUNK_SIZE, window.len());

                    for &u in &window[chunk_start..chunk_end] {
                        let first_slot = graph.out_slot_offset(u).index();
                        for (slot, &v) in graph.out_neighbors(u).enumerate() {
                            if depths[v.index()].load(Ordering::Acquire) == -1
                                && depths[v.index()]
                                    .compare_exchange(
                                        -1,
                                        depth,
                                        Ordering::AcqRel,
                                        Ordering::Relaxed,
                                    )
                                    .is_ok()
                            {
                                lqueue.push(v);
                            }
                            if depths[v.index()].load(Ordering::Acquire) == depth {
                                succ.set_atomic(first_slot + slot);
                                path_counts[v.index()].fetch_add(
                                    path_counts[u.index()].load(Ordering::Relaxed),
                                    Ordering::AcqRel,
                                );
                            }
                        }
                    }
                }

                lqueue.flush();
            });
        }
    });
}

// Walks the depth levels from the second-deepest to the source and
// accumulates `(pc[u] / pc[v]) * (1 + delta[v])` over the marked successor
// edges of every node of the level.
fn back_propagate<NI, G>(
    graph: &G,
    succ: &Bitmap,
    path_counts: &[AtomicU64],
    queue: &SlidingQueue<NI>,
    depth_index: &[usize],
    deltas: &mut ParVec<f32>,
    scores: &mut [f32],
) where
    NI: Idx,
    G: Graph<NI> + DirectedNeighbors<NI> + EdgeSlots<NI> + Sync,
{
    let level_count = depth_index.len() - 1;
    let deltas_ptr = deltas.shared_ptr();
    let scores_ptr = SharedMut::new(scores.as_mut_ptr());

    for d in (0..level_count.saturating_sub(1)).rev() {
        let level = queue.segment(depth_index[d], depth_index[d + 1]);

        level.par_iter().with_min_len(CHUNK_SIZE).for_each(|&u| {
            let first_slot = graph.out_slot_offset(u).index();
            let own_count = path_counts[u.index()].load(Ordering::Relaxed) as f32;

            let mut delta_u = 0.0_f32;
            for (slot, &v) in graph.out_neighbors(u).enumerate() {
                if succ.get(first_slot + slot) {
                    let succ_count = path_counts[v.index()].load(Ordering::Relaxed) as f32;
                    // SAFETY: v lies on a deeper level whose delta was
                    //         finalized by a previous sweep.
                    let delta_v = unsafe { deltas_ptr.add(v.index()).read() };
                    delta_u += (own_count / succ_count) * (1.0 + delta_v);
                }
            }

            // SAFETY: each node belongs to exactly one level and is
            //         processed by exactly one task.
            unsafe {
                deltas_ptr.add(u.index()).write(delta_u);
                let score = scores_ptr.add(u.index()).read();
                scores_ptr.add(u.index()).write(score + delta_u);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_center_dominates() {
        let edges = (1..=10_u32).map(|leaf| (0, leaf)).collect::<Vec<_>>();
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(edges)
            .build();

        // one pass per source, covering every node
        let mut totals = vec![0.0_f32; 11];
        for source in 0..11 {
            let scores = betweenness(&graph, BetweennessConfig::new(1, Some(source)));
            for (total, score) in totals.iter_mut().zip(scores) {
                *total += score;
            }
        }

        assert!(totals[0] > 0.0);
        for leaf in 1..=10 {
            assert!(totals[0] > totals[leaf]);
        }
    }

    #[test]
    fn path_scores_are_symmetric() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (1, 2), (2, 3), (3, 4)])
            .build();

        // exact betweenness: one iteration per source
        let mut totals = vec![0.0_f32; 5];
        for source in 0..5 {
            let scores = betweenness(&graph, BetweennessConfig::new(1, Some(source)));
            for (total, score) in totals.iter_mut().zip(scores) {
                *total += score;
            }
        }

        assert_eq!(totals[0], totals[4]);
        assert_eq!(totals[1], totals[3]);
        assert!(totals[1] > totals[0]);
        assert!(totals[2] > totals[1]);
    }

    #[test]
    fn dependencies_from_a_single_clique_source() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)])
            .build();

        let scores = betweenness(&graph, BetweennessConfig::new(1, Some(0)));

        // every other node is a direct neighbor of the source, so only the
        // source itself accumulates a dependency
        assert_eq!(scores[0], 3.0);
        assert_eq!(&scores[1..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn normalization_scales_to_unit_maximum() {
        let mut scores = vec![0.0, 2.0, 8.0, 4.0];
        normalize_by_max(&mut scores);

        assert_eq!(scores, vec![0.0, 0.25, 1.0, 0.5]);
    }
}
