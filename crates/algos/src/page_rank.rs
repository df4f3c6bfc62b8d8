//! Pull-direction PageRank.
//!
//! Every iteration pulls the contributions of all incoming neighbors, so no
//! atomic updates on the score vector are required. Nodes without outgoing
//! edges contribute nothing; their rank mass is not redistributed.

use crate::prelude::*;

use atomic_float::AtomicF64;
use log::info;
use rayon::prelude::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

const CHUNK_SIZE: usize = 16384;

#[derive(Copy, Clone, Debug)]
pub struct PageRankConfig {
    /// The maximum number of iterations.
    pub max_iterations: usize,
    /// If the sum of score deltas of one iteration is below this value, the
    /// computation stops early.
    pub tolerance: f64,
    /// Probability that an imagined random surfer keeps following links.
    pub damping_factor: f32,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1E-4,
            damping_factor: 0.85,
        }
    }
}

impl PageRankConfig {
    pub fn new(max_iterations: usize, tolerance: f64, damping_factor: f32) -> Self {
        Self {
            max_iterations,
            tolerance,
            damping_factor,
        }
    }
}

/// Computes the PageRank score of every node.
///
/// Returns the scores together with the number of executed iterations and
/// the error of the last iteration.
pub fn page_rank<NI, G>(graph: &G, config: PageRankConfig) -> (Vec<f32>, usize, f64)
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let PageRankConfig {
        max_iterations,
        tolerance,
        damping_factor,
    } = config;

    let node_count = graph.node_count().index();
    let init_score = 1_f32 / node_count as f32;
    let base_score = (1.0_f32 - damping_factor) / node_count as f32;

    let mut out_contrib = Vec::with_capacity(node_count);

    (0..node_count)
        .into_par_iter()
        .map(NI::new)
        .map(|node| {
            let out_degree = graph.out_degree(node).index();
            if out_degree == 0 {
                0.0
            } else {
                init_score / out_degree as f32
            }
        })
        .collect_into_vec(&mut out_contrib);

    let mut scores = vec![init_score; node_count];

    let scores_ptr = SharedMut::new(scores.as_mut_ptr());
    let out_contrib_ptr = SharedMut::new(out_contrib.as_mut_ptr());

    let mut iteration = 0;

    loop {
        let start = Instant::now();
        let error = page_rank_iteration(
            graph,
            base_score,
            damping_factor,
            &out_contrib_ptr,
            &scores_ptr,
        );

        info!(
            "Finished iteration {} with an error of {:.6} in {:?}",
            iteration,
            error,
            start.elapsed()
        );

        iteration += 1;

        if error < tolerance || iteration == max_iterations {
            return (scores, iteration, error);
        }
    }
}

fn page_rank_iteration<NI, G>(
    graph: &G,
    base_score: f32,
    damping_factor: f32,
    out_contrib: &SharedMut<f32>,
    scores: &SharedMut<f32>,
) -> f64
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let node_count = graph.node_count().index();
    let next_chunk = AtomicUsize::new(0);
    let total_error = AtomicF64::new(0_f64);

    rayon::scope(|s| {
        for _ in 0..rayon::current_num_threads() {
            s.spawn(|_| {
                let mut error = 0_f64;

                loop {
                    let chunk_start = next_chunk.fetch_add(CHUNK_SIZE, Ordering::AcqRel);
                    if chunk_start >= node_count {
                        break;
                    }

                    let chunk_end = usize::min(chunk_start + CHUNK_SIZE, node_count);

                    for u in chunk_start..chunk_end {
                        let node = NI::new(u);
                        let incoming_total = graph
                            .in_neighbors(node)
                            .map(|v| unsafe { out_contrib.add(v.index()).read() })
                            .sum::<f32>();

                        let old_score = unsafe { scores.add(u).read() };
                        let new_score = base_score + damping_factor * incoming_total;

                        unsafe { scores.add(u).write(new_score) };
                        error += f64::abs((new_score - old_score) as f64);

                        let out_degree = graph.out_degree(node).index();
                        let contribution = if out_degree == 0 {
                            0.0
                        } else {
                            new_score / out_degree as f32
                        };
                        unsafe { out_contrib.add(u).write(contribution) }
                    }
                }
                total_error.fetch_add(error, Ordering::SeqCst);
            });
        }
    });

    total_error.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_sum_to_one_without_dangling_nodes() {
        // a ring with a few chords, so every node has outgoing edges and no
        // rank mass is lost
        let mut edges = (0..64_u32).map(|u| (u, (u + 1) % 64)).collect::<Vec<_>>();
        edges.extend_from_slice(&[(0, 32), (5, 20), (17, 42), (50, 3)]);

        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(edges)
            .build();

        let (scores, _, _) = page_rank(&graph, PageRankConfig::default());

        let total: f32 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-3, "total rank mass was {total}");
    }

    #[test]
    fn directed_path_ranks_ascend() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (1, 2), (2, 3), (3, 4)])
            .build();

        let (scores, _, _) = page_rank(&graph, PageRankConfig::new(20, 0.0, 0.85));

        assert!(
            scores.windows(2).all(|w| w[0] < w[1]),
            "scores were {scores:?}"
        );
    }

    #[test]
    fn error_decreases_monotonically() {
        let mut edges = (0..64_u32).map(|u| (u, (u + 1) % 64)).collect::<Vec<_>>();
        edges.extend_from_slice(&[(0, 32), (5, 20), (17, 42), (50, 3)]);

        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(edges)
            .build();

        let mut last_error = f64::MAX;
        for iterations in 1..6 {
            let (_, _, error) = page_rank(&graph, PageRankConfig::new(iterations, 0.0, 0.85));
            assert!(error <= last_error + 1e-9);
            last_error = error;
        }
    }

    #[test]
    fn converges_below_tolerance() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (1, 2), (2, 0)])
            .build();

        let (_, iterations, error) = page_rank(&graph, PageRankConfig::new(100, 1e-6, 0.85));

        assert!(iterations < 100);
        assert!(error < 1e-6);
    }
}
