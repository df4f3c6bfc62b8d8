//! Ordered triangle counting on undirected graphs.
//!
//! Every triangle `u > v > w` is found exactly once by intersecting the
//! neighbor list prefixes below the current node id. For skewed degree
//! distributions, relabeling the graph in descending degree order first
//! shortens the scanned prefixes considerably; [`worth_relabeling`]
//! estimates from a degree sample whether that pass pays off.

use crate::prelude::*;

use log::info;
use num_format::{Locale, ToFormattedString};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

const CHUNK_SIZE: usize = 64;

const RELABEL_SAMPLES: usize = 1000;
const RELABEL_MIN_AVG_DEGREE: usize = 10;

pub fn relabel_graph<NI: Idx>(graph: &mut UndirectedCsrGraph<NI>) {
    let start = Instant::now();
    graph.make_degree_ordered();
    info!("Relabeled graph in {:?}", start.elapsed());
}

/// Estimates whether counting profits from degree-ordered relabeling.
///
/// Samples 1000 degrees; a sample mean of more than twice the sample
/// median indicates a skewed degree distribution. Low-degree graphs are
/// never relabeled.
pub fn worth_relabeling<NI: Idx>(graph: &UndirectedCsrGraph<NI>) -> bool {
    let node_count = graph.node_count().index();
    let edge_count = graph.edge_count().index();
    if node_count == 0 || 2 * edge_count / node_count < RELABEL_MIN_AVG_DEGREE {
        return false;
    }

    let mut rng = SmallRng::seed_from_u64(RAND_SEED);
    let sample_count = usize::min(RELABEL_SAMPLES, node_count);
    let mut samples = (0..sample_count)
        .map(|_| graph.degree(NI::new(rng.gen_range(0..node_count))).index())
        .collect::<Vec<_>>();
    samples.sort_unstable();

    let mean = samples.iter().sum::<usize>() as f64 / sample_count as f64;
    let median = samples[sample_count / 2] as f64;

    mean > 2.0 * median
}

/// Counts all triangles of the graph. The neighbor lists must be sorted,
/// deduplicated and free of self-loops.
pub fn global_triangle_count<NI: Idx>(graph: &UndirectedCsrGraph<NI>) -> u64 {
    let start = Instant::now();

    let next_chunk = AtomicUsize::new(0);
    let node_count = graph.node_count().index();
    let total_triangles = AtomicU64::new(0);

    rayon::scope(|s| {
        for _ in 0..rayon::current_num_threads() {
            s.spawn(|_| {
                let mut triangles = 0;

                loop {
                    let chunk_start = next_chunk.fetch_add(CHUNK_SIZE, Ordering::AcqRel);
                    if chunk_start >= node_count {
                        break;
                    }

                    let chunk_end = usize::min(chunk_start + CHUNK_SIZE, node_count);

                    for u in chunk_start..chunk_end {
                        let u = NI::new(u);
                        for &v in graph.neighbors(u) {
                            if v > u {
                                break;
                            }

                            let mut it = graph.neighbors(u).as_slice();

                            for &w in graph.neighbors(v) {
                                if w > v {
                                    break;
                                }
                                while let Some(&x) = it.first() {
                                    if x >= w {
                                        if x == w {
                                            triangles += 1;
                                        }
                                        break;
                                    }
                                    it = &it[1..];
                                }
                            }
                        }
                    }
                }
                total_triangles.fetch_add(triangles, Ordering::AcqRel);
            });
        }
    });

    let triangle_count = total_triangles.load(Ordering::SeqCst);

    info!(
        "Computed {} triangles in {:?}",
        triangle_count.to_formatted_string(&Locale::en),
        start.elapsed()
    );

    triangle_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undirected(edges: Vec<(u32, u32)>) -> UndirectedCsrGraph<u32> {
        GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(edges)
            .build()
    }

    #[test]
    fn clique_of_four() {
        let graph = undirected(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);

        assert_eq!(global_triangle_count(&graph), 4);
    }

    #[test]
    fn two_triangles_sharing_an_edge() {
        let graph = undirected(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)]);

        assert_eq!(global_triangle_count(&graph), 2);
    }

    #[test]
    fn star_has_no_triangles() {
        let graph = undirected((1..=10).map(|leaf| (0, leaf)).collect());

        assert_eq!(global_triangle_count(&graph), 0);
    }

    #[test]
    fn bipartite_graph_has_no_triangles() {
        let mut edges = Vec::new();
        for left in 0..4_u32 {
            for right in 4..8_u32 {
                edges.push((left, right));
            }
        }
        let graph = undirected(edges);

        assert_eq!(global_triangle_count(&graph), 0);
    }

    #[test]
    fn relabeling_preserves_the_count() {
        let mut graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edge_list(rmat_edge_list(7, 8))
            .build();

        let before = global_triangle_count(&graph);
        relabel_graph(&mut graph);
        let after = global_triangle_count(&graph);

        assert_eq!(before, after);
    }

    #[test]
    fn count_matches_naive_intersection() {
        let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edge_list(uniform_edge_list(7, 6))
            .build();

        let expected = crate::verify::count_triangles_naive(&graph);

        assert_eq!(global_triangle_count(&graph), expected);
    }
}
