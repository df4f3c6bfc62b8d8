//! Connected components via subgraph-sampled union find.
//!
//! The implementation follows the Afforest variant of Shiloach-Vishkin
//! connectivity: it first links a sampled subgraph (the first few neighbors
//! of every node), identifies the dominant intermediate component from a
//! small sample of labels and then skips all nodes of that component while
//! linking the remaining edges. On power-law graphs the dominant component
//! covers most of the graph, which removes the bulk of the link work.
//!
//! Directed graphs are treated as weakly connected, i.e., the final phase
//! links incoming edges as well.

use ahash::AHashMap;
use log::info;
use std::time::Instant;

use crate::afforest::Afforest;
use crate::prelude::*;
use rayon::prelude::*;

#[derive(Copy, Clone, Debug)]
pub struct AfforestConfig {
    /// Number of nodes to be processed in batch by a single thread.
    pub chunk_size: usize,

    /// Number of neighbors of each node to sample during subgraph linking.
    pub neighbor_rounds: usize,

    /// Number of component labels to sample when searching the dominant
    /// component.
    pub sampling_size: usize,
}

impl Default for AfforestConfig {
    fn default() -> Self {
        Self {
            chunk_size: AfforestConfig::DEFAULT_CHUNK_SIZE,
            neighbor_rounds: AfforestConfig::DEFAULT_NEIGHBOR_ROUNDS,
            sampling_size: AfforestConfig::DEFAULT_SAMPLING_SIZE,
        }
    }
}

impl AfforestConfig {
    pub const DEFAULT_CHUNK_SIZE: usize = 16384;
    pub const DEFAULT_NEIGHBOR_ROUNDS: usize = 2;
    pub const DEFAULT_SAMPLING_SIZE: usize = 1024;

    pub fn new(chunk_size: usize, neighbor_rounds: usize, sampling_size: usize) -> Self {
        Self {
            chunk_size,
            neighbor_rounds,
            sampling_size,
        }
    }
}

/// The component labeling produced by [`afforest`].
pub struct Components<NI>(Vec<NI>);

impl<NI: Idx> Components<NI> {
    pub fn component(&self, node: NI) -> NI {
        self.0[node.index()]
    }

    /// Number of distinct components.
    pub fn count(&self) -> usize {
        let mut labels = self.0.clone();
        labels.par_sort_unstable();
        labels.dedup();
        labels.len()
    }

    pub fn to_vec(self) -> Vec<NI> {
        self.0
    }
}

/// Computes the (weakly) connected components of the graph.
pub fn afforest<NI, G>(graph: &G, config: AfforestConfig) -> Components<NI>
where
    NI: Idx + std::hash::Hash,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let start = Instant::now();
    let comp = Afforest::new(graph.node_count().index());
    info!("Afforest creation took {:?}", start.elapsed());

    let start = Instant::now();
    sample_subgraph(graph, &comp, config);
    info!("Link subgraph took {:?}", start.elapsed());

    let start = Instant::now();
    let largest_component = find_largest_component(&comp, config);
    info!("Get component took {:?}", start.elapsed());

    let start = Instant::now();
    link_remaining(graph, &comp, largest_component, config);
    info!("Link remaining took {:?}", start.elapsed());

    let start = Instant::now();
    comp.compress();
    info!("Final compress took {:?}", start.elapsed());

    Components(comp.into_components())
}

// Links the r-th neighbor of every node for each sampling round, compressing
// the forest after every round.
fn sample_subgraph<NI, G>(graph: &G, comp: &Afforest<NI>, config: AfforestConfig)
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let neighbor_rounds = config.neighbor_rounds;
    for round in 0..neighbor_rounds {
        let start = Instant::now();
        (0..graph.node_count().index())
            .into_par_iter()
            .chunks(config.chunk_size)
            .for_each(|chunk| {
                for u in chunk {
                    let u = NI::new(u);
                    if round < graph.out_degree(u).index() {
                        for v in graph.out_neighbors(u).skip(round).take(1) {
                            comp.link(u, *v);
                        }
                    }
                }
            });
        info!(
            "Neighbor round {} of {neighbor_rounds} took {:?}",
            round + 1,
            start.elapsed()
        );

        let start = Instant::now();
        comp.compress();
        info!("Compress took {:?}", start.elapsed());
    }
}

// Finds the most frequent component label in a small random sample.
fn find_largest_component<NI>(comp: &Afforest<NI>, config: AfforestConfig) -> NI
where
    NI: Idx + std::hash::Hash,
{
    use nanorand::{Rng, WyRand};
    let mut rng = WyRand::new_seed(RAND_SEED);
    let mut sample_counts = AHashMap::<NI, usize>::new();

    for _ in 0..config.sampling_size {
        let component = comp.find(NI::new(rng.generate_range(0..comp.len())));
        let count = sample_counts.entry(component).or_insert(0);
        *count += 1;
    }

    let (most_frequent, size) = sample_counts
        .iter()
        .max_by(|(_, v1), (_, v2)| v1.cmp(v2))
        .unwrap();

    info!(
        "Largest intermediate component {most_frequent:?} containing approx. {}% of the graph.",
        (*size as f32 / config.sampling_size as f32 * 100.0) as usize
    );

    *most_frequent
}

// Links the unsampled edges while skipping nodes that already belong to the
// dominant component. Incoming edges only matter for directed graphs; for
// undirected graphs both directions are already in the neighbor lists.
fn link_remaining<NI, G>(graph: &G, comp: &Afforest<NI>, skip_component: NI, config: AfforestConfig)
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let directed = graph.directed();
    (0..graph.node_count().index())
        .into_par_iter()
        .chunks(config.chunk_size)
        .for_each(|chunk| {
            for u in chunk {
                let u = NI::new(u);
                if comp.find(u) == skip_component {
                    continue;
                }

                if graph.out_degree(u).index() > config.neighbor_rounds {
                    for v in graph.out_neighbors(u).skip(config.neighbor_rounds) {
                        comp.link(u, *v);
                    }
                }

                if directed {
                    for v in graph.in_neighbors(u) {
                        comp.link(u, *v);
                    }
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_components_directed() {
        let graph: DirectedCsrGraph<usize> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (2, 3)])
            .build();

        let res = afforest(&graph, AfforestConfig::default());

        assert_eq!(res.component(0), res.component(1));
        assert_eq!(res.component(2), res.component(3));
        assert_ne!(res.component(1), res.component(2));
        assert_eq!(res.count(), 2);
    }

    #[test]
    fn weak_connectivity_crosses_edge_direction() {
        // 0 -> 1 <- 2: all weakly connected
        let graph: DirectedCsrGraph<usize> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (2, 1)])
            .build();

        let res = afforest(&graph, AfforestConfig::default());

        assert_eq!(res.component(0), res.component(1));
        assert_eq!(res.component(1), res.component(2));
    }

    #[test]
    fn clique_is_one_component() {
        let graph: UndirectedCsrGraph<usize> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)])
            .build();

        let res = afforest(&graph, AfforestConfig::default());

        assert_eq!(res.count(), 1);
        assert!((0..4).all(|n| res.component(n) == res.component(0)));
    }

    #[test]
    fn isolated_node_is_its_own_component() {
        let graph: UndirectedCsrGraph<usize> = GraphBuilder::new()
            .csr_layout(CsrLayout::Deduplicated)
            .edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3), (5, 5)])
            .build();

        let res = afforest(&graph, AfforestConfig::default());

        assert_eq!(res.count(), 3);
        assert_ne!(res.component(5), res.component(0));
        assert_ne!(res.component(4), res.component(0));
    }
}
