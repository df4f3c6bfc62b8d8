//! Single-source shortest paths via delta-stepping.
//!
//! Relaxations are batched into buckets of width `delta`: two shared
//! frontier buffers are double-buffered across outer iterations while every
//! thread keeps a local collection of bins keyed by `distance / delta`.
//! A node whose tentative distance dropped below the current bucket since it
//! was enqueued is skipped on processing instead of being removed.

use log::info;
use rayon::prelude::*;

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use crate::prelude::*;

/// Distance assigned to unreachable nodes.
pub const INFINITE_DISTANCE: u32 = u32::MAX / 2;

const NO_BIN: usize = usize::MAX;
const BIN_SIZE_THRESHOLD: usize = 1000;

const BATCH_SIZE: usize = 64;

#[derive(Copy, Clone, Debug)]
pub struct DeltaSteppingConfig {
    /// The node for which to compute distances to all reachable nodes.
    pub start_node: usize,

    /// The bucket width. A bucket maintains nodes with the same tentative
    /// distance band to the start node.
    pub delta: u32,
}

impl DeltaSteppingConfig {
    pub fn new(start_node: usize, delta: u32) -> Self {
        assert!(delta > 0, "delta must be positive");
        Self { start_node, delta }
    }
}

impl Default for DeltaSteppingConfig {
    fn default() -> Self {
        Self {
            start_node: 0,
            delta: 1,
        }
    }
}

/// Computes the shortest distance from `config.start_node` to every
/// reachable node. Unreachable nodes are reported as
/// [`INFINITE_DISTANCE`].
pub fn delta_stepping<NI, G>(graph: &G, config: DeltaSteppingConfig) -> Vec<u32>
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighborsWithValues<NI, u32> + EdgeSlots<NI> + Sync,
{
    let start = Instant::now();

    let DeltaSteppingConfig { start_node, delta } = config;

    let node_count = graph.node_count().index();
    let thread_count = rayon::current_num_threads();

    let mut distance: Vec<Atomic<u32>> = Vec::with_capacity(node_count);
    distance.resize_with(node_count, || Atomic::new(INFINITE_DISTANCE));
    distance[start_node].store(0, Ordering::Release);

    // the frontier buffer must hold at least the start node
    let frontier_size = usize::max(graph.out_slot_count().index(), 1);
    let mut frontier = vec![NI::zero(); frontier_size];
    frontier[0] = NI::new(start_node);
    let frontier_idx = AtomicUsize::new(0);
    let mut frontier_len = 1;

    let mut local_bins = Vec::with_capacity(thread_count);
    local_bins.resize_with(thread_count, ThreadLocalBins::<NI>::new);

    let mut curr_bin = 0;

    while curr_bin != NO_BIN {
        frontier_idx.store(0, Ordering::Relaxed);

        let next_bin = local_bins
            .par_iter_mut()
            .map(|bins| {
                process_shared_bin(
                    bins,
                    curr_bin,
                    graph,
                    (&frontier, &frontier_idx, frontier_len),
                    &distance,
                    delta,
                )
            })
            .map(|bins| process_local_bins(bins, curr_bin, graph, &distance, delta))
            .map(|bins| min_non_empty_bin(bins, curr_bin))
            .min()
            .unwrap_or(NO_BIN);

        // copy next local bins into the shared frontier
        frontier_len = frontier_slices(&mut frontier, &local_bins, next_bin)
            .par_iter_mut()
            .zip(local_bins.par_iter_mut())
            .filter(|(_, bins)| bins.contains(next_bin))
            .map(|(slice, bins)| {
                slice.copy_from_slice(bins.slice(next_bin));
                bins.clear(next_bin);
                slice.len()
            })
            .sum();

        curr_bin = next_bin;
    }

    info!("Computed SSSP in {:?}", start.elapsed());

    distance.into_iter().map(Atomic::into_inner).collect()
}

fn process_shared_bin<'bins, NI, G>(
    bins: &'bins mut ThreadLocalBins<NI>,
    curr_bin: usize,
    graph: &G,
    (frontier, frontier_idx, frontier_len): (&[NI], &AtomicUsize, usize),
    distance: &[Atomic<u32>],
    delta: u32,
) -> &'bins mut ThreadLocalBins<NI>
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighborsWithValues<NI, u32> + Sync,
{
    loop {
        let offset = frontier_idx.fetch_add(BATCH_SIZE, Ordering::AcqRel);

        if offset >= frontier_len {
            break;
        }

        let limit = usize::min(offset + BATCH_SIZE, frontier_len);

        for node in frontier[offset..limit].iter() {
            // nodes that moved into a lower bucket since they were enqueued
            // are processed by that bucket instead
            if distance[node.index()].load(Ordering::Acquire) as u64
                >= delta as u64 * curr_bin as u64
            {
                relax_edges(graph, distance, bins, *node, delta);
            }
        }
    }
    bins
}

fn process_local_bins<'bins, NI, G>(
    bins: &'bins mut ThreadLocalBins<NI>,
    curr_bin: usize,
    graph: &G,
    distance: &[Atomic<u32>],
    delta: u32,
) -> &'bins mut ThreadLocalBins<NI>
where
    NI: Idx,
    G: Graph<NI> + DirectedNeighborsWithValues<NI, u32> + Sync,
{
    while curr_bin < bins.len()
        && !bins.is_empty(curr_bin)
        && bins.bin_len(curr_bin) < BIN_SIZE_THRESHOLD
    {
        let current_bin_copy = bins.clone(curr_bin);
        bins.clear(curr_bin);

        for node in current_bin_copy {
            relax_edges(graph, distance, bins, node, delta);
        }
    }
    bins
}

fn min_non_empty_bin<NI: Idx>(bins: &mut ThreadLocalBins<NI>, curr_bin: usize) -> usize {
    let mut next_bin = NO_BIN;
    for bin in curr_bin..bins.len() {
        if !bins.is_empty(bin) {
            next_bin = bin;
            break;
        }
    }
    next_bin
}

fn relax_edges<NI, G>(
    graph: &G,
    distance: &[Atomic<u32>],
    local_bins: &mut ThreadLocalBins<NI>,
    node: NI,
    delta: u32,
) where
    NI: Idx,
    G: Graph<NI> + DirectedNeighborsWithValues<NI, u32> + Sync,
{
    for Target { target, value } in graph.out_neighbors_with_values(node) {
        let mut old_distance = distance[target.index()].load(Ordering::Acquire);
        let new_distance = distance[node.index()].load(Ordering::Acquire) + value;

        while new_distance < old_distance {
            match distance[target.index()].compare_exchange_weak(
                old_distance,
                new_distance,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let dest_bin = (new_distance / delta) as usize;
                    if dest_bin >= local_bins.len() {
                        local_bins.resize(dest_bin + 1);
                    }
                    local_bins.push(dest_bin, *target);
                    break;
                }
                // CAS failed -> retry with the new minimum distance
                Err(min_distance) => old_distance = min_distance,
            }
        }
    }
}

fn frontier_slices<'a, NI: Idx>(
    frontier: &'a mut [NI],
    bins: &[ThreadLocalBins<NI>],
    next_bin: usize,
) -> Vec<&'a mut [NI]> {
    let mut slices = Vec::with_capacity(bins.len());
    let mut tail = frontier;

    for local_bins in bins.iter() {
        if local_bins.contains(next_bin) {
            let (head, remainder) = tail.split_at_mut(local_bins.bin_len(next_bin));
            slices.push(head);
            tail = remainder;
        } else {
            slices.push(&mut []);
        }
    }

    slices
}

#[derive(Debug)]
struct ThreadLocalBins<T> {
    bins: Vec<Vec<T>>,
}

impl<T> ThreadLocalBins<T>
where
    T: Clone,
{
    fn new() -> Self {
        Self { bins: vec![vec![]] }
    }

    fn contains(&self, bin: usize) -> bool {
        self.len() > bin
    }

    fn len(&self) -> usize {
        self.bins.len()
    }

    fn bin_len(&self, bin: usize) -> usize {
        self.bins[bin].len()
    }

    fn is_empty(&self, bin: usize) -> bool {
        self.bins[bin].is_empty()
    }

    fn clone(&self, bin: usize) -> Vec<T> {
        self.bins[bin].clone()
    }

    fn clear(&mut self, bin: usize) {
        self.bins[bin].clear();
    }

    fn slice(&self, bin: usize) -> &[T] {
        &self.bins[bin]
    }

    fn resize(&mut self, new_len: usize) {
        self.bins.resize_with(new_len, Vec::new)
    }

    fn push(&mut self, bin: usize, val: T) {
        self.bins[bin].push(val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_on_weighted_dag() {
        let graph: DirectedCsrGraph<usize, u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Sorted)
            .edges_with_values(vec![
                (0, 1, 4),
                (0, 2, 2),
                (1, 2, 5),
                (1, 3, 10),
                (2, 4, 3),
                (3, 5, 11),
                (4, 3, 4),
            ])
            .build();

        let actual = delta_stepping(&graph, DeltaSteppingConfig::new(0, 3));
        let expected: Vec<u32> = vec![0, 4, 2, 9, 5, 20];

        assert_eq!(actual, expected);
    }

    #[test]
    fn unit_weights_on_clique() {
        let graph: UndirectedCsrGraph<usize, u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Sorted)
            .edges_with_values(vec![
                (0, 1, 1),
                (0, 2, 1),
                (0, 3, 1),
                (1, 2, 1),
                (1, 3, 1),
                (2, 3, 1),
            ])
            .build();

        let actual = delta_stepping(&graph, DeltaSteppingConfig::new(0, 1));

        assert_eq!(actual, vec![0, 1, 1, 1]);
    }

    #[test]
    fn unreachable_nodes_are_infinite() {
        let graph: DirectedCsrGraph<usize, u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Sorted)
            .edges_with_values(vec![(0, 1, 3), (2, 3, 5)])
            .build();

        let actual = delta_stepping(&graph, DeltaSteppingConfig::new(0, 4));

        assert_eq!(actual, vec![0, 3, INFINITE_DISTANCE, INFINITE_DISTANCE]);
    }

    #[test]
    fn agrees_with_dijkstra() {
        let mut edges = uniform_edge_list::<u32, u32>(8, 8);
        insert_weights(&mut edges);

        let graph: DirectedCsrGraph<u32, u32> = GraphBuilder::new()
            .csr_layout(CsrLayout::Sorted)
            .edge_list(edges)
            .build();

        let actual = delta_stepping(&graph, DeltaSteppingConfig::new(0, 8));
        let expected = crate::verify::dijkstra(&graph, 0);

        assert_eq!(actual, expected);
    }
}
