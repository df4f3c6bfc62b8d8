use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::time::Instant;

use crate::index::Idx;
use crate::SharedMut;

use super::EdgeList;

/// Seed for all pseudo-random graph generation.
pub const RAND_SEED: u64 = 27491095;

/// Number of edges generated sequentially from one seeded generator.
///
/// The edge index range is split into fixed-size blocks and block `b` is
/// produced by a generator seeded with `RAND_SEED + b`. The output is
/// therefore identical for every thread count.
const BLOCK_SIZE: usize = 1 << 18;

/// Largest generated edge weight; weights are drawn from `1..=MAX_WEIGHT`.
const MAX_WEIGHT: u32 = 255;

// R-MAT quadrant probabilities.
const RMAT_A: f64 = 0.57;
const RMAT_B: f64 = 0.19;
const RMAT_C: f64 = 0.19;

/// Generates an edge list with `2^scale * degree` edges whose endpoints are
/// drawn uniformly from `0..2^scale`.
pub fn uniform_edge_list<NI, EV>(scale: usize, degree: usize) -> EdgeList<NI, EV>
where
    NI: Idx,
    EV: Default + Copy + Send + Sync,
{
    let node_count = 1_usize << scale;
    let edge_count = node_count * degree;

    let start = Instant::now();
    let edges = block_generate(edge_count, |rng| {
        let source = NI::new(rng.gen_range(0..node_count));
        let target = NI::new(rng.gen_range(0..node_count));
        (source, target)
    });
    info!(
        "Generated {} uniform random edges in {:?}",
        edge_count,
        start.elapsed()
    );

    EdgeList::with_max_node_id(edges, NI::new(node_count - 1))
}

/// Generates a Kronecker edge list with `2^scale * degree` edges using the
/// R-MAT quadrant probabilities of Graph500.
///
/// Node ids are scrambled with a seeded random permutation afterwards, which
/// removes the locality artifacts of the quadrant recursion.
pub fn rmat_edge_list<NI, EV>(scale: usize, degree: usize) -> EdgeList<NI, EV>
where
    NI: Idx,
    EV: Default + Copy + Send + Sync,
{
    let node_count = 1_usize << scale;
    let edge_count = node_count * degree;

    let start = Instant::now();
    let mut edges = block_generate(edge_count, |rng| {
        let mut source = 0_usize;
        let mut target = 0_usize;
        for _ in 0..scale {
            source <<= 1;
            target <<= 1;
            let quadrant = rng.gen::<f64>();
            if quadrant < RMAT_A {
                // top-left, both bits stay zero
            } else if quadrant < RMAT_A + RMAT_B {
                target += 1;
            } else if quadrant < RMAT_A + RMAT_B + RMAT_C {
                source += 1;
            } else {
                source += 1;
                target += 1;
            }
        }
        (NI::new(source), NI::new(target))
    });
    info!(
        "Generated {} R-MAT edges in {:?}",
        edge_count,
        start.elapsed()
    );

    let start = Instant::now();
    permute_node_ids(&mut edges, node_count);
    info!("Permuted node ids in {:?}", start.elapsed());

    EdgeList::with_max_node_id(edges, NI::new(node_count - 1))
}

/// Overwrites the weights of the edge list with uniform values in
/// `1..=255`, using the same block-seeded scheme as edge generation.
pub fn insert_weights<NI: Idx>(edges: &mut EdgeList<NI, u32>) {
    let start = Instant::now();
    let edges = edges.as_mut_slice();
    edges
        .par_chunks_mut(BLOCK_SIZE)
        .enumerate()
        .for_each(|(block, chunk)| {
            let mut rng = SmallRng::seed_from_u64(RAND_SEED + block as u64);
            for (_, _, weight) in chunk.iter_mut() {
                *weight = rng.gen_range(1..=MAX_WEIGHT);
            }
        });
    info!("Inserted random weights in {:?}", start.elapsed());
}

// Fills a fresh edge buffer block by block. Each block is produced
// sequentially from its own seeded generator; the parallel writers target
// disjoint index ranges.
fn block_generate<NI, EV, F>(edge_count: usize, next_edge: F) -> Vec<(NI, NI, EV)>
where
    NI: Idx,
    EV: Default + Copy + Send + Sync,
    F: Fn(&mut SmallRng) -> (NI, NI) + Send + Sync,
{
    let mut edges = Vec::<(NI, NI, EV)>::with_capacity(edge_count);
    let edges_ptr = SharedMut::new(edges.as_mut_ptr());

    let block_count = (edge_count + BLOCK_SIZE - 1) / BLOCK_SIZE;

    // SAFETY: the blocks cover disjoint index ranges below edge_count and
    //         every position is written exactly once.
    (0..block_count).into_par_iter().for_each(|block| {
        let mut rng = SmallRng::seed_from_u64(RAND_SEED + block as u64);
        let start = block * BLOCK_SIZE;
        let end = usize::min(start + BLOCK_SIZE, edge_count);
        for i in start..end {
            let (source, target) = next_edge(&mut rng);
            unsafe {
                edges_ptr.add(i).write((source, target, EV::default()));
            }
        }
    });

    unsafe {
        edges.set_len(edge_count);
    }

    edges
}

// Replaces every node id through a random permutation of `0..node_count`.
fn permute_node_ids<NI, EV>(edges: &mut [(NI, NI, EV)], node_count: usize)
where
    NI: Idx,
    EV: Send + Sync,
{
    let mut rng = SmallRng::seed_from_u64(RAND_SEED);
    let mut permutation = (0..node_count).map(NI::new).collect::<Vec<_>>();
    for i in (1..node_count).rev() {
        permutation.swap(i, rng.gen_range(0..=i));
    }

    let permutation = &permutation;
    edges.par_iter_mut().for_each(|(source, target, _)| {
        *source = permutation[source.index()];
        *target = permutation[target.index()];
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::edgelist::Edges;

    #[test]
    fn uniform_ids_stay_in_range() {
        let edges = uniform_edge_list::<u32, ()>(6, 4);

        assert_eq!(edges.len(), 64 * 4);
        assert_eq!(edges.max_node_id(), 63);
        assert!(edges
            .into_vec()
            .into_iter()
            .all(|(s, t, _)| s < 64 && t < 64));
    }

    #[test]
    fn rmat_ids_stay_in_range() {
        let edges = rmat_edge_list::<u32, ()>(6, 4);

        assert_eq!(edges.len(), 64 * 4);
        assert!(edges
            .into_vec()
            .into_iter()
            .all(|(s, t, _)| s < 64 && t < 64));
    }

    #[test]
    fn generation_is_deterministic() {
        let first = rmat_edge_list::<u32, ()>(10, 16).into_vec();
        let second = rmat_edge_list::<u32, ()>(10, 16).into_vec();

        assert_eq!(first, second);
    }

    #[test]
    fn generation_is_thread_count_independent() {
        let baseline = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| uniform_edge_list::<u32, ()>(8, 8).into_vec());

        let concurrent = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| uniform_edge_list::<u32, ()>(8, 8).into_vec());

        assert_eq!(baseline, concurrent);
    }

    #[test]
    fn weights_are_within_bounds() {
        let mut edges = uniform_edge_list::<u32, u32>(6, 4);
        insert_weights(&mut edges);

        assert!(edges
            .into_vec()
            .into_iter()
            .all(|(_, _, w)| (1..=255).contains(&w)));
    }
}
