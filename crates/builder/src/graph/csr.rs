use byte_slice_cast::{AsByteSlice, AsMutByteSlice, ToByteSlice, ToMutByteSlice};
use log::info;
use num_format::{Locale, ToFormattedString};
use std::{
    convert::TryFrom,
    fs::File,
    io::{BufReader, Read, Write},
    mem::ManuallyDrop,
    path::PathBuf,
    sync::atomic::Ordering::{AcqRel, Acquire},
    time::Instant,
};

use atomic::Atomic;
use rayon::prelude::*;

use crate::{
    graph_ops::{DeserializeGraphOp, SerializeGraphOp},
    index::Idx,
    input::{edgelist::EdgeList, edgelist::Edges, Direction},
    DirectedDegrees, DirectedNeighbors, DirectedNeighborsWithValues, EdgeSlots, Error, Graph,
    SharedMut, UndirectedDegrees, UndirectedNeighbors, UndirectedNeighborsWithValues,
};

/// Number of elements processed per block by the parallel prefix sum.
const PREFIX_SUM_BLOCK_SIZE: usize = 1 << 20;

/// Defines how the neighbor list of individual nodes are organized within the
/// CSR target array.
#[derive(Clone, Copy, Debug, Default)]
pub enum CsrLayout {
    /// Neighbor lists are sorted and may contain duplicate target ids. This
    /// is the default representation.
    #[default]
    Sorted,
    /// Neighbor lists are not in any particular order.
    Unsorted,
    /// Neighbor lists are sorted and do not contain duplicate target ids.
    /// Self-loops, i.e., edges in the form of `(u, u)` are removed.
    Deduplicated,
}

/// A Compressed-Sparse-Row data structure to represent sparse graphs.
///
/// The data structure is composed of two arrays: `offsets` and `targets`.
/// For a graph with node count `n` and edge count `m`, `offsets` has exactly
/// `n + 1` and `targets` exactly `m` entries.
///
/// For a given node `u`, `offsets[u]` stores the start index of the neighbor
/// list of `u` in `targets`. The degree of `u`, i.e., the length of the
/// neighbor list is defined by `offsets[u + 1] - offsets[u]`. The neighbor
/// list of `u` is defined by the slice `&targets[offsets[u]..offsets[u + 1]]`.
#[derive(Debug)]
pub struct Csr<Index: Idx, NI, EV> {
    offsets: Box<[Index]>,
    targets: Box<[Target<NI, EV>]>,
}

/// Represents the target of an edge and its associated value.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Target<NI, EV> {
    pub target: NI,
    pub value: EV,
}

impl<T: Ord, V> Ord for Target<T, V> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.target.cmp(&other.target)
    }
}

impl<T: PartialOrd, V> PartialOrd for Target<T, V> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.target.partial_cmp(&other.target)
    }
}

impl<T: PartialEq, V> PartialEq for Target<T, V> {
    fn eq(&self, other: &Self) -> bool {
        self.target.eq(&other.target)
    }
}

impl<T: Eq, V> Eq for Target<T, V> {}

impl<T, EV> Target<T, EV> {
    pub fn new(target: T, value: EV) -> Self {
        Self { target, value }
    }
}

impl<Index: Idx, NI, EV> Csr<Index, NI, EV> {
    pub(crate) fn new(offsets: Box<[Index]>, targets: Box<[Target<NI, EV>]>) -> Self {
        Self { offsets, targets }
    }

    #[inline]
    pub(crate) fn node_count(&self) -> Index {
        Index::new(self.offsets.len() - 1)
    }

    #[inline]
    pub(crate) fn edge_count(&self) -> Index {
        Index::new(self.targets.len())
    }

    #[inline]
    pub(crate) fn degree(&self, i: Index) -> Index {
        let from = self.offsets[i.index()];
        let to = self.offsets[(i + Index::new(1)).index()];

        to - from
    }

    #[inline]
    pub(crate) fn offset(&self, i: Index) -> Index {
        self.offsets[i.index()]
    }

    #[inline]
    pub(crate) fn targets_with_values(&self, i: Index) -> &[Target<NI, EV>] {
        let from = self.offsets[i.index()];
        let to = self.offsets[(i + Index::new(1)).index()];

        &self.targets[from.index()..to.index()]
    }
}

impl<Index: Idx, NI> Csr<Index, NI, ()> {
    #[inline]
    pub(crate) fn targets(&self, i: Index) -> &[NI] {
        assert_eq!(
            std::mem::size_of::<Target<NI, ()>>(),
            std::mem::size_of::<NI>()
        );
        assert_eq!(
            std::mem::align_of::<Target<NI, ()>>(),
            std::mem::align_of::<NI>()
        );
        let from = self.offsets[i.index()];
        let to = self.offsets[(i + Index::new(1)).index()];

        let len = (to - from).index();

        let targets = &self.targets[from.index()..to.index()];

        // SAFETY: len is within bounds as it is calculated above as
        //         `to - from`. The types Target<T, ()> and T are verified to
        //         have the same size and alignment.
        unsafe { std::slice::from_raw_parts(targets.as_ptr() as *const _, len) }
    }
}

pub trait SwapCsr<Index: Idx, NI, EV> {
    fn swap_csr(&mut self, csr: Csr<Index, NI, EV>) -> &mut Self;
}

impl<NI, EV, E> From<(&'_ E, NI, Direction, CsrLayout)> for Csr<NI, NI, EV>
where
    NI: Idx,
    EV: Copy + Send + Sync,
    E: Edges<NI = NI, EV = EV>,
{
    fn from(
        (edge_list, node_count, direction, csr_layout): (&'_ E, NI, Direction, CsrLayout),
    ) -> Self {
        let start = Instant::now();
        let degrees = edge_list.degrees(node_count, direction);
        info!("Computed degrees in {:?}", start.elapsed());

        let start = Instant::now();
        let offsets = prefix_sum_atomic(degrees);
        info!("Computed prefix sum in {:?}", start.elapsed());

        let start = Instant::now();
        let edge_count = offsets[node_count.index()].load(Acquire).index();
        let mut targets = Vec::<Target<NI, EV>>::with_capacity(edge_count);
        let targets_ptr = SharedMut::new(targets.as_mut_ptr());

        // The following loop writes all targets into their final position.
        // The offsets are a prefix sum of all degrees, which produces
        // non-overlapping positions for all node values.
        //
        // SAFETY: for any (s, t) tuple from the same edge_list we use the
        // prefix_sum to find a unique position for the target value, so that
        // we only write once into each position and every thread that might
        // run will write into different positions.
        if matches!(direction, Direction::Outgoing | Direction::Undirected) {
            edge_list.edges().for_each(|(s, t, v)| {
                let offset = NI::get_and_increment(&offsets[s.index()], Acquire);

                unsafe {
                    targets_ptr.add(offset.index()).write(Target::new(t, v));
                }
            })
        }

        if matches!(direction, Direction::Incoming | Direction::Undirected) {
            edge_list.edges().for_each(|(s, t, v)| {
                let offset = NI::get_and_increment(&offsets[t.index()], Acquire);

                unsafe {
                    targets_ptr.add(offset.index()).write(Target::new(s, v));
                }
            })
        }

        // SAFETY: The previous loops iterated the input edge list once (twice
        // for undirected) and inserted one node id for each edge. The
        // `edge_count` is defined by the highest offset value.
        unsafe {
            targets.set_len(edge_count);
        }
        info!("Computed target array in {:?}", start.elapsed());

        let start = Instant::now();
        let mut offsets = ManuallyDrop::new(offsets);
        let (ptr, len, cap) = (offsets.as_mut_ptr(), offsets.len(), offsets.capacity());

        // SAFETY: NI and Atomic<NI> have the same memory layout
        let mut offsets = unsafe {
            let ptr = ptr as *mut NI;
            Vec::from_raw_parts(ptr, len, cap)
        };

        // Each insert into the target array in the previous loops incremented
        // the offset for the corresponding node by one. As a consequence the
        // offset values are shifted one index to the right. We need to
        // correct this in order to get correct offsets.
        offsets.rotate_right(1);
        offsets[0] = NI::zero();
        info!("Finalized offset array in {:?}", start.elapsed());

        let (offsets, targets) = match csr_layout {
            CsrLayout::Unsorted => (offsets, targets),
            CsrLayout::Sorted => {
                let start = Instant::now();
                sort_targets(&offsets, &mut targets);
                info!("Sorted targets in {:?}", start.elapsed());
                (offsets, targets)
            }
            CsrLayout::Deduplicated => {
                let start = Instant::now();
                let offsets_targets = squish_targets(&offsets, &mut targets[..]);
                info!("Sorted and deduplicated targets in {:?}", start.elapsed());
                offsets_targets
            }
        };

        Csr {
            offsets: offsets.into_boxed_slice(),
            targets: targets.into_boxed_slice(),
        }
    }
}

impl<NI: Idx> Csr<NI, NI, ()> {
    /// Builds a CSR by rewriting the edge list's backing storage into the
    /// target array.
    ///
    /// The edge list is sorted, deduplicated and cleared of self-loops in
    /// place. Afterwards the pair buffer is reinterpreted as a flat node id
    /// buffer and each target id is moved to its final position. The write
    /// position of edge `i` never exceeds its read position, so no edge is
    /// overwritten before it was consumed.
    ///
    /// With `symmetrize`, missing inverse edges are inserted by growing the
    /// buffer once and opening gaps at the head of each neighbor list.
    pub(crate) fn from_edge_list_in_place(
        edge_list: EdgeList<NI, ()>,
        node_count: NI,
        symmetrize: bool,
    ) -> Self {
        let start = Instant::now();
        let mut pairs = edge_list.into_vec();
        pairs.par_sort_unstable();
        pairs.dedup();
        pairs.retain(|(s, t, _)| s != t);
        info!("Sorted and squished edge list in {:?}", start.elapsed());

        let start = Instant::now();
        let edge_count = pairs.len();
        let mut degrees = vec![NI::zero(); node_count.index()];
        for (s, _, ()) in &pairs {
            degrees[s.index()] += NI::new(1);
        }
        let mut offsets = prefix_sum(degrees);

        let mut flat = into_flat_targets(pairs);

        // Move each target id to its final position, advancing the write
        // cursor of its source node. Edges are sorted by source, so edge `i`
        // lands at position `i` while reading from `2 * i + 1`.
        for edge in 0..edge_count {
            let source = flat[2 * edge];
            let target = flat[2 * edge + 1];
            let position = offsets[source.index()];
            flat[position.index()] = target;
            offsets[source.index()] += NI::new(1);
        }

        // The write cursors shifted every offset one node to the right.
        offsets.rotate_right(1);
        offsets[0] = NI::zero();
        info!("Rewrote edge list into targets in {:?}", start.elapsed());

        if symmetrize {
            let start = Instant::now();
            let (offsets, flat) = insert_missing_inverses(offsets, flat, edge_count);
            info!("Symmetrized targets in place in {:?}", start.elapsed());
            Csr::from_flat_parts(offsets, flat)
        } else {
            flat.truncate(edge_count);
            flat.shrink_to_fit();
            Csr::from_flat_parts(offsets, flat)
        }
    }

    fn from_flat_parts(offsets: Vec<NI>, flat: Vec<NI>) -> Self {
        assert_eq!(
            std::mem::size_of::<Target<NI, ()>>(),
            std::mem::size_of::<NI>()
        );
        assert_eq!(
            std::mem::align_of::<Target<NI, ()>>(),
            std::mem::align_of::<NI>()
        );
        let mut flat = ManuallyDrop::new(flat);
        let (ptr, len, cap) = (flat.as_mut_ptr(), flat.len(), flat.capacity());
        // SAFETY: NI and Target<NI, ()> have the same size and alignment,
        //         verified above.
        let targets = unsafe { Vec::from_raw_parts(ptr as *mut Target<NI, ()>, len, cap) };

        Csr {
            offsets: offsets.into_boxed_slice(),
            targets: targets.into_boxed_slice(),
        }
    }

    /// Builds the transposed CSR by a counting pass over this one.
    pub(crate) fn invert(&self) -> Self {
        let node_count = self.node_count();
        let mut degrees = Vec::with_capacity(node_count.index());
        degrees.resize_with(node_count.index(), || Atomic::new(NI::zero()));

        (0..node_count.index()).into_par_iter().for_each(|u| {
            for target in self.targets(NI::new(u)) {
                NI::get_and_increment(&degrees[target.index()], AcqRel);
            }
        });

        let offsets = prefix_sum_atomic(degrees);

        let edge_count = self.targets.len();
        let mut inverse = Vec::<Target<NI, ()>>::with_capacity(edge_count);
        let inverse_ptr = SharedMut::new(inverse.as_mut_ptr());

        // SAFETY: as in the copying builder, the prefix sum hands out a
        //         unique position for every inserted id.
        (0..node_count.index()).into_par_iter().for_each(|u| {
            for target in self.targets(NI::new(u)) {
                let offset = NI::get_and_increment(&offsets[target.index()], Acquire);
                unsafe {
                    inverse_ptr
                        .add(offset.index())
                        .write(Target::new(NI::new(u), ()));
                }
            }
        });
        unsafe {
            inverse.set_len(edge_count);
        }

        let mut offsets = offsets
            .into_iter()
            .map(Atomic::into_inner)
            .collect::<Vec<_>>();
        offsets.rotate_right(1);
        offsets[0] = NI::zero();

        sort_targets(&offsets, &mut inverse);

        Csr {
            offsets: offsets.into_boxed_slice(),
            targets: inverse.into_boxed_slice(),
        }
    }
}

// Reinterprets a pair list as a flat buffer of node ids.
fn into_flat_targets<NI: Idx>(pairs: Vec<(NI, NI, ())>) -> Vec<NI> {
    assert_eq!(
        std::mem::size_of::<(NI, NI, ())>(),
        2 * std::mem::size_of::<NI>()
    );
    assert_eq!(std::mem::align_of::<(NI, NI, ())>(), std::mem::align_of::<NI>());

    let mut pairs = ManuallyDrop::new(pairs);
    let (ptr, len, cap) = (pairs.as_mut_ptr(), pairs.len(), pairs.capacity());

    // SAFETY: (NI, NI, ()) consists of exactly two NI values, verified above.
    unsafe { Vec::from_raw_parts(ptr as *mut NI, len * 2, cap * 2) }
}

// Expands a forward CSR into its symmetric closure without a second buffer.
//
// Three passes: count the missing inverse edges per node, relocate every
// neighbor list to its shifted position leaving a gap at the head, then fill
// the gaps with the missing inverse ids and restore sorted lists.
fn insert_missing_inverses<NI: Idx>(
    offsets: Vec<NI>,
    mut flat: Vec<NI>,
    edge_count: usize,
) -> (Vec<NI>, Vec<NI>) {
    let node_count = offsets.len() - 1;

    let neighbors =
        |u: usize| -> std::ops::Range<usize> { offsets[u].index()..offsets[u + 1].index() };

    let mut invs_needed = Vec::with_capacity(node_count);
    invs_needed.resize_with(node_count, || Atomic::new(NI::zero()));

    {
        let flat = &flat;
        (0..node_count).into_par_iter().for_each(|u| {
            for &v in &flat[neighbors(u)] {
                let adjacency = &flat[neighbors(v.index())];
                if adjacency.binary_search(&NI::new(u)).is_err() {
                    NI::get_and_increment(&invs_needed[v.index()], AcqRel);
                }
            }
        });
    }

    let invs_needed = invs_needed
        .into_iter()
        .map(Atomic::into_inner)
        .collect::<Vec<_>>();

    let new_degrees = (0..node_count)
        .map(|u| offsets[u + 1] - offsets[u] + invs_needed[u])
        .collect::<Vec<_>>();
    let new_offsets = prefix_sum(new_degrees);
    let total_edges = new_offsets[node_count].index();

    flat.resize(total_edges, NI::zero());

    // Relocate from the highest node downwards so that no list is clobbered
    // before it moved. Each list lands behind its gap of `invs_needed` slots.
    for u in (0..node_count).rev() {
        let src = neighbors(u);
        let dst = (new_offsets[u] + invs_needed[u]).index();
        flat.copy_within(src, dst);
    }

    let mut gaps = Vec::with_capacity(node_count);
    gaps.resize_with(node_count, || Atomic::new(NI::zero()));

    let relocated = |u: usize| -> std::ops::Range<usize> {
        (new_offsets[u] + invs_needed[u]).index()..new_offsets[u + 1].index()
    };

    // Every missing inverse claims one of the head slots of its target's
    // list through an atomic cursor.
    let flat_ptr = SharedMut::new(flat.as_mut_ptr());
    let flat_ref = &flat;
    (0..node_count).into_par_iter().for_each(|u| {
        for &v in &flat_ref[relocated(u)] {
            let adjacency = &flat_ref[relocated(v.index())];
            if adjacency.binary_search(&NI::new(u)).is_err() {
                let slot = NI::get_and_increment(&gaps[v.index()], AcqRel);
                let position = new_offsets[v.index()] + slot;
                debug_assert!(slot < invs_needed[v.index()]);
                // SAFETY: gap slots are handed out exactly once per missing
                //         inverse and lie outside every relocated range.
                unsafe {
                    flat_ptr.add(position.index()).write(NI::new(u));
                }
            }
        }
    });

    debug_assert_eq!(
        edge_count + invs_needed.iter().map(|n| n.index()).sum::<usize>(),
        total_edges
    );

    let mut slices = Vec::with_capacity(node_count);
    let mut tail = flat.as_mut_slice();
    let mut prev = NI::zero();
    for &offset in &new_offsets[1..] {
        let (list, remainder) = tail.split_at_mut((offset - prev).index());
        slices.push(list);
        tail = remainder;
        prev = offset;
    }
    slices.par_iter_mut().for_each(|list| list.sort_unstable());

    (new_offsets, flat)
}

unsafe impl<NI, EV> ToByteSlice for Target<NI, EV>
where
    NI: ToByteSlice,
    EV: ToByteSlice,
{
    fn to_byte_slice<S: AsRef<[Self]> + ?Sized>(slice: &S) -> &[u8] {
        let slice = slice.as_ref();
        let len = slice.len() * std::mem::size_of::<Target<NI, EV>>();
        unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, len) }
    }
}

unsafe impl<NI, EV> ToMutByteSlice for Target<NI, EV>
where
    NI: ToMutByteSlice,
    EV: ToMutByteSlice,
{
    fn to_mut_byte_slice<S: AsMut<[Self]> + ?Sized>(slice: &mut S) -> &mut [u8] {
        let slice = slice.as_mut();
        let len = slice.len() * std::mem::size_of::<Target<NI, EV>>();
        unsafe { std::slice::from_raw_parts_mut(slice.as_mut_ptr() as *mut u8, len) }
    }
}

/// A directed graph with one CSR for each edge direction.
///
/// The inverse adjacency is always materialized since every pull-style
/// kernel consumes incoming edges.
pub struct DirectedCsrGraph<NI: Idx, EV = ()> {
    csr_out: Csr<NI, NI, EV>,
    csr_inc: Csr<NI, NI, EV>,
}

impl<NI: Idx, EV> DirectedCsrGraph<NI, EV> {
    pub fn new(csr_out: Csr<NI, NI, EV>, csr_inc: Csr<NI, NI, EV>) -> Self {
        let g = Self { csr_out, csr_inc };
        info!(
            "Created directed graph (node_count = {:?}, edge_count = {:?})",
            g.node_count(),
            g.edge_count()
        );

        g
    }

    /// Logs a summary of the graph shape.
    pub fn print_stats(&self) {
        let node_count = self.node_count().index();
        let edge_count = self.edge_count().index();
        info!(
            "directed graph: {} nodes, {} edges, average degree {:.2}",
            node_count.to_formatted_string(&Locale::en),
            edge_count.to_formatted_string(&Locale::en),
            edge_count as f64 / node_count as f64,
        );
    }
}

impl<NI: Idx> DirectedCsrGraph<NI> {
    /// Builds the graph by consuming the edge list's backing storage for the
    /// outgoing CSR. The incoming CSR is derived by a counting pass.
    pub fn from_edge_list_in_place(edge_list: EdgeList<NI, ()>) -> Self {
        let node_count = edge_list.max_node_id() + NI::new(1);
        let csr_out = Csr::from_edge_list_in_place(edge_list, node_count, false);
        let csr_inc = csr_out.invert();
        DirectedCsrGraph::new(csr_out, csr_inc)
    }
}

impl<NI: Idx, EV> Graph<NI> for DirectedCsrGraph<NI, EV> {
    delegate::delegate! {
        to self.csr_out {
            fn node_count(&self) -> NI;
            fn edge_count(&self) -> NI;
        }
    }

    fn directed(&self) -> bool {
        true
    }
}

impl<NI: Idx, EV> DirectedDegrees<NI> for DirectedCsrGraph<NI, EV> {
    fn out_degree(&self, node: NI) -> NI {
        self.csr_out.degree(node)
    }

    fn in_degree(&self, node: NI) -> NI {
        self.csr_inc.degree(node)
    }
}

impl<NI: Idx> DirectedNeighbors<NI> for DirectedCsrGraph<NI> {
    type NeighborsIterator<'a> = std::slice::Iter<'a, NI>;

    fn out_neighbors(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr_out.targets(node).iter()
    }

    fn in_neighbors(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr_inc.targets(node).iter()
    }
}

impl<NI: Idx, EV> DirectedNeighborsWithValues<NI, EV> for DirectedCsrGraph<NI, EV> {
    type NeighborsIterator<'a> = std::slice::Iter<'a, Target<NI, EV>> where EV: 'a;

    fn out_neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr_out.targets_with_values(node).iter()
    }

    fn in_neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr_inc.targets_with_values(node).iter()
    }
}

impl<NI: Idx, EV> EdgeSlots<NI> for DirectedCsrGraph<NI, EV> {
    fn out_slot_count(&self) -> NI {
        self.csr_out.edge_count()
    }

    fn out_slot_offset(&self, node: NI) -> NI {
        self.csr_out.offset(node)
    }
}

impl<NI, EV, E> From<(E, CsrLayout)> for DirectedCsrGraph<NI, EV>
where
    NI: Idx,
    EV: Copy + Send + Sync,
    E: Edges<NI = NI, EV = EV>,
{
    fn from((edge_list, csr_layout): (E, CsrLayout)) -> Self {
        info!("Creating directed graph");
        let node_count = edge_list.max_node_id() + NI::new(1);

        let start = Instant::now();
        let csr_out = Csr::from((&edge_list, node_count, Direction::Outgoing, csr_layout));
        info!("Created outgoing csr in {:?}.", start.elapsed());

        let start = Instant::now();
        let csr_inc = Csr::from((&edge_list, node_count, Direction::Incoming, csr_layout));
        info!("Created incoming csr in {:?}.", start.elapsed());

        DirectedCsrGraph::new(csr_out, csr_inc)
    }
}

/// An undirected graph with a single CSR in which every edge appears in the
/// neighbor lists of both endpoints.
pub struct UndirectedCsrGraph<NI: Idx, EV = ()> {
    csr: Csr<NI, NI, EV>,
}

impl<NI: Idx, EV> UndirectedCsrGraph<NI, EV> {
    pub fn new(csr: Csr<NI, NI, EV>) -> Self {
        let g = Self { csr };
        info!(
            "Created undirected graph (node_count = {:?}, edge_count = {:?})",
            g.node_count(),
            g.edge_count()
        );

        g
    }

    /// Logs a summary of the graph shape.
    pub fn print_stats(&self) {
        let node_count = self.node_count().index();
        let edge_count = self.edge_count().index();
        info!(
            "undirected graph: {} nodes, {} edges, average degree {:.2}",
            node_count.to_formatted_string(&Locale::en),
            edge_count.to_formatted_string(&Locale::en),
            2.0 * edge_count as f64 / node_count as f64,
        );
    }
}

impl<NI: Idx> UndirectedCsrGraph<NI> {
    /// Builds the symmetric closure of the edge list by consuming its
    /// backing storage.
    pub fn from_edge_list_in_place(edge_list: EdgeList<NI, ()>) -> Self {
        let node_count = edge_list.max_node_id() + NI::new(1);
        let csr = Csr::from_edge_list_in_place(edge_list, node_count, true);
        UndirectedCsrGraph::new(csr)
    }
}

impl<NI: Idx, EV> Graph<NI> for UndirectedCsrGraph<NI, EV> {
    fn node_count(&self) -> NI {
        self.csr.node_count()
    }

    fn edge_count(&self) -> NI {
        self.csr.edge_count() / NI::new(2)
    }

    fn directed(&self) -> bool {
        false
    }
}

impl<NI: Idx, EV> UndirectedDegrees<NI> for UndirectedCsrGraph<NI, EV> {
    fn degree(&self, node: NI) -> NI {
        self.csr.degree(node)
    }
}

impl<NI: Idx> UndirectedNeighbors<NI> for UndirectedCsrGraph<NI> {
    type NeighborsIterator<'a> = std::slice::Iter<'a, NI>;

    fn neighbors(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr.targets(node).iter()
    }
}

impl<NI: Idx, EV> UndirectedNeighborsWithValues<NI, EV> for UndirectedCsrGraph<NI, EV> {
    type NeighborsIterator<'a> = std::slice::Iter<'a, Target<NI, EV>> where EV: 'a;

    fn neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr.targets_with_values(node).iter()
    }
}

impl<NI: Idx, EV> DirectedDegrees<NI> for UndirectedCsrGraph<NI, EV> {
    fn out_degree(&self, node: NI) -> NI {
        self.csr.degree(node)
    }

    fn in_degree(&self, node: NI) -> NI {
        self.csr.degree(node)
    }
}

impl<NI: Idx> DirectedNeighbors<NI> for UndirectedCsrGraph<NI> {
    type NeighborsIterator<'a> = std::slice::Iter<'a, NI>;

    fn out_neighbors(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr.targets(node).iter()
    }

    fn in_neighbors(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr.targets(node).iter()
    }
}

impl<NI: Idx, EV> DirectedNeighborsWithValues<NI, EV> for UndirectedCsrGraph<NI, EV> {
    type NeighborsIterator<'a> = std::slice::Iter<'a, Target<NI, EV>> where EV: 'a;

    fn out_neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr.targets_with_values(node).iter()
    }

    fn in_neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_> {
        self.csr.targets_with_values(node).iter()
    }
}

impl<NI: Idx, EV> EdgeSlots<NI> for UndirectedCsrGraph<NI, EV> {
    fn out_slot_count(&self) -> NI {
        self.csr.edge_count()
    }

    fn out_slot_offset(&self, node: NI) -> NI {
        self.csr.offset(node)
    }
}

impl<NI: Idx, EV> SwapCsr<NI, NI, EV> for UndirectedCsrGraph<NI, EV> {
    fn swap_csr(&mut self, mut csr: Csr<NI, NI, EV>) -> &mut Self {
        std::mem::swap(&mut self.csr, &mut csr);
        self
    }
}

impl<NI, EV, E> From<(E, CsrLayout)> for UndirectedCsrGraph<NI, EV>
where
    NI: Idx,
    EV: Copy + Send + Sync,
    E: Edges<NI = NI, EV = EV>,
{
    fn from((edge_list, csr_layout): (E, CsrLayout)) -> Self {
        info!("Creating undirected graph");
        let node_count = edge_list.max_node_id() + NI::new(1);

        let start = Instant::now();
        let csr = Csr::from((&edge_list, node_count, Direction::Undirected, csr_layout));
        info!("Created csr in {:?}.", start.elapsed());

        UndirectedCsrGraph::new(csr)
    }
}

// Binary graph layout: `u8` directed flag, `i64` edge count, `i64` node
// count, `i64[N + 1]` offsets and `NodeID[M]` targets per stored direction
// (weighted targets are `(NodeID, Weight)` pairs). Everything little-endian
// and tightly packed. Node ids must be 4 bytes wide.

fn check_id_width<NI: Idx>() -> Result<(), Error> {
    let actual = std::mem::size_of::<NI>();
    if actual != 4 {
        return Err(Error::InvalidIdSize {
            expected: 4,
            actual,
        });
    }
    Ok(())
}

fn write_csr<NI, EV, W>(csr: &Csr<NI, NI, EV>, output: &mut W) -> Result<(), Error>
where
    NI: Idx + ToByteSlice,
    EV: ToByteSlice,
    W: Write,
{
    let offsets = csr
        .offsets
        .iter()
        .map(|&offset| offset.index() as i64)
        .collect::<Vec<_>>();
    output.write_all(offsets.as_byte_slice())?;
    output.write_all(csr.targets.as_byte_slice())?;
    Ok(())
}

fn read_array<T, R>(read: &mut R, len: usize) -> Result<Vec<T>, Error>
where
    T: Copy + ToMutByteSlice,
    R: Read,
{
    let mut values = Vec::<T>::with_capacity(len);
    // SAFETY: the uninitialized prefix is fully overwritten by read_exact
    //         before set_len publishes it.
    let uninit = unsafe { std::slice::from_raw_parts_mut(values.as_mut_ptr(), len) };
    read.read_exact(uninit.as_mut_byte_slice())?;
    unsafe {
        values.set_len(len);
    }
    Ok(values)
}

fn read_csr<NI, EV, R>(read: &mut R, node_count: usize, edge_count: usize) -> Result<Csr<NI, NI, EV>, Error>
where
    NI: Idx,
    EV: Copy,
    Target<NI, EV>: ToMutByteSlice,
    R: Read,
{
    let offsets = read_array::<i64, _>(read, node_count + 1)?
        .into_iter()
        .map(|offset| Ok(NI::new(usize::try_from(offset)?)))
        .collect::<Result<Vec<_>, Error>>()?;
    let targets = read_array::<Target<NI, EV>, _>(read, edge_count)?;

    Ok(Csr::new(
        offsets.into_boxed_slice(),
        targets.into_boxed_slice(),
    ))
}

fn read_header<R: Read>(read: &mut R) -> Result<(bool, usize, usize), Error> {
    let mut directed = [0_u8; 1];
    read.read_exact(&mut directed)?;
    let meta = read_array::<i64, _>(read, 2)?;
    let edge_count = usize::try_from(meta[0])?;
    let node_count = usize::try_from(meta[1])?;
    Ok((directed[0] != 0, edge_count, node_count))
}

impl<W, NI, EV> SerializeGraphOp<W> for DirectedCsrGraph<NI, EV>
where
    W: Write,
    NI: Idx + ToByteSlice,
    EV: ToByteSlice,
{
    fn serialize(&self, mut output: W) -> Result<(), Error> {
        check_id_width::<NI>()?;
        let DirectedCsrGraph { csr_out, csr_inc } = self;

        output.write_all(&[1_u8])?;
        let meta = [
            csr_out.edge_count().index() as i64,
            csr_out.node_count().index() as i64,
        ];
        output.write_all(meta.as_byte_slice())?;

        write_csr(csr_out, &mut output)?;
        write_csr(csr_inc, &mut output)?;

        Ok(())
    }
}

impl<R, NI, EV> DeserializeGraphOp<R, Self> for DirectedCsrGraph<NI, EV>
where
    R: Read,
    NI: Idx,
    EV: Copy,
    Target<NI, EV>: ToMutByteSlice,
{
    fn deserialize(mut read: R) -> Result<Self, Error> {
        check_id_width::<NI>()?;
        let (directed, edge_count, node_count) = read_header(&mut read)?;
        if !directed {
            return Err(Error::InvalidOrientation {
                expected: "directed",
                actual: "undirected",
            });
        }
        let csr_out = read_csr(&mut read, node_count, edge_count)?;
        let csr_inc = read_csr(&mut read, node_count, edge_count)?;
        Ok(DirectedCsrGraph::new(csr_out, csr_inc))
    }
}

impl<W, NI, EV> SerializeGraphOp<W> for UndirectedCsrGraph<NI, EV>
where
    W: Write,
    NI: Idx + ToByteSlice,
    EV: ToByteSlice,
{
    fn serialize(&self, mut output: W) -> Result<(), Error> {
        check_id_width::<NI>()?;
        let UndirectedCsrGraph { csr } = self;

        output.write_all(&[0_u8])?;
        let meta = [
            csr.edge_count().index() as i64,
            csr.node_count().index() as i64,
        ];
        output.write_all(meta.as_byte_slice())?;

        write_csr(csr, &mut output)?;

        Ok(())
    }
}

impl<R, NI, EV> DeserializeGraphOp<R, Self> for UndirectedCsrGraph<NI, EV>
where
    R: Read,
    NI: Idx,
    EV: Copy,
    Target<NI, EV>: ToMutByteSlice,
{
    fn deserialize(mut read: R) -> Result<Self, Error> {
        check_id_width::<NI>()?;
        let (directed, edge_count, node_count) = read_header(&mut read)?;
        if directed {
            return Err(Error::InvalidOrientation {
                expected: "undirected",
                actual: "directed",
            });
        }
        let csr = read_csr(&mut read, node_count, edge_count)?;
        Ok(UndirectedCsrGraph::new(csr))
    }
}

impl<NI, EV> TryFrom<(PathBuf, CsrLayout)> for DirectedCsrGraph<NI, EV>
where
    NI: Idx,
    EV: Copy,
    Target<NI, EV>: ToMutByteSlice,
{
    type Error = Error;

    fn try_from((path, _): (PathBuf, CsrLayout)) -> Result<Self, Self::Error> {
        let reader = BufReader::new(File::open(path)?);
        DirectedCsrGraph::deserialize(reader)
    }
}

impl<NI, EV> TryFrom<(PathBuf, CsrLayout)> for UndirectedCsrGraph<NI, EV>
where
    NI: Idx,
    EV: Copy,
    Target<NI, EV>: ToMutByteSlice,
{
    type Error = Error;

    fn try_from((path, _): (PathBuf, CsrLayout)) -> Result<Self, Self::Error> {
        let reader = BufReader::new(File::open(path)?);
        UndirectedCsrGraph::deserialize(reader)
    }
}

fn prefix_sum_atomic<NI: Idx>(degrees: Vec<Atomic<NI>>) -> Vec<Atomic<NI>> {
    let len = degrees.len();

    let mut block_offsets = degrees
        .par_chunks(PREFIX_SUM_BLOCK_SIZE)
        .map(|block| block.iter().map(|d| d.load(Acquire)).sum::<NI>())
        .collect::<Vec<_>>();

    let mut total = NI::zero();
    for block_offset in block_offsets.iter_mut() {
        let offset = total;
        total += *block_offset;
        *block_offset = offset;
    }

    let mut sums = Vec::<Atomic<NI>>::with_capacity(len + 1);
    let sums_ptr = SharedMut::new(sums.as_mut_ptr());

    // SAFETY: the blocks write disjoint index ranges and every position
    //         below len + 1 is written exactly once.
    degrees
        .par_chunks(PREFIX_SUM_BLOCK_SIZE)
        .enumerate()
        .for_each(|(block, chunk)| {
            let mut running = block_offsets[block];
            let base = block * PREFIX_SUM_BLOCK_SIZE;
            for (i, degree) in chunk.iter().enumerate() {
                unsafe {
                    sums_ptr.add(base + i).write(Atomic::new(running));
                }
                running += degree.load(Acquire);
            }
        });

    unsafe {
        sums_ptr.add(len).write(Atomic::new(total));
        sums.set_len(len + 1);
    }

    sums
}

pub(crate) fn prefix_sum<NI: Idx>(degrees: Vec<NI>) -> Vec<NI> {
    let len = degrees.len();

    let mut block_offsets = degrees
        .par_chunks(PREFIX_SUM_BLOCK_SIZE)
        .map(|block| block.iter().copied().sum::<NI>())
        .collect::<Vec<_>>();

    let mut total = NI::zero();
    for block_offset in block_offsets.iter_mut() {
        let offset = total;
        total += *block_offset;
        *block_offset = offset;
    }

    let mut sums = Vec::<NI>::with_capacity(len + 1);
    let sums_ptr = SharedMut::new(sums.as_mut_ptr());

    // SAFETY: the blocks write disjoint index ranges and every position
    //         below len + 1 is written exactly once.
    degrees
        .par_chunks(PREFIX_SUM_BLOCK_SIZE)
        .enumerate()
        .for_each(|(block, chunk)| {
            let mut running = block_offsets[block];
            let base = block * PREFIX_SUM_BLOCK_SIZE;
            for (i, &degree) in chunk.iter().enumerate() {
                unsafe {
                    sums_ptr.add(base + i).write(running);
                }
                running += degree;
            }
        });

    unsafe {
        sums_ptr.add(len).write(total);
        sums.set_len(len + 1);
    }

    sums
}

pub(crate) fn sort_targets<NI, T, EV>(offsets: &[NI], targets: &mut [Target<T, EV>])
where
    NI: Idx,
    T: Copy + Send + Ord,
    EV: Send,
{
    to_mut_slices(offsets, targets)
        .par_iter_mut()
        .for_each(|list| list.sort_unstable());
}

// The squish pass: sorts every neighbor list, removes duplicate targets and
// self-loops and compacts the shortened lists into a fresh buffer.
fn squish_targets<NI, EV>(
    offsets: &[NI],
    targets: &mut [Target<NI, EV>],
) -> (Vec<NI>, Vec<Target<NI, EV>>)
where
    NI: Idx,
    EV: Copy + Send + Sync,
{
    let node_count = offsets.len() - 1;

    let mut new_degrees = Vec::with_capacity(node_count);
    let mut target_slices = to_mut_slices(offsets, targets);

    target_slices
        .par_iter_mut()
        .enumerate()
        .map(|(node, slice)| {
            slice.sort_unstable();
            let mut new_degree = 0;
            for i in 0..slice.len() {
                let candidate = slice[i];
                if candidate.target == NI::new(node) {
                    continue;
                }
                if new_degree > 0 && slice[new_degree - 1].target == candidate.target {
                    continue;
                }
                slice[new_degree] = candidate;
                new_degree += 1;
            }
            NI::new(new_degree)
        })
        .collect_into_vec(&mut new_degrees);

    let new_offsets = prefix_sum(new_degrees);
    debug_assert_eq!(new_offsets.len(), node_count + 1);

    let edge_count = new_offsets[node_count].index();
    let mut new_targets: Vec<Target<NI, EV>> = Vec::with_capacity(edge_count);
    let new_targets_ptr = SharedMut::new(new_targets.as_mut_ptr());

    target_slices
        .into_par_iter()
        .enumerate()
        .for_each(|(node, slice)| {
            let new_degree = (new_offsets[node + 1] - new_offsets[node]).index();
            // SAFETY: the prefix sum assigns each node a non-overlapping
            //         range in the new target buffer.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    slice.as_ptr(),
                    new_targets_ptr.add(new_offsets[node].index()),
                    new_degree,
                );
            }
        });

    // SAFETY: we copied all (potentially shortened) target lists from the
    //         old target buffer to the new one.
    unsafe {
        new_targets.set_len(edge_count);
    }

    (new_offsets, new_targets)
}

fn to_mut_slices<'targets, NI: Idx, T>(
    offsets: &[NI],
    targets: &'targets mut [T],
) -> Vec<&'targets mut [T]> {
    let node_count = offsets.len() - 1;
    let mut target_slices = Vec::with_capacity(node_count);
    let mut tail = targets;
    let mut prev_offset = offsets[0];

    for &offset in &offsets[1..] {
        let (list, remainder) = tail.split_at_mut((offset - prev_offset).index());
        target_slices.push(list);
        tail = remainder;
        prev_offset = offset;
    }

    target_slices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t<T>(target: T) -> Target<T, ()> {
        Target::new(target, ())
    }

    #[test]
    fn to_mut_slices_test() {
        let offsets = &[0, 2, 5, 5, 8];
        let targets = &mut [0, 1, 2, 3, 4, 5, 6, 7];
        let slices = to_mut_slices::<usize, usize>(offsets, targets);

        assert_eq!(
            slices,
            vec![vec![0, 1], vec![2, 3, 4], vec![], vec![5, 6, 7]]
        );
    }

    #[test]
    fn sort_targets_test() {
        let offsets = &[0, 2, 5, 5, 8];
        let mut targets = vec![t(1), t(0), t(4), t(2), t(3), t(5), t(6), t(7)];
        sort_targets::<usize, _, _>(offsets, &mut targets);

        assert_eq!(
            targets,
            vec![t(0), t(1), t(2), t(3), t(4), t(5), t(6), t(7)]
        );
    }

    #[test]
    fn squish_targets_test() {
        let offsets = &[0, 3, 7, 7, 10];
        // 0: [1, 1, 0]    => [1] (removed duplicate and self loop)
        // 1: [4, 2, 3, 2] => [2, 3, 4] (removed duplicate)
        let mut targets = vec![t(1), t(1), t(0), t(4), t(2), t(3), t(2), t(5), t(6), t(7)];
        let (offsets, targets) = squish_targets::<usize, _>(offsets, &mut targets);

        assert_eq!(offsets, vec![0, 1, 4, 4, 7]);
        assert_eq!(targets, vec![t(1), t(2), t(3), t(4), t(5), t(6), t(7)]);
    }

    #[test]
    fn prefix_sum_test() {
        let degrees = vec![42, 0, 1337, 4, 2, 0];
        let prefix_sum = prefix_sum::<usize>(degrees);

        assert_eq!(prefix_sum, vec![0, 42, 42, 1379, 1383, 1385, 1385]);
    }

    #[test]
    fn prefix_sum_empty_test() {
        assert_eq!(prefix_sum::<usize>(vec![]), vec![0]);
    }

    #[test]
    fn prefix_sum_atomic_test() {
        use std::sync::atomic::Ordering::SeqCst;

        let degrees = vec![42, 0, 1337, 4, 2, 0]
            .into_iter()
            .map(Atomic::<usize>::new)
            .collect::<Vec<_>>();

        let prefix_sum = prefix_sum_atomic(degrees)
            .into_iter()
            .map(|n| n.load(SeqCst))
            .collect::<Vec<_>>();

        assert_eq!(prefix_sum, vec![0, 42, 42, 1379, 1383, 1385, 1385]);
    }

    #[test]
    fn into_flat_targets_test() {
        let pairs: Vec<(u32, u32, ())> = vec![(0, 1, ()), (2, 3, ()), (4, 5, ())];
        let flat = into_flat_targets(pairs);

        assert_eq!(flat, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn insert_missing_inverses_test() {
        // 0 -> [1, 2], 1 -> [], 2 -> [1]
        let offsets: Vec<u32> = vec![0, 2, 2, 3];
        let flat: Vec<u32> = vec![1, 2, 1];

        let (offsets, flat) = insert_missing_inverses(offsets, flat, 3);

        // 0 -> [1, 2], 1 -> [0, 2], 2 -> [0, 1]
        assert_eq!(offsets, vec![0, 2, 4, 6]);
        assert_eq!(flat, vec![1, 2, 0, 2, 0, 1]);
    }
}
