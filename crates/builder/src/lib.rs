//! Building blocks for parallel graph kernels.
//!
//! The crate provides a Compressed-Sparse-Row (CSR) graph representation for
//! directed and undirected graphs, a parallel builder that turns edge lists
//! into CSR graphs, deterministic synthetic graph generators and readers for
//! common text and binary graph formats. All construction steps are
//! parallelized with [rayon](https://github.com/rayon-rs/rayon).
//!
//! # What is a graph?
//!
//! A graph consists of nodes and edges where edges connect exactly two nodes.
//! A graph can be either directed, i.e., an edge has a source and a target
//! node, or undirected where there is no such distinction.
//!
//! In a directed graph, each node `u` has outgoing and incoming neighbors. An
//! outgoing neighbor of node `u` is any node `v` for which an edge `(u, v)`
//! exists. An incoming neighbor of node `u` is any node `v` for which an edge
//! `(v, u)` exists.
//!
//! # How to build a graph
//!
//! The library provides a builder that can be used to construct a graph from
//! a given list of edges.
//!
//! ```
//! use gravel_builder::prelude::*;
//!
//! let graph: DirectedCsrGraph<usize> = GraphBuilder::new()
//!     .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
//!     .build();
//!
//! assert_eq!(graph.node_count(), 4);
//! assert_eq!(graph.edge_count(), 5);
//!
//! assert_eq!(graph.out_degree(1), 2);
//! assert_eq!(graph.in_degree(1), 1);
//!
//! assert_eq!(graph.out_neighbors(1).as_slice(), &[2, 3]);
//! assert_eq!(graph.in_neighbors(1).as_slice(), &[0]);
//! ```
//!
//! To build an undirected graph, only the expected type changes. Undirected
//! graphs store each edge in the neighbor list of both endpoints.
//!
//! ```
//! use gravel_builder::prelude::*;
//!
//! let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
//!     .csr_layout(CsrLayout::Sorted)
//!     .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
//!     .build();
//!
//! assert_eq!(graph.node_count(), 4);
//! assert_eq!(graph.edge_count(), 5);
//!
//! assert_eq!(graph.degree(1), 3);
//!
//! assert_eq!(graph.neighbors(1).as_slice(), &[0, 2, 3]);
//! ```

pub mod bitmap;
pub mod builder;
pub mod graph;
pub mod graph_ops;
pub mod index;
pub mod input;
pub mod prelude;
pub mod pvec;
pub mod queue;

pub use crate::builder::GraphBuilder;
pub use crate::graph::csr::CsrLayout;
pub use crate::graph::csr::DirectedCsrGraph;
pub use crate::graph::csr::UndirectedCsrGraph;

use std::convert::Infallible;

use crate::graph::csr::Target;
use crate::index::Idx;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error while loading graph")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("incompatible index type")]
    IdxError {
        #[from]
        source: std::num::TryFromIntError,
    },
    #[error("malformed input: {message}")]
    InvalidInput { message: String },
    #[error("invalid id size, expected {expected} bytes, got {actual} bytes")]
    InvalidIdSize { expected: usize, actual: usize },
    #[error("expected a {expected} graph, got a {actual} graph")]
    InvalidOrientation {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("could not allocate {bytes} bytes")]
    Allocation { bytes: usize },
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

/// A graph is a tuple `(N, E)`, where `N` is a set of nodes and `E` a set of
/// edges. Each edge connects exactly two nodes.
///
/// `Graph` is parameterized over the node index type `NI` which is used to
/// uniquely identify a node. An edge is a tuple of node identifiers.
pub trait Graph<NI: Idx> {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> NI;

    /// Returns the number of edges in the graph. For directed graphs this is
    /// the number of directed edges, for undirected graphs the number of
    /// undirected node pairs.
    fn edge_count(&self) -> NI;

    /// Returns `true` if edges distinguish between source and target node.
    fn directed(&self) -> bool;
}

pub trait UndirectedDegrees<NI: Idx> {
    /// Returns the number of edges connected to the given node.
    fn degree(&self, node: NI) -> NI;
}

/// Returns the neighbors of a given node.
///
/// The edge `(42, 1337)` is equivalent to the edge `(1337, 42)`.
pub trait UndirectedNeighbors<NI: Idx> {
    type NeighborsIterator<'a>: Iterator<Item = &'a NI>
    where
        Self: 'a;

    /// Returns an iterator of all nodes connected to the given node.
    fn neighbors(&self, node: NI) -> Self::NeighborsIterator<'_>;
}

/// Returns the neighbors of a given node together with the value of the
/// connecting edge.
pub trait UndirectedNeighborsWithValues<NI: Idx, EV> {
    type NeighborsIterator<'a>: Iterator<Item = &'a Target<NI, EV>>
    where
        Self: 'a,
        EV: 'a;

    /// Returns an iterator of all nodes connected to the given node
    /// including the value of the connecting edge.
    fn neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_>;
}

pub trait DirectedDegrees<NI: Idx> {
    /// Returns the number of edges where the given node is a source node.
    fn out_degree(&self, node: NI) -> NI;

    /// Returns the number of edges where the given node is a target node.
    fn in_degree(&self, node: NI) -> NI;
}

/// Returns the neighbors of a given node either in outgoing or incoming
/// direction.
///
/// An edge tuple `e = (u, v)` has a source node `u` and a target node `v`.
/// From the perspective of `u`, the edge `e` is an **outgoing** edge. From
/// the perspective of node `v`, the edge `e` is an **incoming** edge.
///
/// Undirected graphs also implement this trait; for them outgoing and
/// incoming neighbors are the same set, which allows pull-style kernels to
/// run on both orientations.
pub trait DirectedNeighbors<NI: Idx> {
    type NeighborsIterator<'a>: Iterator<Item = &'a NI>
    where
        Self: 'a;

    /// Returns an iterator of all nodes which are connected in outgoing
    /// direction to the given node.
    fn out_neighbors(&self, node: NI) -> Self::NeighborsIterator<'_>;

    /// Returns an iterator of all nodes which are connected in incoming
    /// direction to the given node.
    fn in_neighbors(&self, node: NI) -> Self::NeighborsIterator<'_>;
}

/// Like [`DirectedNeighbors`], but each neighbor is returned together with
/// the value of the connecting edge.
pub trait DirectedNeighborsWithValues<NI: Idx, EV> {
    type NeighborsIterator<'a>: Iterator<Item = &'a Target<NI, EV>>
    where
        Self: 'a,
        EV: 'a;

    /// Returns an iterator of all nodes which are connected in outgoing
    /// direction to the given node, including the edge value.
    fn out_neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_>;

    /// Returns an iterator of all nodes which are connected in incoming
    /// direction to the given node, including the edge value.
    fn in_neighbors_with_values(&self, node: NI) -> Self::NeighborsIterator<'_>;
}

/// Exposes the layout of the flat outgoing target array.
///
/// Kernels that attach per-edge state to a graph, such as the successor
/// bitmap in betweenness centrality, address an edge by the absolute index
/// of its target slot within the contiguous target storage.
pub trait EdgeSlots<NI: Idx> {
    /// The total number of target slots in the outgoing adjacency storage.
    /// For undirected graphs this is twice the edge count.
    fn out_slot_count(&self) -> NI;

    /// The index of the first target slot of the given node.
    fn out_slot_offset(&self, node: NI) -> NI;
}

#[repr(transparent)]
pub struct SharedMut<T>(*mut T);
unsafe impl<T: Send> Send for SharedMut<T> {}
unsafe impl<T: Sync> Sync for SharedMut<T> {}

impl<T> SharedMut<T> {
    pub fn new(ptr: *mut T) -> Self {
        SharedMut(ptr)
    }

    delegate::delegate! {
        to self.0 {
            /// # Safety
            ///
            /// Ensure that `count` does not exceed the capacity of the
            /// underlying buffer.
            pub unsafe fn add(&self, count: usize) -> *mut T;
        }
    }
}
