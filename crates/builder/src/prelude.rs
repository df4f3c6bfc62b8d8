pub use crate::builder::GraphBuilder;
pub use crate::builder::InPlaceGraph;

pub use crate::graph::csr::CsrLayout;
pub use crate::graph::csr::DirectedCsrGraph;
pub use crate::graph::csr::Target;
pub use crate::graph::csr::UndirectedCsrGraph;

pub use crate::graph_ops::DeserializeGraphOp;
pub use crate::graph_ops::RelabelByDegreeOp;
pub use crate::graph_ops::SerializeGraphOp;

pub use crate::bitmap::Bitmap;
pub use crate::pvec::ParVec;
pub use crate::queue::QueueBuffer;
pub use crate::queue::SlidingQueue;

pub use crate::index::Idx;
pub use atomic::Atomic;

pub use crate::input::*;

pub use crate::DirectedDegrees;
pub use crate::DirectedNeighbors;
pub use crate::DirectedNeighborsWithValues;
pub use crate::EdgeSlots;
pub use crate::Graph;
pub use crate::SharedMut;
pub use crate::UndirectedDegrees;
pub use crate::UndirectedNeighbors;
pub use crate::UndirectedNeighborsWithValues;

pub use crate::Error;
