pub use gravel_builder::prelude::*;

pub use crate::bc::betweenness;
pub use crate::bc::BetweennessConfig;
pub use crate::bfs::bfs;
pub use crate::bfs::BfsConfig;
pub use crate::cc::afforest;
pub use crate::cc::AfforestConfig;
pub use crate::cc::Components;
pub use crate::page_rank::page_rank;
pub use crate::page_rank::PageRankConfig;
pub use crate::sssp::delta_stepping;
pub use crate::sssp::DeltaSteppingConfig;
pub use crate::sssp::INFINITE_DISTANCE;
pub use crate::triangle_count::global_triangle_count;
pub use crate::triangle_count::relabel_graph;
pub use crate::triangle_count::worth_relabeling;
