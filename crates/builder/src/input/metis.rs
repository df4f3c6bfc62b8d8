use std::{convert::TryFrom, fs::File, marker::PhantomData, path::Path};

use log::info;

use crate::graph::csr::CsrLayout;
use crate::index::Idx;
use crate::{DirectedCsrGraph, Error, UndirectedCsrGraph};

use super::{EdgeList, InputCapabilities, InputPath};

/// Reads a graph from a Metis-style adjacency file.
///
/// The first non-comment line holds the node and edge counts. Line `i + 1`
/// lists the 1-indexed neighbors of node `i`. Comment lines start with `%`.
/// Since Metis files list every edge in the lines of both endpoints, the
/// parsed edge list already contains each edge in both directions.
///
/// # Example
///
/// ```ignore
/// > cat my_graph.graph
/// 4 4
/// 2 3
/// 1 3
/// 1 2 4
/// 3
/// ```
pub struct MetisInput<NI: Idx> {
    _idx: PhantomData<NI>,
}

impl<NI: Idx> Default for MetisInput<NI> {
    fn default() -> Self {
        Self { _idx: PhantomData }
    }
}

impl<NI: Idx> InputCapabilities<NI> for MetisInput<NI> {
    type GraphInput = Metis<NI>;
}

/// The edge list read from a Metis adjacency file.
pub struct Metis<NI: Idx>(pub EdgeList<NI, ()>);

impl<NI, P> TryFrom<InputPath<P>> for Metis<NI>
where
    P: AsRef<Path>,
    NI: Idx,
{
    type Error = Error;

    fn try_from(path: InputPath<P>) -> Result<Self, Self::Error> {
        let file = File::open(path.0.as_ref())?;
        let mmap = unsafe { memmap2::MmapOptions::new().populate().map(&file)? };
        Ok(Metis(parse_metis_bytes(mmap.as_ref())?))
    }
}

impl<NI: Idx> From<(Metis<NI>, CsrLayout)> for DirectedCsrGraph<NI> {
    fn from((metis, csr_layout): (Metis<NI>, CsrLayout)) -> Self {
        DirectedCsrGraph::from((metis.0, csr_layout))
    }
}

impl<NI: Idx> From<(Metis<NI>, CsrLayout)> for UndirectedCsrGraph<NI> {
    fn from((metis, csr_layout): (Metis<NI>, CsrLayout)) -> Self {
        UndirectedCsrGraph::from((metis.0, csr_layout))
    }
}

fn parse_metis_bytes<NI: Idx>(bytes: &[u8]) -> Result<EdgeList<NI, ()>, Error> {
    let start = std::time::Instant::now();

    let mut lines = bytes
        .split(|&b| b == b'\n')
        .filter(|line| !line.starts_with(b"%"));

    let header = lines.next().ok_or_else(|| Error::InvalidInput {
        message: "missing header line".to_string(),
    })?;
    let (node_count, header_bytes) = NI::parse(header);
    if header_bytes == 0 {
        return Err(Error::InvalidInput {
            message: "malformed header line".to_string(),
        });
    }

    let mut edges = Vec::new();

    for u in 0..node_count.index() {
        let mut line = lines.next().ok_or_else(|| Error::InvalidInput {
            message: format!("missing adjacency line for node {u}"),
        })?;

        while !line.is_empty() {
            let (neighbor, neighbor_bytes) = NI::parse(line);
            if neighbor_bytes == 0 {
                break;
            }
            if neighbor == NI::zero() || neighbor > node_count {
                return Err(Error::InvalidInput {
                    message: format!("neighbor id out of range for node {u}"),
                });
            }
            // neighbor ids are 1-indexed
            edges.push((NI::new(u), neighbor - NI::new(1), ()));
            line = line[neighbor_bytes..]
                .strip_prefix(b" ")
                .unwrap_or(&line[neighbor_bytes..]);
        }
    }

    info!(
        "Read {} adjacency entries in {:?}",
        edges.len(),
        start.elapsed()
    );

    let max_node_id = if node_count == NI::zero() {
        NI::zero()
    } else {
        node_count - NI::new(1)
    };

    Ok(EdgeList::with_max_node_id(edges, max_node_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::edgelist::Edges;

    #[test]
    fn parse_adjacency_lines() {
        let bytes = "% a comment\n4 4\n2 3\n1 3\n1 2 4\n3\n".as_bytes();

        let edge_list = parse_metis_bytes::<u32>(bytes).unwrap();

        assert_eq!(edge_list.max_node_id(), 3);
        assert_eq!(
            edge_list.into_vec(),
            vec![
                (0, 1, ()),
                (0, 2, ()),
                (1, 0, ()),
                (1, 2, ()),
                (2, 0, ()),
                (2, 1, ()),
                (2, 3, ()),
                (3, 2, ()),
            ]
        );
    }

    #[test]
    fn empty_adjacency_lines_are_isolated_nodes() {
        let bytes = "3 1\n2\n1\n\n".as_bytes();

        let edge_list = parse_metis_bytes::<u32>(bytes).unwrap();

        assert_eq!(edge_list.max_node_id(), 2);
        assert_eq!(edge_list.into_vec(), vec![(0, 1, ()), (1, 0, ())]);
    }

    #[test]
    fn missing_lines_are_rejected() {
        let bytes = "3 1\n2\n".as_bytes();

        assert!(parse_metis_bytes::<u32>(bytes).is_err());
    }

    #[test]
    fn empty_header_parses_without_nodes() {
        let bytes = "0 0\n".as_bytes();

        let edge_list = parse_metis_bytes::<u32>(bytes).unwrap();

        assert_eq!(edge_list.len(), 0);
    }
}
