use std::{convert::TryFrom, fs::File, marker::PhantomData, path::Path};

use log::info;

use crate::graph::csr::CsrLayout;
use crate::index::Idx;
use crate::{DirectedCsrGraph, Error, UndirectedCsrGraph};

use super::{EdgeList, InputCapabilities, InputPath, ParseValue};

/// Reads a graph from a DIMACS shortest-path challenge file.
///
/// Arc descriptor lines start with `a` and carry two 1-indexed node ids and
/// an edge weight. All other lines (comments and the problem line) are
/// ignored.
///
/// # Example
///
/// ```ignore
/// > cat my_graph.gr
/// c example graph
/// p sp 4 3
/// a 1 2 42
/// a 2 3 1337
/// a 3 4 7
/// ```
pub struct DimacsInput<NI: Idx, EV = u32> {
    _idx: PhantomData<(NI, EV)>,
}

impl<NI: Idx, EV> Default for DimacsInput<NI, EV> {
    fn default() -> Self {
        Self { _idx: PhantomData }
    }
}

impl<NI: Idx, EV> InputCapabilities<NI> for DimacsInput<NI, EV> {
    type GraphInput = Dimacs<NI, EV>;
}

/// The edge list read from the arc lines of a DIMACS `.gr` file.
pub struct Dimacs<NI: Idx, EV>(pub EdgeList<NI, EV>);

impl<NI, P, EV> TryFrom<InputPath<P>> for Dimacs<NI, EV>
where
    P: AsRef<Path>,
    NI: Idx,
    EV: ParseValue + Send + Sync,
{
    type Error = Error;

    fn try_from(path: InputPath<P>) -> Result<Self, Self::Error> {
        let file = File::open(path.0.as_ref())?;
        let mmap = unsafe { memmap2::MmapOptions::new().populate().map(&file)? };
        Ok(Dimacs(parse_dimacs_bytes(mmap.as_ref())?))
    }
}

impl<NI, EV> From<(Dimacs<NI, EV>, CsrLayout)> for DirectedCsrGraph<NI, EV>
where
    NI: Idx,
    EV: Copy + Send + Sync,
{
    fn from((dimacs, csr_layout): (Dimacs<NI, EV>, CsrLayout)) -> Self {
        DirectedCsrGraph::from((dimacs.0, csr_layout))
    }
}

impl<NI, EV> From<(Dimacs<NI, EV>, CsrLayout)> for UndirectedCsrGraph<NI, EV>
where
    NI: Idx,
    EV: Copy + Send + Sync,
{
    fn from((dimacs, csr_layout): (Dimacs<NI, EV>, CsrLayout)) -> Self {
        UndirectedCsrGraph::from((dimacs.0, csr_layout))
    }
}

fn parse_dimacs_bytes<NI, EV>(bytes: &[u8]) -> Result<EdgeList<NI, EV>, Error>
where
    NI: Idx,
    EV: ParseValue + Send + Sync,
{
    let start = std::time::Instant::now();
    let mut edges = Vec::new();
    let mut declared_nodes: Option<NI> = None;

    for line in bytes.split(|&b| b == b'\n') {
        // problem line: `p sp <nodes> <arcs>`; nodes without arcs only
        // exist through the declared node count
        if let Some(problem) = line.strip_prefix(b"p ") {
            let Some(digits) = problem.iter().position(|b| b.is_ascii_digit()) else {
                return Err(Error::InvalidInput {
                    message: "malformed problem line".to_string(),
                });
            };
            declared_nodes = Some(NI::parse(&problem[digits..]).0);
            continue;
        }

        let Some(line) = line.strip_prefix(b"a ") else {
            continue;
        };

        let (source, source_bytes) = NI::parse(line);
        if source_bytes == 0 || source_bytes == line.len() {
            return Err(Error::InvalidInput {
                message: "malformed arc descriptor".to_string(),
            });
        }
        let line = &line[source_bytes + 1..];

        let (target, target_bytes) = NI::parse(line);
        if target_bytes == 0 {
            return Err(Error::InvalidInput {
                message: "malformed arc descriptor".to_string(),
            });
        }
        let line = &line[target_bytes..];

        let value = match line.strip_prefix(b" ") {
            Some(value_bytes) => EV::parse(value_bytes).0,
            None => EV::parse(&[]).0,
        };

        if source == NI::zero() || target == NI::zero() {
            return Err(Error::InvalidInput {
                message: "DIMACS node ids are 1-indexed".to_string(),
            });
        }
        if let Some(nodes) = declared_nodes {
            if source > nodes || target > nodes {
                return Err(Error::InvalidInput {
                    message: "arc endpoint exceeds the declared node count".to_string(),
                });
            }
        }

        // node ids are shifted into the zero-based range
        edges.push((source - NI::new(1), target - NI::new(1), value));
    }

    info!("Read {} arcs in {:?}", edges.len(), start.elapsed());

    Ok(match declared_nodes {
        Some(nodes) if nodes > NI::zero() => {
            EdgeList::with_max_node_id(edges, nodes - NI::new(1))
        }
        _ => EdgeList::new(edges),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::edgelist::Edges;

    #[test]
    fn parse_arcs_and_ignore_comments() {
        let bytes = "c a comment\np sp 4 3\na 1 2 42\na 2 3 1337\na 3 4 7\n".as_bytes();

        let edge_list = parse_dimacs_bytes::<u32, u32>(bytes).unwrap();

        assert_eq!(edge_list.max_node_id(), 3);
        assert_eq!(
            edge_list.into_vec(),
            vec![(0, 1, 42), (1, 2, 1337), (2, 3, 7)]
        );
    }

    #[test]
    fn declared_node_count_keeps_isolated_nodes() {
        let bytes = "p sp 5 2\na 1 2 42\na 2 3 7\n".as_bytes();

        let edge_list = parse_dimacs_bytes::<u32, u32>(bytes).unwrap();

        assert_eq!(edge_list.max_node_id(), 4);
        assert_eq!(edge_list.len(), 2);
    }

    #[test]
    fn reject_zero_node_ids() {
        let bytes = "a 0 1 3\n".as_bytes();

        assert!(parse_dimacs_bytes::<u32, u32>(bytes).is_err());
    }

    #[test]
    fn reject_arcs_beyond_the_declared_node_count() {
        let bytes = "p sp 2 1\na 1 3 5\n".as_bytes();

        assert!(parse_dimacs_bytes::<u32, u32>(bytes).is_err());
    }

    #[test]
    fn weights_are_optional_for_unweighted_lists() {
        let bytes = "a 1 2 42\na 2 3 1337\n".as_bytes();

        let edge_list = parse_dimacs_bytes::<u32, ()>(bytes).unwrap();

        assert_eq!(edge_list.into_vec(), vec![(0, 1, ()), (1, 2, ())]);
    }
}
