use gravel_builder::prelude::*;

fn assert_csr_invariants<NI: Idx, G>(graph: &G)
where
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI>,
{
    let node_count = graph.node_count().index();
    for u in 0..node_count {
        let u = NI::new(u);
        let neighbors = graph.out_neighbors(u).copied().collect::<Vec<_>>();
        assert_eq!(neighbors.len(), graph.out_degree(u).index());
        assert!(neighbors.windows(2).all(|w| w[0] < w[1]), "not strictly ascending");
        assert!(!neighbors.contains(&u), "self loop survived");
    }
}

#[test]
fn directed_graph_from_edges() {
    let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 1)])
        .build();

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 6);
    assert!(graph.directed());

    assert_eq!(graph.out_neighbors(0).as_slice(), &[1, 2]);
    assert_eq!(graph.out_neighbors(1).as_slice(), &[2, 3]);
    assert_eq!(graph.in_neighbors(1).as_slice(), &[0, 3]);
    assert_eq!(graph.in_neighbors(3).as_slice(), &[1, 2]);

    assert_csr_invariants(&graph);
}

#[test]
fn undirected_graph_from_edges() {
    let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
        .build();

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 5);
    assert!(!graph.directed());

    assert_eq!(graph.neighbors(0).as_slice(), &[1, 2]);
    assert_eq!(graph.neighbors(1).as_slice(), &[0, 2, 3]);
    assert_eq!(graph.neighbors(2).as_slice(), &[0, 1, 3]);
    assert_eq!(graph.neighbors(3).as_slice(), &[1, 2]);
}

#[test]
fn deduplicated_layout_removes_loops_and_duplicates() {
    let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(vec![(0, 0), (0, 1), (0, 1), (1, 2), (2, 2), (1, 2), (2, 0)])
        .build();

    assert_eq!(graph.out_neighbors(0).as_slice(), &[1]);
    assert_eq!(graph.out_neighbors(1).as_slice(), &[2]);
    assert_eq!(graph.out_neighbors(2).as_slice(), &[0]);

    assert_csr_invariants(&graph);
}

#[test]
fn undirected_symmetry() {
    let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(vec![(0, 1), (2, 0), (1, 3), (3, 2)])
        .build();

    for u in 0..graph.node_count() {
        for &v in graph.neighbors(u) {
            assert!(
                graph.neighbors(v).any(|&w| w == u),
                "missing inverse of ({u}, {v})"
            );
        }
    }
}

#[test]
fn in_place_build_matches_copying_build() {
    let edges = vec![(0, 1), (1, 0), (0, 0), (2, 1), (2, 1), (4, 3), (1, 4)];

    let copying: DirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(edges.clone())
        .build();

    let in_place: DirectedCsrGraph<u32> = GraphBuilder::new().edges(edges).build_in_place();

    assert_eq!(copying.node_count(), in_place.node_count());
    assert_eq!(copying.edge_count(), in_place.edge_count());

    for u in 0..copying.node_count() {
        assert_eq!(
            copying.out_neighbors(u).as_slice(),
            in_place.out_neighbors(u).as_slice()
        );
        assert_eq!(
            copying.in_neighbors(u).as_slice(),
            in_place.in_neighbors(u).as_slice()
        );
    }
}

#[test]
fn in_place_symmetrization_matches_copying_build() {
    let edges = vec![(0, 1), (1, 0), (0, 0), (2, 1), (2, 1), (4, 3), (1, 4), (3, 4)];

    let copying: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(edges.clone())
        .build();

    let in_place: UndirectedCsrGraph<u32> = GraphBuilder::new().edges(edges).build_in_place();

    assert_eq!(copying.node_count(), in_place.node_count());
    assert_eq!(copying.edge_count(), in_place.edge_count());

    for u in 0..copying.node_count() {
        assert_eq!(in_place.neighbors(u).as_slice(), copying.neighbors(u).as_slice());
    }
}

#[test]
fn in_place_symmetrization_of_generated_graph() {
    let copying: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edge_list(rmat_edge_list(8, 8))
        .build();

    let in_place: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .edge_list(rmat_edge_list(8, 8))
        .build_in_place();

    assert_eq!(copying.node_count(), in_place.node_count());
    assert_eq!(copying.edge_count(), in_place.edge_count());

    for u in 0..copying.node_count() {
        assert_eq!(in_place.neighbors(u).as_slice(), copying.neighbors(u).as_slice());
    }
}

#[test]
fn weighted_graph_from_edges() {
    let graph: DirectedCsrGraph<u32, u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Sorted)
        .edges_with_values(vec![(0, 1, 4), (0, 2, 2), (1, 2, 5), (2, 1, 1)])
        .build();

    assert_eq!(
        graph.out_neighbors_with_values(0).as_slice(),
        &[Target::new(1, 4), Target::new(2, 2)]
    );
    assert_eq!(
        graph.in_neighbors_with_values(2).as_slice(),
        &[Target::new(0, 2), Target::new(1, 5)]
    );
}

#[test]
fn empty_graph() {
    let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(Vec::<(u32, u32)>::new())
        .build();

    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn serialize_directed_graph_roundtrip() {
    use std::io::{Seek, SeekFrom};

    let mut file = tempfile::tempfile().unwrap();

    let g0: DirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 1)])
        .build();

    g0.serialize(&file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let g1 = DirectedCsrGraph::<u32>::deserialize(file).unwrap();

    assert_eq!(g0.node_count(), g1.node_count());
    assert_eq!(g0.edge_count(), g1.edge_count());

    for u in 0..g0.node_count() {
        assert_eq!(g0.out_neighbors(u).as_slice(), g1.out_neighbors(u).as_slice());
        assert_eq!(g0.in_neighbors(u).as_slice(), g1.in_neighbors(u).as_slice());
    }
}

#[test]
fn serialize_undirected_graph_roundtrip() {
    use std::io::{Seek, SeekFrom};

    let mut file = tempfile::tempfile().unwrap();

    let g0: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 1)])
        .build();

    g0.serialize(&file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let g1 = UndirectedCsrGraph::<u32>::deserialize(file).unwrap();

    assert_eq!(g0.node_count(), g1.node_count());
    assert_eq!(g0.edge_count(), g1.edge_count());

    for u in 0..g0.node_count() {
        assert_eq!(g0.neighbors(u).as_slice(), g1.neighbors(u).as_slice());
    }
}

#[test]
fn serialize_weighted_graph_roundtrip() {
    use std::io::{Seek, SeekFrom};

    let mut file = tempfile::tempfile().unwrap();

    let g0: DirectedCsrGraph<u32, u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Sorted)
        .edges_with_values(vec![(0, 1, 4), (0, 2, 2), (1, 2, 5), (2, 0, 7)])
        .build();

    g0.serialize(&file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let g1 = DirectedCsrGraph::<u32, u32>::deserialize(file).unwrap();

    for u in 0..g0.node_count() {
        assert_eq!(
            g0.out_neighbors_with_values(u).as_slice(),
            g1.out_neighbors_with_values(u).as_slice()
        );
    }
}

#[test]
fn deserialize_with_wrong_orientation_fails() {
    use std::io::{Seek, SeekFrom};

    let mut file = tempfile::tempfile().unwrap();

    let g0: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .edges(vec![(0, 1), (1, 2)])
        .build();

    g0.serialize(&file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let result = DirectedCsrGraph::<u32>::deserialize(file);
    assert!(matches!(result, Err(Error::InvalidOrientation { .. })));
}

#[test]
fn deserialize_with_wrong_id_size_fails() {
    use std::io::{Seek, SeekFrom};

    let mut file = tempfile::tempfile().unwrap();

    let g0: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .edges(vec![(0, 1), (1, 2)])
        .build();

    g0.serialize(&file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let result = UndirectedCsrGraph::<usize>::deserialize(file);
    assert!(matches!(result, Err(Error::InvalidIdSize { .. })));
}
