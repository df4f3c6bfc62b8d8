use gravel::prelude::*;
use gravel::verify;

fn edgeless_graph() -> UndirectedCsrGraph<u32> {
    GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edge_list(EdgeList::with_max_node_id(vec![], 3))
        .build()
}

fn weighted_edgeless_graph() -> UndirectedCsrGraph<u32, u32> {
    GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edge_list(EdgeList::with_max_node_id(vec![], 3))
        .build()
}

#[test]
fn bfs_on_edgeless_graph() {
    let graph = edgeless_graph();

    let parent = bfs(&graph, 0, BfsConfig::default());

    assert_eq!(parent, vec![Some(0), None, None, None]);
}

#[test]
fn sssp_on_edgeless_graph() {
    let graph = weighted_edgeless_graph();

    let distances = delta_stepping(&graph, DeltaSteppingConfig::new(0, 1));

    assert_eq!(
        distances,
        vec![
            0,
            INFINITE_DISTANCE,
            INFINITE_DISTANCE,
            INFINITE_DISTANCE
        ]
    );
}

#[test]
fn page_rank_on_edgeless_graph() {
    let graph = edgeless_graph();

    let (scores, _, _) = page_rank(&graph, PageRankConfig::default());

    // no incoming contributions, every node keeps the base score
    let base = (1.0 - 0.85) / 4.0;
    assert!(scores.iter().all(|&score| (score - base).abs() < 1e-6));
}

#[test]
fn cc_on_edgeless_graph() {
    let graph = edgeless_graph();

    let components = afforest(&graph, AfforestConfig::default());

    assert_eq!(components.count(), 4);
}

#[test]
fn bc_on_edgeless_graph() {
    let graph = edgeless_graph();

    let scores = betweenness(&graph, BetweennessConfig::default());

    assert_eq!(scores, vec![0.0; 4]);
}

#[test]
fn tc_on_edgeless_graph() {
    let graph = edgeless_graph();

    assert_eq!(global_triangle_count(&graph), 0);
}

#[test]
fn kernels_agree_on_a_generated_graph() {
    let graph: UndirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edge_list(rmat_edge_list(8, 8))
        .build();

    let parent = bfs(&graph, 0, BfsConfig::default());
    assert!(verify::verify_bfs_tree(&graph, 0, &parent));

    let components = afforest(&graph, AfforestConfig::default()).to_vec();
    assert!(verify::verify_components(&graph, &components));

    assert_eq!(
        global_triangle_count(&graph),
        verify::count_triangles_naive(&graph)
    );
}

#[test]
fn weighted_kernels_agree_on_a_generated_graph() {
    let mut edges = rmat_edge_list::<u32, u32>(8, 8);
    insert_weights(&mut edges);

    let graph: UndirectedCsrGraph<u32, u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edge_list(edges)
        .build();

    let distances = delta_stepping(&graph, DeltaSteppingConfig::new(0, 4));
    assert!(verify::verify_sssp(&graph, 0, &distances));
}
