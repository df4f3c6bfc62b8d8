use gravel::prelude::*;
use gravel_app::*;

fn main() {
    env_logger::init();

    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains("-h") {
        print_usage_and_exit("bfs", "");
    }
    let args = CommonArgs::parse(&mut pargs).unwrap_or_else(|error| exit_usage(error));
    if !pargs.finish().is_empty() {
        exit_usage("unexpected trailing arguments");
    }

    if args.symmetrize {
        let graph = build_undirected(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        run(&graph, &args);
    } else {
        let graph = build_directed(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        run(&graph, &args);
    }
}

fn run<G>(graph: &G, args: &CommonArgs)
where
    G: Graph<u32> + DirectedDegrees<u32> + DirectedNeighbors<u32> + EdgeSlots<u32> + Sync,
{
    let mut picker = SourcePicker::new(graph, args.start_node);

    benchmark_kernel(
        args.trials,
        |_| {
            let source = picker.pick();
            (source, bfs(graph, source, BfsConfig::default()))
        },
        |(source, parent)| {
            if args.analysis {
                let reached = parent.iter().filter(|p| p.is_some()).count();
                println!("BFS tree from source {source} reached {reached} nodes");
                let ok = gravel::verify::verify_bfs_tree(graph, source, &parent);
                println!("Verification: {}", if ok { "PASS" } else { "FAIL" });
            }
        },
    );
}
