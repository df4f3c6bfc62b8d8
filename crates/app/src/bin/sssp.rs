use gravel::prelude::*;
use gravel_app::*;

fn main() {
    env_logger::init();

    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains("-h") {
        print_usage_and_exit("sssp", " -d <delta>: bucket width (default 1)");
    }
    let delta: u32 = pargs
        .opt_value_from_str("-d")
        .unwrap_or_else(|error| exit_usage(error))
        .unwrap_or(1);
    if delta == 0 {
        exit_usage("delta must be positive");
    }
    let args = CommonArgs::parse(&mut pargs).unwrap_or_else(|error| exit_usage(error));
    if !pargs.finish().is_empty() {
        exit_usage("unexpected trailing arguments");
    }

    if args.symmetrize {
        let graph = build_weighted_undirected(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        run(&graph, &args, delta);
    } else {
        let graph = build_weighted_directed(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        run(&graph, &args, delta);
    }
}

fn run<G>(graph: &G, args: &CommonArgs, delta: u32)
where
    G: Graph<u32> + DirectedDegrees<u32> + DirectedNeighborsWithValues<u32, u32> + EdgeSlots<u32> + Sync,
{
    let mut picker = SourcePicker::new(graph, args.start_node);

    benchmark_kernel(
        args.trials,
        |_| {
            let source = picker.pick();
            let config = DeltaSteppingConfig::new(source as usize, delta);
            (source, delta_stepping(graph, config))
        },
        |(source, distances)| {
            if args.analysis {
                let reached = distances
                    .iter()
                    .filter(|&&distance| distance != INFINITE_DISTANCE)
                    .count();
                println!("SSSP from source {source} reached {reached} nodes");
                let ok = gravel::verify::verify_sssp(graph, source, &distances);
                println!("Verification: {}", if ok { "PASS" } else { "FAIL" });
            }
        },
    );
}
