use gravel::prelude::*;
use gravel_app::*;

fn main() {
    env_logger::init();

    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains("-h") {
        print_usage_and_exit("cc", "");
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
    G: Graph<u32> + DirectedDegrees<u32> + DirectedNeighbors<u32> + Sync,
{
    benchmark_kernel(
        args.trials,
        |_| afforest(graph, AfforestConfig::default()),
        |components| {
            if args.analysis {
                println!("Found {} components", components.count());
                let labels = components.to_vec();
                let ok = gravel::verify::verify_components(graph, &labels);
                println!("Verification: {}", if ok { "PASS" } else { "FAIL" });
            }
        },
    );
}
