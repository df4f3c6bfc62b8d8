use gravel::bc::normalize_by_max;
use gravel::prelude::*;
use gravel_app::*;

fn main() {
    env_logger::init();

    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains("-h") {
        print_usage_and_exit("bc", " -k <n>    : number of sampled sources (default 1)");
    }
    let num_sources: usize = pargs
        .opt_value_from_str("-k")
        .unwrap_or_else(|error| exit_usage(error))
        .unwrap_or(1);
    let args = CommonArgs::parse(&mut pargs).unwrap_or_else(|error| exit_usage(error));
    if !pargs.finish().is_empty() {
        exit_usage("unexpected trailing arguments");
    }

    let config = BetweennessConfig::new(num_sources, args.start_node);

    if args.symmetrize {
        let graph = build_undirected(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        run(&graph, &args, config);
    } else {
        let graph = build_directed(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        run(&graph, &args, config);
    }
}

fn run<G>(graph: &G, args: &CommonArgs, config: BetweennessConfig)
where
    G: Graph<u32> + DirectedDegrees<u32> + DirectedNeighbors<u32> + EdgeSlots<u32> + Sync,
{
    benchmark_kernel(
        args.trials,
        |_| betweenness(graph, config),
        |mut scores| {
            if args.analysis {
                normalize_by_max(&mut scores);
                print_top_scores(&scores);
            }
        },
    );
}

fn print_top_scores(scores: &[f32]) {
    let mut ranked = scores
        .iter()
        .enumerate()
        .map(|(node, &score)| (score, node))
        .collect::<Vec<_>>();
    ranked.sort_by(|left, right| right.0.total_cmp(&left.0));

    for (score, node) in ranked.into_iter().take(5) {
        println!("node {node}: {score:.6}");
    }
}
