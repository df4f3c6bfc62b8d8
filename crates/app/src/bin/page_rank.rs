use gravel::prelude::*;
use gravel_app::*;

fn main() {
    env_logger::init();

    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains("-h") {
        print_usage_and_exit("page_rank", " -k <iters>: maximum number of iterations (default 20)");
    }
    let max_iterations: usize = pargs
        .opt_value_from_str("-k")
        .unwrap_or_else(|error| exit_usage(error))
        .unwrap_or(PageRankConfig::default().max_iterations);
    let args = CommonArgs::parse(&mut pargs).unwrap_or_else(|error| exit_usage(error));
    if !pargs.finish().is_empty() {
        exit_usage("unexpected trailing arguments");
    }

    let config = PageRankConfig {
        max_iterations,
        ..PageRankConfig::default()
    };

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

fn run<G>(graph: &G, args: &CommonArgs, config: PageRankConfig)
where
    G: Graph<u32> + DirectedDegrees<u32> + DirectedNeighbors<u32> + Sync,
{
    benchmark_kernel(
        args.trials,
        |_| page_rank(graph, config),
        |(scores, iterations, error)| {
            println!("Converged to an error of {error:.6} after {iterations} iterations");
            if args.analysis {
                print_top_scores(&scores);
                let total: f64 = scores.iter().map(|&score| score as f64).sum();
                println!("Sum of all scores: {total:.6}");
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
