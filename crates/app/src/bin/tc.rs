use gravel::prelude::*;
use gravel_app::*;

fn main() {
    env_logger::init();

    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains("-h") {
        print_usage_and_exit("tc", "");
    }
    let args = CommonArgs::parse(&mut pargs).unwrap_or_else(|error| exit_usage(error));
    if !pargs.finish().is_empty() {
        exit_usage("unexpected trailing arguments");
    }

    let serialized_undirected = args
        .file
        .as_deref()
        .and_then(|path| path.extension())
        .map_or(false, |extension| extension == "sg");
    if !args.symmetrize && !serialized_undirected {
        exit_unsupported("triangle counting requires an undirected graph, pass -s");
    }

    let mut graph = build_undirected(&args).unwrap_or_else(|error| exit_usage(error));
    graph.print_stats();

    if worth_relabeling(&graph) {
        relabel_graph(&mut graph);
    }

    benchmark_kernel(
        args.trials,
        |_| global_triangle_count(&graph),
        |triangles| {
            println!("Found {triangles} triangles");
            if args.analysis {
                let expected = gravel::verify::count_triangles_naive(&graph);
                let ok = triangles == expected;
                println!("Verification: {}", if ok { "PASS" } else { "FAIL" });
            }
        },
    );
}
