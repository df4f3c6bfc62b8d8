use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use gravel::prelude::*;
use gravel_app::*;

fn main() {
    env_logger::init();

    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains("-h") {
        print_usage_and_exit(
            "converter",
            " -e <path> : write the graph as a text edge list\n \
              -b <path> : write the graph in serialized binary form\n \
              -w <path> : write the weighted graph in serialized binary form",
        );
    }

    fn as_path_buf(arg: &std::ffi::OsStr) -> Result<PathBuf, std::convert::Infallible> {
        Ok(arg.into())
    }

    let edge_list_out: Option<PathBuf> = pargs
        .opt_value_from_os_str("-e", as_path_buf)
        .unwrap_or_else(|error| exit_usage(error));
    let binary_out: Option<PathBuf> = pargs
        .opt_value_from_os_str("-b", as_path_buf)
        .unwrap_or_else(|error| exit_usage(error));
    let weighted_out: Option<PathBuf> = pargs
        .opt_value_from_os_str("-w", as_path_buf)
        .unwrap_or_else(|error| exit_usage(error));

    let args = CommonArgs::parse(&mut pargs).unwrap_or_else(|error| exit_usage(error));
    if !pargs.finish().is_empty() {
        exit_usage("unexpected trailing arguments");
    }

    if edge_list_out.is_none() && binary_out.is_none() && weighted_out.is_none() {
        exit_usage("nothing to do, pass -e, -b or -w");
    }

    if let Some(out) = weighted_out {
        if args.symmetrize {
            let graph = build_weighted_undirected(&args).unwrap_or_else(|error| exit_usage(error));
            graph.print_stats();
            serialize_to(&graph, &out);
        } else {
            let graph = build_weighted_directed(&args).unwrap_or_else(|error| exit_usage(error));
            graph.print_stats();
            serialize_to(&graph, &out);
        }
        return;
    }

    if args.symmetrize {
        let graph = build_undirected(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        if let Some(out) = binary_out {
            serialize_to(&graph, &out);
        }
        if let Some(out) = edge_list_out {
            write_undirected_edge_list(&graph, &out);
        }
    } else {
        let graph = build_directed(&args).unwrap_or_else(|error| exit_usage(error));
        graph.print_stats();
        if let Some(out) = binary_out {
            serialize_to(&graph, &out);
        }
        if let Some(out) = edge_list_out {
            write_directed_edge_list(&graph, &out);
        }
    }
}

fn serialize_to<G>(graph: &G, path: &PathBuf)
where
    G: for<'a> SerializeGraphOp<&'a mut BufWriter<File>>,
{
    let file = File::create(path).unwrap_or_else(|error| exit_usage(error));
    let mut writer = BufWriter::new(file);
    graph
        .serialize(&mut writer)
        .unwrap_or_else(|error| exit_usage(error));
    println!("Wrote serialized graph to {}", path.display());
}

fn write_directed_edge_list(graph: &DirectedCsrGraph<u32>, path: &PathBuf) {
    let file = File::create(path).unwrap_or_else(|error| exit_usage(error));
    let mut writer = BufWriter::new(file);
    for u in 0..graph.node_count() {
        for &v in graph.out_neighbors(u) {
            writeln!(writer, "{u} {v}").unwrap_or_else(|error| exit_usage(error));
        }
    }
    println!("Wrote edge list to {}", path.display());
}

fn write_undirected_edge_list(graph: &UndirectedCsrGraph<u32>, path: &PathBuf) {
    let file = File::create(path).unwrap_or_else(|error| exit_usage(error));
    let mut writer = BufWriter::new(file);
    for u in 0..graph.node_count() {
        // every edge is stored in both neighbor lists, keep one copy
        for &v in graph.neighbors(u) {
            if u <= v {
                writeln!(writer, "{u} {v}").unwrap_or_else(|error| exit_usage(error));
            }
        }
    }
    println!("Wrote edge list to {}", path.display());
}
