//! Shared plumbing for the benchmark binaries: command line parsing, graph
//! loading by file suffix, source selection and the timed trial loop.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use gravel::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Average degree used for generated graphs.
pub const DEFAULT_DEGREE: usize = 16;

/// Number of timed kernel executions.
pub const DEFAULT_TRIALS: usize = 16;

/// Command line flags shared by every benchmark binary.
///
/// ```text
///  -h        : print this message and exit
///  -f <path> : load graph from file (.el .wel .gr .graph .sg .wsg)
///  -g <scale>: generate R-MAT graph with 2^scale nodes
///  -u <scale>: generate uniform random graph with 2^scale nodes
///  -s        : symmetrize the input edge list
///  -n <n>    : number of trials (default 16)
///  -r <node> : start from a fixed node (default random)
///  -a        : print analysis and verify after the last trial
///  -m        : build the CSR in place (unweighted only)
/// ```
#[derive(Debug)]
pub struct CommonArgs {
    pub file: Option<PathBuf>,
    pub rmat_scale: Option<usize>,
    pub uniform_scale: Option<usize>,
    pub symmetrize: bool,
    pub trials: usize,
    pub start_node: Option<usize>,
    pub analysis: bool,
    pub in_place: bool,
}

impl CommonArgs {
    pub fn parse(pargs: &mut pico_args::Arguments) -> Result<Self, pico_args::Error> {
        fn as_path_buf(arg: &OsStr) -> Result<PathBuf, std::convert::Infallible> {
            Ok(arg.into())
        }

        let args = CommonArgs {
            file: pargs.opt_value_from_os_str("-f", as_path_buf)?,
            rmat_scale: pargs.opt_value_from_str("-g")?,
            uniform_scale: pargs.opt_value_from_str("-u")?,
            symmetrize: pargs.contains("-s"),
            trials: pargs.opt_value_from_str("-n")?.unwrap_or(DEFAULT_TRIALS),
            start_node: pargs.opt_value_from_str("-r")?,
            analysis: pargs.contains("-a"),
            in_place: pargs.contains("-m"),
        };

        if args.file.is_none() && args.rmat_scale.is_none() && args.uniform_scale.is_none() {
            return Err(pico_args::Error::MissingArgument);
        }

        Ok(args)
    }
}

/// Prints the usage header and exits successfully. Called for `-h`.
pub fn print_usage_and_exit(binary: &str, kernel_flags: &str) -> ! {
    println!("usage: {binary} [options]");
    println!(" -h        : print this message and exit");
    println!(" -f <path> : load graph from file (.el .wel .gr .graph .sg .wsg)");
    println!(" -g <scale>: generate R-MAT graph with 2^scale nodes");
    println!(" -u <scale>: generate uniform random graph with 2^scale nodes");
    println!(" -s        : symmetrize the input edge list");
    println!(" -n <n>    : number of trials (default {DEFAULT_TRIALS})");
    println!(" -r <node> : start from a fixed node (default random)");
    println!(" -a        : print analysis and verify after the last trial");
    println!(" -m        : build the CSR in place (unweighted only)");
    if !kernel_flags.is_empty() {
        println!("{kernel_flags}");
    }
    std::process::exit(0)
}

/// Reports a malformed command line and exits with the argument error code.
pub fn exit_usage(message: impl std::fmt::Display) -> ! {
    eprintln!("argument error: {message}");
    std::process::exit(-1)
}

/// Reports an unsupported flag/input combination and exits.
pub fn exit_unsupported(message: impl std::fmt::Display) -> ! {
    eprintln!("unsupported: {message}");
    std::process::exit(-2)
}

fn file_suffix(path: &std::path::Path) -> String {
    path.extension()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_string()
}

fn generated_edge_list<EV>(args: &CommonArgs) -> Option<EdgeList<u32, EV>>
where
    EV: Default + Copy + Send + Sync,
{
    if let Some(scale) = args.rmat_scale {
        Some(rmat_edge_list(scale, DEFAULT_DEGREE))
    } else {
        args.uniform_scale
            .map(|scale| uniform_edge_list(scale, DEFAULT_DEGREE))
    }
}

macro_rules! build_unweighted {
    ($fn_name:ident, $graph:ty) => {
        pub fn $fn_name(args: &CommonArgs) -> Result<$graph, Error> {
            let layout = CsrLayout::Deduplicated;

            if let Some(path) = &args.file {
                let suffix = file_suffix(path);
                if args.in_place && suffix != "el" && suffix != "graph" && suffix != "gr" {
                    exit_unsupported("in-place construction needs an edge list input");
                }
                let edge_list: EdgeList<u32, ()> = match suffix.as_str() {
                    "el" => EdgeList::try_from(InputPath(path.clone()))?,
                    "gr" => Dimacs::<u32, ()>::try_from(InputPath(path.clone()))?.0,
                    "graph" => Metis::<u32>::try_from(InputPath(path.clone()))?.0,
                    "sg" => {
                        return GraphBuilder::new()
                            .csr_layout(layout)
                            .file_format(BinaryInput::<u32>::default())
                            .path(path.clone())
                            .build();
                    }
                    "wel" | "wsg" => {
                        exit_unsupported("weighted input for an unweighted kernel")
                    }
                    other => exit_usage(format!("unknown graph file suffix .{other}")),
                };
                let builder = GraphBuilder::new().csr_layout(layout).edge_list(edge_list);
                return Ok(if args.in_place {
                    builder.build_in_place()
                } else {
                    builder.build()
                });
            }

            let edge_list =
                generated_edge_list::<()>(args).expect("neither file nor generator given");
            let builder = GraphBuilder::new().csr_layout(layout).edge_list(edge_list);
            Ok(if args.in_place {
                builder.build_in_place()
            } else {
                builder.build()
            })
        }
    };
}

build_unweighted!(build_directed, DirectedCsrGraph<u32>);
build_unweighted!(build_undirected, UndirectedCsrGraph<u32>);

macro_rules! build_weighted {
    ($fn_name:ident, $graph:ty) => {
        pub fn $fn_name(args: &CommonArgs) -> Result<$graph, Error> {
            if args.in_place {
                exit_unsupported("in-place construction of a weighted graph");
            }
            let layout = CsrLayout::Deduplicated;

            if let Some(path) = &args.file {
                let edge_list: EdgeList<u32, u32> = match file_suffix(path).as_str() {
                    "wel" => EdgeList::try_from(InputPath(path.clone()))?,
                    "gr" => Dimacs::<u32, u32>::try_from(InputPath(path.clone()))?.0,
                    "wsg" => {
                        return GraphBuilder::new()
                            .csr_layout(layout)
                            .file_format(BinaryInput::<u32>::default())
                            .path(path.clone())
                            .build();
                    }
                    "el" | "graph" | "sg" => {
                        exit_unsupported("unweighted input for a weighted kernel")
                    }
                    other => exit_usage(format!("unknown graph file suffix .{other}")),
                };
                return Ok(GraphBuilder::new()
                    .csr_layout(layout)
                    .edge_list(edge_list)
                    .build());
            }

            let mut edge_list =
                generated_edge_list::<u32>(args).expect("neither file nor generator given");
            insert_weights(&mut edge_list);
            Ok(GraphBuilder::new()
                .csr_layout(layout)
                .edge_list(edge_list)
                .build())
        }
    };
}

build_weighted!(build_weighted_directed, DirectedCsrGraph<u32, u32>);
build_weighted!(build_weighted_undirected, UndirectedCsrGraph<u32, u32>);

/// Picks benchmark source nodes: either the fixed `-r` node or uniformly
/// random nodes with at least one outgoing edge.
pub struct SourcePicker<'g, G> {
    graph: &'g G,
    fixed: Option<usize>,
    rng: SmallRng,
}

impl<'g, G> SourcePicker<'g, G>
where
    G: Graph<u32> + DirectedDegrees<u32>,
{
    pub fn new(graph: &'g G, fixed: Option<usize>) -> Self {
        Self {
            graph,
            fixed,
            rng: SmallRng::seed_from_u64(RAND_SEED),
        }
    }

    pub fn pick(&mut self) -> u32 {
        if let Some(fixed) = self.fixed {
            return fixed as u32;
        }
        let node_count = self.graph.node_count();
        if self.graph.edge_count() == 0 {
            return 0;
        }
        loop {
            let candidate = self.rng.gen_range(0..node_count);
            if self.graph.out_degree(candidate) > 0 {
                return candidate;
            }
        }
    }
}

/// Runs `kernel` for the configured number of trials, printing per-trial
/// and average timings. The result of the last trial is handed to
/// `analyze`.
pub fn benchmark_kernel<R>(
    trials: usize,
    mut kernel: impl FnMut(usize) -> R,
    mut analyze: impl FnMut(R),
) {
    if trials == 0 {
        return;
    }
    let mut total = Duration::ZERO;
    for trial in 0..trials {
        let start = Instant::now();
        let result = kernel(trial);
        let elapsed = start.elapsed();
        total += elapsed;
        println!("Trial time {elapsed:?}");
        if trial + 1 == trials {
            analyze(result);
        }
    }
    println!("Average time {:?}", total / trials as u32);
}
