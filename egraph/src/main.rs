/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! Driver: load a vector file, build the cover tree, optionally verify it,
//! optionally build and verify the epsilon graph. Exit codes: 0 on success,
//! 1 on bad arguments or i/o trouble, 2 when a requested verification fails.

use clap::error::ErrorKind;
use clap::Parser;
use hubtree::graph::{build_epsilon_graph, graph_is_correct};
use hubtree::utils::{log_msg, log_param, StageTimer};
use hubtree::{CoverTreeBuilder, PointVector, Real, L2};
use pointset::loaders::vecs_from_file;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(name = "egraph", version, about = "hub-based cover tree and epsilon-graph builder")]
struct Args {
    /// Epsilon-graph radius; a positive value also builds the graph
    #[clap(short = 'r', long = "radius", default_value_t = 0.0)]
    radius: Real,
    /// Hub split ratio, strictly between 0 and 1
    #[clap(short = 'S', long = "split-ratio", default_value_t = 0.5)]
    split_ratio: Real,
    /// Hub size at which whole subtrees go to single tasks; 0 disables
    #[clap(short = 's', long = "switch-size", default_value_t = 0.0)]
    switch_size: Real,
    /// Hubs at or below this size become leaves immediately
    #[clap(short = 'l', long = "min-hub-size", default_value_t = 10)]
    min_hub_size: usize,
    /// Number of worker threads
    #[clap(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,
    /// Output tree file
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// Asynchronous tree construction
    #[clap(short = 'A', long = "asynchronous")]
    asynchronous: bool,
    /// Verify tree correctness
    #[clap(short = 'T', long = "verify-tree")]
    verify_tree: bool,
    /// Verify graph correctness (assumes -r; slow, builds the brute-force graph)
    #[clap(short = 'G', long = "verify-graph")]
    verify_graph: bool,
    /// Verbose
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
    /// Input points file (fvecs/bvecs)
    filename: PathBuf,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            exit(code);
        }
    };
    exit(run(args));
}

fn run(args: Args) -> i32 {
    if !(args.split_ratio > 0.0 && args.split_ratio < 1.0) {
        eprintln!("[err::main] split ratio must lie strictly between 0 and 1");
        return 1;
    }
    if args.threads == 0 {
        eprintln!("[err::main] thread count must be positive");
        return 1;
    }
    if args.radius < 0.0 || args.switch_size < 0.0 {
        eprintln!("[err::main] radius and switch size must be non-negative");
        return 1;
    }
    let build_graph = args.radius > 0.0;

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
    {
        eprintln!("[err::main] could not size the worker pool: {}", e);
        return 1;
    }

    let cmd: Vec<String> = std::env::args().collect();
    log_param(
        "main",
        format_args!("cmd: {} [threads={}]", cmd.join(" "), args.threads),
    );
    log_param(
        "main",
        format_args!(
            "point parameters: [file='{}',fp={}]",
            args.filename.display(),
            std::mem::size_of::<Real>() << 3
        ),
    );
    log_param(
        "main",
        format_args!(
            "ctree parameters: [split_ratio={:.2},switch_size={:.2},min_hub_size={},level_synch={},verify_tree={},verbose={}]",
            args.split_ratio,
            args.switch_size,
            args.min_hub_size,
            !args.asynchronous,
            args.verify_tree,
            args.verbose
        ),
    );
    if build_graph {
        log_param(
            "main",
            format_args!(
                "graph parameters: [radius={:.3},verify_graph={}]",
                args.radius, args.verify_graph
            ),
        );
    }

    let timer = StageTimer::start();
    let points: Arc<PointVector<L2>> = match vecs_from_file(&args.filename) {
        Ok(points) => Arc::new(points),
        Err(e) => {
            eprintln!("[err::main] could not load '{}': {}", args.filename.display(), e);
            return 1;
        }
    };
    let size = points.len();
    log_msg(
        "read_points",
        timer.elapsed(),
        format_args!(
            "read {} points from file '{}' [dim={}]",
            size,
            args.filename.display(),
            points.dim()
        ),
    );

    let timer = StageTimer::start();
    let mut builder = CoverTreeBuilder::new();
    builder
        .set_split_ratio(args.split_ratio)
        .set_switch_size(args.switch_size)
        .set_min_hub_size(args.min_hub_size)
        .set_level_synch(!args.asynchronous)
        .set_verbosity(if args.verbose { 1 } else { 0 });
    let tree = match builder.build(Arc::clone(&points)) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("[err::main] could not build the tree: {}", e);
            return 1;
        }
    };
    log_msg(
        "build",
        timer.elapsed(),
        format_args!(
            "constructed cover tree [vertices={},levels={}]",
            tree.num_vertices(),
            tree.num_levels()
        ),
    );

    if args.verify_tree {
        let timer = StageTimer::start();
        let passed = tree.is_correct(args.split_ratio);
        log_msg(
            "verify_tree",
            timer.elapsed(),
            format_args!(
                "cover tree {} verification",
                if passed { "PASSED" } else { "FAILED" }
            ),
        );
        if !passed {
            return 2;
        }
    }

    if let Some(path) = &args.output {
        let timer = StageTimer::start();
        if let Err(e) = tree.write_to(path) {
            eprintln!("[err::main] could not write '{}': {}", path.display(), e);
            return 1;
        }
        log_msg(
            "write_tree",
            timer.elapsed(),
            format_args!("wrote tree to '{}'", path.display()),
        );
    }

    if build_graph {
        let timer = StageTimer::start();
        let (graph, num_edges) = build_epsilon_graph(&tree, args.radius);
        log_msg(
            "build_graph",
            timer.elapsed(),
            format_args!(
                "constructed epsilon graph [vertices={},edges={},avg_deg={:.3}]",
                size,
                num_edges,
                num_edges as f64 / size as f64
            ),
        );

        if args.verify_graph {
            let timer = StageTimer::start();
            let correct = graph_is_correct(&points, args.radius, &graph);
            log_msg(
                "verify_graph",
                timer.elapsed(),
                format_args!(
                    "epsilon graph {} verification",
                    if correct { "PASSED" } else { "FAILED" }
                ),
            );
            if !correct {
                return 2;
            }
        }
    }

    0
}
