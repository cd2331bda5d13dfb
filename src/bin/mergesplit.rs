//! Main CLI for the merge-split sampler.
use mimalloc::MiMalloc;
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use clap::{value_t, App, Arg};
use mergesplit::chain::run::run_merge_split;
use mergesplit::chain::MergeSplitParams;
use mergesplit::config::ConstraintsConfig;
use mergesplit::init::{from_networkx, repair_counties};
use mergesplit::stats::{AssignmentsOnlyWriter, JSONLWriter, StatsWriter, TSVWriter};
use serde_json::json;
use sha3::{Digest, Sha3_256};
use std::path::PathBuf;
use std::{fs, io};

fn main() {
    let matches = App::new("mergesplit")
        .version("0.1.0")
        .about("A merge-split Markov chain sampler for redistricting plans")
        .arg(
            Arg::with_name("graph_json")
                .long("graph-json")
                .takes_value(true)
                .required(true)
                .help("The path of the dual graph (in NetworkX format)."),
        )
        .arg(
            Arg::with_name("n_steps")
                .long("n-steps")
                .takes_value(true)
                .required(true)
                .help("The number of chain iterations."),
        )
        .arg(
            Arg::with_name("tol")
                .long("tol")
                .takes_value(true)
                .required(true)
                .help("The relative population tolerance."),
        )
        .arg(
            Arg::with_name("pop_col")
                .long("pop-col")
                .takes_value(true)
                .required(true)
                .help("The name of the total population column in the graph metadata."),
        )
        .arg(
            Arg::with_name("assignment_col")
                .long("assignment-col")
                .takes_value(true)
                .required(true)
                .help("The name of the assignment column in the graph metadata."),
        )
        .arg(
            Arg::with_name("county_col")
                .long("county-col")
                .takes_value(true)
                .help("The name of the county column in the graph metadata."),
        )
        .arg(
            Arg::with_name("rng_seed")
                .long("rng-seed")
                .takes_value(true)
                .required(true)
                .help("The seed of the RNG used to draw proposals."),
        )
        .arg(
            Arg::with_name("compactness")
                .long("compactness")
                .takes_value(true)
                .default_value("1")
                .help("The spanning tree compactness exponent (1 = uniform trees)."),
        )
        .arg(
            Arg::with_name("k")
                .long("k")
                .takes_value(true)
                .default_value("0")
                .help("The cut boundary parameter (0 = adaptive)."),
        )
        .arg(
            Arg::with_name("adapt_k_thresh")
                .long("adapt-k-thresh")
                .takes_value(true)
                .default_value("0.975")
                .help("The acceptance rate bound that widens k under adaptive control."),
        )
        .arg(
            Arg::with_name("constraints")
                .long("constraints")
                .takes_value(true)
                .default_value("")
                .help("Constraint weights and settings (a JSON object)."),
        )
        .arg(
            Arg::with_name("writer")
                .long("writer")
                .takes_value(true)
                .default_value("jsonl"),
        ) // other options: jsonl-full, tsv, assignments
        .arg(
            Arg::with_name("sum_cols")
                .long("sum-cols")
                .multiple(true)
                .takes_value(true),
        )
        .get_matches();
    let n_steps = value_t!(matches.value_of("n_steps"), u64).unwrap_or_else(|e| e.exit());
    let rng_seed = value_t!(matches.value_of("rng_seed"), u64).unwrap_or_else(|e| e.exit());
    let tol = value_t!(matches.value_of("tol"), f64).unwrap_or_else(|e| e.exit());
    let compactness = value_t!(matches.value_of("compactness"), f64).unwrap_or_else(|e| e.exit());
    let k = value_t!(matches.value_of("k"), u32).unwrap_or_else(|e| e.exit());
    let adapt_k_thresh =
        value_t!(matches.value_of("adapt_k_thresh"), f64).unwrap_or_else(|e| e.exit());
    let graph_json = fs::canonicalize(PathBuf::from(matches.value_of("graph_json").unwrap()))
        .unwrap()
        .into_os_string()
        .into_string()
        .unwrap();
    let pop_col = matches.value_of("pop_col").unwrap();
    let assignment_col = matches.value_of("assignment_col").unwrap();
    let county_col = matches.value_of("county_col");
    let constraints_raw = matches.value_of("constraints").unwrap();
    let writer_str = matches.value_of("writer").unwrap();
    let mut columns: Vec<String> = matches
        .values_of("sum_cols")
        .unwrap_or_default()
        .map(|c| c.to_string())
        .collect();

    let writer: Box<dyn StatsWriter> = match writer_str {
        "tsv" => Box::new(TSVWriter::new()),
        "jsonl" => Box::new(JSONLWriter::new(false)),
        "jsonl-full" => Box::new(JSONLWriter::new(true)),
        "assignments" => Box::new(AssignmentsOnlyWriter::new()),
        bad => panic!("Parameter error: invalid writer '{}'", bad),
    };
    let config = ConstraintsConfig::from_json(constraints_raw).unwrap();
    for col in config.columns() {
        if !columns.contains(&col) {
            columns.push(col);
        }
    }

    assert!(tol >= 0.0 && tol <= 1.0);

    let (mut graph, partition) =
        from_networkx(&graph_json, pop_col, assignment_col, county_col, columns).unwrap();
    repair_counties(&mut graph);
    let constraints = config.resolve(&graph).unwrap();
    let avg_pop = (graph.total_pop as f64) / (partition.num_dists as f64);
    let params = MergeSplitParams {
        min_pop: ((1.0 - tol) * avg_pop as f64).floor() as u32,
        max_pop: ((1.0 + tol) * avg_pop as f64).ceil() as u32,
        num_steps: n_steps,
        rng_seed: rng_seed,
        compactness: compactness,
        k: k,
        adapt_k_thresh: adapt_k_thresh,
    };

    let mut graph_file = fs::File::open(&graph_json).unwrap();
    let mut graph_hasher = Sha3_256::new();
    io::copy(&mut graph_file, &mut graph_hasher).unwrap();
    let graph_hash = format!("{:x}", graph_hasher.finalize());
    let meta = json!({
        "assignment_col": assignment_col,
        "county_col": county_col,
        "tol": tol,
        "pop_col": pop_col,
        "graph_path": graph_json,
        "graph_sha3": graph_hash,
        "rng_seed": rng_seed,
        "num_steps": n_steps,
        "compactness": compactness,
        "k": k,
        "adapt_k_thresh": adapt_k_thresh,
        "constraints": constraints_raw,
    });
    println!("{}", json!({ "meta": meta }).to_string());
    let plan = partition.plan();
    if let Err(err) = run_merge_split(
        &graph,
        &plan,
        partition.num_dists,
        &constraints,
        &params,
        writer,
    ) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
