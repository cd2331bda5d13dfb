//! Runners for merge-split chains.
//!
//! A runner orchestrates the components of one merge-split iteration
//! (merge region selection, spanning tree generation, balanced cut,
//! energy evaluation, acceptance) and handles setup, validation, and
//! output. The chain itself is strictly sequential; [`multi_start`]
//! runs several independent chains in parallel, one per initial plan.
use super::accept::{acceptance_prob, ln_tree_count_ratio};
use super::adapt::KController;
use super::{node_bound, random_split, MergeSplitParams, MergeSplitProposal};
use crate::buffers::{SpanningTreeBuffer, SplitBuffer, SubgraphBuffer};
use crate::constraints::ConstraintSet;
use crate::graph::Graph;
use crate::partition::Partition;
use crate::spanning_tree::{SpanningTreeSampler, USTSampler, WeightedMSTSampler};
use crate::stats::{NullWriter, SelfLoopCounts, SelfLoopReason, StatsWriter};
use anyhow::{anyhow, bail, Result};
use crossbeam::scope;
use crossbeam_channel::unbounded;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// The full output of a chain run.
pub struct ChainResults {
    /// One 1-indexed assignment vector per iteration. The seed state is
    /// the first entry; every entry is a valid plan. On rejected or
    /// self-looped iterations the previous plan repeats.
    pub plans: Vec<Vec<u32>>,
    /// The accept/reject decision per iteration (the seed state counts
    /// as accepted). Iterations that never reached the acceptance test
    /// are recorded as rejections.
    pub accepted: Vec<bool>,
}

/// Checks the structural preconditions of a chain run: a connected
/// graph and a contiguous, population-valid seed plan with at least
/// two districts.
fn validate_start(
    graph: &Graph,
    partition: &Partition,
    constraints: &ConstraintSet,
    params: &MergeSplitParams,
) -> Result<()> {
    params.validate(graph).map_err(|e| anyhow!(e))?;
    constraints
        .validate(graph, partition.num_dists)
        .map_err(|e| anyhow!(e))?;
    if partition.num_dists < 2 {
        bail!("Merge-split requires at least two districts");
    }
    let all_nodes: Vec<usize> = (0..graph.neighbors.len()).collect();
    if !graph.region_connected(&all_nodes) {
        bail!("The adjacency graph must be connected");
    }
    if !partition.contiguous(graph) {
        bail!("The initial plan must have contiguous districts");
    }
    if !partition.pop_bounds_ok(params.min_pop, params.max_pop) {
        bail!(
            "The initial plan must satisfy population bounds [{}, {}]",
            params.min_pop,
            params.max_pop
        );
    }
    Ok(())
}

/// Runs a sequential merge-split chain from `partition`, streaming
/// per-proposal data to `writer` and returning the full plan matrix
/// and decision sequence.
///
/// Every iteration emits a plan: accepted proposals advance the state,
/// while rejections and self-loops repeat it. The output therefore
/// always contains exactly `params.num_steps` plans (the seed state is
/// the first).
pub fn merge_split_chain(
    graph: &Graph,
    partition: &Partition,
    constraints: &ConstraintSet,
    mut writer: Box<dyn StatsWriter>,
    params: &MergeSplitParams,
) -> Result<ChainResults> {
    validate_start(graph, partition, constraints, params)?;

    let n = graph.neighbors.len();
    let node_ub = node_bound(&graph.pops, params.max_pop);
    let mut rng: SmallRng = SeedableRng::seed_from_u64(params.rng_seed);
    let mut subgraph_buf = SubgraphBuffer::new(n, node_ub);
    let mut st_buf = SpanningTreeBuffer::new(node_ub);
    let mut split_buf = SplitBuffer::new(node_ub);
    let mut proposal_buf = MergeSplitProposal::new_buffer(node_ub);
    let mut st_sampler: Box<dyn SpanningTreeSampler> = if params.compactness == 1.0 {
        Box::new(USTSampler::new(node_ub, &mut rng))
    } else {
        Box::new(WeightedMSTSampler::new(node_ub, params.compactness))
    };
    let mut controller = KController::new(params.k, params.adapt_k_thresh);

    let mut partition = partition.clone();
    let mut energy = constraints.energy(graph, &partition);
    writer.init(graph, &partition)?;

    let mut results = ChainResults {
        plans: Vec::with_capacity(params.num_steps as usize),
        accepted: Vec::with_capacity(params.num_steps as usize),
    };
    results.plans.push(partition.plan());
    results.accepted.push(true);

    let mut counts = SelfLoopCounts::default();
    while (results.plans.len() as u64) < params.num_steps {
        let step = results.plans.len() as u64;

        // Step 1: sample a cut edge, which is guaranteed to yield a
        // pair of adjacent districts.
        let cut_edge_idx = rng.gen_range(0..partition.cut_edges.len());
        let edge_idx = partition.cut_edges[cut_edge_idx];
        let dist_a = partition.assignments[graph.edges[edge_idx].0] as usize;
        let dist_b = partition.assignments[graph.edges[edge_idx].1] as usize;
        partition.subgraph(graph, &mut subgraph_buf, dist_a, dist_b);

        // Step 2: draw a random spanning tree of the merged region.
        // A valid state's merge regions are connected, but a sampler
        // failure is a self-loop rather than a fatal error.
        if st_sampler
            .random_spanning_tree(&subgraph_buf.graph, &mut st_buf, &mut rng)
            .is_err()
        {
            counts.inc(SelfLoopReason::Disconnected);
            results.plans.push(partition.plan());
            results.accepted.push(false);
            continue;
        }

        // Step 3: cut a population-balanced tree edge among the k best
        // candidates.
        let split = random_split(
            &subgraph_buf.graph,
            &mut rng,
            &st_buf.st,
            dist_a,
            dist_b,
            &mut split_buf,
            &mut proposal_buf,
            &subgraph_buf.raw_nodes,
            params,
            controller.k(),
        );
        if let Err(reason) = split {
            counts.inc(reason);
            results.plans.push(partition.plan());
            results.accepted.push(false);
            continue;
        }

        // Step 4: Metropolis-Hastings test with the spanning-tree-count
        // proposal correction.
        let ln_ratio = ln_tree_count_ratio(graph, &partition, &proposal_buf);
        let mut candidate = partition.clone();
        candidate.update(graph, &proposal_buf);
        let e_new = constraints.energy(graph, &candidate);
        let prob = acceptance_prob(ln_ratio, energy, e_new);
        let decision = rng.gen::<f64>() < prob;
        controller.observe(decision);
        if decision {
            partition = candidate;
            energy = e_new;
        }
        writer.step(
            step,
            graph,
            &partition,
            &proposal_buf,
            &counts,
            decision,
            energy,
        )?;
        counts = SelfLoopCounts::default();
        results.plans.push(partition.plan());
        results.accepted.push(decision);
    }
    writer.close()?;
    Ok(results)
}

/// The core entry point: runs a merge-split chain from a 1-indexed
/// assignment vector over `graph`.
///
/// `ndists` is the expected number of districts; a seed plan with a
/// different district count is a structural error.
pub fn run_merge_split(
    graph: &Graph,
    initial_plan: &[u32],
    ndists: u32,
    constraints: &ConstraintSet,
    params: &MergeSplitParams,
    writer: Box<dyn StatsWriter>,
) -> Result<ChainResults> {
    let partition = Partition::from_assignments(graph, initial_plan).map_err(|e| anyhow!(e))?;
    if partition.num_dists != ndists {
        bail!(
            "Expected {} districts; the initial plan has {}",
            ndists,
            partition.num_dists
        );
    }
    merge_split_chain(graph, &partition, constraints, writer, params)
}

/// Runs one independent chain per initial plan, in parallel.
///
/// Chains share only the read-only graph and constraint set; each
/// chain owns its state and RNG stream (seeded `rng_seed + index + 1`),
/// so results are independent of scheduling.
pub fn multi_start(
    graph: &Graph,
    initial_plans: &[Vec<u32>],
    ndists: u32,
    constraints: &ConstraintSet,
    params: &MergeSplitParams,
) -> Result<Vec<ChainResults>> {
    let (result_send, result_recv) = unbounded();
    scope(|scope| {
        for (idx, plan) in initial_plans.iter().enumerate() {
            let result_send = result_send.clone();
            let chain_params = MergeSplitParams {
                rng_seed: params.rng_seed + idx as u64 + 1,
                ..params.clone()
            };
            scope.spawn(move |_| {
                let result = run_merge_split(
                    graph,
                    plan,
                    ndists,
                    constraints,
                    &chain_params,
                    Box::new(NullWriter::new()),
                );
                result_send.send((idx, result)).unwrap();
            });
        }
    })
    .unwrap();
    drop(result_send);

    let mut results: Vec<Option<ChainResults>> = (0..initial_plans.len()).map(|_| None).collect();
    for (idx, result) in result_recv.iter() {
        results[idx] = Some(result?);
    }
    Ok(results.into_iter().map(|r| r.unwrap()).collect())
}
