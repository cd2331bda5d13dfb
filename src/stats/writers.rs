//! Writers for streaming chain steps and statistics to stdout.
use crate::chain::MergeSplitProposal;
use crate::graph::Graph;
use crate::partition::Partition;
use crate::stats::{partition_sums, SelfLoopCounts, SelfLoopReason};
use serde_json::json;
use std::io::Result;

/// A standard interface for writing steps and statistics to stdout.
pub trait StatsWriter: Send {
    /// Prints data from the initial partition.
    fn init(&mut self, graph: &Graph, partition: &Partition) -> Result<()>;

    /// Prints data from a proposal that reached the acceptance test.
    /// `partition` reflects the proposal if and only if `accepted`.
    fn step(
        &mut self,
        step: u64,
        graph: &Graph,
        partition: &Partition,
        proposal: &MergeSplitProposal,
        counts: &SelfLoopCounts,
        accepted: bool,
        energy: f64,
    ) -> Result<()>;

    /// Cleans up after the last step (useful for testing).
    fn close(&mut self) -> Result<()>;
}

/// Writes chain statistics in TSV (tab-separated values) format.
/// Each proposal that reaches the acceptance test is a line; no
/// statistics are saved about the initial partition.
pub struct TSVWriter {}

/// Writes statistics in JSONL (JSON Lines) format.
pub struct JSONLWriter {
    /// Determines whether node deltas should be saved for each step.
    nodes: bool,
}

/// Writes 1-indexed assignment vectors in space-delimited format
/// (with step number prefix), one line per accepted step.
pub struct AssignmentsOnlyWriter {}

/// A writer that discards everything (used by in-memory runners and
/// benchmarks).
#[derive(Default)]
pub struct NullWriter {}

impl NullWriter {
    pub fn new() -> NullWriter {
        NullWriter {}
    }
}

impl StatsWriter for NullWriter {
    fn init(&mut self, _graph: &Graph, _partition: &Partition) -> Result<()> {
        Ok(())
    }

    fn step(
        &mut self,
        _step: u64,
        _graph: &Graph,
        _partition: &Partition,
        _proposal: &MergeSplitProposal,
        _counts: &SelfLoopCounts,
        _accepted: bool,
        _energy: f64,
    ) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl TSVWriter {
    pub fn new() -> TSVWriter {
        TSVWriter {}
    }
}

impl JSONLWriter {
    pub fn new(nodes: bool) -> JSONLWriter {
        JSONLWriter { nodes: nodes }
    }
}

impl AssignmentsOnlyWriter {
    pub fn new() -> AssignmentsOnlyWriter {
        AssignmentsOnlyWriter {}
    }
}

impl StatsWriter for TSVWriter {
    fn init(&mut self, _graph: &Graph, _partition: &Partition) -> Result<()> {
        print!("step\tno_split\tno_valid_cut\tdisconnected\t");
        println!("a_label\tb_label\ta_pop\tb_pop\taccepted\tenergy");
        Ok(())
    }

    fn step(
        &mut self,
        step: u64,
        _graph: &Graph,
        _partition: &Partition,
        proposal: &MergeSplitProposal,
        counts: &SelfLoopCounts,
        accepted: bool,
        energy: f64,
    ) -> Result<()> {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            step,
            counts.get(SelfLoopReason::NoSplit),
            counts.get(SelfLoopReason::NoValidCut),
            counts.get(SelfLoopReason::Disconnected),
            proposal.a_label,
            proposal.b_label,
            proposal.a_pop,
            proposal.b_pop,
            accepted,
            energy
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl StatsWriter for JSONLWriter {
    fn init(&mut self, graph: &Graph, partition: &Partition) -> Result<()> {
        let stats = json!({
            "init": {
                "num_dists": partition.num_dists,
                "populations": partition.dist_pops,
                "county_splits": partition.county_splits(graph),
                "sums": partition_sums(graph, partition)
            }
        });
        println!("{}", stats);
        Ok(())
    }

    fn step(
        &mut self,
        step: u64,
        graph: &Graph,
        partition: &Partition,
        proposal: &MergeSplitProposal,
        counts: &SelfLoopCounts,
        accepted: bool,
        energy: f64,
    ) -> Result<()> {
        let mut step = json!({
            "step": step,
            "dists": (proposal.a_label, proposal.b_label),
            "populations": (proposal.a_pop, proposal.b_pop),
            "accepted": accepted,
            "energy": energy,
            "county_splits": partition.county_splits(graph),
            "counts": counts
        });
        if self.nodes {
            step.as_object_mut().unwrap().insert(
                "nodes".to_string(),
                json!((proposal.a_nodes.clone(), proposal.b_nodes.clone())),
            );
        }
        println!("{}", json!({ "step": step }));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl StatsWriter for AssignmentsOnlyWriter {
    fn init(&mut self, _graph: &Graph, partition: &Partition) -> Result<()> {
        let plan: Vec<String> = partition.plan().iter().map(|a| a.to_string()).collect();
        println!("0 {}", plan.join(" "));
        Ok(())
    }

    fn step(
        &mut self,
        step: u64,
        _graph: &Graph,
        partition: &Partition,
        _proposal: &MergeSplitProposal,
        _counts: &SelfLoopCounts,
        accepted: bool,
        _energy: f64,
    ) -> Result<()> {
        if accepted {
            let plan: Vec<String> = partition.plan().iter().map(|a| a.to_string()).collect();
            println!("{} {}", step, plan.join(" "));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
