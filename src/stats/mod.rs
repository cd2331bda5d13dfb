//! Statistics over chains, partitions, and proposals.
mod self_loops;
mod spanning_trees;
mod writers;

pub use self::self_loops::{SelfLoopCounts, SelfLoopReason};
pub use self::spanning_trees::{
    subgraph_log_spanning_tree_count, subgraph_spanning_tree_count, ST_EXACT_LIMIT,
};
pub use self::writers::{AssignmentsOnlyWriter, JSONLWriter, NullWriter, StatsWriter, TSVWriter};

use crate::graph::Graph;
use crate::partition::Partition;
use std::collections::HashMap;

/// Computes per-district sums of a single node attribute column.
pub fn partition_attr_sums(graph: &Graph, partition: &Partition, attr: &str) -> Vec<u32> {
    let values = &graph.attr[attr];
    assert!(values.len() == graph.neighbors.len());
    partition
        .dist_nodes
        .iter()
        .map(|nodes| nodes.iter().map(|&n| values[n]).sum())
        .collect()
}

/// Computes per-district sums of all node attribute columns.
pub fn partition_sums(graph: &Graph, partition: &Partition) -> HashMap<String, Vec<u32>> {
    graph
        .attr
        .keys()
        .map(|key| (key.clone(), partition_attr_sums(graph, partition, key)))
        .collect()
}
