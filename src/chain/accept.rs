//! The Metropolis-Hastings acceptance test.
//!
//! Merge-split proposals are not symmetric: the probability of drawing
//! a spanning tree consistent with a particular two-district split is
//! proportional to the product of the districts' spanning tree counts.
//! Detailed balance therefore requires correcting the energy-based
//! acceptance probability by the ratio of the reverse and forward
//! proposal probabilities, which reduces to the old pair's tree count
//! product over the new pair's.
use crate::chain::MergeSplitProposal;
use crate::graph::Graph;
use crate::partition::Partition;
use crate::stats::subgraph_log_spanning_tree_count;

/// Computes the log proposal-probability correction `ln R` for a
/// proposal: the log spanning tree counts of the two current districts
/// minus those of the two proposed districts.
pub fn ln_tree_count_ratio(
    graph: &Graph,
    partition: &Partition,
    proposal: &MergeSplitProposal,
) -> f64 {
    let old = subgraph_log_spanning_tree_count(graph, &partition.dist_nodes[proposal.a_label])
        + subgraph_log_spanning_tree_count(graph, &partition.dist_nodes[proposal.b_label]);
    let new = subgraph_log_spanning_tree_count(graph, &proposal.a_nodes)
        + subgraph_log_spanning_tree_count(graph, &proposal.b_nodes);
    old - new
}

/// Computes the acceptance probability
/// `min(1, R * exp(E_old - E_new))` in log space.
/// Lower energy is preferred; `ln_ratio` is the log of the
/// reverse-over-forward proposal probability ratio.
pub fn acceptance_prob(ln_ratio: f64, e_old: f64, e_new: f64) -> f64 {
    let ln_p = ln_ratio + e_old - e_new;
    if ln_p >= 0.0 {
        1.0
    } else {
        ln_p.exp()
    }
}
