//! The merge-split proposal engine.
//!
//! A merge-split step merges two adjacent districts, draws a random
//! spanning tree of the merged region, and cuts a tree edge to re-split
//! the region into two population-valid districts. The submodules
//! provide the Metropolis-Hastings acceptance test ([`accept`]), the
//! adaptive boundary-parameter controller ([`adapt`]), and chain
//! runners ([`run`]).
pub mod accept;
pub mod adapt;
pub mod run;

use crate::buffers::SplitBuffer;
use crate::graph::Graph;
use crate::stats::{SelfLoopReason, ST_EXACT_LIMIT};
use rand::rngs::SmallRng;
use rand::Rng;

/// The number of cut-selection retries per drawn spanning tree before
/// the iteration is reported as a self-loop.
pub const CUT_RETRIES: u32 = 16;

/// Parameters for a merge-split chain run.
#[derive(Clone, Debug)]
pub struct MergeSplitParams {
    /// The minimum population of a district.
    pub min_pop: u32,
    /// The maximum population of a district.
    pub max_pop: u32,
    /// The number of chain iterations (the seed state counts as the
    /// first iteration).
    pub num_steps: u64,
    /// The seed of the RNG used to draw proposals.
    pub rng_seed: u64,
    /// The spanning tree compactness bias exponent (≥ 0). A value of
    /// exactly 1 selects uniform spanning tree sampling; any other
    /// value selects the weighted-MST sampler.
    pub compactness: f64,
    /// The boundary parameter: the number of best-balance tree edges
    /// eligible as cut candidates per proposal. 0 requests adaptive
    /// control (starting from 1); a nonzero value pins k for the whole
    /// run.
    pub k: u32,
    /// The cumulative acceptance rate bound that triggers a k increase
    /// under adaptive control.
    pub adapt_k_thresh: f64,
}

impl MergeSplitParams {
    /// Validates parameters once, before any sampling starts.
    pub fn validate(&self, graph: &Graph) -> Result<(), String> {
        if self.min_pop > self.max_pop {
            return Err(format!(
                "Invalid population bounds: min {} > max {}",
                self.min_pop, self.max_pop
            ));
        }
        if self.num_steps == 0 {
            return Err("Number of steps must be positive".to_string());
        }
        if self.compactness < 0.0 || !self.compactness.is_finite() {
            return Err(format!("Invalid compactness {}", self.compactness));
        }
        if !(0.0..=1.0).contains(&self.adapt_k_thresh) {
            return Err(format!(
                "adapt_k_thresh must be in [0, 1] (got {})",
                self.adapt_k_thresh
            ));
        }
        let bound = node_bound(&graph.pops, self.max_pop);
        if bound > ST_EXACT_LIMIT {
            return Err(format!(
                "Merge regions may contain up to {} nodes; \
                 exact spanning tree counts are limited to {} nodes",
                bound, ST_EXACT_LIMIT
            ));
        }
        Ok(())
    }
}

/// A proposed update to a partitioning: a re-split of two districts.
#[derive(Clone)]
pub struct MergeSplitProposal {
    /// The label of the first district in the re-split.
    pub a_label: usize,
    /// The label of the second district in the re-split.
    pub b_label: usize,
    /// The population of the new `a`-district.
    pub a_pop: u32,
    /// The population of the new `b`-district.
    pub b_pop: u32,
    /// The nodes in the new `a`-district (parent graph IDs).
    pub a_nodes: Vec<usize>,
    /// The nodes in the new `b`-district (parent graph IDs).
    pub b_nodes: Vec<usize>,
}

impl MergeSplitProposal {
    /// Creates a proposal buffer for districts of up to `n` nodes total.
    pub fn new_buffer(n: usize) -> MergeSplitProposal {
        MergeSplitProposal {
            a_label: 0,
            b_label: 0,
            a_pop: 0,
            b_pop: 0,
            a_nodes: Vec::<usize>::with_capacity(n),
            b_nodes: Vec::<usize>::with_capacity(n),
        }
    }

    /// Resets the buffer.
    pub fn clear(&mut self) {
        self.a_label = 0;
        self.b_label = 0;
        self.a_pop = 0;
        self.b_pop = 0;
        self.a_nodes.clear();
        self.b_nodes.clear();
    }
}

/// Returns the maximum number of nodes in two districts based on node
/// populations (`pops`) and the maximum district population (`max_pop`).
///
/// Used to choose buffer sizes for merge-split steps.
pub fn node_bound(pops: &[u32], max_pop: u32) -> usize {
    let mut sorted_pops = pops.to_vec();
    sorted_pops.sort_unstable();
    let mut bound = 0;
    let mut total = 0;
    while bound < sorted_pops.len() && total < 2 * max_pop {
        total += sorted_pops[bound];
        bound += 1;
    }
    bound + 1
}

/// Cuts a random population-balanced edge of a spanning tree, splitting
/// the merged region back into two districts.
///
/// The tree is oriented by a BFS from an arbitrary root; cutting the
/// edge above node `v` separates the subtree rooted at `v` (the new
/// `a`-district) from the rest (the new `b`-district). Candidate cut
/// nodes are ranked by the population deviation of the induced split,
/// and one of the `k` best candidates is chosen uniformly; a candidate
/// outside the population bounds costs a retry, up to [`CUT_RETRIES`].
///
/// On success, fills `proposal` (with node IDs translated back to the
/// parent graph via `raw_nodes`) and returns the number of
/// population-valid candidates among the `k` eligible ones. Fails with
/// a self-loop reason if the tree admits no valid cut.
#[allow(clippy::too_many_arguments)]
pub fn random_split(
    graph: &Graph,
    rng: &mut SmallRng,
    st: &[Vec<usize>],
    a_label: usize,
    b_label: usize,
    buf: &mut SplitBuffer,
    proposal: &mut MergeSplitProposal,
    raw_nodes: &[usize],
    params: &MergeSplitParams,
    k: u32,
) -> Result<usize, SelfLoopReason> {
    buf.clear();
    proposal.clear();
    let n = graph.pops.len();
    if n < 2 {
        return Err(SelfLoopReason::NoSplit);
    }
    let total_pop = graph.total_pop;

    // Orient the tree with a BFS from node 0. The deque doubles as the
    // BFS visit order: `head` walks it without popping.
    buf.deque.push_back(0);
    buf.visited[0] = true;
    let mut head = 0;
    while head < buf.deque.len() {
        let node = buf.deque[head];
        head += 1;
        for &neighbor in st[node].iter() {
            if !buf.visited[neighbor] {
                buf.visited[neighbor] = true;
                buf.pred[neighbor] = node;
                buf.succ[node].push(neighbor);
                buf.deque.push_back(neighbor);
            }
        }
    }

    // Accumulate subtree populations in reverse BFS order.
    for idx in 0..n {
        buf.tree_pops[idx] = graph.pops[idx];
    }
    for idx in (1..buf.deque.len()).rev() {
        let node = buf.deque[idx];
        buf.tree_pops[buf.pred[node]] += buf.tree_pops[node];
    }

    // Rank every non-root node by the population deviation of the split
    // rooted there.
    let half = total_pop as f64 / 2.0;
    for idx in 1..buf.deque.len() {
        let node = buf.deque[idx];
        let dev = (buf.tree_pops[node] as f64 - half).abs();
        buf.candidates.push((node, dev));
    }
    buf.candidates
        .sort_unstable_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    let eligible = (k.max(1) as usize).min(buf.candidates.len());
    let n_valid = buf.candidates[..eligible]
        .iter()
        .filter(|&&(node, _)| {
            let a_pop = buf.tree_pops[node];
            let b_pop = total_pop - a_pop;
            params.min_pop <= a_pop
                && a_pop <= params.max_pop
                && params.min_pop <= b_pop
                && b_pop <= params.max_pop
        })
        .count();

    if n_valid == 0 {
        // No eligible candidate can be valid, so skip the draws.
        return Err(SelfLoopReason::NoValidCut);
    }

    // Draw cut candidates until one is population-valid.
    let mut split_root = None;
    for _ in 0..CUT_RETRIES {
        let (node, _) = buf.candidates[rng.gen_range(0..eligible)];
        let a_pop = buf.tree_pops[node];
        let b_pop = total_pop - a_pop;
        if params.min_pop <= a_pop
            && a_pop <= params.max_pop
            && params.min_pop <= b_pop
            && b_pop <= params.max_pop
        {
            split_root = Some(node);
            break;
        }
    }
    let split_root = match split_root {
        Some(node) => node,
        None => return Err(SelfLoopReason::NoValidCut),
    };

    // Mark the subtree under the cut (the new a-district).
    buf.deque.clear();
    buf.deque.push_back(split_root);
    buf.in_a[split_root] = true;
    while let Some(node) = buf.deque.pop_front() {
        for &succ in buf.succ[node].iter() {
            buf.in_a[succ] = true;
            buf.deque.push_back(succ);
        }
    }

    proposal.a_label = a_label;
    proposal.b_label = b_label;
    proposal.a_pop = buf.tree_pops[split_root];
    proposal.b_pop = total_pop - proposal.a_pop;
    for (idx, &node) in raw_nodes.iter().enumerate().take(n) {
        if buf.in_a[idx] {
            proposal.a_nodes.push(node);
        } else {
            proposal.b_nodes.push(node);
        }
    }
    Ok(n_valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{SpanningTreeBuffer, SubgraphBuffer};
    use crate::partition::Partition;
    use crate::spanning_tree::{SpanningTreeSampler, USTSampler};
    use rand::SeedableRng;

    fn params(min_pop: u32, max_pop: u32) -> MergeSplitParams {
        MergeSplitParams {
            min_pop: min_pop,
            max_pop: max_pop,
            num_steps: 10,
            rng_seed: 42,
            compactness: 1.0,
            k: 1,
            adapt_k_thresh: 0.975,
        }
    }

    #[test]
    fn node_bound_uniform_pops() {
        // Two districts of up to 6 population, unit pops: at most 13 nodes.
        assert_eq!(node_bound(&vec![1; 36], 6), 13);
    }

    #[test]
    fn validate_rejects_bad_params() {
        let grid = Graph::rect_grid(3, 3);
        let mut bad = params(4, 3);
        assert!(bad.validate(&grid).is_err());
        bad = params(2, 4);
        bad.num_steps = 0;
        assert!(bad.validate(&grid).is_err());
        bad = params(2, 4);
        bad.adapt_k_thresh = 1.5;
        assert!(bad.validate(&grid).is_err());
        bad = params(2, 4);
        bad.compactness = -1.0;
        assert!(bad.validate(&grid).is_err());
        assert!(params(2, 4).validate(&grid).is_ok());
    }

    #[test]
    fn random_split_balances_grid() {
        // Merge the two halves of a 4x4 grid and re-split; with unit
        // populations and exact bounds, both halves must have 8 nodes.
        let grid = Graph::rect_grid(4, 4);
        let partition = Partition::from_assignments(
            &grid,
            &[1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2],
        )
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut subgraph_buf = SubgraphBuffer::new(16, 16);
        let mut st_buf = SpanningTreeBuffer::new(16);
        let mut split_buf = SplitBuffer::new(16);
        let mut proposal = MergeSplitProposal::new_buffer(16);
        let mut sampler = USTSampler::new(16, &mut rng);
        let params = params(8, 8);

        let mut splits = 0;
        for _ in 0..50 {
            partition.subgraph(&grid, &mut subgraph_buf, 0, 1);
            sampler
                .random_spanning_tree(&subgraph_buf.graph, &mut st_buf, &mut rng)
                .unwrap();
            let result = random_split(
                &subgraph_buf.graph,
                &mut rng,
                &st_buf.st,
                0,
                1,
                &mut split_buf,
                &mut proposal,
                &subgraph_buf.raw_nodes,
                &params,
                4,
            );
            if let Ok(n_valid) = result {
                assert!(n_valid >= 1);
                assert_eq!(proposal.a_pop, 8);
                assert_eq!(proposal.b_pop, 8);
                assert_eq!(proposal.a_nodes.len() + proposal.b_nodes.len(), 16);
                assert!(grid.region_connected(&proposal.a_nodes));
                assert!(grid.region_connected(&proposal.b_nodes));
                splits += 1;
            }
        }
        assert!(splits > 0);
    }

    #[test]
    fn random_split_single_node_region() {
        let grid = Graph::rect_grid(1, 1);
        let mut rng = SmallRng::seed_from_u64(7);
        let mut split_buf = SplitBuffer::new(1);
        let mut proposal = MergeSplitProposal::new_buffer(1);
        let result = random_split(
            &grid,
            &mut rng,
            &[vec![]],
            0,
            1,
            &mut split_buf,
            &mut proposal,
            &[0],
            &params(0, 1),
            1,
        );
        assert_eq!(result, Err(SelfLoopReason::NoSplit));
    }
}
