// Functional tests that verify that the neutral merge-split chain
// approximately targets its spanning-tree-implied distribution on
// small grids.
use mergesplit::chain::run::run_merge_split;
use mergesplit::chain::MergeSplitParams;
use mergesplit::constraints::ConstraintSet;
use mergesplit::graph::Graph;
use mergesplit::stats::NullWriter;
use std::collections::HashMap;

/// RNG seed for all tests.
const RNG_SEED: u64 = 153434375;

/// Canonicalizes a 1-indexed plan as the sorted set of nodes sharing
/// node 0's district (two districts assumed).
fn node_zero_side(plan: &[u32]) -> Vec<usize> {
    plan.iter()
        .enumerate()
        .filter(|(_, &assn)| assn == plan[0])
        .map(|(node, _)| node)
        .collect()
}

/// The 4x2 grid (nodes `2 * col + row`) admits exactly four balanced
/// two-district plans:
///
///   V  = {0,1,2,3} | {4,5,6,7}   two 2x2 blocks    tau = 4*4   cut = 2
///   H  = {0,2,4,6} | {1,3,5,7}   two rows          tau = 1*1   cut = 4
///   Z1 = {0,1,2,4} | {3,5,6,7}   zigzag            tau = 1*1   cut = 4
///   Z2 = {0,1,3,5} | {2,4,6,7}   zigzag            tau = 1*1   cut = 4
///
/// With exact population bounds, a spanning tree of the merged region
/// has at most one balanced edge (two distinct 4-node subtrees cannot
/// coexist among 8 nodes), so with k = 1 the proposal drawn from a
/// uniform tree is a function of the tree alone: the trees proposing a
/// split S are exactly (tree on A) x (tree on B) x (crossing edge),
/// i.e. tau(A) * tau(B) * cut(S) of them, independent of the current
/// state. Against that proposal, the tree-count acceptance correction
/// leaves the stationary distribution pi(S) proportional to cut(S):
///
///   pi(V) = 2/14 = 1/7,  pi(H) = pi(Z1) = pi(Z2) = 4/14 = 2/7.
///
/// (A sign flip in the correction would instead weight each split by
/// cut(S) * tau(A)^2 * tau(B)^2, putting ~97% of the mass on V.)
#[test]
fn test_neutral_chain_targets_cut_size_distribution() {
    let grid = Graph::rect_grid(4, 2);
    let plan: Vec<u32> = vec![1, 1, 1, 1, 2, 2, 2, 2];
    let params = MergeSplitParams {
        min_pop: 4,
        max_pop: 4,
        num_steps: 50_000,
        rng_seed: RNG_SEED,
        compactness: 1.0,
        k: 1,
        adapt_k_thresh: 0.975,
    };
    let results = run_merge_split(
        &grid,
        &plan,
        2,
        &ConstraintSet::empty(),
        &params,
        Box::new(NullWriter::new()),
    )
    .unwrap();

    let mut counts = HashMap::<Vec<usize>, usize>::new();
    for plan in results.plans.iter() {
        *counts.entry(node_zero_side(plan)).or_insert(0) += 1;
    }

    let expected = [
        (vec![0, 1, 2, 3], 1.0 / 7.0),
        (vec![0, 2, 4, 6], 2.0 / 7.0),
        (vec![0, 1, 2, 4], 2.0 / 7.0),
        (vec![0, 1, 3, 5], 2.0 / 7.0),
    ];
    assert_eq!(counts.len(), expected.len(), "unexpected plan visited");
    let total = results.plans.len() as f64;
    for (side, target) in expected.iter() {
        let freq = *counts.get(side).unwrap_or(&0) as f64 / total;
        assert!(
            (freq - target).abs() < 0.03,
            "split {:?}: frequency {:.4}, target {:.4}",
            side,
            freq,
            target
        );
    }
}

/// On the 2x3 grid the three balanced plans all have unit tree counts
/// and three-edge cuts, so the neutral chain must weight them equally
/// even though the splits are not related by symmetry.
#[test]
fn test_neutral_chain_uniform_on_2x3_grid() {
    let grid = Graph::rect_grid(3, 2);
    let plan: Vec<u32> = vec![1, 1, 1, 2, 2, 2];
    let params = MergeSplitParams {
        min_pop: 3,
        max_pop: 3,
        num_steps: 30_000,
        rng_seed: RNG_SEED,
        compactness: 1.0,
        k: 1,
        adapt_k_thresh: 0.975,
    };
    let results = run_merge_split(
        &grid,
        &plan,
        2,
        &ConstraintSet::empty(),
        &params,
        Box::new(NullWriter::new()),
    )
    .unwrap();

    let mut counts = HashMap::<Vec<usize>, usize>::new();
    for plan in results.plans.iter() {
        *counts.entry(node_zero_side(plan)).or_insert(0) += 1;
    }
    assert_eq!(counts.len(), 3);
    let total = results.plans.len() as f64;
    for (side, &count) in counts.iter() {
        let freq = count as f64 / total;
        assert!(
            (freq - 1.0 / 3.0).abs() < 0.03,
            "split {:?}: frequency {:.4}, target {:.4}",
            side,
            freq,
            1.0 / 3.0
        );
    }
}
