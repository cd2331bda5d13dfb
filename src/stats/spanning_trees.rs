//! Spanning tree counts (Matrix-Tree theorem) for districts.
use crate::graph::Graph;
use ndarray::*;
use ndarray_linalg::*;

/// The precision of the eigenvalues (and other intermediate values).
type MatEl = f64;

/// The largest region (in nodes) for which spanning tree counts are
/// computed. The count is always exact (eigenvalue product of the
/// region Laplacian); this limit exists because the computation is
/// cubic in the region size, so chain parameters that would produce
/// larger merge regions are rejected up front rather than silently
/// approximated.
pub const ST_EXACT_LIMIT: usize = 1024;

/// Computes the Laplacian matrix of a subgraph induced by a list of nodes.
fn subgraph_laplacian(graph: &Graph, nodes: &[usize]) -> Array2<MatEl> {
    let n = nodes.len();
    let mut in_nodes = vec![false; graph.neighbors.len()];
    for &node in nodes.iter() {
        in_nodes[node] = true;
    }

    let mut lap = Array2::<MatEl>::zeros((n, n));
    for (ii, &outer) in nodes.iter().enumerate() {
        for (jj, &inner) in nodes.iter().enumerate() {
            if ii > jj {
                continue; // symmetry
            } else if ii == jj {
                // Case: diagonal (node degrees within the subgraph).
                let degree = graph.neighbors[inner]
                    .iter()
                    .filter(|&n| in_nodes[*n])
                    .count();
                lap[[ii, ii]] = degree as MatEl;
            } else if graph.neighbors[inner].contains(&outer) {
                // Case: adjacent nodes (-1).
                lap[[ii, jj]] = -1 as MatEl;
                lap[[jj, ii]] = -1 as MatEl;
            }
        }
    }
    lap
}

/// Computes the number of spanning trees in the subgraph induced by the
/// list of nodes (the product of the Laplacian's nonzero eigenvalues,
/// divided by the node count).
pub fn subgraph_spanning_tree_count(graph: &Graph, nodes: &[usize]) -> MatEl {
    subgraph_log_spanning_tree_count(graph, nodes).exp()
}

/// Computes the natural log of the number of spanning trees in the
/// subgraph induced by the list of nodes.
///
/// The log form is what the sampler consumes: tree counts overflow f64
/// for even moderately sized regions, but acceptance ratios only ever
/// need count *ratios*, which are differences in log space.
pub fn subgraph_log_spanning_tree_count(graph: &Graph, nodes: &[usize]) -> MatEl {
    if nodes.len() == 1 {
        return 0.0; // special case: single node (one empty tree)
    }
    assert!(
        nodes.len() <= ST_EXACT_LIMIT,
        "spanning tree count requested for a region of {} nodes (limit {})",
        nodes.len(),
        ST_EXACT_LIMIT
    );
    let lap = subgraph_laplacian(graph, nodes);
    let ev = lap.clone().eigvals().unwrap();
    let log_prod = ev
        .iter()
        .map(|&n| n.re)
        .filter(|&n| n > 1e-6)
        .map(|n| n.ln())
        .sum::<MatEl>();
    log_prod - (nodes.len() as MatEl).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    #[rustfmt::skip]
    fn subgraph_laplacian_2x2() {
        let expected = arr2(
            &[[ 2., -1., -1.,  0.],
              [-1.,  2.,  0., -1.],
              [-1.,  0.,  2., -1.],
              [ 0., -1., -1.,  2.]]);
        let grid = Graph::rect_grid(2, 2);
        assert_eq!(subgraph_laplacian(&grid, &(0..4).collect::<Vec<usize>>()), expected);
    }

    #[rstest]
    #[rustfmt::skip]
    fn subgraph_spanning_tree_count_square_grids(
        #[values((1, 1.), (2, 4.), (3, 192.), (4, 100352.), (5, 557568000.))]
        size_count: (usize, MatEl)
    ) {
        // Number of spanning trees in an nXn grid: https://oeis.org/A007341
        let n = size_count.0;
        let expected = size_count.1;
        let grid = Graph::rect_grid(n, n);
        let grid_indices: Vec<usize> = (0..(n * n)).collect();
        assert_relative_eq!(
            subgraph_spanning_tree_count(&grid, &grid_indices),
            expected,
            max_relative = 0.0001);
    }

    #[test]
    fn log_count_matches_count() {
        let grid = Graph::rect_grid(3, 3);
        let nodes: Vec<usize> = (0..9).collect();
        assert_relative_eq!(
            subgraph_log_spanning_tree_count(&grid, &nodes),
            192.0_f64.ln(),
            max_relative = 0.0001
        );
    }

    #[test]
    fn count_on_partial_region() {
        // A path of three nodes has exactly one spanning tree.
        let grid = Graph::rect_grid(3, 3);
        assert_relative_eq!(
            subgraph_spanning_tree_count(&grid, &[0, 1, 2]),
            1.0,
            max_relative = 0.0001
        );
    }
}
