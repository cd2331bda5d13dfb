//! Random spanning tree sampling over merge regions.
use crate::buffers::SpanningTreeBuffer;
use crate::graph::{Edge, Graph};
use rand::rngs::SmallRng;
use rand::Rng;
use std::cmp::{max, min};
use std::error::Error;
use std::fmt;

/// Error raised when a spanning tree is requested over a region whose
/// induced subgraph is not connected. Callers must guarantee
/// connectivity before invoking a sampler; Wilson's algorithm does not
/// terminate on disconnected input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectedRegionError {
    /// The number of nodes in the region.
    pub region_size: usize,
    /// The number of nodes reachable from the region's first node.
    pub reached: usize,
}

impl fmt::Display for DisconnectedRegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region is disconnected: reached {} of {} nodes",
            self.reached, self.region_size
        )
    }
}

impl Error for DisconnectedRegionError {}

/// Verifies that a (relabeled) subgraph is connected; returns the
/// witness counts on failure.
fn check_connected(graph: &Graph) -> Result<(), DisconnectedRegionError> {
    let n = graph.pops.len();
    if n == 0 {
        return Ok(());
    }
    let mut visited = vec![false; n];
    let mut stack = vec![0];
    visited[0] = true;
    let mut reached = 0;
    while let Some(next) = stack.pop() {
        reached += 1;
        for &neighbor in graph.neighbors[next].iter() {
            if !visited[neighbor] {
                visited[neighbor] = true;
                stack.push(neighbor);
            }
        }
    }
    if reached == n {
        Ok(())
    } else {
        Err(DisconnectedRegionError {
            region_size: n,
            reached: reached,
        })
    }
}

pub trait SpanningTreeSampler {
    /// Samples a random spanning tree of `graph` using `rng`; inserts the
    /// tree into `buf`. Fails if `graph` is not connected.
    fn random_spanning_tree(
        &mut self,
        graph: &Graph,
        buf: &mut SpanningTreeBuffer,
        rng: &mut SmallRng,
    ) -> Result<(), DisconnectedRegionError>;
}
pub use crate::spanning_tree::ust::USTSampler;
pub use crate::spanning_tree::weighted::WeightedMSTSampler;

/// Spanning tree sampling from the uniform distribution.
mod ust {
    use super::*;
    use crate::buffers::RandomRangeBuffer;

    /// A reusable buffer for Wilson's algorithm.
    struct USTBuffer {
        /// Boolean representation of the subset of nodes in the spanning tree.
        in_tree: Vec<bool>,
        /// The next node in the spanning tree (for a chosen ordering).
        next: Vec<i64>,
        /// The edge indices in the tree.
        edges: Vec<usize>,
    }

    impl USTBuffer {
        /// Creates a buffer for a spanning tree of a subgraph
        /// within a graph of size `n`.
        fn new(n: usize) -> USTBuffer {
            USTBuffer {
                in_tree: vec![false; n],
                next: vec![-1; n],
                edges: Vec::<usize>::with_capacity(n - 1),
            }
        }

        /// Resets the buffer.
        fn clear(&mut self) {
            self.in_tree.fill(false);
            self.next.fill(-1);
            self.edges.clear();
        }
    }

    /// Samples random spanning trees from the uniform distribution.
    pub struct USTSampler {
        /// A buffer for Wilson's algorithm.
        ust_buf: USTBuffer,
        /// A reservoir of random bytes (used for quickly selecting random node neighbors).
        range_buf: RandomRangeBuffer,
    }

    impl USTSampler {
        /// Creates a UST sampler (and underlying buffers) for a graph of
        /// approximate size `n`. (A reservoir of random bytes is initialized
        /// using `rng`.)
        pub fn new(n: usize, rng: &mut SmallRng) -> USTSampler {
            USTSampler {
                ust_buf: USTBuffer::new(n),
                range_buf: RandomRangeBuffer::new(rng),
            }
        }
    }

    impl SpanningTreeSampler for USTSampler {
        /// Draws a random spanning tree of a graph from the uniform
        /// distribution using Wilson's algorithm [1] (in essence, a
        /// loop-erased random walk). The tree is inserted into `buf`.
        ///
        /// The maximum degree of the graph must be ≤256; otherwise,
        /// sampling from the uniform distribution is not guaranteed.
        ///
        /// # References
        /// [1]  Wilson, David Bruce. "Generating random spanning trees more quickly
        ///      than the cover time." Proceedings of the twenty-eighth annual ACM
        ///      symposium on Theory of computing. 1996.
        fn random_spanning_tree(
            &mut self,
            graph: &Graph,
            buf: &mut SpanningTreeBuffer,
            rng: &mut SmallRng,
        ) -> Result<(), DisconnectedRegionError> {
            check_connected(graph)?;
            buf.clear();
            self.ust_buf.clear();
            let n = graph.pops.len();
            let root = rng.gen_range(0..n);
            self.ust_buf.in_tree[root] = true;
            for i in 0..n {
                let mut u = i;
                while !self.ust_buf.in_tree[u] {
                    let neighbors = &graph.neighbors[u];
                    let neighbor =
                        neighbors[self.range_buf.range(rng, neighbors.len() as u8) as usize];
                    self.ust_buf.next[u] = neighbor as i64;
                    u = neighbor;
                }
                u = i;
                while !self.ust_buf.in_tree[u] {
                    self.ust_buf.in_tree[u] = true;
                    u = self.ust_buf.next[u] as usize;
                }
            }

            for (curr, &prev) in self.ust_buf.next.iter().enumerate().take(n) {
                if prev >= 0 {
                    let a = min(curr, prev as usize);
                    let b = max(curr, prev as usize);
                    let mut edge_idx = graph.edges_start[a];
                    while graph.edges[edge_idx].0 == a {
                        if graph.edges[edge_idx].1 == b {
                            self.ust_buf.edges.push(edge_idx);
                            break;
                        }
                        edge_idx += 1;
                    }
                }
            }
            // `check_connected` holds, so Wilson's algorithm must
            // produce exactly n - 1 edges.
            assert_eq!(self.ust_buf.edges.len(), n - 1);

            for &edge in self.ust_buf.edges.iter() {
                let Edge(src, dst) = graph.edges[edge];
                buf.st[src].push(dst);
                buf.st[dst].push(src);
            }
            Ok(())
        }
    }
}

/// Spanning tree sampling via random edge weights, with an optional
/// compactness bias.
mod weighted {
    use super::*;
    use petgraph::unionfind::UnionFind;

    /// Samples random spanning trees by drawing random edge keys and
    /// finding the minimum spanning tree under the induced edge order.
    ///
    /// With `compactness = 0`, every edge order is equally likely and the
    /// sampler reduces to a uniformly random MST. Larger values of
    /// `compactness` upweight edges between high-degree (interior) nodes,
    /// which biases trees toward interior edges and the eventual cuts
    /// toward shorter, more compact boundaries.
    pub struct WeightedMSTSampler {
        /// The compactness bias exponent (≥ 0).
        compactness: f64,
        /// Buffer for keyed edges, sorted before each Kruskal pass.
        keyed_edges: Vec<(f64, Edge)>,
    }

    impl WeightedMSTSampler {
        /// Initializes a weighted MST sampler for a graph with approximate
        /// size `n` and the given compactness exponent.
        pub fn new(n: usize, compactness: f64) -> WeightedMSTSampler {
            WeightedMSTSampler {
                compactness: compactness,
                keyed_edges: Vec::<(f64, Edge)>::with_capacity(8 * n),
            }
        }
    }

    impl SpanningTreeSampler for WeightedMSTSampler {
        /// Draws a random spanning tree by assigning each edge the key
        /// `u^(1/w)` (u uniform, w the edge's compactness weight) and
        /// running Kruskal's algorithm on the descending key order.
        /// This yields a random spanning tree where an edge's chance of
        /// early inclusion scales with its weight (the weighted-reservoir
        /// key trick of Efraimidis and Spirakis).
        fn random_spanning_tree(
            &mut self,
            graph: &Graph,
            buf: &mut SpanningTreeBuffer,
            rng: &mut SmallRng,
        ) -> Result<(), DisconnectedRegionError> {
            buf.clear();
            self.keyed_edges.clear();
            for edge in graph.edges.iter() {
                let weight = ((graph.neighbors[edge.0].len() * graph.neighbors[edge.1].len())
                    as f64)
                    .powf(self.compactness);
                let u: f64 = rng.gen();
                self.keyed_edges.push((u.powf(1.0 / weight), edge.clone()));
            }
            self.keyed_edges
                .sort_unstable_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

            // Kruskal's algorithm: add edges until the region is spanned.
            let n = graph.pops.len();
            let mut uf = UnionFind::<usize>::new(n);
            let mut n_unions = 0;
            for (_, Edge(src, dst)) in self.keyed_edges.iter() {
                if n_unions == n - 1 {
                    break;
                }
                if uf.union(*src, *dst) {
                    buf.st[*src].push(*dst);
                    buf.st[*dst].push(*src);
                    n_unions += 1;
                }
            }
            if n_unions != n - 1 {
                // Kruskal exhausted the edge list without spanning the
                // region, so the region must be disconnected.
                return Err(DisconnectedRegionError {
                    region_size: n,
                    reached: n_unions + 1,
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Counts tree edges and checks that the tree spans the graph.
    fn tree_is_spanning(graph: &Graph, st: &[Vec<usize>]) -> bool {
        let n = graph.pops.len();
        let edge_count: usize = st.iter().take(n).map(|adj| adj.len()).sum();
        if edge_count != 2 * (n - 1) {
            return false;
        }
        let mut visited = vec![false; n];
        let mut stack = vec![0];
        visited[0] = true;
        let mut reached = 0;
        while let Some(next) = stack.pop() {
            reached += 1;
            for &neighbor in st[next].iter() {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }
        reached == n
    }

    #[test]
    fn ust_sampler_spans_grid() {
        let grid = Graph::rect_grid(4, 4);
        let mut rng = SmallRng::seed_from_u64(2023);
        let mut sampler = USTSampler::new(16, &mut rng);
        let mut buf = SpanningTreeBuffer::new(16);
        for _ in 0..25 {
            sampler
                .random_spanning_tree(&grid, &mut buf, &mut rng)
                .unwrap();
            assert!(tree_is_spanning(&grid, &buf.st));
        }
    }

    #[test]
    fn weighted_sampler_spans_grid() {
        let grid = Graph::rect_grid(4, 4);
        let mut rng = SmallRng::seed_from_u64(2023);
        let mut sampler = WeightedMSTSampler::new(16, 1.5);
        let mut buf = SpanningTreeBuffer::new(16);
        for _ in 0..25 {
            sampler
                .random_spanning_tree(&grid, &mut buf, &mut rng)
                .unwrap();
            assert!(tree_is_spanning(&grid, &buf.st));
        }
    }

    #[test]
    fn ust_sampler_disconnected_region() {
        // Two isolated 2x2 grids glued into one node ID space.
        let mut disconnected = Graph::rect_grid(2, 2);
        let other = Graph::rect_grid(2, 2);
        for (node, adj) in other.neighbors.iter().enumerate() {
            disconnected
                .neighbors
                .push(adj.iter().map(|&n| n + 4).collect());
            disconnected.pops.push(other.pops[node]);
            disconnected.counties.push(0);
            disconnected.edges_start.push(0);
        }
        for edge in other.edges.iter() {
            disconnected
                .edges
                .push(crate::graph::Edge(edge.0 + 4, edge.1 + 4));
        }
        for (node, _) in other.neighbors.iter().enumerate() {
            disconnected.edges_start[node + 4] = disconnected
                .edges
                .iter()
                .position(|e| e.0 == node + 4)
                .unwrap_or(disconnected.edges.len());
        }
        disconnected.total_pop = 8;

        let mut rng = SmallRng::seed_from_u64(2023);
        let mut ust = USTSampler::new(8, &mut rng);
        let mut weighted = WeightedMSTSampler::new(8, 0.0);
        let mut buf = SpanningTreeBuffer::new(8);
        let err = ust
            .random_spanning_tree(&disconnected, &mut buf, &mut rng)
            .unwrap_err();
        assert_eq!(err.region_size, 8);
        assert_eq!(err.reached, 4);
        assert!(weighted
            .random_spanning_tree(&disconnected, &mut buf, &mut rng)
            .is_err());
    }
}
