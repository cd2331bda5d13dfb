//! Data structures for partitionings (districting plans).
use crate::buffers::SubgraphBuffer;
use crate::chain::MergeSplitProposal;
use crate::graph::{Edge, Graph};

/// A partitioning (districting plan) on top of a [Graph].
/// The graph is referenced implicitly (we don't store a reference to it).
#[derive(Clone)]
pub struct Partition {
    /// The number of districts (parts) in the partitioning.
    pub num_dists: u32,
    /// An assignment vector mapping nodes in the graph to
    /// district labels (0-indexed internally).
    pub assignments: Vec<u32>,
    /// The cut edges (that is, edges that connect nodes in different
    /// districts) in the partitioning.
    /// This should be consistent with `dist_nodes`.
    pub cut_edges: Vec<usize>,
    /// A flattened district adjacency matrix. A district pair's entry
    /// is the number of cut edges between the pair; nonadjacency is
    /// represented by a cut edge count of 0.
    pub dist_adj: Vec<u32>,
    /// The population in each district.
    pub dist_pops: Vec<u32>,
    /// The nodes in each district (a list-of-lists representation).
    /// This should be consistent with `assignments`.
    pub dist_nodes: Vec<Vec<usize>>,
}

impl Partition {
    /// Updates a [Partition] with an underlying `graph` to reflect a `proposal`.
    pub fn update(&mut self, graph: &Graph, proposal: &MergeSplitProposal) {
        // Move nodes.
        self.dist_nodes[proposal.a_label] = proposal.a_nodes.clone();
        self.dist_nodes[proposal.b_label] = proposal.b_nodes.clone();
        self.dist_pops[proposal.a_label] = proposal.a_pop;
        self.dist_pops[proposal.b_label] = proposal.b_pop;
        for &node in proposal.a_nodes.iter() {
            self.assignments[node] = proposal.a_label as u32;
        }
        for &node in proposal.b_nodes.iter() {
            self.assignments[node] = proposal.b_label as u32;
        }
        self.update_derived(graph);
    }

    /// Updates properties derived from the partition's assignments
    /// (cut edges list, district adjacency matrix).
    fn update_derived(&mut self, graph: &Graph) {
        let mut dist_adj = vec![0; (self.num_dists * self.num_dists) as usize];
        let mut cut_edges = Vec::<usize>::new();
        for (index, edge) in graph.edges.iter().enumerate() {
            let dist_a = self.assignments[edge.0];
            let dist_b = self.assignments[edge.1];
            assert!(dist_a < self.num_dists);
            assert!(dist_b < self.num_dists);
            if dist_a != dist_b {
                dist_adj[((dist_a * self.num_dists) + dist_b) as usize] += 1;
                dist_adj[((dist_b * self.num_dists) + dist_a) as usize] += 1;
                cut_edges.push(index);
            }
        }
        self.dist_adj = dist_adj;
        self.cut_edges = cut_edges;
    }

    /// Copies the subgraph induced by the union of districts `a` and `b`
    /// into a buffer.
    ///
    /// The resulting subgraph has relabeled node IDs: nodes
    /// [0..# of nodes in district `a`] are from district `a`, and the
    /// remaining nodes are from district `b`. The `node_to_idx` member
    /// of the subgraph buffer contains a mapping between the node IDs
    /// of the parent graph and these new node IDs.
    pub fn subgraph(&self, graph: &Graph, buf: &mut SubgraphBuffer, a: usize, b: usize) {
        buf.clear();
        for &node in self.dist_nodes[a].iter() {
            buf.raw_nodes.push(node);
        }
        for &node in self.dist_nodes[b].iter() {
            buf.raw_nodes.push(node);
        }
        for (idx, &node) in buf.raw_nodes.iter().enumerate() {
            buf.node_to_idx[node] = idx as i64;
        }
        let mut edge_pos = 0;
        for (idx, &node) in buf.raw_nodes.iter().enumerate() {
            buf.graph.edges_start[idx] = edge_pos;
            for &neighbor in graph.neighbors[node].iter() {
                if buf.node_to_idx[neighbor] >= 0 {
                    let neighbor_idx = buf.node_to_idx[neighbor] as usize;
                    buf.graph.neighbors[idx].push(neighbor_idx);
                    if neighbor_idx > idx {
                        buf.graph.edges.push(Edge(idx, neighbor_idx));
                        edge_pos += 1;
                    }
                }
            }
            buf.graph.pops.push(graph.pops[node]);
            buf.graph.counties.push(graph.counties[node]);
        }
        buf.graph.total_pop = self.dist_pops[a] + self.dist_pops[b];
    }

    /// Counts the number of excess county-district pieces: for each
    /// county, the number of districts it touches beyond the first.
    /// A plan that keeps every county whole scores 0.
    pub fn county_splits(&self, graph: &Graph) -> u32 {
        let num_counties = match graph.counties.iter().max() {
            Some(&c) => c as usize + 1,
            None => return 0,
        };
        let mut seen = vec![false; num_counties * self.num_dists as usize];
        let mut pieces = vec![0u32; num_counties];
        for (node, &county) in graph.counties.iter().enumerate() {
            let dist = self.assignments[node];
            let key = (county as usize * self.num_dists as usize) + dist as usize;
            if !seen[key] {
                seen[key] = true;
                pieces[county as usize] += 1;
            }
        }
        pieces.iter().map(|&p| p.saturating_sub(1)).sum()
    }

    /// Checks that every district's population lies in `[min_pop, max_pop]`.
    pub fn pop_bounds_ok(&self, min_pop: u32, max_pop: u32) -> bool {
        self.dist_pops
            .iter()
            .all(|&pop| min_pop <= pop && pop <= max_pop)
    }

    /// Checks that every district's induced subgraph is connected.
    pub fn contiguous(&self, graph: &Graph) -> bool {
        self.dist_nodes
            .iter()
            .all(|nodes| graph.region_connected(nodes))
    }

    /// Returns the 1-indexed assignment vector (the external plan format).
    pub fn plan(&self) -> Vec<u32> {
        self.assignments.iter().map(|&a| a + 1).collect()
    }

    /// Builds a partition from a 1-indexed assignment vector.
    pub fn from_assignments(graph: &Graph, assignments: &[u32]) -> Result<Partition, String> {
        match assignments.iter().min() {
            None => return Err("Empty assignment vector".to_string()),
            Some(1) => (),
            Some(_) => return Err("Assignments must be 1-indexed".to_string()),
        };

        if assignments.len() != graph.neighbors.len() {
            return Err(format!(
                "Mismatch: graph has {} nodes, assignment vector has {} nodes",
                graph.neighbors.len(),
                assignments.len()
            ));
        }

        let num_dists = *assignments.iter().max().unwrap(); // guaranteed nonempty
        let mut dist_nodes = vec![Vec::<usize>::new(); num_dists as usize];
        let mut dist_pops = vec![0; num_dists as usize];
        let assignments_zeroed = assignments.iter().map(|a| a - 1).collect::<Vec<u32>>();
        for (node, &assignment) in assignments_zeroed.iter().enumerate() {
            dist_nodes[assignment as usize].push(node);
            dist_pops[assignment as usize] += graph.pops[node];
        }
        for (dist, nodes) in dist_nodes.iter().enumerate() {
            if nodes.is_empty() {
                return Err(format!("District {} has no nodes", dist + 1));
            }
        }
        let mut partition = Partition {
            num_dists: num_dists,
            assignments: assignments_zeroed,
            cut_edges: Vec::<usize>::new(), // derived
            dist_adj: Vec::<u32>::new(),    // derived
            dist_pops: dist_pops,
            dist_nodes: dist_nodes,
        };
        partition.update_derived(graph);
        Ok(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_assignments_rect_grid_2x2() {
        let grid = Graph::rect_grid(2, 2);
        let assignments = vec![1, 1, 1, 2];
        let partition = Partition::from_assignments(&grid, &assignments).unwrap();
        assert_eq!(partition.num_dists, 2);
        assert_eq!(partition.assignments, vec![0, 0, 0, 1]);
        assert_eq!(partition.dist_pops, vec![3, 1]);
        assert_eq!(partition.dist_nodes, vec![vec![0, 1, 2], vec![3]]);
        assert_eq!(partition.dist_adj, vec![0, 2, 2, 0]);
        assert_eq!(partition.cut_edges, vec![2, 3]);
        assert_eq!(partition.plan(), vec![1, 1, 1, 2]);
    }

    #[test]
    #[should_panic(expected = "Assignments must be 1-indexed")]
    fn from_assignments_zero_indexed() {
        let grid = Graph::rect_grid(2, 2);
        let assignments = vec![0, 0, 0, 1];
        Partition::from_assignments(&grid, &assignments).unwrap();
    }

    #[test]
    #[should_panic(expected = "District 2 has no nodes")]
    fn from_assignments_missing_district() {
        let grid = Graph::rect_grid(2, 2);
        let assignments = vec![1, 1, 1, 3];
        Partition::from_assignments(&grid, &assignments).unwrap();
    }

    #[test]
    #[should_panic(expected = "Mismatch: graph has 4 nodes, assignment vector has 3 nodes")]
    fn from_assignments_length_mismatch() {
        let grid = Graph::rect_grid(2, 2);
        let assignments = vec![1, 1, 3];
        Partition::from_assignments(&grid, &assignments).unwrap();
    }

    #[test]
    #[should_panic(expected = "Empty assignment vector")]
    fn from_assignments_empty() {
        let grid = Graph::rect_grid(2, 2);
        let assignments = vec![];
        Partition::from_assignments(&grid, &assignments).unwrap();
    }

    #[test]
    fn county_splits_whole_and_split() {
        let mut grid = Graph::rect_grid(2, 2);
        // Left column is county 0; right column is county 1.
        grid.counties = vec![0, 0, 1, 1];
        let whole = Partition::from_assignments(&grid, &[1, 1, 2, 2]).unwrap();
        assert_eq!(whole.county_splits(&grid), 0);
        let split = Partition::from_assignments(&grid, &[1, 2, 1, 2]).unwrap();
        assert_eq!(split.county_splits(&grid), 2);
    }

    #[test]
    fn contiguity_and_pop_bounds() {
        let grid = Graph::rect_grid(3, 3);
        let stripes = Partition::from_assignments(&grid, &[1, 1, 1, 2, 2, 2, 3, 3, 3]).unwrap();
        assert!(stripes.contiguous(&grid));
        assert!(stripes.pop_bounds_ok(3, 3));
        assert!(!stripes.pop_bounds_ok(4, 9));
        // Diagonal corners: disconnected district.
        let broken = Partition::from_assignments(&grid, &[1, 2, 2, 2, 2, 2, 2, 2, 1]).unwrap();
        assert!(!broken.contiguous(&grid));
    }
}
