//! A lightweight adjacency graph with population and county metadata.
use std::collections::HashMap;

/// Edges are pairs of node indices.
#[derive(Clone, Hash, Eq, PartialEq, Debug)]
pub struct Edge(pub usize, pub usize);

/// A lightweight graph with population and county metadata.
#[derive(Clone)]
pub struct Graph {
    /// The graph's edges, represented as pairs of node indices,
    /// sorted by the first element of the pair.
    /// (Nodes are represented implicitly.)
    pub edges: Vec<Edge>,
    /// The population at each node.
    pub pops: Vec<u32>,
    /// The graph's adjacencies (list-of-lists format).
    pub neighbors: Vec<Vec<usize>>,
    /// Maps between node indices and blocks of edges in `edges`.
    /// The nth element corresponds to the starting index of the
    /// block of edges in `edges` of the form (n, *).
    pub edges_start: Vec<usize>,
    /// The county label of each node. Counties are only used to
    /// penalize and track splits; they need not be contiguous.
    pub counties: Vec<u32>,
    /// Named node-level count columns (e.g. minority populations).
    pub attr: HashMap<String, Vec<u32>>,
    /// The total population over all nodes.
    /// (Should be equal to the sum of `pops`.)
    pub total_pop: u32,
}

impl Graph {
    /// Returns a new graph with preallocated containers for `n` nodes and
    /// `8 * n` edges.
    pub fn new_buffer(n: usize) -> Graph {
        Graph {
            pops: Vec::<u32>::with_capacity(n),
            neighbors: vec![Vec::<usize>::with_capacity(8); n],
            edges: Vec::<Edge>::with_capacity(8 * n),
            edges_start: vec![0; n],
            counties: Vec::<u32>::with_capacity(n),
            attr: HashMap::new(),
            total_pop: 0,
        }
    }

    /// Resets a graph's containers.
    /// (Useful when using a graph as a subgraph buffer.)
    pub fn clear(&mut self) {
        self.pops.clear();
        for adj in self.neighbors.iter_mut() {
            adj.clear();
        }
        self.edges.clear();
        self.counties.clear();
        self.edges_start.fill(0);
        self.total_pop = 0;
    }

    /// Builds a `width` x `height` grid graph (rook adjacency) with
    /// unit node populations and a single county.
    ///
    /// Nodes are indexed in column-major order: node `height * col + row`
    /// is at position (col, row).
    pub fn rect_grid(width: usize, height: usize) -> Graph {
        let n = width * height;
        let mut edges = Vec::<Edge>::new();
        let mut neighbors = vec![Vec::<usize>::with_capacity(4); n];
        let mut edges_start = vec![0; n];
        for col in 0..width {
            for row in 0..height {
                let node = (col * height) + row;
                edges_start[node] = edges.len();
                if row > 0 {
                    neighbors[node].push(node - 1);
                }
                if row < height - 1 {
                    neighbors[node].push(node + 1);
                    edges.push(Edge(node, node + 1));
                }
                if col > 0 {
                    neighbors[node].push(node - height);
                }
                if col < width - 1 {
                    neighbors[node].push(node + height);
                    edges.push(Edge(node, node + height));
                }
            }
        }
        Graph {
            edges: edges,
            pops: vec![1; n],
            neighbors: neighbors,
            edges_start: edges_start,
            counties: vec![0; n],
            attr: HashMap::new(),
            total_pop: n as u32,
        }
    }

    /// Verifies that a set of nodes induces a connected subgraph.
    ///
    /// This is the contiguity check used to validate seed plans and
    /// (in tests) every accepted plan.
    pub fn region_connected(&self, nodes: &[usize]) -> bool {
        if nodes.is_empty() {
            return true; // ...vacuously.
        }
        let mut in_region = vec![false; self.neighbors.len()];
        for &node in nodes.iter() {
            in_region[node] = true;
        }
        let mut visited = vec![false; self.neighbors.len()];
        let mut stack = vec![nodes[0]];
        visited[nodes[0]] = true;
        let mut reached = 0;
        while let Some(next) = stack.pop() {
            reached += 1;
            for &neighbor in self.neighbors[next].iter() {
                if in_region[neighbor] && !visited[neighbor] {
                    visited[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }
        reached == nodes.len()
    }

    /// Partitions a set of nodes into the connected components of its
    /// induced subgraph. Components are returned in order of discovery.
    pub fn region_components(&self, nodes: &[usize]) -> Vec<Vec<usize>> {
        let mut in_region = vec![false; self.neighbors.len()];
        for &node in nodes.iter() {
            in_region[node] = true;
        }
        let mut visited = vec![false; self.neighbors.len()];
        let mut components = Vec::<Vec<usize>>::new();
        for &start in nodes.iter() {
            if visited[start] {
                continue;
            }
            let mut component = vec![start];
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(next) = stack.pop() {
                for &neighbor in self.neighbors[next].iter() {
                    if in_region[neighbor] && !visited[neighbor] {
                        visited[neighbor] = true;
                        component.push(neighbor);
                        stack.push(neighbor);
                    }
                }
            }
            components.push(component);
        }
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_grid_2x2() {
        let grid = Graph::rect_grid(2, 2);
        assert_eq!(grid.pops, vec![1, 1, 1, 1]);
        assert_eq!(grid.total_pop, 4);
        assert_eq!(
            grid.edges,
            vec![Edge(0, 1), Edge(0, 2), Edge(1, 3), Edge(2, 3)]
        );
        assert_eq!(grid.neighbors[0], vec![1, 2]);
        assert_eq!(grid.neighbors[3], vec![2, 1]);
    }

    #[test]
    fn rect_grid_3x3_degrees() {
        let grid = Graph::rect_grid(3, 3);
        let degrees: Vec<usize> = grid.neighbors.iter().map(|adj| adj.len()).collect();
        assert_eq!(degrees, vec![2, 3, 2, 3, 4, 3, 2, 3, 2]);
        assert_eq!(grid.edges.len(), 12);
    }

    #[test]
    fn region_connected_full_grid() {
        let grid = Graph::rect_grid(3, 3);
        assert!(grid.region_connected(&(0..9).collect::<Vec<usize>>()));
    }

    #[test]
    fn region_connected_split_region() {
        let grid = Graph::rect_grid(3, 3);
        // Opposite corners of the grid.
        assert!(!grid.region_connected(&[0, 8]));
    }

    #[test]
    fn region_components_split_region() {
        let grid = Graph::rect_grid(3, 3);
        let components = grid.region_components(&[0, 1, 8]);
        assert_eq!(components, vec![vec![0, 1], vec![8]]);
    }
}
