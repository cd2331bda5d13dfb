//! Utility functions for loading graph and partition data.
use crate::graph::{Edge, Graph};
use crate::partition::Partition;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;

/// Loads graph and partition data in the NetworkX `adjacency_data`
/// format used by [GerryChain](https://github.com/mggg/gerrychain).
///
/// # Arguments
///
/// * `path` - The path of the graph JSON file.
/// * `pop_col` - The column in the graph JSON corresponding to total node
///   population. This column should be integer-valued.
/// * `assignment_col` - A column in the graph JSON corresponding to a
///   seed partition. This column should be integer-valued and 1-indexed.
/// * `county_col` - An optional column holding integer county labels.
///   When absent, every node is placed in a single county.
/// * `columns` - The metadata columns to load as node attributes.
pub fn from_networkx(
    path: &str,
    pop_col: &str,
    assignment_col: &str,
    county_col: Option<&str>,
    columns: Vec<String>,
) -> Result<(Graph, Partition)> {
    let (graph, data) = graph_from_networkx(path, pop_col, county_col, columns)?;
    let raw_nodes = data["nodes"]
        .as_array()
        .context("Could not find `nodes`")?;
    let assignments = raw_nodes
        .iter()
        .map(|node| {
            node[assignment_col]
                .as_u64()
                .map(|a| a as u32)
                .with_context(|| format!("Bad assignment in column '{}'", assignment_col))
        })
        .collect::<Result<Vec<u32>>>()?;
    let partition = Partition::from_assignments(&graph, &assignments).map_err(|e| anyhow!(e))?;
    Ok((graph, partition))
}

/// Loads graph data in the NetworkX `adjacency_data` format. Returns
/// the [Graph] and the raw graph JSON tree upon a successful load.
pub fn graph_from_networkx(
    path: &str,
    pop_col: &str,
    county_col: Option<&str>,
    columns: Vec<String>,
) -> Result<(Graph, Value)> {
    let raw = fs::read_to_string(path).context("Could not load graph")?;
    let data: Value = serde_json::from_str(&raw).context("Could not parse graph JSON")?;

    let raw_nodes = data["nodes"]
        .as_array()
        .context("Could not find `nodes`")?;
    let raw_adj = data["adjacency"]
        .as_array()
        .context("Could not find `adjacency`")?;
    let num_nodes = raw_nodes.len();
    let mut pops = Vec::<u32>::with_capacity(num_nodes);
    let mut counties = Vec::<u32>::with_capacity(num_nodes);
    let mut neighbors = Vec::<Vec<usize>>::with_capacity(num_nodes);
    let mut edges = Vec::<Edge>::new();
    let mut edges_start = vec![0; num_nodes];
    let mut attr = HashMap::new();
    for col in columns.iter() {
        attr.insert(col.clone(), Vec::<u32>::with_capacity(num_nodes));
    }

    for (index, (node, adj)) in raw_nodes.iter().zip(raw_adj.iter()).enumerate() {
        edges_start[index] = edges.len();
        let node_neighbors = adj
            .as_array()
            .context("Bad adjacency entry")?
            .iter()
            .map(|n| {
                n["id"]
                    .as_u64()
                    .map(|id| id as usize)
                    .context("Bad neighbor ID")
            })
            .collect::<Result<Vec<usize>>>()?;
        for col in columns.iter() {
            let value = node[col]
                .as_u64()
                .with_context(|| format!("Bad value in column '{}'", col))?;
            if let Some(data) = attr.get_mut(col) {
                data.push(value as u32);
            }
        }
        pops.push(
            node[pop_col]
                .as_u64()
                .with_context(|| format!("Bad population in column '{}'", pop_col))?
                as u32,
        );
        counties.push(match county_col {
            Some(col) => {
                node[col]
                    .as_u64()
                    .with_context(|| format!("Bad county in column '{}'", col))? as u32
            }
            None => 0,
        });
        for &neighbor in node_neighbors.iter() {
            if neighbor > index {
                edges.push(Edge(index, neighbor));
            }
        }
        neighbors.push(node_neighbors);
    }

    let total_pop = pops.iter().sum();
    let graph = Graph {
        pops: pops,
        neighbors: neighbors,
        edges: edges,
        edges_start: edges_start,
        counties: counties,
        attr: attr,
        total_pop: total_pop,
    };
    Ok((graph, data))
}

/// Repairs non-contiguous county groups by relabeling.
///
/// Counties are only used to penalize splits, but a non-contiguous
/// county would be penalized even by plans that keep each of its
/// connected pieces whole. Each extra connected component of a county
/// is therefore relabeled as a fresh pseudo-county. Returns the number
/// of relabeled components; a warning is printed when any repair
/// happens (splits will read higher than with the raw labels).
pub fn repair_counties(graph: &mut Graph) -> u32 {
    let num_counties = match graph.counties.iter().max() {
        Some(&c) => c + 1,
        None => return 0,
    };
    let mut county_nodes = vec![Vec::<usize>::new(); num_counties as usize];
    for (node, &county) in graph.counties.iter().enumerate() {
        county_nodes[county as usize].push(node);
    }
    let mut next_label = num_counties;
    let mut relabeled = 0;
    for nodes in county_nodes.iter() {
        if nodes.is_empty() {
            continue;
        }
        let components = graph.region_components(nodes);
        // The first component keeps the original label.
        for component in components.iter().skip(1) {
            for &node in component.iter() {
                graph.counties[node] = next_label;
            }
            next_label += 1;
            relabeled += 1;
        }
    }
    if relabeled > 0 {
        eprintln!(
            "warning: {} non-contiguous county component(s) relabeled; \
             county split counts will increase",
            relabeled
        );
    }
    relabeled
}
