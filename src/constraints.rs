//! Weighted constraint terms and the plan energy function.
//!
//! Each constraint kind is a tagged variant carrying its own typed
//! parameters; all variants expose a uniform `score`. The energy of a
//! plan is the weighted sum of the enabled terms' scores, and lower
//! energy is always preferred. The acceptance engine only ever sees
//! the scalar energy, so new terms can be added here without touching
//! the chain.
use crate::graph::Graph;
use crate::partition::Partition;
use crate::stats::{partition_attr_sums, subgraph_log_spanning_tree_count};

/// A single weighted constraint term. A term with strength 0 is
/// disabled (its score is never computed).
#[derive(Clone, Debug)]
pub enum Constraint {
    /// Penalizes tree-count-implied non-compactness: the score is the
    /// sum of log spanning tree counts over districts, so plans whose
    /// districts admit fewer spanning trees (more compact districts)
    /// have lower energy.
    Compactness { strength: f64 },
    /// Penalizes deviation from a reference ("status quo") plan: the
    /// fraction of units assigned differently, normalized by the
    /// reference's district count.
    StatusQuo {
        strength: f64,
        /// The 1-indexed reference assignment vector.
        ref_plan: Vec<u32>,
        /// The number of districts in the reference plan.
        ref_num_dists: u32,
    },
    /// Penalizes districts whose minority share misses both targets
    /// (the older two-target penalty form). Only districts with total
    /// population at least `pop_threshold` are scored.
    VraOld {
        strength: f64,
        tgt_min: f64,
        tgt_other: f64,
        pow: f64,
        pop_threshold: u32,
        /// The graph attribute column holding minority populations.
        min_pop_col: String,
    },
    /// Penalizes districts whose minority share falls below a
    /// per-district minimum target (squared shortfall).
    Vra {
        strength: f64,
        /// One minimum share target per district.
        tgts_min: Vec<f64>,
        /// The graph attribute column holding minority populations.
        min_pop_col: String,
    },
    /// Penalizes pairing two or more listed incumbents in one district.
    Incumbency {
        strength: f64,
        /// Node indices of incumbent home units.
        incumbents: Vec<usize>,
    },
    /// Penalizes, per county, the number of districts it touches
    /// beyond one.
    CountySplits { strength: f64 },
}

impl Constraint {
    /// The term's weight in the energy function.
    pub fn strength(&self) -> f64 {
        match self {
            Constraint::Compactness { strength } => *strength,
            Constraint::StatusQuo { strength, .. } => *strength,
            Constraint::VraOld { strength, .. } => *strength,
            Constraint::Vra { strength, .. } => *strength,
            Constraint::Incumbency { strength, .. } => *strength,
            Constraint::CountySplits { strength } => *strength,
        }
    }

    /// The term's unweighted score for a plan (lower is better).
    pub fn score(&self, graph: &Graph, partition: &Partition) -> f64 {
        match self {
            Constraint::Compactness { .. } => partition
                .dist_nodes
                .iter()
                .map(|nodes| subgraph_log_spanning_tree_count(graph, nodes))
                .sum(),
            Constraint::StatusQuo {
                ref_plan,
                ref_num_dists,
                ..
            } => {
                let diff = partition
                    .assignments
                    .iter()
                    .zip(ref_plan.iter())
                    .filter(|(&assn, &ref_assn)| assn + 1 != ref_assn)
                    .count();
                diff as f64 / (partition.assignments.len() as f64 * *ref_num_dists as f64)
            }
            Constraint::VraOld {
                tgt_min,
                tgt_other,
                pow,
                pop_threshold,
                min_pop_col,
                ..
            } => {
                let min_pops = partition_attr_sums(graph, partition, min_pop_col);
                min_pops
                    .iter()
                    .zip(partition.dist_pops.iter())
                    .filter(|(_, &pop)| pop >= *pop_threshold && pop > 0)
                    .map(|(&min_pop, &pop)| {
                        let share = min_pop as f64 / pop as f64;
                        ((share - tgt_min).abs() * (share - tgt_other).abs()).powf(*pow)
                    })
                    .sum()
            }
            Constraint::Vra {
                tgts_min,
                min_pop_col,
                ..
            } => {
                let min_pops = partition_attr_sums(graph, partition, min_pop_col);
                min_pops
                    .iter()
                    .zip(partition.dist_pops.iter())
                    .zip(tgts_min.iter())
                    .filter(|((_, &pop), _)| pop > 0)
                    .map(|((&min_pop, &pop), &tgt)| {
                        let shortfall = (tgt - (min_pop as f64 / pop as f64)).max(0.0);
                        shortfall * shortfall
                    })
                    .sum()
            }
            Constraint::Incumbency { incumbents, .. } => {
                let mut per_dist = vec![0u32; partition.num_dists as usize];
                for &node in incumbents.iter() {
                    per_dist[partition.assignments[node] as usize] += 1;
                }
                per_dist.iter().map(|&c| c.saturating_sub(1) as f64).sum()
            }
            Constraint::CountySplits { .. } => partition.county_splits(graph) as f64,
        }
    }
}

/// An immutable set of weighted constraint terms.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    terms: Vec<Constraint>,
}

impl ConstraintSet {
    /// Builds a constraint set, rejecting negative weights.
    pub fn new(terms: Vec<Constraint>) -> Result<ConstraintSet, String> {
        for term in terms.iter() {
            if term.strength() < 0.0 || !term.strength().is_finite() {
                return Err(format!(
                    "Constraint weights must be finite and nonnegative (got {})",
                    term.strength()
                ));
            }
        }
        Ok(ConstraintSet { terms: terms })
    }

    /// A constraint set with no terms (energy identically 0).
    pub fn empty() -> ConstraintSet {
        ConstraintSet { terms: vec![] }
    }

    /// The terms in the set.
    pub fn terms(&self) -> &[Constraint] {
        &self.terms
    }

    /// Checks term parameters against a concrete graph and district count.
    /// Called once before a chain starts.
    pub fn validate(&self, graph: &Graph, num_dists: u32) -> Result<(), String> {
        let n = graph.neighbors.len();
        for term in self.terms.iter() {
            match term {
                Constraint::StatusQuo { ref_plan, .. } => {
                    if ref_plan.len() != n {
                        return Err(format!(
                            "Status quo reference plan has {} entries; graph has {} nodes",
                            ref_plan.len(),
                            n
                        ));
                    }
                }
                Constraint::VraOld { min_pop_col, .. } | Constraint::Vra { min_pop_col, .. } => {
                    if !graph.attr.contains_key(min_pop_col) {
                        return Err(format!("Missing attribute column '{}'", min_pop_col));
                    }
                }
                Constraint::Incumbency { incumbents, .. } => {
                    if incumbents.iter().any(|&node| node >= n) {
                        return Err("Incumbent node index out of range".to_string());
                    }
                }
                _ => {}
            }
            if let Constraint::Vra { tgts_min, .. } = term {
                if tgts_min.len() != num_dists as usize {
                    return Err(format!(
                        "VRA targets: expected {} entries, got {}",
                        num_dists,
                        tgts_min.len()
                    ));
                }
            }
        }
        Ok(())
    }

    /// Computes the energy `E(plan) = Σ_term weight * score` over
    /// enabled terms. Lower energy is preferred.
    pub fn energy(&self, graph: &Graph, partition: &Partition) -> f64 {
        self.terms
            .iter()
            .filter(|term| term.strength() > 0.0)
            .map(|term| term.strength() * term.score(graph, partition))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stripes_3x3() -> (Graph, Partition) {
        let grid = Graph::rect_grid(3, 3);
        let partition =
            Partition::from_assignments(&grid, &[1, 1, 1, 2, 2, 2, 3, 3, 3]).unwrap();
        (grid, partition)
    }

    #[test]
    fn empty_set_energy_is_zero() {
        let (grid, partition) = stripes_3x3();
        assert_eq!(ConstraintSet::empty().energy(&grid, &partition), 0.0);
    }

    #[test]
    fn zero_weight_terms_are_disabled() {
        let (grid, partition) = stripes_3x3();
        let set = ConstraintSet::new(vec![
            Constraint::CountySplits { strength: 0.0 },
            Constraint::StatusQuo {
                strength: 0.0,
                ref_plan: vec![1; 9],
                ref_num_dists: 1,
            },
        ])
        .unwrap();
        assert_eq!(set.energy(&grid, &partition), 0.0);
    }

    #[test]
    fn negative_weight_rejected() {
        assert!(ConstraintSet::new(vec![Constraint::CountySplits { strength: -1.0 }]).is_err());
    }

    #[test]
    fn status_quo_counts_differing_units() {
        let (grid, partition) = stripes_3x3();
        let same = Constraint::StatusQuo {
            strength: 1.0,
            ref_plan: partition.plan(),
            ref_num_dists: 3,
        };
        assert_eq!(same.score(&grid, &partition), 0.0);
        let mut shifted = partition.plan();
        shifted[0] = 2;
        let diff = Constraint::StatusQuo {
            strength: 1.0,
            ref_plan: shifted,
            ref_num_dists: 3,
        };
        assert_relative_eq!(diff.score(&grid, &partition), 1.0 / 27.0);
    }

    #[test]
    fn compactness_of_path_districts_is_zero() {
        // Each column district of the 3x3 stripes plan is a path, which
        // has exactly one spanning tree: ln(1) + ln(1) + ln(1) = 0.
        let (grid, partition) = stripes_3x3();
        let term = Constraint::Compactness { strength: 1.0 };
        assert_relative_eq!(term.score(&grid, &partition), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn incumbency_pairing() {
        let (grid, partition) = stripes_3x3();
        // Nodes 0 and 1 are both in district 1; node 3 is in district 2.
        let term = Constraint::Incumbency {
            strength: 1.0,
            incumbents: vec![0, 1, 3],
        };
        assert_eq!(term.score(&grid, &partition), 1.0);
    }

    #[test]
    fn county_splits_scored() {
        let (mut grid, partition) = stripes_3x3();
        // Rows as counties; the column-stripe plan splits each of the
        // three counties three ways.
        grid.counties = vec![0, 1, 2, 0, 1, 2, 0, 1, 2];
        let term = Constraint::CountySplits { strength: 1.0 };
        assert_eq!(term.score(&grid, &partition), 6.0);
    }

    #[test]
    fn vra_shortfall() {
        let (mut grid, partition) = stripes_3x3();
        // District 1 is entirely minority; districts 2 and 3 have none.
        grid.attr.insert(
            "min_pop".to_string(),
            vec![1, 1, 1, 0, 0, 0, 0, 0, 0],
        );
        let term = Constraint::Vra {
            strength: 1.0,
            tgts_min: vec![0.5, 0.5, 0.0],
            min_pop_col: "min_pop".to_string(),
        };
        // District 1 exceeds its target; district 2 misses by 0.5.
        assert_relative_eq!(term.score(&grid, &partition), 0.25);
    }

    #[test]
    fn vra_old_respects_pop_threshold() {
        let (mut grid, partition) = stripes_3x3();
        grid.attr.insert(
            "min_pop".to_string(),
            vec![1, 1, 1, 0, 0, 0, 0, 0, 0],
        );
        let term = Constraint::VraOld {
            strength: 1.0,
            tgt_min: 0.55,
            tgt_other: 0.25,
            pow: 1.0,
            pop_threshold: 100,
            min_pop_col: "min_pop".to_string(),
        };
        // All districts fall below the population threshold.
        assert_eq!(term.score(&grid, &partition), 0.0);
    }

    #[test]
    fn validate_checks_sizes() {
        let (grid, _) = stripes_3x3();
        let bad_ref = ConstraintSet::new(vec![Constraint::StatusQuo {
            strength: 1.0,
            ref_plan: vec![1, 2],
            ref_num_dists: 2,
        }])
        .unwrap();
        assert!(bad_ref.validate(&grid, 3).is_err());
        let bad_col = ConstraintSet::new(vec![Constraint::Vra {
            strength: 1.0,
            tgts_min: vec![0.0, 0.0, 0.0],
            min_pop_col: "missing".to_string(),
        }])
        .unwrap();
        assert!(bad_col.validate(&grid, 3).is_err());
    }
}
