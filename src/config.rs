//! Helpers for parsing JSON constraint configuration strings.
//!
//! A constraint configuration is a JSON object with one key per
//! enabled term, e.g.
//!
//! ```json
//! {
//!   "compactness": {"strength": 1.0},
//!   "status_quo": {"strength": 0.5, "ref_col": "CD"},
//!   "county_splits": {"strength": 2.0}
//! }
//! ```
//!
//! Columns named by the configuration (`ref_col`, `min_pop_col`) are
//! resolved against the graph's attribute columns, so they must be
//! loaded alongside the graph.
use crate::constraints::{Constraint, ConstraintSet};
use crate::graph::Graph;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct WeightConfig {
    pub strength: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StatusQuoConfig {
    pub strength: f64,
    /// The graph column holding the 1-indexed reference assignment.
    pub ref_col: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VraOldConfig {
    pub strength: f64,
    pub tgt_min: f64,
    pub tgt_other: f64,
    pub pow: f64,
    pub pop_threshold: u32,
    pub min_pop_col: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VraConfig {
    pub strength: f64,
    pub tgts_min: Vec<f64>,
    pub min_pop_col: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct IncumbencyConfig {
    pub strength: f64,
    /// Node indices of incumbent home units.
    pub incumbents: Vec<usize>,
}

/// The parsed form of a constraint configuration string.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConstraintsConfig {
    pub compactness: Option<WeightConfig>,
    pub status_quo: Option<StatusQuoConfig>,
    pub vra_old: Option<VraOldConfig>,
    pub vra: Option<VraConfig>,
    pub incumbency: Option<IncumbencyConfig>,
    pub county_splits: Option<WeightConfig>,
}

impl ConstraintsConfig {
    /// Parses a configuration from a JSON string. An empty string is
    /// an empty configuration (no constraints).
    pub fn from_json(raw: &str) -> Result<ConstraintsConfig, String> {
        if raw.is_empty() {
            return Ok(ConstraintsConfig::default());
        }
        serde_json::from_str(raw).map_err(|e| format!("Could not parse constraints: {}", e))
    }

    /// The graph attribute columns the configuration references.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        if let Some(config) = &self.status_quo {
            columns.push(config.ref_col.clone());
        }
        if let Some(config) = &self.vra_old {
            columns.push(config.min_pop_col.clone());
        }
        if let Some(config) = &self.vra {
            columns.push(config.min_pop_col.clone());
        }
        columns
    }

    /// Resolves column references against `graph` and builds the
    /// constraint set.
    pub fn resolve(&self, graph: &Graph) -> Result<ConstraintSet, String> {
        let mut terms = Vec::new();
        if let Some(config) = &self.compactness {
            terms.push(Constraint::Compactness {
                strength: config.strength,
            });
        }
        if let Some(config) = &self.status_quo {
            let ref_plan = graph
                .attr
                .get(&config.ref_col)
                .ok_or_else(|| format!("Missing attribute column '{}'", config.ref_col))?
                .clone();
            let ref_num_dists = match ref_plan.iter().max() {
                Some(&max) if ref_plan.iter().min() == Some(&1) => max,
                _ => {
                    return Err(format!(
                        "Reference column '{}' must be a 1-indexed assignment",
                        config.ref_col
                    ))
                }
            };
            terms.push(Constraint::StatusQuo {
                strength: config.strength,
                ref_plan: ref_plan,
                ref_num_dists: ref_num_dists,
            });
        }
        if let Some(config) = &self.vra_old {
            terms.push(Constraint::VraOld {
                strength: config.strength,
                tgt_min: config.tgt_min,
                tgt_other: config.tgt_other,
                pow: config.pow,
                pop_threshold: config.pop_threshold,
                min_pop_col: config.min_pop_col.clone(),
            });
        }
        if let Some(config) = &self.vra {
            terms.push(Constraint::Vra {
                strength: config.strength,
                tgts_min: config.tgts_min.clone(),
                min_pop_col: config.min_pop_col.clone(),
            });
        }
        if let Some(config) = &self.incumbency {
            terms.push(Constraint::Incumbency {
                strength: config.strength,
                incumbents: config.incumbents.clone(),
            });
        }
        if let Some(config) = &self.county_splits {
            terms.push(Constraint::CountySplits {
                strength: config.strength,
            });
        }
        ConstraintSet::new(terms)
    }
}
