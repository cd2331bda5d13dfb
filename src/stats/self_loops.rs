//! Self-loop counts (iterations that repeat the current state without
//! reaching the acceptance test).
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashMap;

/// Reasons why a merge-split iteration self-looped.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug)]
pub enum SelfLoopReason {
    /// Drew a spanning tree with no cut candidates at all.
    NoSplit,
    /// No population-valid cut was found within the retry bound.
    NoValidCut,
    /// A cut momentarily produced a disconnected region.
    Disconnected,
}

/// Self-loop statistics since the last accepted proposal.
#[derive(Clone, Default)]
pub struct SelfLoopCounts {
    counts: HashMap<SelfLoopReason, usize>,
}

impl SelfLoopCounts {
    /// Increments the self-loop count (with a reason).
    pub fn inc(&mut self, reason: SelfLoopReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    /// Returns the self-loop count for a reason.
    pub fn get(&self, reason: SelfLoopReason) -> usize {
        self.counts.get(&reason).map_or(0, |&c| c)
    }

    /// Returns the total self-loop count over all reasons.
    pub fn sum(&self) -> usize {
        self.counts.values().sum()
    }
}

impl Serialize for SelfLoopCounts {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("SelfLoopCounts", self.counts.len())?;
        for (&reason, count) in self.counts.iter() {
            let key = match reason {
                SelfLoopReason::NoSplit => "no_split",
                SelfLoopReason::NoValidCut => "no_valid_cut",
                SelfLoopReason::Disconnected => "disconnected",
            };
            state.serialize_field(key, count)?;
        }
        state.end()
    }
}
