//! Adaptive control of the boundary parameter k.
//!
//! The boundary parameter trades per-step acceptance for mixing: a
//! larger k widens the set of eligible cut edges, which lowers the
//! acceptance rate but decorrelates successive plans faster. The
//! controller observes the cumulative acceptance rate of proposals
//! that reach the acceptance test and nudges k toward a configured
//! target. The loop is deterministic given the acceptance history.

/// The minimum number of observed decisions before any adjustment.
const MIN_OBSERVATIONS: u64 = 20;

/// Decisions between consecutive adjustments.
const ADAPT_INTERVAL: u64 = 20;

/// If the cumulative acceptance rate collapses below this floor, k is
/// walked back down (to a floor of 1).
const ACCEPT_FLOOR: f64 = 0.05;

/// Feedback controller for the boundary parameter k.
#[derive(Clone, Debug)]
pub struct KController {
    /// The current boundary parameter.
    k: u32,
    /// Whether the caller pinned k (disables adaptation).
    fixed: bool,
    /// The acceptance rate bound that triggers a k increase.
    thresh: f64,
    /// Accepted decisions observed so far.
    accepts: u64,
    /// Total decisions observed so far.
    decisions: u64,
    /// Decisions remaining until the next adjustment opportunity.
    cooldown: u64,
}

impl KController {
    /// Creates a controller. A nonzero `fixed_k` pins k for the whole
    /// run; `fixed_k = 0` requests adaptation starting from k = 1.
    pub fn new(fixed_k: u32, thresh: f64) -> KController {
        KController {
            k: if fixed_k > 0 { fixed_k } else { 1 },
            fixed: fixed_k > 0,
            thresh: thresh,
            accepts: 0,
            decisions: 0,
            cooldown: MIN_OBSERVATIONS,
        }
    }

    /// The current boundary parameter.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// The cumulative acceptance rate over observed decisions.
    pub fn acceptance_rate(&self) -> f64 {
        if self.decisions == 0 {
            return 0.0;
        }
        self.accepts as f64 / self.decisions as f64
    }

    /// Records an accept/reject decision and adjusts k if warranted.
    ///
    /// The upper bound on the cumulative acceptance rate is the point
    /// estimate plus two standard errors; adjusting on the bound
    /// rather than the estimate avoids reacting to early noise.
    pub fn observe(&mut self, accepted: bool) {
        self.decisions += 1;
        if accepted {
            self.accepts += 1;
        }
        if self.fixed {
            return;
        }
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return;
        }
        let rate = self.acceptance_rate();
        let stderr = (rate * (1.0 - rate) / self.decisions as f64).sqrt();
        if rate + 2.0 * stderr > self.thresh {
            self.k += 1;
            self.cooldown = ADAPT_INTERVAL;
        } else if rate < ACCEPT_FLOOR && self.k > 1 {
            self.k -= 1;
            self.cooldown = ADAPT_INTERVAL;
        }
    }
}
