//! Lineage-memoized phenotype assignment.
//!
//! Every bacterium carries one of two phenotypes. A founder flips a fair coin, a
//! newborn inherits from its nearest resolved ancestor, and a cell seen again in a
//! later frame may switch phenotype with a probability shaped by its neighbors.

use crate::config::{ColonyConfig, FeedbackMode};
use crate::constants::SIGNAL_PERCENT_MAX;
use crate::lineage;
use crate::rng::create_rng;
use crate::spatial::NeighborComposition;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phenotype {
    Magenta,
    Cyan,
}

impl Phenotype {
    pub const ALL: [Phenotype; 2] = [Phenotype::Magenta, Phenotype::Cyan];

    /// Slot of this phenotype in per-state counters.
    pub fn index(self) -> usize {
        match self {
            Phenotype::Magenta => 0,
            Phenotype::Cyan => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Phenotype::Magenta => Phenotype::Cyan,
            Phenotype::Cyan => Phenotype::Magenta,
        }
    }
}

/// Outcome of resolving one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Resolved(Phenotype),
    /// No ancestor could be found; rendered with a neutral color.
    Unresolved,
}

impl CellState {
    pub fn phenotype(self) -> Option<Phenotype> {
        match self {
            CellState::Resolved(p) => Some(p),
            CellState::Unresolved => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    /// The ancestor walk never reached a memoized cell or the founder band.
    UnresolvableAncestry { id: u64 },
}

/// Switching probabilities for one re-observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionRates {
    pub magenta_to_cyan: f64,
    pub cyan_to_magenta: f64,
}

/// Owns the phenotype memo of a single simulation run.
///
/// The memo maps bacterium ID to its last assigned phenotype. It only grows (or is
/// overwritten on re-observation) until [`LineageColorModel::reset`] clears it.
pub struct LineageColorModel<R: Rng = ChaCha12Rng> {
    memo: HashMap<u64, Phenotype>,
    /// Founders resolved on behalf of a descendant before being seen themselves.
    implied_founders: HashSet<u64>,
    signal: f64,
    alpha: f64,
    signal_bounds: (f64, f64),
    alpha_bounds: (f64, f64),
    feedback: FeedbackMode,
    max_ancestor_depth: u32,
    anomalies: Vec<Anomaly>,
    anomaly_ids: HashSet<u64>,
    rng: R,
}

impl LineageColorModel<ChaCha12Rng> {
    /// Model seeded from `config.seed`. The config is assumed validated.
    pub fn new(config: &ColonyConfig) -> Self {
        Self::with_rng(config, create_rng(config.seed))
    }
}

impl<R: Rng> LineageColorModel<R> {
    pub fn with_rng(config: &ColonyConfig, rng: R) -> Self {
        let mut model = Self {
            memo: HashMap::new(),
            implied_founders: HashSet::new(),
            signal: 0.0,
            alpha: 0.0,
            signal_bounds: (config.signal_percent_min, config.signal_percent_max),
            alpha_bounds: (config.alpha_min, config.alpha_max),
            feedback: config.feedback,
            max_ancestor_depth: config.max_ancestor_depth,
            anomalies: Vec::new(),
            anomaly_ids: HashSet::new(),
            rng,
        };
        model.set_signal(config.signal_percent);
        model.set_alpha(config.alpha);
        model
    }

    /// Resolve the phenotype of `id` given the composition of its neighborhood.
    ///
    /// A memoized cell is re-observed and may switch phenotype. A founder flips a
    /// fair coin. Any other cell inherits from its nearest resolved ancestor without
    /// switching. Cells with no reachable ancestor come back unresolved and are
    /// recorded as anomalies.
    pub fn resolve(&mut self, id: u64, neighbors: &NeighborComposition) -> CellState {
        if let Some(current) = self.memo.get(&id).copied() {
            if self.implied_founders.remove(&id) {
                return CellState::Resolved(current);
            }
            let next = self.transition(current, neighbors);
            self.memo.insert(id, next);
            return CellState::Resolved(next);
        }

        if lineage::is_founder(id) {
            let state = self.flip_founder();
            self.memo.insert(id, state);
            return CellState::Resolved(state);
        }

        match self.inherit(id) {
            Some(state) => {
                self.memo.insert(id, state);
                CellState::Resolved(state)
            }
            None => {
                self.record_anomaly(id);
                CellState::Unresolved
            }
        }
    }

    fn inherit(&mut self, id: u64) -> Option<Phenotype> {
        for ancestor in lineage::ancestors(id, self.max_ancestor_depth) {
            if let Some(state) = self.memo.get(&ancestor) {
                return Some(*state);
            }
            if lineage::is_founder(ancestor) {
                let state = self.flip_founder();
                self.memo.insert(ancestor, state);
                self.implied_founders.insert(ancestor);
                return Some(state);
            }
        }
        None
    }

    fn flip_founder(&mut self) -> Phenotype {
        if self.rng.random::<f64>() < 0.5 {
            Phenotype::Magenta
        } else {
            Phenotype::Cyan
        }
    }

    fn transition(&mut self, current: Phenotype, neighbors: &NeighborComposition) -> Phenotype {
        let rates = self.transition_rates(neighbors);
        let r: f64 = self.rng.random();
        match current {
            Phenotype::Magenta if r < rates.magenta_to_cyan => Phenotype::Cyan,
            Phenotype::Cyan if r < rates.cyan_to_magenta => Phenotype::Magenta,
            unchanged => unchanged,
        }
    }

    pub fn transition_rates(&self, neighbors: &NeighborComposition) -> TransitionRates {
        let magenta_share = neighbors.proportion(Phenotype::Magenta);
        let cyan_share = neighbors.proportion(Phenotype::Cyan);
        let (towards_cyan, towards_magenta) = match self.feedback {
            FeedbackMode::Positive => (cyan_share, magenta_share),
            FeedbackMode::Negative => (magenta_share, cyan_share),
        };
        TransitionRates {
            magenta_to_cyan: self.alpha + towards_cyan * self.signal,
            cyan_to_magenta: self.alpha + towards_magenta * self.signal,
        }
    }

    fn record_anomaly(&mut self, id: u64) {
        if self.anomaly_ids.insert(id) {
            warn!(id, "no resolvable ancestor; using neutral state");
            self.anomalies.push(Anomaly::UnresolvableAncestry { id });
        } else {
            debug!(id, "ancestor still unresolvable");
        }
    }

    pub fn state_of(&self, id: u64) -> Option<Phenotype> {
        self.memo.get(&id).copied()
    }

    /// Number of `ids` whose memoized phenotype equals `target`.
    pub fn state_count<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a u64>,
        target: Phenotype,
    ) -> usize {
        ids.into_iter()
            .filter(|id| self.memo.get(*id) == Some(&target))
            .count()
    }

    /// Share of neighbors sharing the current phenotype of `id`.
    ///
    /// Returns 0 for unresolved cells and empty neighborhoods.
    pub fn similarity_to_neighbors(&self, id: u64, neighbors: &NeighborComposition) -> f64 {
        self.state_of(id)
            .map(|state| neighbors.proportion(state))
            .unwrap_or(0.0)
    }

    /// Forget every memoized phenotype. Called when playback loops to its start.
    pub fn reset(&mut self) {
        debug!(entries = self.memo.len(), "clearing phenotype memo");
        self.memo.clear();
        self.implied_founders.clear();
        self.anomalies.clear();
        self.anomaly_ids.clear();
    }

    /// Set neighbor-influence strength from a raw percentage.
    pub fn set_signal(&mut self, percent: f64) {
        let (min, max) = self.signal_bounds;
        let percent = clamp_or_min(percent, min, max);
        self.signal = (percent / SIGNAL_PERCENT_MAX).clamp(0.0, 1.0);
    }

    /// Set the baseline switching rate.
    pub fn set_alpha(&mut self, value: f64) {
        let (min, max) = self.alpha_bounds;
        self.alpha = clamp_or_min(value, min, max).clamp(0.0, 1.0);
    }

    pub fn signal(&self) -> f64 {
        self.signal
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn feedback(&self) -> FeedbackMode {
        self.feedback
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }
}

fn clamp_or_min(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}
