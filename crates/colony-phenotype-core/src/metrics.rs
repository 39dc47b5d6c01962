use crate::phenotype::{CellState, Phenotype};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FrameSummary {
    pub timestep: usize,
    /// Valid records in the layer.
    pub population: usize,
    pub magenta_count: usize,
    pub cyan_count: usize,
    pub unresolved_count: usize,
    /// Mean share of same-phenotype neighbors across the layer.
    pub average_similarity: f64,
    /// Records skipped because a field was missing or not finite.
    pub malformed_records: usize,
    /// New unresolvable-ancestry anomalies raised this frame.
    pub anomalies: usize,
    /// Members of the focus lineage present in the layer.
    pub focus_alive: usize,
}

impl FrameSummary {
    pub fn count(&self, state: Phenotype) -> usize {
        match state {
            Phenotype::Magenta => self.magenta_count,
            Phenotype::Cyan => self.cyan_count,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameTimings {
    pub spatial_build_us: u64,
    pub resolve_us: u64,
    pub total_us: u64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub frames: usize,
    pub sample_every: usize,
    /// Number of times playback wrapped back to the first timestep.
    pub loops: usize,
    pub samples: Vec<FrameSummary>,
    /// `[magenta, cyan]` population per played frame, for overlay plots.
    #[serde(default)]
    pub population_history: Vec<[usize; 2]>,
    #[serde(default)]
    pub total_anomalies: usize,
    #[serde(default)]
    pub total_malformed: usize,
}

/// Running aggregate over one frame's resolved cells.
#[derive(Clone, Debug, Default)]
pub(crate) struct FrameAccumulator {
    counts: [usize; 2],
    unresolved: usize,
    similarity_sum: f64,
    cells: usize,
}

impl FrameAccumulator {
    pub(crate) fn add(&mut self, state: CellState, similarity: f64) {
        match state {
            CellState::Resolved(p) => self.counts[p.index()] += 1,
            CellState::Unresolved => self.unresolved += 1,
        }
        self.similarity_sum += similarity;
        self.cells += 1;
    }

    pub(crate) fn average_similarity(&self) -> f64 {
        if self.cells == 0 {
            return 0.0;
        }
        let mean = self.similarity_sum / self.cells as f64;
        if mean.is_nan() {
            0.0
        } else {
            mean
        }
    }

    pub(crate) fn finish(&self, timestep: usize) -> FrameSummary {
        FrameSummary {
            timestep,
            population: self.cells,
            magenta_count: self.counts[Phenotype::Magenta.index()],
            cyan_count: self.counts[Phenotype::Cyan.index()],
            unresolved_count: self.unresolved,
            average_similarity: self.average_similarity(),
            ..FrameSummary::default()
        }
    }
}
