use crate::config::{ColonyConfig, ConfigError};
use crate::dataset::Dataset;
use crate::lineage;
use crate::metrics::{FrameAccumulator, FrameSummary, FrameTimings, RunSummary};
use crate::palette::{self, Rgb};
use crate::phenotype::{CellState, LineageColorModel, Phenotype};
use crate::record::{BacteriumRecord, RawRecord};
use crate::spatial::{NeighborComposition, SpatialIndex};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Everything the rendering layer needs to draw one bacterium.
#[derive(Clone, Debug, Serialize)]
pub struct CellOutput {
    pub id: u64,
    pub state: CellState,
    pub similarity: f64,
    pub neighbors: NeighborComposition,
    pub color: Rgb,
    /// Capsule outline, a darker shade of `color`.
    pub outline: Rgb,
    pub in_focus: bool,
}

#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub cells: Vec<CellOutput>,
    pub summary: FrameSummary,
    pub timings: FrameTimings,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("frames ({actual}) exceed supported maximum ({max})")]
    TooManyFrames { max: usize, actual: usize },
    #[error("sample count ({actual}) exceeds supported maximum ({max})")]
    TooManySamples { max: usize, actual: usize },
    #[error("dataset has no timesteps")]
    EmptyDataset,
}

struct FocusLineage {
    root: u64,
    ids: HashSet<u64>,
}

/// Frame driver: owns the phenotype model and rebuilds the spatial index per frame.
pub struct ColonySystem {
    config: ColonyConfig,
    model: LineageColorModel,
    current_ids: Vec<u64>,
    last_timestep: Option<usize>,
    average_similarity: f64,
    loops: usize,
    focus: Option<FocusLineage>,
}

impl ColonySystem {
    pub const MAX_PLAYBACK_FRAMES: usize = 1_000_000;
    pub const MAX_PLAYBACK_SAMPLES: usize = 50_000;

    pub fn new(config: ColonyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let model = LineageColorModel::new(&config);
        Ok(Self {
            config,
            model,
            current_ids: Vec::new(),
            last_timestep: None,
            average_similarity: 0.0,
            loops: 0,
            focus: None,
        })
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn model(&self) -> &LineageColorModel {
        &self.model
    }

    /// Resolve every bacterium of one timestep.
    ///
    /// Cells are resolved in layer order, so neighbor counts see the phenotypes that
    /// earlier cells of the same layer were just assigned. A timestep lower than the
    /// previous one means playback looped, and the memo is cleared first.
    pub fn update_frame(&mut self, timestep: usize, layer: &[RawRecord]) -> FrameOutput {
        let total_start = Instant::now();
        if self.last_timestep.is_some_and(|prev| timestep < prev) {
            self.begin_loop();
        }
        self.last_timestep = Some(timestep);

        let (records, malformed_records) = validate_layer(timestep, layer);

        let t0 = Instant::now();
        let index = SpatialIndex::build(&records);
        let spatial_build_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        let anomalies_before = self.model.anomalies().len();
        let radius = self.config.neighbor_radius;
        let color_mode = self.config.color_mode;
        let max_neighbors = self.config.max_neighbors;
        let mut acc = FrameAccumulator::default();
        let mut cells = Vec::with_capacity(records.len());
        let mut focus_alive = 0usize;
        self.current_ids.clear();

        for record in &records {
            let model = &self.model;
            let neighbors =
                index.count_neighbors(record.x, record.y, radius, |id| model.state_of(id));
            let state = self.model.resolve(record.id, &neighbors);
            let similarity = self.model.similarity_to_neighbors(record.id, &neighbors);
            let in_focus = self
                .focus
                .as_ref()
                .is_some_and(|focus| focus.ids.contains(&record.id));
            if in_focus {
                focus_alive += 1;
            }

            acc.add(state, similarity);
            self.current_ids.push(record.id);
            let color = palette::cell_color(
                color_mode,
                state,
                similarity,
                neighbors.total,
                max_neighbors,
            );
            cells.push(CellOutput {
                id: record.id,
                state,
                similarity,
                neighbors,
                color,
                outline: color.outline(),
                in_focus,
            });
        }
        let resolve_us = t1.elapsed().as_micros() as u64;

        self.average_similarity = acc.average_similarity();
        let summary = FrameSummary {
            malformed_records,
            anomalies: self.model.anomalies().len().saturating_sub(anomalies_before),
            focus_alive,
            ..acc.finish(timestep)
        };

        FrameOutput {
            cells,
            summary,
            timings: FrameTimings {
                spatial_build_us,
                resolve_us,
                total_us: total_start.elapsed().as_micros() as u64,
            },
        }
    }

    fn begin_loop(&mut self) {
        debug!(loops = self.loops + 1, "playback wrapped to start");
        self.model.reset();
        self.last_timestep = None;
        self.loops += 1;
    }

    /// Play `frames` frames of `dataset`, looping over its timesteps.
    ///
    /// Starts from a cleared memo. A summary is sampled every `sample_every` frames
    /// and at the last frame.
    pub fn run_playback(
        &mut self,
        dataset: &Dataset,
        frames: usize,
        sample_every: usize,
    ) -> Result<RunSummary, PlaybackError> {
        if sample_every == 0 {
            return Err(PlaybackError::InvalidSampleEvery);
        }
        if frames > Self::MAX_PLAYBACK_FRAMES {
            return Err(PlaybackError::TooManyFrames {
                max: Self::MAX_PLAYBACK_FRAMES,
                actual: frames,
            });
        }
        let estimated_samples = if frames == 0 {
            0
        } else {
            ((frames - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_PLAYBACK_SAMPLES {
            return Err(PlaybackError::TooManySamples {
                max: Self::MAX_PLAYBACK_SAMPLES,
                actual: estimated_samples,
            });
        }
        let timestep_count = dataset.timestep_count();
        if timestep_count == 0 {
            return Err(PlaybackError::EmptyDataset);
        }

        self.model.reset();
        self.last_timestep = None;
        let loops_before = self.loops;
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut population_history = Vec::with_capacity(frames);
        let mut total_anomalies = 0usize;
        let mut total_malformed = 0usize;

        for frame in 1..=frames {
            let timestep = (frame - 1) % timestep_count;
            if frame > 1 && timestep == 0 {
                self.begin_loop();
            }
            let output = self.update_frame(timestep, dataset.layer(timestep));
            let summary = output.summary;
            population_history.push([summary.magenta_count, summary.cyan_count]);
            total_anomalies += summary.anomalies;
            total_malformed += summary.malformed_records;
            if frame % sample_every == 0 || frame == frames {
                samples.push(summary);
            }
        }

        Ok(RunSummary {
            schema_version: 1,
            frames,
            sample_every,
            loops: self.loops - loops_before,
            samples,
            population_history,
            total_anomalies,
            total_malformed,
        })
    }

    pub fn magenta_count(&self) -> usize {
        self.model.state_count(&self.current_ids, Phenotype::Magenta)
    }

    pub fn cyan_count(&self) -> usize {
        self.model.state_count(&self.current_ids, Phenotype::Cyan)
    }

    /// Mean similarity of the last frame; 0 before the first frame.
    pub fn average_similarity(&self) -> f64 {
        self.average_similarity
    }

    /// Number of times playback has wrapped since construction.
    pub fn loops(&self) -> usize {
        self.loops
    }

    pub fn set_signal(&mut self, percent: f64) {
        self.model.set_signal(percent);
    }

    pub fn set_alpha(&mut self, value: f64) {
        self.model.set_alpha(value);
    }

    /// Highlight `root` and its descendants for `generations` divisions.
    pub fn set_focus_lineage(&mut self, root: u64, generations: u32) {
        self.focus = Some(FocusLineage {
            root,
            ids: lineage::descendants(root, generations),
        });
    }

    pub fn clear_focus_lineage(&mut self) {
        self.focus = None;
    }

    pub fn focus_root(&self) -> Option<u64> {
        self.focus.as_ref().map(|focus| focus.root)
    }

    /// Clear all memoized phenotypes without counting a playback loop.
    pub fn reset(&mut self) {
        self.model.reset();
        self.current_ids.clear();
        self.average_similarity = 0.0;
    }
}

fn validate_layer(timestep: usize, layer: &[RawRecord]) -> (Vec<BacteriumRecord>, usize) {
    let mut records = Vec::with_capacity(layer.len());
    let mut malformed = 0usize;
    for (index, raw) in layer.iter().enumerate() {
        match raw.validate() {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(timestep, index, %error, "skipping malformed record");
                malformed += 1;
            }
        }
    }
    (records, malformed)
}

#[cfg(test)]
mod tests;
