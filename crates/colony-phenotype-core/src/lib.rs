pub mod config;
pub mod constants;
pub mod dataset;
pub mod lineage;
pub mod metrics;
pub mod palette;
pub mod phenotype;
pub mod record;
pub mod rng;
pub mod spatial;
pub mod system;

pub use config::{ColonyConfig, ColorMode, ConfigError, FeedbackMode};
pub use dataset::{Dataset, DatasetError};
pub use metrics::{FrameSummary, FrameTimings, RunSummary};
pub use phenotype::{Anomaly, CellState, LineageColorModel, Phenotype};
pub use record::{BacteriumRecord, RawRecord, RecordError};
pub use spatial::{NeighborComposition, SpatialIndex};
pub use system::{CellOutput, ColonySystem, FrameOutput, PlaybackError};
