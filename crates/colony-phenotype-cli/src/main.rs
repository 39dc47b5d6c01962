use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use colony_phenotype_core::lineage::generation_of;
use colony_phenotype_core::{
    BacteriumRecord, ColonyConfig, ColonySystem, Dataset, RawRecord, SpatialIndex,
};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

const WARMUP_FRAMES: usize = 3;
const FOCUS_GENERATIONS: u32 = 14;
const COLONY_SPACING: f64 = 40.0;
const TARGET_FPS: f64 = 60.0;

#[derive(Parser)]
#[command(name = "colony-phenotype")]
#[command(about = "Headless phenotype playback for bacterial colony datasets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a dataset and summarize phenotype populations
    Run {
        /// Path to dataset file (JSON, timestep -> records)
        #[arg(long)]
        data: PathBuf,

        /// Path to config file (JSON, optional)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Frames to play (default: one pass over the dataset)
        #[arg(long)]
        frames: Option<usize>,

        /// Record a summary every N frames
        #[arg(long, default_value_t = 1)]
        sample_every: usize,

        /// Neighbor-influence strength in percent
        #[arg(long)]
        signal: Option<f64>,

        /// Baseline switching rate
        #[arg(long)]
        alpha: Option<f64>,

        /// Founder ID whose lineage is tracked separately
        #[arg(long)]
        focus: Option<u64>,

        /// Output directory for summary.json (optional)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Play up to one timestep and print every cell of it as JSON lines
    Inspect {
        /// Path to dataset file (JSON, timestep -> records)
        #[arg(long)]
        data: PathBuf,

        /// Path to config file (JSON, optional)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Timestep to inspect
        #[arg(long)]
        timestep: usize,

        /// Only report the cell with this ID
        #[arg(long)]
        id: Option<u64>,
    },
    /// Time the per-frame pass on synthetic colonies
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

/// Founders on a grid, each doubling once per timestep around its own center.
fn synthetic_colony(founders: u64, generations: u32, seed: u64) -> Dataset {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    let side = (founders as f64).sqrt().ceil() as u64;
    let layers = (0..=generations).map(|generation| {
        let per_founder = 1u64 << generation;
        let spread = (per_founder as f64).sqrt() * 2.0;
        let mut layer = Vec::with_capacity((founders * per_founder) as usize);
        for f in 0..founders {
            let founder_id = 1000 + f;
            let cx = (f % side) as f64 * COLONY_SPACING;
            let cy = (f / side) as f64 * COLONY_SPACING;
            for k in 0..per_founder {
                let record = BacteriumRecord {
                    id: (founder_id << generation) + k,
                    x: cx + (rng.random::<f64>() - 0.5) * spread,
                    y: cy + (rng.random::<f64>() - 0.5) * spread,
                    length: 2.0 + rng.random::<f64>() * 2.0,
                    angle: rng.random::<f64>() * 2.0 - 1.0,
                };
                layer.push(RawRecord::from(record));
            }
        }
        (generation as usize, layer)
    });
    Dataset::from_layers(layers)
}

fn run_benchmark(founders: u64, generations: u32, config: &ColonyConfig) -> Result<()> {
    let dataset = synthetic_colony(founders, generations, config.seed);
    let mut system =
        ColonySystem::new(config.clone()).context("Benchmark config validation error")?;
    let timesteps = dataset.timestep_count();

    for step in 0..WARMUP_FRAMES.min(timesteps) {
        system.update_frame(step, dataset.layer(step));
    }
    system.reset();

    let mut total_spatial = 0u64;
    let mut total_resolve = 0u64;
    let mut total_time = 0u64;
    let mut last_population = 0usize;
    for step in 0..timesteps {
        let output = system.update_frame(step, dataset.layer(step));
        total_spatial += output.timings.spatial_build_us;
        total_resolve += output.timings.resolve_us;
        total_time += output.timings.total_us;
        last_population = output.summary.population;
    }

    let frames = timesteps.max(1) as f64;
    let avg_frame_us = (total_time as f64 / frames).max(1.0);
    let frames_per_sec = 1_000_000.0 / avg_frame_us;
    println!(
        "--- {founders} founders x {generations} generations ({last_population} cells in last frame) ---"
    );
    println!("  Avg frame:     {avg_frame_us:.0} us ({frames_per_sec:.1} frames/sec)");
    println!(
        "  Breakdown:     spatial={:.0} us, resolve={:.0} us",
        total_spatial as f64 / frames,
        total_resolve as f64 / frames,
    );
    println!(
        "  Final split:   magenta={} cyan={}",
        system.magenta_count(),
        system.cyan_count()
    );
    let verdict = if frames_per_sec >= TARGET_FPS {
        "OK"
    } else {
        "SLOW"
    };
    println!("  Verdict:       {verdict} (target: >={TARGET_FPS} frames/sec)");
    println!();
    Ok(())
}

/// Plays timesteps `0..=timestep` in order and describes the cells of the last one,
/// including the IDs inside each cell's neighbor circle.
fn inspect_timestep(
    system: &mut ColonySystem,
    dataset: &Dataset,
    timestep: usize,
    only: Option<u64>,
) -> Result<Vec<Value>> {
    ensure!(
        timestep < dataset.timestep_count(),
        "timestep {timestep} is past the last timestep ({})",
        dataset.timestep_count().saturating_sub(1)
    );
    for step in 0..timestep {
        system.update_frame(step, dataset.layer(step));
    }
    let layer = dataset.layer(timestep);
    let output = system.update_frame(timestep, layer);

    // Cells come out in the order of the records that validated.
    let records: Vec<BacteriumRecord> = layer
        .iter()
        .filter_map(|raw| raw.validate().ok())
        .collect();
    let index = SpatialIndex::build(&records);
    let radius = system.config().neighbor_radius;

    Ok(records
        .iter()
        .zip(&output.cells)
        .filter(|(record, _)| only.map_or(true, |id| id == record.id))
        .map(|(record, cell)| {
            json!({
                "id": cell.id,
                "generation": generation_of(cell.id),
                "state": cell.state,
                "similarity": cell.similarity,
                "color": format!("#{:06x}", cell.color.to_hex()),
                "outline": format!("#{:06x}", cell.outline.to_hex()),
                "length": record.length,
                "rotation_radians": record.rotation_radians(),
                "in_focus": cell.in_focus,
                "neighbor_ids": index.neighbor_ids(record.x, record.y, radius),
            })
        })
        .collect())
}

fn load_config(path: Option<&PathBuf>) -> Result<ColonyConfig> {
    let Some(path) = path else {
        return Ok(ColonyConfig::default());
    };
    let file = File::open(path).context("failed to open config file")?;
    let config: ColonyConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    Ok(config)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = ColonyConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Inspect {
            data,
            config,
            timestep,
            id,
        } => {
            let colony_config = load_config(config.as_ref())?;
            let file = File::open(&data).context("failed to open dataset file")?;
            let dataset =
                Dataset::from_reader(BufReader::new(file)).context("failed to parse dataset")?;
            let mut system = ColonySystem::new(colony_config).context("Config validation error")?;
            let cells = inspect_timestep(&mut system, &dataset, timestep, id)?;
            if cells.is_empty() {
                info!(timestep, ?id, "no matching cells");
            }
            for cell in cells {
                println!("{}", serde_json::to_string(&cell)?);
            }
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p colony-phenotype-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Colony Phenotype Frame Benchmark ===");
            println!("Target: >={TARGET_FPS} frames/sec");
            println!();

            let config = ColonyConfig::default();
            let sizes = [(16, 6), (64, 6), (64, 8), (256, 8)];
            for (founders, generations) in sizes {
                run_benchmark(founders, generations, &config)?;
            }
        }
        Commands::Run {
            data,
            config,
            frames,
            sample_every,
            signal,
            alpha,
            focus,
            out,
        } => {
            let colony_config = load_config(config.as_ref())?;
            let file = File::open(&data).context("failed to open dataset file")?;
            let dataset =
                Dataset::from_reader(BufReader::new(file)).context("failed to parse dataset")?;
            ensure!(!dataset.is_empty(), "dataset {:?} has no timesteps", data);

            let mut system = ColonySystem::new(colony_config).context("Config validation error")?;
            if let Some(signal) = signal {
                system.set_signal(signal);
            }
            if let Some(alpha) = alpha {
                system.set_alpha(alpha);
            }
            if let Some(root) = focus {
                system.set_focus_lineage(root, FOCUS_GENERATIONS);
            }

            let frames = frames.unwrap_or_else(|| dataset.timestep_count());
            info!(
                timesteps = dataset.timestep_count(),
                records = dataset.total_records(),
                frames,
                "loaded dataset"
            );
            println!("Loaded dataset from {:?}", data);
            println!("Playing {} frames...", frames);

            let summary = system
                .run_playback(&dataset, frames, sample_every)
                .context("playback failed")?;

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                let summary_path = out_dir.join("summary.json");
                let file = File::create(summary_path).context("failed to create summary file")?;
                serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
                println!("Run complete. Results saved to {:?}", out_dir);
            } else if let Some(last) = summary.samples.last() {
                println!(
                    "Run complete. Final split: magenta={} cyan={} similarity={:.3} (loops: {}, anomalies: {}, malformed: {})",
                    last.magenta_count,
                    last.cyan_count,
                    last.average_similarity,
                    summary.loops,
                    summary.total_anomalies,
                    summary.total_malformed,
                );
            } else {
                println!("Run complete. No frames played.");
            }
        }
    }
    Ok(())
}
