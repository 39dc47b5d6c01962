use colony_phenotype_core::{ColonyConfig, ColonySystem, Dataset, RunSummary};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// Minimal PyO3 module exposing colony-phenotype-core to Python.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&ColonyConfig::default())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize default config: {e}")))
}

#[pyfunction]
fn validate_config_json(config_json: &str) -> PyResult<bool> {
    parse_config(Some(config_json)).map_err(PyValueError::new_err)?;
    Ok(true)
}

/// Play a dataset and return the run summary as JSON.
///
/// `frames` defaults to one pass over the dataset's timesteps.
#[pyfunction]
#[pyo3(signature = (data_json, config_json=None, frames=None, sample_every=1))]
fn run_dataset_json(
    data_json: &str,
    config_json: Option<&str>,
    frames: Option<usize>,
    sample_every: usize,
) -> PyResult<String> {
    let summary =
        play(data_json, config_json, frames, sample_every).map_err(PyValueError::new_err)?;
    serde_json::to_string(&summary)
        .map_err(|e| PyValueError::new_err(format!("failed to serialize summary: {e}")))
}

fn parse_config(config_json: Option<&str>) -> Result<ColonyConfig, String> {
    let config = match config_json {
        Some(json) => serde_json::from_str::<ColonyConfig>(json)
            .map_err(|e| format!("invalid config json: {e}"))?,
        None => ColonyConfig::default(),
    };
    config
        .validate()
        .map_err(|e| format!("invalid colony configuration: {e}"))?;
    Ok(config)
}

fn play(
    data_json: &str,
    config_json: Option<&str>,
    frames: Option<usize>,
    sample_every: usize,
) -> Result<RunSummary, String> {
    let config = parse_config(config_json)?;
    let dataset = Dataset::from_json_str(data_json).map_err(|e| e.to_string())?;
    let mut system = ColonySystem::new(config).map_err(|e| e.to_string())?;
    let frames = frames.unwrap_or_else(|| dataset.timestep_count());
    system
        .run_playback(&dataset, frames, sample_every)
        .map_err(|e| format!("playback failed: {e}"))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(validate_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(run_dataset_json, m)?)?;
    Ok(())
}
