use crate::constants::MAX_TIMESTEP;
use crate::record::RawRecord;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use thiserror::Error;

/// Time-indexed bacterium records, one layer per timestep.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    layers: BTreeMap<usize, Vec<RawRecord>>,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid dataset json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timestep key `{0}` is not a non-negative integer")]
    InvalidTimestep(String),
    #[error("timestep {actual} exceeds the maximum of {max}")]
    TimestepTooLarge { max: usize, actual: String },
    #[error("layer for timestep `{0}` is not an array")]
    InvalidLayer(String),
    #[error("dataset must be an object keyed by timestep or an array of layers")]
    InvalidShape,
}

impl Dataset {
    pub fn from_layers(layers: impl IntoIterator<Item = (usize, Vec<RawRecord>)>) -> Self {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, DatasetError> {
        Self::from_value(serde_json::from_reader(reader)?)
    }

    /// Accepts an object keyed by decimal timestep or a plain array of layers. Only the
    /// outer shape can fail here; individual entries are checked per frame.
    fn from_value(value: Value) -> Result<Self, DatasetError> {
        let layers = match value {
            Value::Object(keyed) => keyed
                .into_iter()
                .map(|(key, layer)| {
                    let step = timestep(&key)?;
                    let records = records(layer).ok_or(DatasetError::InvalidLayer(key))?;
                    Ok((step, records))
                })
                .collect::<Result<BTreeMap<_, _>, DatasetError>>()?,
            Value::Array(ordered) => {
                if ordered.len() > MAX_TIMESTEP + 1 {
                    return Err(DatasetError::TimestepTooLarge {
                        max: MAX_TIMESTEP,
                        actual: (ordered.len() - 1).to_string(),
                    });
                }
                ordered
                    .into_iter()
                    .enumerate()
                    .map(|(step, layer)| {
                        records(layer)
                            .map(|records| (step, records))
                            .ok_or_else(|| DatasetError::InvalidLayer(step.to_string()))
                    })
                    .collect::<Result<BTreeMap<_, _>, DatasetError>>()?
            }
            _ => return Err(DatasetError::InvalidShape),
        };
        Ok(Self { layers })
    }

    /// Records for `timestep`; empty when the dataset has no such layer.
    pub fn layer(&self, timestep: usize) -> &[RawRecord] {
        self.layers.get(&timestep).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One past the highest timestep present.
    pub fn timestep_count(&self) -> usize {
        self.layers
            .keys()
            .next_back()
            .map_or(0, |last| last.saturating_add(1))
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }
}

fn timestep(key: &str) -> Result<usize, DatasetError> {
    let trimmed = key.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DatasetError::InvalidTimestep(key.to_string()));
    }
    match trimmed.parse::<usize>() {
        Ok(step) if step <= MAX_TIMESTEP => Ok(step),
        _ => Err(DatasetError::TimestepTooLarge {
            max: MAX_TIMESTEP,
            actual: trimmed.to_string(),
        }),
    }
}

fn records(layer: Value) -> Option<Vec<RawRecord>> {
    match layer {
        Value::Array(entries) => Some(entries.iter().map(RawRecord::from_value).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_dataset_parses_string_timesteps() {
        let json = r#"{
            "0": [{"x": 1, "y": 2, "length": 3, "angle": 0.1, "ID": 1000}],
            "2": [
                {"x": 1, "y": 2, "length": 3, "angle": 0.1, "ID": 2000},
                {"x": 1, "y": 2, "ID": 4001}
            ]
        }"#;
        let dataset = Dataset::from_json_str(json).expect("dataset should parse");
        assert_eq!(dataset.timestep_count(), 3);
        assert_eq!(dataset.layer(0).len(), 1);
        assert!(dataset.layer(1).is_empty());
        assert_eq!(dataset.layer(2).len(), 2);
        assert_eq!(dataset.total_records(), 3);
        assert!(dataset.layer(2)[1].validate().is_err());
    }

    #[test]
    fn ordered_dataset_uses_array_positions() {
        let json = r#"[[], [{"x": 0, "y": 0, "length": 1, "angle": 0, "ID": 1500}]]"#;
        let dataset = Dataset::from_json_str(json).expect("dataset should parse");
        assert_eq!(dataset.timestep_count(), 2);
        assert_eq!(dataset.layer(1)[0].id, Some(1500));
    }

    #[test]
    fn non_numeric_timestep_is_rejected() {
        let result = Dataset::from_json_str(r#"{"first": []}"#);
        assert!(matches!(result, Err(DatasetError::InvalidTimestep(key)) if key == "first"));
    }

    #[test]
    fn empty_dataset_has_no_timesteps() {
        let dataset = Dataset::from_json_str("{}").expect("empty object parses");
        assert!(dataset.is_empty());
        assert_eq!(dataset.timestep_count(), 0);
    }

    #[test]
    fn wrong_typed_records_do_not_fail_the_file() {
        let json = r#"{"0": [
            {"x": 0, "y": 0, "length": 1, "angle": 0, "ID": 1000},
            {"x": "bad", "y": 0, "length": 1, "angle": 0, "ID": 1001},
            {"x": 0, "y": 0, "length": 1, "angle": 0, "ID": 1500.0},
            7
        ]}"#;
        let dataset = Dataset::from_json_str(json).expect("dataset should parse");
        let layer = dataset.layer(0);
        assert_eq!(layer.len(), 4);
        assert!(layer[0].validate().is_ok());
        assert!(layer[1].validate().is_err());
        assert_eq!(layer[2].validate().map(|r| r.id), Ok(1500));
        assert!(layer[3].validate().is_err());
    }

    #[test]
    fn oversized_timestep_keys_are_rejected() {
        let result = Dataset::from_json_str(r#"{"18446744073709551615": []}"#);
        assert!(matches!(result, Err(DatasetError::TimestepTooLarge { .. })));

        let result = Dataset::from_json_str(r#"{"4000000000": []}"#);
        assert!(matches!(
            result,
            Err(DatasetError::TimestepTooLarge { max, ref actual })
                if max == MAX_TIMESTEP && actual == "4000000000"
        ));

        let key = format!(r#"{{"{MAX_TIMESTEP}": []}}"#);
        let dataset = Dataset::from_json_str(&key).expect("largest timestep is accepted");
        assert_eq!(dataset.timestep_count(), MAX_TIMESTEP + 1);
    }

    #[test]
    fn timestep_count_saturates_for_programmatic_layers() {
        let dataset = Dataset::from_layers([(usize::MAX, Vec::new())]);
        assert_eq!(dataset.timestep_count(), usize::MAX);
    }

    #[test]
    fn non_array_layers_and_scalars_are_shape_errors() {
        let result = Dataset::from_json_str(r#"{"0": {"ID": 1000}}"#);
        assert!(matches!(result, Err(DatasetError::InvalidLayer(key)) if key == "0"));
        assert!(matches!(
            Dataset::from_json_str("42"),
            Err(DatasetError::InvalidShape)
        ));
    }
}
