use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::f64::consts::PI;
use thiserror::Error;

/// One bacterium as it appears in a dataset layer. Every field is optional and
/// deserialization never fails, so incomplete or wrong-typed entries reach validation
/// instead of failing the whole file.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct RawRecord {
    #[serde(rename = "ID")]
    pub id: Option<u64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub length: Option<f64>,
    pub angle: Option<f64>,
    /// First field whose JSON value had the wrong type, or `"record"` when the entry
    /// was not an object at all.
    #[serde(skip)]
    pub invalid_field: Option<&'static str>,
}

/// A validated bacterium for a single timestep.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacteriumRecord {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub length: f64,
    /// Orientation in turns, normalized to [-1, 1].
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("record field `{0}` is not a finite number")]
    NonFinite(&'static str),
    #[error("record field `{0}` has the wrong type")]
    InvalidType(&'static str),
}

impl RawRecord {
    /// Reads whatever fields `value` carries. `ID` may be an integer, an integral float
    /// or a decimal string; the other fields must be numbers.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self {
                invalid_field: Some("record"),
                ..Self::default()
            };
        };
        let mut invalid = None;
        let id = lenient(object, &["ID", "id"], identifier, &mut invalid);
        let x = lenient(object, &["x"], Value::as_f64, &mut invalid);
        let y = lenient(object, &["y"], Value::as_f64, &mut invalid);
        let length = lenient(object, &["length"], Value::as_f64, &mut invalid);
        let angle = lenient(object, &["angle"], Value::as_f64, &mut invalid);
        Self {
            id,
            x,
            y,
            length,
            angle,
            invalid_field: invalid,
        }
    }

    pub fn validate(&self) -> Result<BacteriumRecord, RecordError> {
        if let Some(field) = self.invalid_field {
            return Err(RecordError::InvalidType(field));
        }
        let id = self.id.ok_or(RecordError::MissingField("ID"))?;
        Ok(BacteriumRecord {
            id,
            x: finite("x", self.x)?,
            y: finite("y", self.y)?,
            length: finite("length", self.length)?,
            angle: finite("angle", self.angle)?,
        })
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self::from_value(&value))
    }
}

/// Looks `keys` up in order. A missing or `null` field is absent; a present field that
/// `parse` rejects is absent and recorded in `invalid` if nothing was recorded before.
fn lenient<T>(
    object: &Map<String, Value>,
    keys: &[&'static str],
    parse: impl Fn(&Value) -> Option<T>,
    invalid: &mut Option<&'static str>,
) -> Option<T> {
    let (key, value) = keys
        .iter()
        .find_map(|key| object.get(*key).map(|value| (*key, value)))?;
    if value.is_null() {
        return None;
    }
    let parsed = parse(value);
    if parsed.is_none() && invalid.is_none() {
        *invalid = Some(key);
    }
    parsed
}

fn identifier(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn finite(name: &'static str, value: Option<f64>) -> Result<f64, RecordError> {
    let value = value.ok_or(RecordError::MissingField(name))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RecordError::NonFinite(name))
    }
}

impl BacteriumRecord {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            length: 1.0,
            angle: 0.0,
        }
    }

    /// Rotation about the viewing axis, in radians.
    pub fn rotation_radians(&self) -> f64 {
        self.angle * PI
    }
}

impl From<BacteriumRecord> for RawRecord {
    fn from(record: BacteriumRecord) -> Self {
        Self {
            id: Some(record.id),
            x: Some(record.x),
            y: Some(record.y),
            length: Some(record.length),
            angle: Some(record.angle),
            invalid_field: None,
        }
    }
}
