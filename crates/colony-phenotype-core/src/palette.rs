use crate::config::ColorMode;
use crate::phenotype::{CellState, Phenotype};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Rgb([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
    }

    pub fn to_hex(self) -> u32 {
        let [r, g, b] = self.0;
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }

    /// Half-intensity variant used for capsule outlines.
    pub fn outline(self) -> Self {
        Rgb(self.0.map(|c| c / 2))
    }
}

pub const MAGENTA: Rgb = Rgb::from_hex(0xFF00FF);
pub const CYAN: Rgb = Rgb::from_hex(0x00FFFF);
pub const NEUTRAL: Rgb = Rgb::from_hex(0x808080);
pub const SPARSE: Rgb = Rgb::from_hex(0x0000FF);
pub const CROWDED: Rgb = Rgb::from_hex(0xFF0000);

pub fn phenotype_color(state: Phenotype) -> Rgb {
    match state {
        Phenotype::Magenta => MAGENTA,
        Phenotype::Cyan => CYAN,
    }
}

/// `rgb(s, s, 255 - s)` with `s` the similarity scaled to 0..=255.
pub fn similarity_color(similarity: f64) -> Rgb {
    let s = unit_to_byte(similarity);
    Rgb([s, s, 255 - s])
}

/// Linear blue-to-red ramp on neighbor count, saturating at `max_neighbors`.
pub fn density_color(neighbors: usize, max_neighbors: usize) -> Rgb {
    let t = neighbors.min(max_neighbors) as f64 / max_neighbors.max(1) as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgb([
        lerp(SPARSE.0[0], CROWDED.0[0]),
        lerp(SPARSE.0[1], CROWDED.0[1]),
        lerp(SPARSE.0[2], CROWDED.0[2]),
    ])
}

/// Display color for a cell under the configured mode. Unresolved cells are neutral in
/// every mode.
pub fn cell_color(
    mode: ColorMode,
    state: CellState,
    similarity: f64,
    neighbors: usize,
    max_neighbors: usize,
) -> Rgb {
    match (state, mode) {
        (CellState::Unresolved, _) => NEUTRAL,
        (CellState::Resolved(p), ColorMode::Inheritance) => phenotype_color(p),
        (CellState::Resolved(_), ColorMode::Similarity) => similarity_color(similarity),
        (CellState::Resolved(_), ColorMode::Density) => density_color(neighbors, max_neighbors),
    }
}

fn unit_to_byte(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
