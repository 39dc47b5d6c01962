/// Lowest identifier of the founder band. Founders have no tracked parent.
pub const FOUNDER_ID_MIN: u64 = 1000;

/// Highest identifier of the founder band (inclusive).
pub const FOUNDER_ID_MAX: u64 = 2000;

/// Upper bound on ancestor halvings. A `u64` identifier reaches zero within 64 halvings,
/// so the walk can never need more.
pub const MAX_ANCESTOR_DEPTH: u32 = 64;

/// Raw signal slider range, in percent. Divided by 100 before it reaches the transition rule.
pub const SIGNAL_PERCENT_MIN: f64 = 0.0;
pub const SIGNAL_PERCENT_MAX: f64 = 100.0;

/// Largest number of generations a focus lineage may span. `2^(g+1)` IDs are generated.
pub const MAX_FOCUS_GENERATIONS: u32 = 20;

/// Highest timestep a dataset may carry. One past it equals the playback frame cap.
pub const MAX_TIMESTEP: usize = 999_999;
