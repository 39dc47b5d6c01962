//! Helpers over the binary lineage identifier tree.
//!
//! Founder cells carry an identifier inside `[FOUNDER_ID_MIN, FOUNDER_ID_MAX]`. Every
//! identifier above the band descends from `id / 2`, so the left child of `p` is `2p`
//! and the right child is `2p + 1`.

use crate::constants::{FOUNDER_ID_MAX, FOUNDER_ID_MIN, MAX_FOCUS_GENERATIONS};
use std::collections::HashSet;

pub fn is_founder(id: u64) -> bool {
    (FOUNDER_ID_MIN..=FOUNDER_ID_MAX).contains(&id)
}

/// Parent identifier, or `None` for founders and identifiers below the band.
pub fn parent(id: u64) -> Option<u64> {
    (id > FOUNDER_ID_MAX).then_some(id / 2)
}

/// Iterate `id / 2, id / 4, ...` for at most `max_depth` steps, stopping after the first
/// ancestor that is not itself a descendant (a founder or an out-of-band identifier).
pub fn ancestors(id: u64, max_depth: u32) -> Ancestors {
    Ancestors {
        next: parent(id),
        remaining: max_depth,
    }
}

#[derive(Clone, Debug)]
pub struct Ancestors {
    next: Option<u64>,
    remaining: u32,
}

impl Iterator for Ancestors {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = parent(current);
        Some(current)
    }
}

/// Number of halvings between `id` and its founder, or `None` when the walk
/// never lands inside the founder band.
pub fn generation_of(id: u64) -> Option<u32> {
    let mut current = id;
    let mut generation = 0u32;
    while current > FOUNDER_ID_MAX {
        current /= 2;
        generation += 1;
    }
    is_founder(current).then_some(generation)
}

/// The root plus every descendant identifier within `generations` divisions.
///
/// `generations` is capped at [`MAX_FOCUS_GENERATIONS`]; identifiers that would
/// overflow `u64` are dropped.
pub fn descendants(root: u64, generations: u32) -> HashSet<u64> {
    let generations = generations.min(MAX_FOCUS_GENERATIONS);
    let mut ids = HashSet::new();
    ids.insert(root);
    let mut frontier = vec![root];
    for _ in 0..generations {
        let mut next = Vec::with_capacity(frontier.len() * 2);
        for id in frontier {
            let Some(left) = id.checked_mul(2) else {
                continue;
            };
            next.push(left);
            if let Some(right) = left.checked_add(1) {
                next.push(right);
            }
        }
        ids.extend(next.iter().copied());
        frontier = next;
    }
    ids
}
