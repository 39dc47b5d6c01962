use crate::phenotype::Phenotype;
use crate::record::BacteriumRecord;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Position-only entry so the tree never clones full records.
#[derive(Clone, Debug)]
pub struct CellLocation {
    pub id: u64,
    pub position: [f64; 2],
}

impl RTreeObject for CellLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Neighbor counts around a query point.
///
/// `count_by_state` is indexed by [`Phenotype::index`]. Cells without a resolved
/// phenotype contribute to `total` only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborComposition {
    pub total: usize,
    pub count_by_state: [usize; 2],
}

impl NeighborComposition {
    pub fn count(&self, state: Phenotype) -> usize {
        self.count_by_state[state.index()]
    }

    /// Share of neighbors carrying `state`; 0 when there are no neighbors.
    pub fn proportion(&self, state: Phenotype) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(state) as f64 / self.total as f64
        }
    }
}

/// Per-frame point index over one timestep's bacteria.
///
/// Rebuilt from scratch every frame; it keeps no state across frames.
pub struct SpatialIndex {
    tree: RTree<CellLocation>,
}

impl SpatialIndex {
    /// Build an R*-tree from record positions via bulk_load (O(n log n)).
    pub fn build(records: &[BacteriumRecord]) -> Self {
        let locations: Vec<CellLocation> = records
            .iter()
            .map(|r| CellLocation {
                id: r.id,
                position: [r.x, r.y],
            })
            .collect();
        Self {
            tree: RTree::bulk_load(locations),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Count indexed cells strictly inside the circle of `radius` around `(x, y)`.
    ///
    /// A cell at the query point itself is counted. `lookup` reports the resolved
    /// phenotype of a neighbor, if any.
    pub fn count_neighbors(
        &self,
        x: f64,
        y: f64,
        radius: f64,
        lookup: impl Fn(u64) -> Option<Phenotype>,
    ) -> NeighborComposition {
        let mut composition = NeighborComposition::default();
        self.for_each_neighbor(x, y, radius, |loc| {
            composition.total += 1;
            if let Some(state) = lookup(loc.id) {
                composition.count_by_state[state.index()] += 1;
            }
        });
        composition
    }

    /// Sorted IDs of the cells strictly inside the circle of `radius` around `(x, y)`.
    pub fn neighbor_ids(&self, x: f64, y: f64, radius: f64) -> Vec<u64> {
        let mut ids = Vec::new();
        self.for_each_neighbor(x, y, radius, |loc| ids.push(loc.id));
        ids.sort_unstable();
        ids
    }

    fn for_each_neighbor(
        &self,
        x: f64,
        y: f64,
        radius: f64,
        mut visitor: impl FnMut(&CellLocation),
    ) {
        if !(radius.is_finite() && radius > 0.0) {
            return;
        }
        let r_sq = radius * radius;
        // The envelope query prunes every subtree whose bounding box misses the
        // circle's bounding square; the squared-distance test trims the corners.
        let envelope = AABB::from_corners([x - radius, y - radius], [x + radius, y + radius]);
        for loc in self.tree.locate_in_envelope(&envelope) {
            let dx = loc.position[0] - x;
            let dy = loc.position[1] - y;
            if dx * dx + dy * dy < r_sq {
                visitor(loc);
            }
        }
    }
}
