//! R-tree index over planar point positions.
//!
//! Positions are indexed by slot in the caller's slice, so query results map back to
//! the owning `Vec<PlantedPoint>` without cloning.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::{PlanarPoint, PlantedPoint};

/// A planar position with its slot in the source slice
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over the planar coordinates of a point snapshot.
#[derive(Debug, Clone, Default)]
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    /// Bulk-load an index for `points`. Slots follow slice order.
    pub fn build(points: &[PlantedPoint]) -> Self {
        let indexed: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint { idx: i, x: p.planar.x, y: p.planar.y })
            .collect();

        Self { tree: RTree::bulk_load(indexed) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Slot of the closest point within `max_distance` of `target`.
    ///
    /// Equal distances resolve to the lowest slot, so the earlier point in the
    /// snapshot wins.
    pub fn nearest_within(&self, target: &PlanarPoint, max_distance: f64) -> Option<usize> {
        self.candidates(target, max_distance)
            .into_iter()
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(idx, _)| idx)
    }

    /// Slots of all points within `radius` of `target`, in ascending slot order.
    pub fn within_radius(&self, target: &PlanarPoint, radius: f64) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .candidates(target, radius)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// The `k` nearest slots to `target` with their distances, closest first,
    /// skipping `exclude` (typically the query point's own slot).
    pub fn k_nearest(
        &self,
        target: &PlanarPoint,
        k: usize,
        exclude: Option<usize>,
    ) -> Vec<(usize, f64)> {
        let available = self.len() - exclude.map_or(0, |e| usize::from(e < self.len()));
        let wanted = k.min(available);
        if wanted == 0 {
            return Vec::new();
        }

        // Grow the search circle until it holds enough points; everything outside
        // the circle is farther than everything inside it.
        let mut radius = 16.0;
        loop {
            let mut found: Vec<(usize, f64)> = self
                .candidates(target, radius)
                .into_iter()
                .filter(|(idx, _)| Some(*idx) != exclude)
                .collect();

            if found.len() >= wanted || !radius.is_finite() {
                found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                found.truncate(wanted);
                return found;
            }
            radius *= 4.0;
        }
    }

    /// Slots and distances of points within `radius`, unordered.
    fn candidates(&self, target: &PlanarPoint, radius: f64) -> Vec<(usize, f64)> {
        if !(radius >= 0.0) || !target.x.is_finite() || !target.y.is_finite() {
            return Vec::new();
        }
        let query = [target.x, target.y];
        let search_bounds = AABB::from_corners(
            [target.x - radius, target.y - radius],
            [target.x + radius, target.y + radius],
        );
        let max_distance_2 = radius * radius;

        self.tree
            .locate_in_envelope_intersecting(&search_bounds)
            .filter_map(|p| {
                let d2 = p.distance_2(&query);
                (d2 <= max_distance_2).then(|| (p.idx, d2.sqrt()))
            })
            .collect()
    }
}
