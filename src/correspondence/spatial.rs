//! Nearest-point queries over cell centers, backed by an R-tree.
//!
//! The tree orders candidates by Euclidean distance. Manhattan queries walk
//! that order and stop once the Euclidean distance exceeds the best
//! Manhattan distance found, which bounds every remaining candidate.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use super::geometry::l1_distance;

/// Relative slack on the stopping bound.
const STOP_SLACK: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry {
    position: [f64; 3],
    item: usize,
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for Entry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Points tagged with caller indices.
#[derive(Clone, Debug)]
pub struct PointIndex {
    tree: RTree<Entry>,
}

impl PointIndex {
    /// Bulk-load `(position, item)` pairs.
    pub fn new<I>(points: I) -> Self
    where
        I: IntoIterator<Item = ([f64; 3], usize)>,
    {
        let entries: Vec<Entry> = points
            .into_iter()
            .map(|(position, item)| Entry { position, item })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// True without points.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Item nearest to `q` in Manhattan distance; ties go to the smallest item.
    pub fn nearest_l1(&self, q: [f64; 3]) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for entry in self.tree.nearest_neighbor_iter(&q) {
            if let Some((d, _)) = best {
                if entry.distance_2(&q).sqrt() > d * (1.0 + STOP_SLACK) {
                    break;
                }
            }
            let d = l1_distance(entry.position, q);
            if best.is_none_or(|(bd, bi)| d < bd || (d == bd && entry.item < bi)) {
                best = Some((d, entry.item));
            }
        }
        best.map(|(_, item)| item)
    }
}
