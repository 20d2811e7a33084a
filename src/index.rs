//! Static 2-D k-d tree for nearest-neighbor lookup.
//!
//! # Layout
//!
//! The tree is implicit: all nodes live in one `Vec` and the node for a range
//! `lo..hi` sits at its midpoint, with the left subtree in `lo..mid` and the
//! right subtree in `mid + 1..hi`. Levels alternate between latitude (even
//! depth) and longitude (odd depth). Building is a median selection per level,
//! O(N log N) expected.
//!
//! Each node stores its coordinates and a `u32` index into the caller's record
//! list, so the tree never owns or duplicates record data.
//!
//! # Metric
//!
//! Distances are squared Euclidean on raw degrees. This is a planar
//! approximation: it ignores meridian convergence and does not wrap at the
//! antimeridian. For "nearest city" at country or region scale the density of
//! cities dominates the error, so the cheaper metric is used.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Copy)]
struct Node {
    point: [f64; 2],
    item: u32,
}

/// A point returned by [`SpatialIndex::nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Squared Euclidean distance to the query, in degrees².
    pub distance: f64,
    /// Position of the point in the slice the index was built from.
    pub index: usize,
}

/// Immutable nearest-neighbor index over `(latitude, longitude)` points.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    nodes: Vec<Node>,
}

impl SpatialIndex {
    /// Builds the index. Point `i` is reported back as `Neighbor { index: i, .. }`.
    ///
    /// Points with a non-finite coordinate are left out.
    ///
    /// # Examples
    ///
    /// ```
    /// use revgeo::SpatialIndex;
    ///
    /// let index = SpatialIndex::build(&[(48.8566, 2.3522), (48.8049, 2.1204)]);
    /// let nearest = index.nearest(48.85, 2.35, 1);
    /// assert_eq!(nearest[0].index, 0);
    /// ```
    pub fn build(points: &[(f64, f64)]) -> Self {
        let mut nodes: Vec<Node> = points
            .iter()
            .enumerate()
            .filter(|(_, (lat, lon))| lat.is_finite() && lon.is_finite())
            .map(|(i, &(lat, lon))| Node {
                point: [lat, lon],
                item: i as u32,
            })
            .collect();

        partition(&mut nodes, 0);
        Self { nodes }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no points are indexed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The `k` points closest to `(latitude, longitude)`, nearest first.
    ///
    /// Returns fewer than `k` neighbors only when the index holds fewer points.
    /// Points at equal distance come back in no particular order.
    pub fn nearest(&self, latitude: f64, longitude: f64, k: usize) -> Vec<Neighbor> {
        if k == 0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let mut best = Candidates {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        };
        self.search(0, self.nodes.len(), 0, [latitude, longitude], &mut best);

        best.heap
            .into_sorted_vec()
            .into_iter()
            .map(|(distance, item)| Neighbor {
                distance: distance.0,
                index: item as usize,
            })
            .collect()
    }

    fn search(&self, lo: usize, hi: usize, depth: usize, query: [f64; 2], best: &mut Candidates) {
        if lo >= hi {
            return;
        }

        let mid = lo + (hi - lo) / 2;
        let node = &self.nodes[mid];
        best.offer(squared_distance(node.point, query), node.item);

        let axis = depth % 2;
        let diff = query[axis] - node.point[axis];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(near.0, near.1, depth + 1, query, best);
        if best.accepts(diff * diff) {
            self.search(far.0, far.1, depth + 1, query, best);
        }
    }
}

/// Max-heap of the best `k` candidates seen so far.
struct Candidates {
    k: usize,
    heap: BinaryHeap<(OrderedFloat<f64>, u32)>,
}

impl Candidates {
    fn offer(&mut self, distance: f64, item: u32) {
        if self.heap.len() < self.k {
            self.heap.push((OrderedFloat(distance), item));
        } else if self.accepts(distance) {
            self.heap.pop();
            self.heap.push((OrderedFloat(distance), item));
        }
    }

    /// Whether something at `distance` could still make the cut.
    fn accepts(&self, distance: f64) -> bool {
        self.heap.len() < self.k
            || self
                .heap
                .peek()
                .is_some_and(|(worst, _)| OrderedFloat(distance) < *worst)
    }
}

fn partition(nodes: &mut [Node], depth: usize) {
    if nodes.len() <= 1 {
        return;
    }

    let axis = depth % 2;
    let mid = nodes.len() / 2;
    nodes.select_nth_unstable_by(mid, |a, b| a.point[axis].total_cmp(&b.point[axis]));

    let (left, rest) = nodes.split_at_mut(mid);
    partition(left, depth + 1);
    partition(&mut rest[1..], depth + 1);
}

fn squared_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dlat = a[0] - b[0];
    let dlon = a[1] - b[1];
    dlat * dlat + dlon * dlon
}
