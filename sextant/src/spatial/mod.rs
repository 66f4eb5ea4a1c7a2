//! Spatial index for nearest-neighbor queries over 2-D point sets.
//!
//! A bucketed k-d tree: points are partitioned by median splits along the
//! axis of larger spread until at most `leaf_size` points remain in a node.
//! The tree is built once per point set and queried many times.


use glam::DVec2;

use crate::constants::DEFAULT_LEAF_SIZE;
use crate::error::Error;

/// Result of a neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the point slice the tree was built from.
    pub index: usize,
    /// Squared Euclidean distance to the query point.
    pub dist_sq: f64,
}

impl Neighbor {
    /// Euclidean distance to the query point.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.dist_sq.sqrt()
    }

    /// Ordering used for deterministic results: distance, then lower index.
    #[inline]
    fn closer_than(&self, other: &Neighbor) -> bool {
        self.dist_sq < other.dist_sq || (self.dist_sq == other.dist_sq && self.index < other.index)
    }
}

/// A 2-D k-d tree over a static point cloud.
#[derive(Debug, Clone)]
pub struct KdTree {
    points: Vec<DVec2>,
    /// Permutation of point indices; leaves own contiguous ranges of it.
    order: Vec<usize>,
    nodes: Vec<KdNode>,
}

#[derive(Debug, Clone, Copy)]
enum KdNode {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        /// 0 = x, 1 = y
        dim: usize,
        value: f64,
        left: usize,
        right: usize,
    },
}

impl KdTree {
    /// Build a tree with the default leaf size.
    ///
    /// An empty slice yields an empty tree; queries on it fail with
    /// [`Error::EmptyIndex`].
    pub fn build(points: &[DVec2]) -> Self {
        Self::with_leaf_size(points, DEFAULT_LEAF_SIZE)
    }

    /// Build a tree whose leaves hold at most `leaf_size` points.
    pub fn with_leaf_size(points: &[DVec2], leaf_size: usize) -> Self {
        assert!(leaf_size > 0, "leaf_size must be positive");

        let points = points.to_vec();
        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::new();

        if !points.is_empty() {
            Self::build_recursive(&points, &mut order, 0, leaf_size, &mut nodes);
        }

        Self {
            points,
            order,
            nodes,
        }
    }

    fn build_recursive(
        points: &[DVec2],
        indices: &mut [usize],
        offset: usize,
        leaf_size: usize,
        nodes: &mut Vec<KdNode>,
    ) -> usize {
        let node_idx = nodes.len();

        if indices.len() <= leaf_size {
            nodes.push(KdNode::Leaf {
                start: offset,
                end: offset + indices.len(),
            });
            return node_idx;
        }

        // Split along the axis with the larger extent
        let (min, max) = indices.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), &i| (lo.min(points[i]), hi.max(points[i])),
        );
        let extent = max - min;
        let dim = if extent.x >= extent.y { 0 } else { 1 };

        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            points[a][dim]
                .total_cmp(&points[b][dim])
                .then(a.cmp(&b))
        });
        let value = points[indices[mid]][dim];

        // Placeholder, patched once both children exist
        nodes.push(KdNode::Leaf { start: 0, end: 0 });

        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = Self::build_recursive(points, left_indices, offset, leaf_size, nodes);
        let right = Self::build_recursive(points, right_indices, offset + mid, leaf_size, nodes);

        nodes[node_idx] = KdNode::Split {
            dim,
            value,
            left,
            right,
        };
        node_idx
    }

    /// Nearest indexed point to `query`.
    ///
    /// Ties resolve to the lower point index, so results are deterministic.
    pub fn nearest(&self, query: DVec2) -> Result<Neighbor, Error> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyIndex);
        }
        if !query.is_finite() {
            return Err(Error::NonFiniteQuery {
                x: query.x,
                y: query.y,
            });
        }

        let mut best = Neighbor {
            index: usize::MAX,
            dist_sq: f64::INFINITY,
        };
        self.nearest_recursive(0, query, &mut best);
        Ok(best)
    }

    fn nearest_recursive(&self, node_idx: usize, query: DVec2, best: &mut Neighbor) {
        match self.nodes[node_idx] {
            KdNode::Leaf { start, end } => {
                for &index in &self.order[start..end] {
                    let candidate = Neighbor {
                        index,
                        dist_sq: query.distance_squared(self.points[index]),
                    };
                    if candidate.closer_than(best) {
                        *best = candidate;
                    }
                }
            }
            KdNode::Split {
                dim,
                value,
                left,
                right,
            } => {
                let diff = query[dim] - value;
                let (first, second) = if diff < 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                self.nearest_recursive(first, query, best);

                // `<=` keeps equal-distance points on the far side reachable for tie-breaking
                if diff * diff <= best.dist_sq {
                    self.nearest_recursive(second, query, best);
                }
            }
        }
    }

    /// The `k` nearest points, sorted by distance (ties by index).
    pub fn k_nearest(&self, query: DVec2, k: usize) -> Vec<Neighbor> {
        if self.nodes.is_empty() || k == 0 || !query.is_finite() {
            return Vec::new();
        }

        let mut heap = BoundedMaxHeap::new(k);
        self.k_nearest_recursive(0, query, &mut heap);

        let mut result = heap.into_vec();
        result.sort_by(|a, b| a.dist_sq.total_cmp(&b.dist_sq).then(a.index.cmp(&b.index)));
        result
    }

    fn k_nearest_recursive(&self, node_idx: usize, query: DVec2, heap: &mut BoundedMaxHeap) {
        match self.nodes[node_idx] {
            KdNode::Leaf { start, end } => {
                for &index in &self.order[start..end] {
                    heap.push(Neighbor {
                        index,
                        dist_sq: query.distance_squared(self.points[index]),
                    });
                }
            }
            KdNode::Split {
                dim,
                value,
                left,
                right,
            } => {
                let diff = query[dim] - value;
                let (first, second) = if diff < 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                self.k_nearest_recursive(first, query, heap);

                if !heap.is_full() || diff * diff <= heap.max_distance() {
                    self.k_nearest_recursive(second, query, heap);
                }
            }
        }
    }

    /// Collect the indices of all points within `radius` (inclusive) into `out`.
    ///
    /// `out` is cleared first; the order of the indices is unspecified.
    pub fn radius_indices_into(&self, query: DVec2, radius: f64, out: &mut Vec<usize>) {
        out.clear();
        if self.nodes.is_empty() || !query.is_finite() {
            return;
        }
        self.radius_recursive(0, query, radius * radius, out);
    }

    fn radius_recursive(&self, node_idx: usize, query: DVec2, radius_sq: f64, out: &mut Vec<usize>) {
        match self.nodes[node_idx] {
            KdNode::Leaf { start, end } => {
                out.extend(
                    self.order[start..end]
                        .iter()
                        .copied()
                        .filter(|&i| query.distance_squared(self.points[i]) <= radius_sq),
                );
            }
            KdNode::Split {
                dim,
                value,
                left,
                right,
            } => {
                let diff = query[dim] - value;
                let diff_sq = diff * diff;

                if diff <= 0.0 || diff_sq <= radius_sq {
                    self.radius_recursive(left, query, radius_sq, out);
                }
                if diff >= 0.0 || diff_sq <= radius_sq {
                    self.radius_recursive(right, query, radius_sq, out);
                }
            }
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indexed point by its original index.
    pub fn point(&self, idx: usize) -> DVec2 {
        self.points[idx]
    }
}

/// A bounded max-heap keeping the k closest neighbors seen so far.
#[derive(Debug)]
struct BoundedMaxHeap {
    capacity: usize,
    items: Vec<Neighbor>,
}

impl BoundedMaxHeap {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity + 1),
        }
    }

    fn push(&mut self, item: Neighbor) {
        if self.items.len() < self.capacity {
            self.items.push(item);
            self.sift_up(self.items.len() - 1);
        } else if item.closer_than(&self.items[0]) {
            // Replace the farthest (root) with the new item
            self.items[0] = item;
            self.sift_down(0);
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    fn max_distance(&self) -> f64 {
        self.items.first().map_or(f64::INFINITY, |n| n.dist_sq)
    }

    fn into_vec(self) -> Vec<Neighbor> {
        self.items
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.items[parent].closer_than(&self.items[idx]) {
                self.items.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut largest = idx;

            if left < self.items.len() && self.items[largest].closer_than(&self.items[left]) {
                largest = left;
            }
            if right < self.items.len() && self.items[largest].closer_than(&self.items[right]) {
                largest = right;
            }

            if largest != idx {
                self.items.swap(idx, largest);
                idx = largest;
            } else {
                break;
            }
        }
    }
}
