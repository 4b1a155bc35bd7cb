//! 3-D k-d tree and chamfer distance.
//!
//! The frame parser's `pcd2pcd` mode compares whole point clouds a couple of
//! times per frame, so nearest-neighbor lookups need to be better than the
//! naive O(N²) scan. A median-split k-d tree over xyz gives O(N log N) build
//! and O(log N) expected query time, matching the spatial index the recorded
//! pipelines use for this signal.

use glam::Vec3;

use crate::{Error, Result};

use super::point_cloud::PointCloud;

/// A static median-split k-d tree over 3-D points.
///
/// Built once per query cloud, then queried for single nearest neighbors
/// (k = 1). Points are stored in a flat buffer; `build` recursively
/// partitions it in place around the median along a cycling axis.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<Node>,
}

#[derive(Debug)]
struct Node {
    point: Vec3,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdTree {
    /// Build a tree from a non-empty cloud's positions.
    pub fn build(cloud: &PointCloud) -> Result<Self> {
        if cloud.is_empty() {
            return Err(Error::Geometry(
                "cannot build a nearest-neighbor index over an empty point cloud".to_string(),
            ));
        }
        let mut points: Vec<Vec3> = cloud.positions().collect();
        let mut nodes = Vec::with_capacity(points.len());
        Self::build_recursive(&mut points, 0, &mut nodes);
        Ok(Self { nodes })
    }

    /// Returns the index of the subtree root inserted into `nodes`.
    fn build_recursive(points: &mut [Vec3], depth: usize, nodes: &mut Vec<Node>) -> Option<usize> {
        if points.is_empty() {
            return None;
        }
        let axis = depth % 3;
        points.sort_unstable_by(|a, b| {
            a[axis]
                .partial_cmp(&b[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let median = points.len() / 2;
        let point = points[median];

        let idx = nodes.len();
        nodes.push(Node {
            point,
            axis,
            left: None,
            right: None,
        });

        let (lo, hi) = points.split_at_mut(median);
        let left = Self::build_recursive(lo, depth + 1, nodes);
        let right = Self::build_recursive(&mut hi[1..], depth + 1, nodes);
        nodes[idx].left = left;
        nodes[idx].right = right;
        Some(idx)
    }

    /// Euclidean distance from `query` to its nearest point in the tree.
    pub fn nearest_distance(&self, query: Vec3) -> f32 {
        let mut best = f32::INFINITY;
        self.search(0, query, &mut best);
        best.sqrt()
    }

    fn search(&self, idx: usize, query: Vec3, best_sq: &mut f32) {
        let node = &self.nodes[idx];
        let d_sq = node.point.distance_squared(query);
        if d_sq < *best_sq {
            *best_sq = d_sq;
        }

        let diff = query[node.axis] - node.point[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(n) = near {
            self.search(n, query, best_sq);
        }
        // Only cross the splitting plane if the best ball reaches it
        if let Some(f) = far {
            if diff * diff < *best_sq {
                self.search(f, query, best_sq);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Symmetric chamfer distance between two point clouds.
///
/// Mean of the A→B and B→A single-nearest-neighbor distances, averaged over
/// both directions. Only xyz participates; colors are ignored. Fails on an
/// empty side — the parser must surface that, not compare against nothing.
pub fn chamfer_distance(a: &PointCloud, b: &PointCloud) -> Result<f32> {
    let tree_a = KdTree::build(a)?;
    let tree_b = KdTree::build(b)?;

    let a_to_b: f32 = a.positions().map(|p| tree_b.nearest_distance(p)).sum::<f32>() / a.len() as f32;
    let b_to_a: f32 = b.positions().map(|p| tree_a.nearest_distance(p)).sum::<f32>() / b.len() as f32;

    Ok((a_to_b + b_to_a) / 2.0)
}
