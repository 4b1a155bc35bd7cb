//! Colored point clouds and axis-aligned bounding boxes.
//!
//! A [`PointCloud`] is the per-frame scene observation: xyz position plus RGB
//! color per point, mirroring the recorded `(N, 6)` layout. The synthesizer
//! relies on three operations here: bounding boxes derived from a masked
//! object cloud, the box partition that splits a scene into object / target /
//! remainder subsets, and rigid translation of each subset.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Margin added on every axis when a bounding box is relaxed.
const BBOX_RELAX_MARGIN: f32 = 0.01;

/// A single colored point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Position in the robot frame
    pub position: Vec3,
    /// RGB color, carried through untouched by every geometric operation
    pub color: Vec3,
}

impl Point {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }
}

/// An ordered collection of colored points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    points: Vec<Point>,
}

/// Axis-aligned bounding box over a point cloud's spatial extent.
///
/// Derived once per episode from the frame-0 object/target clouds and held
/// fixed for the whole synthesis of that episode (objects don't resize).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Exact or relaxed bounding box of a cloud.
    ///
    /// With `relax` the box is expanded by a fixed margin on every axis and
    /// the z-minimum is clamped to the table plane at 0, so that points at
    /// the very edge of a segmentation mask still fall inside.
    ///
    /// Returns `Error::Geometry` for an empty cloud — a box over nothing
    /// signals a failed mask upstream.
    pub fn of_cloud(cloud: &PointCloud, relax: bool) -> Result<Self> {
        let first = cloud
            .points
            .first()
            .ok_or_else(|| Error::Geometry("bounding box of empty point cloud".to_string()))?;

        let mut min = first.position;
        let mut max = first.position;
        for p in &cloud.points[1..] {
            min = min.min(p.position);
            max = max.max(p.position);
        }

        if relax {
            min -= Vec3::splat(BBOX_RELAX_MARGIN);
            max += Vec3::splat(BBOX_RELAX_MARGIN);
            min.z = 0.0;
        }

        Ok(Self { min, max })
    }

    /// Strict-interior membership test (open interval on all three axes).
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x > self.min.x
            && p.y > self.min.y
            && p.z > self.min.z
            && p.x < self.max.x
            && p.y < self.max.y
            && p.z < self.max.z
    }
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build a cloud from `(xyz, rgb)` rows.
    pub fn from_rows(rows: &[([f32; 3], [f32; 3])]) -> Self {
        Self {
            points: rows
                .iter()
                .map(|(xyz, rgb)| Point::new(Vec3::from_array(*xyz), Vec3::from_array(*rgb)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Iterator over xyz positions only.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points.iter().map(|p| p.position)
    }

    /// Copy with `xyz += v`; colors are untouched.
    pub fn translated(&self, v: Vec3) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.position + v, p.color))
                .collect(),
        }
    }

    /// Translate in place; used by the final batch-shift stage.
    pub fn translate_in_place(&mut self, v: Vec3) {
        for p in &mut self.points {
            p.position += v;
        }
    }

    /// Append all points of `other`, in order.
    pub fn extend_from(&mut self, other: &PointCloud) {
        self.points.extend_from_slice(&other.points);
    }

    /// Retain only the points inside `bbox` (strict interior).
    pub fn clipped_to(&self, bbox: &Aabb) -> Self {
        Self {
            points: self
                .points
                .iter()
                .copied()
                .filter(|p| bbox.contains(p.position))
                .collect(),
        }
    }

    /// Partition the cloud by a list of bounding boxes.
    ///
    /// Returns one selection per box (strict-interior membership, each box
    /// tested independently) plus a final selection holding every point not
    /// captured by any box. The selections must partition the input
    /// exactly: a point claimed by two boxes is a fatal geometry error — it
    /// means the boxes were computed from a corrupted or mismatched mask.
    pub fn partition(&self, boxes: &[Aabb]) -> Result<Vec<PointCloud>> {
        let mut selections: Vec<PointCloud> = vec![PointCloud::default(); boxes.len() + 1];

        for point in &self.points {
            let mut slot = boxes.len();
            for (i, b) in boxes.iter().enumerate() {
                if b.contains(point.position) {
                    if slot != boxes.len() {
                        return Err(Error::Geometry(format!(
                            "point {} claimed by boxes {slot} and {i}; selections must be disjoint",
                            point.position
                        )));
                    }
                    slot = i;
                }
            }
            selections[slot].points.push(*point);
        }

        let total: usize = selections.iter().map(|s| s.len()).sum();
        if total != self.len() {
            return Err(Error::Geometry(format!(
                "partition lost points: {} in, {} out across {} boxes",
                self.len(),
                total,
                boxes.len()
            )));
        }

        Ok(selections)
    }
}

/// Mean Euclidean distance from a single point to every point in the cloud.
///
/// The driving signal of the `ee2pcd` parsing mode: how far the end-effector
/// is from the object on average.
pub fn average_distance_to_cloud(point: Vec3, cloud: &PointCloud) -> f32 {
    if cloud.is_empty() {
        return f32::INFINITY;
    }
    let sum: f32 = cloud.positions().map(|p| p.distance(point)).sum();
    sum / cloud.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_cloud() -> PointCloud {
        // 3x3 grid on the z=0.1 plane, unit colors
        let mut rows = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                rows.push(([i as f32 * 0.1, j as f32 * 0.1, 0.1], [1.0, 2.0, 3.0]));
            }
        }
        PointCloud::from_rows(&rows)
    }

    #[test]
    fn test_bbox_exact() {
        let cloud = grid_cloud();
        let bbox = Aabb::of_cloud(&cloud, false).unwrap();
        assert_relative_eq!(bbox.min.x, 0.0);
        assert_relative_eq!(bbox.max.x, 0.2);
        assert_relative_eq!(bbox.min.z, 0.1);
        assert_relative_eq!(bbox.max.z, 0.1);
    }

    #[test]
    fn test_bbox_relaxed_clamps_z_floor() {
        let cloud = grid_cloud();
        let bbox = Aabb::of_cloud(&cloud, true).unwrap();
        assert_relative_eq!(bbox.min.x, -0.01);
        assert_relative_eq!(bbox.max.x, 0.21);
        assert_relative_eq!(bbox.min.z, 0.0);
        assert_relative_eq!(bbox.max.z, 0.11);
    }

    #[test]
    fn test_bbox_empty_cloud_fails() {
        let result = Aabb::of_cloud(&PointCloud::default(), true);
        assert!(result.is_err());
    }

    #[test]
    fn test_contains_is_open_interval() {
        let bbox = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(bbox.contains(Vec3::splat(0.5)));
        // Boundary points are outside
        assert!(!bbox.contains(Vec3::new(0.0, 0.5, 0.5)));
        assert!(!bbox.contains(Vec3::new(0.5, 1.0, 0.5)));
    }

    #[test]
    fn test_translate_round_trip() {
        let cloud = grid_cloud();
        let v = Vec3::new(0.3, -0.2, 0.05);
        let back = cloud.translated(v).translated(-v);
        for (a, b) in cloud.points().iter().zip(back.points()) {
            assert_relative_eq!(a.position.x, b.position.x, epsilon = 1e-6);
            assert_relative_eq!(a.position.y, b.position.y, epsilon = 1e-6);
            assert_relative_eq!(a.position.z, b.position.z, epsilon = 1e-6);
            // Colors unchanged bit-for-bit
            assert_eq!(a.color, b.color);
        }
    }

    #[test]
    fn test_partition_totality() {
        let cloud = grid_cloud();
        let left = Aabb::new(Vec3::new(-0.05, -0.05, 0.0), Vec3::new(0.05, 0.25, 0.2));
        let right = Aabb::new(Vec3::new(0.15, -0.05, 0.0), Vec3::new(0.25, 0.25, 0.2));
        let parts = cloud.partition(&[left, right]).unwrap();

        assert_eq!(parts.len(), 3);
        let total: usize = parts.iter().map(|p| p.len()).sum();
        assert_eq!(total, cloud.len());
        // Left and right columns of the grid each hold 3 points
        assert_eq!(parts[0].len(), 3);
        assert_eq!(parts[1].len(), 3);
        assert_eq!(parts[2].len(), 3);
    }

    #[test]
    fn test_partition_no_boxes_returns_whole_cloud() {
        let cloud = grid_cloud();
        let parts = cloud.partition(&[]).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), cloud.len());
    }

    #[test]
    fn test_partition_empty_cloud() {
        let cloud = PointCloud::default();
        let bbox = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let parts = cloud.partition(&[bbox]).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_partition_overlapping_boxes_is_fatal() {
        let cloud = PointCloud::from_rows(&[([0.5, 0.5, 0.5], [0.0, 0.0, 0.0])]);
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let result = cloud.partition(&[a, b]);
        assert!(matches!(result, Err(crate::Error::Geometry(_))));
    }

    #[test]
    fn test_partition_touching_boxes_stay_disjoint() {
        // Shared face: strict-interior membership keeps the boxes disjoint,
        // and a point on the face lands in the remainder
        let cloud = PointCloud::from_rows(&[
            ([0.5, 0.5, 0.5], [0.0; 3]),
            ([1.5, 0.5, 0.5], [0.0; 3]),
            ([1.0, 0.5, 0.5], [0.0; 3]),
        ]);
        let left = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let right = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let parts = cloud.partition(&[left, right]).unwrap();
        assert_eq!(parts[0].len(), 1);
        assert_eq!(parts[1].len(), 1);
        assert_eq!(parts[2].len(), 1);
    }

    #[test]
    fn test_average_distance() {
        let cloud = PointCloud::from_rows(&[
            ([1.0, 0.0, 0.0], [0.0; 3]),
            ([3.0, 0.0, 0.0], [0.0; 3]),
        ]);
        let d = average_distance_to_cloud(Vec3::ZERO, &cloud);
        assert_relative_eq!(d, 2.0);
    }

    #[test]
    fn test_average_distance_empty_cloud() {
        assert!(average_distance_to_cloud(Vec3::ZERO, &PointCloud::default()).is_infinite());
    }
}
