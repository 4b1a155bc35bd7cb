//! Point-cloud geometry primitives.
//!
//! Everything the parser and synthesizer need to reason about a scene:
//! axis-aligned bounding boxes, spatial partition, rigid translation, and
//! nearest-neighbor (chamfer) distances.

pub mod kdtree;
pub mod point_cloud;

pub use kdtree::{chamfer_distance, KdTree};
pub use point_cloud::{average_distance_to_cloud, Aabb, Point, PointCloud};
