//! The segmentation-mask collaborator seam.
//!
//! The generator never looks at camera images itself. It asks a
//! [`MaskSource`] for the subset of a frame's point cloud that a semantic
//! segmentation mask labels as the manipulated object or the placement
//! target: once per source episode (frame 0) to seed bounding boxes, and
//! once per scanned frame when stage boundaries are parsed automatically.
//!
//! The production collaborator projects the robot-frame cloud back into the
//! camera image and filters by the mask pixels; it is constructed with an
//! immutable [`RigCalibration`] — one value per physical camera rig, never a
//! global. That projection pipeline lives outside this crate. For tests and
//! offline experiments [`BoxMaskSource`] labels points by fixed boxes.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::geometry::point_cloud::{Aabb, PointCloud};
use crate::{Error, Result};

/// The two semantic roles a mask can identify in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticLabel {
    /// The object being manipulated
    Object,
    /// The placement target
    Target,
}

impl std::fmt::Display for SemanticLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticLabel::Object => write!(f, "object"),
            SemanticLabel::Target => write!(f, "target"),
        }
    }
}

/// Object/target segmentation collaborator.
pub trait MaskSource {
    /// The subset of `cloud` that the mask for (`episode`, `label`)
    /// identifies as that label, in the same robot frame as the input.
    fn filtered_cloud(
        &self,
        episode: usize,
        cloud: &PointCloud,
        label: SemanticLabel,
    ) -> Result<PointCloud>;
}

/// Immutable calibration for one physical camera rig.
///
/// Everything a projection-based mask collaborator needs to map a
/// robot-frame point cloud back onto the camera image: the robot→camera
/// extrinsic, the pinhole intrinsics, the sensor's depth scale, and the
/// image extent the mask was drawn on. Constructed once per rig and passed
/// into the collaborator at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigCalibration {
    /// Robot→camera extrinsic rotation (xyzw quaternion)
    pub extrinsic_rotation: Quat,
    /// Robot→camera extrinsic translation
    pub extrinsic_translation: Vec3,
    /// 3×3 pinhole intrinsic matrix
    pub intrinsics: Mat3,
    /// Depth-sensor scale factor applied to xyz before projection
    pub depth_scale: f32,
    /// Mask image size as (width, height)
    pub image_size: (u32, u32),
}

impl RigCalibration {
    pub fn new(
        extrinsic_rotation: Quat,
        extrinsic_translation: Vec3,
        intrinsics: Mat3,
        depth_scale: f32,
        image_size: (u32, u32),
    ) -> Self {
        Self {
            extrinsic_rotation,
            extrinsic_translation,
            intrinsics,
            depth_scale,
            image_size,
        }
    }
}

/// Mask collaborator that labels points by fixed per-label boxes.
///
/// Stands in for the projection pipeline wherever real masks are
/// unavailable: any point strictly inside the registered box carries the
/// label. Boxes can be registered per episode or once as a default.
#[derive(Debug, Clone, Default)]
pub struct BoxMaskSource {
    per_episode: HashMap<(usize, SemanticLabel), Aabb>,
    defaults: HashMap<SemanticLabel, Aabb>,
}

impl BoxMaskSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a default box used for every episode without an override.
    pub fn with_label(mut self, label: SemanticLabel, bbox: Aabb) -> Self {
        self.defaults.insert(label, bbox);
        self
    }

    /// Register a box for one specific episode.
    pub fn set_episode_label(&mut self, episode: usize, label: SemanticLabel, bbox: Aabb) {
        self.per_episode.insert((episode, label), bbox);
    }

    fn bbox_for(&self, episode: usize, label: SemanticLabel) -> Option<&Aabb> {
        self.per_episode
            .get(&(episode, label))
            .or_else(|| self.defaults.get(&label))
    }
}

impl MaskSource for BoxMaskSource {
    fn filtered_cloud(
        &self,
        episode: usize,
        cloud: &PointCloud,
        label: SemanticLabel,
    ) -> Result<PointCloud> {
        let bbox = self.bbox_for(episode, label).ok_or_else(|| {
            Error::Config(format!(
                "no {label} mask registered for source episode {episode}"
            ))
        })?;
        Ok(cloud.clipped_to(bbox))
    }
}
