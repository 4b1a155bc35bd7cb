//! Trajectory scanning.
//!
//! The parser walks a source trajectory frame by frame, computing the
//! distance signal the state machine asks for and recording the boundary
//! frames it emits. Two signal modes exist: `ee2pcd` measures from the
//! end-effector position, `pcd2pcd` removes the object/target boxes from the
//! scene and measures the chamfer distance of what remains (the robot arm).
//!
//! Thresholds are brittle and task-specific; manually supplied boundaries
//! skip this module entirely and are the recommended path. Scanning exists
//! as a fallback and tuning aid.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::episode::Episode;
use crate::geometry::kdtree::chamfer_distance;
use crate::geometry::point_cloud::{average_distance_to_cloud, Aabb, PointCloud};
use crate::mask::{MaskSource, SemanticLabel};
use crate::{Error, Result};

use super::boundaries::StageBoundaries;
use super::stage_machine::{BoundaryKind, SignalRequest, Thresholds, TwoStageMachine};

/// Which distance signal drives the boundary detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    /// Mean distance from the end-effector position to the reference cloud
    Ee2Pcd,
    /// Chamfer distance from the non-object scene remainder to the reference cloud
    Pcd2Pcd,
}

/// Arrival/departure thresholds, serializable for the config surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParserThresholds {
    /// Arrival radius at the object (`skill_1`)
    pub arrive_object: f32,
    /// Departure radius from the pickup site (`motion_2`)
    pub depart_object: f32,
    /// Arrival radius at the target (`skill_2`)
    pub arrive_target: f32,
}

impl Default for ParserThresholds {
    fn default() -> Self {
        Self {
            arrive_object: 0.15,
            depart_object: 0.235,
            arrive_target: 0.275,
        }
    }
}

impl From<ParserThresholds> for Thresholds {
    fn from(t: ParserThresholds) -> Self {
        Thresholds {
            arrive_object: t.arrive_object,
            depart_object: t.depart_object,
            arrive_target: t.arrive_target,
        }
    }
}

/// Scans source trajectories for stage boundaries.
#[derive(Debug, Clone)]
pub struct FrameParser {
    mode: DistanceMode,
    thresholds: ParserThresholds,
}

impl FrameParser {
    pub fn new(mode: DistanceMode, thresholds: ParserThresholds) -> Self {
        Self { mode, thresholds }
    }

    /// Find the single boundary of a one-object trajectory: the first frame
    /// where the driving distance to the object falls to or below the
    /// object-arrival threshold.
    pub fn parse_one_stage(
        &self,
        episode_idx: usize,
        episode: &Episode,
        masks: &dyn MaskSource,
    ) -> Result<usize> {
        for frame in 0..episode.len() {
            let cloud = &episode.clouds[frame];
            let object = masks.filtered_cloud(episode_idx, cloud, SemanticLabel::Object)?;

            let signal = match self.mode {
                DistanceMode::Ee2Pcd => {
                    average_distance_to_cloud(episode.state_position(frame)?, &object)
                }
                DistanceMode::Pcd2Pcd => {
                    let obj_bbox = Aabb::of_cloud(&object, true)?;
                    let remainder = scene_remainder(cloud, &[obj_bbox])?;
                    chamfer_distance(&remainder, &object)?
                }
            };

            if signal <= self.thresholds.arrive_object {
                info!(episode = episode_idx, frame, "stage boundary found");
                return Ok(frame);
            }
        }

        Err(Error::Parsing {
            episode: episode_idx,
            detail: format!(
                "no frame reached the object within threshold {}",
                self.thresholds.arrive_object
            ),
        })
    }

    /// Find the three boundaries of a two-object trajectory.
    ///
    /// The departure test runs against the held-object reference shape
    /// frozen at the `skill_1` frame, while the target-arrival test runs
    /// against the live target cloud at the current frame. That asymmetry is
    /// deliberate: after pickup, the live object cloud moves with the
    /// gripper and can no longer serve as a fixed departure anchor.
    pub fn parse_two_stage(
        &self,
        episode_idx: usize,
        episode: &Episode,
        masks: &dyn MaskSource,
    ) -> Result<StageBoundaries> {
        let mut machine = TwoStageMachine::new(self.thresholds.into());
        let mut held_reference: Option<PointCloud> = None;

        let mut skill_1 = 0usize;
        let mut motion_2 = 0usize;
        let mut skill_2 = 0usize;

        for frame in 0..episode.len() {
            let Some(request) = machine.signal_request() else {
                break;
            };

            let cloud = &episode.clouds[frame];
            let object = masks.filtered_cloud(episode_idx, cloud, SemanticLabel::Object)?;
            let target = masks.filtered_cloud(episode_idx, cloud, SemanticLabel::Target)?;

            let reference = match request {
                SignalRequest::ToObject => &object,
                SignalRequest::ToHeldReference => {
                    // Set when the pickup boundary fired; the machine never
                    // asks for it earlier
                    held_reference.as_ref().ok_or_else(|| Error::Parsing {
                        episode: episode_idx,
                        detail: "departure test before pickup boundary".to_string(),
                    })?
                }
                SignalRequest::ToTarget => &target,
            };

            let signal = match self.mode {
                DistanceMode::Ee2Pcd => {
                    average_distance_to_cloud(episode.state_position(frame)?, reference)
                }
                DistanceMode::Pcd2Pcd => {
                    // Before pickup both boxes are carved out and the
                    // remainder is the bare arm; afterwards the object rides
                    // the gripper and only the target is excluded
                    let excluded = match request {
                        SignalRequest::ToObject => vec![
                            Aabb::of_cloud(&object, true)?,
                            Aabb::of_cloud(&target, true)?,
                        ],
                        SignalRequest::ToHeldReference | SignalRequest::ToTarget => {
                            vec![Aabb::of_cloud(&target, true)?]
                        }
                    };
                    let remainder = scene_remainder(cloud, &excluded)?;
                    chamfer_distance(&remainder, reference)?
                }
            };

            if let Some(boundary) = machine.observe(signal) {
                debug!(episode = episode_idx, frame, ?boundary, signal, "boundary");
                match boundary {
                    BoundaryKind::Skill1 => {
                        skill_1 = frame;
                        held_reference = Some(object);
                    }
                    BoundaryKind::Motion2 => motion_2 = frame,
                    BoundaryKind::Skill2 => skill_2 = frame,
                }
            }
        }

        if !machine.is_done() {
            return Err(Error::Parsing {
                episode: episode_idx,
                detail: format!(
                    "trajectory ended in phase {:?} before all boundaries were found",
                    machine.phase()
                ),
            });
        }

        info!(
            episode = episode_idx,
            skill_1, motion_2, skill_2, "parsed stage boundaries"
        );
        let boundaries = StageBoundaries::TwoStage {
            skill_1,
            motion_2,
            skill_2,
        };
        boundaries.validate(episode.len()).map_err(|e| Error::Parsing {
            episode: episode_idx,
            detail: format!("parsed boundaries invalid: {e}"),
        })?;
        Ok(boundaries)
    }
}

/// Everything in `scene` outside the excluded boxes.
fn scene_remainder(scene: &PointCloud, excluded: &[Aabb]) -> Result<PointCloud> {
    let mut parts = scene.partition(excluded)?;
    parts
        .pop()
        .ok_or_else(|| Error::Geometry("partition yielded no selections".to_string()))
}
