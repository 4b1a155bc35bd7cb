//! Stage scripts.
//!
//! The synthesizer is an interpreter over a small list of stage descriptors
//! rather than hand-written per-task frame loops. Each [`Stage`] names its
//! source-frame range, whether the reach is re-planned, and which bounding
//! boxes carve the scene cloud apart (with the fixed offset each carved part
//! moves by). The one- and two-object task shapes become two builders over
//! the same interpreter.

use std::ops::Range;

use glam::Vec3;

use crate::geometry::point_cloud::Aabb;
use crate::parsing::StageBoundaries;
use crate::{Error, Result};

/// One semantic stage of a synthesized trajectory.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Source frames this stage replays
    pub range: Range<usize>,
    /// Net extra translation of the stage endpoint; `Some` re-plans the
    /// reach, `None` passes source actions through (a manipulation stage)
    pub motion: Option<Vec3>,
    /// Boxes carved out of the scene cloud, each moved by its fixed offset;
    /// everything outside them moves with the accumulated drift
    pub partition: Vec<(Aabb, Vec3)>,
}

/// The full per-episode synthesis program.
#[derive(Debug, Clone)]
pub struct StageScript {
    pub stages: Vec<Stage>,
    /// Batch shift of all frames from the given index on by the terminal
    /// offset, for the post-manipulation tail of two-object tasks
    pub final_shift: Option<(usize, Vec3)>,
}

impl StageScript {
    /// Reach the object, then manipulate through the trajectory end.
    ///
    /// The manipulation stage carries no partition: once the object is
    /// reached the whole scene moves together with the drift.
    pub fn one_object(
        len: usize,
        boundaries: StageBoundaries,
        object_bbox: Aabb,
        object_offset: Vec3,
    ) -> Result<Self> {
        boundaries.validate(len)?;
        let skill_1 = boundaries.skill_1();
        Ok(Self {
            stages: vec![
                Stage {
                    range: 0..skill_1,
                    motion: Some(object_offset),
                    partition: vec![(object_bbox, object_offset)],
                },
                Stage {
                    range: skill_1..len,
                    motion: None,
                    partition: Vec::new(),
                },
            ],
            final_shift: None,
        })
    }

    /// Reach the object, manipulate, transport to the target, place.
    ///
    /// The first reach carves out both object and target; once the object is
    /// picked up it travels with the drift, so the remaining stages carve
    /// out only the not-yet-displaced target. The transport stage covers the
    /// leftover distance `target_offset - object_offset`. Frames from
    /// `skill_2` on are batch-shifted by the target offset.
    pub fn two_object(
        len: usize,
        boundaries: StageBoundaries,
        object_bbox: Aabb,
        target_bbox: Aabb,
        object_offset: Vec3,
        target_offset: Vec3,
    ) -> Result<Self> {
        boundaries.validate(len)?;
        let StageBoundaries::TwoStage {
            skill_1,
            motion_2,
            skill_2,
        } = boundaries
        else {
            return Err(Error::Config(
                "two-object synthesis needs two-stage boundaries".to_string(),
            ));
        };

        Ok(Self {
            stages: vec![
                Stage {
                    range: 0..skill_1,
                    motion: Some(object_offset),
                    partition: vec![
                        (object_bbox, object_offset),
                        (target_bbox, target_offset),
                    ],
                },
                Stage {
                    range: skill_1..motion_2,
                    motion: None,
                    partition: vec![(target_bbox, target_offset)],
                },
                Stage {
                    range: motion_2..skill_2,
                    motion: Some(target_offset - object_offset),
                    partition: vec![(target_bbox, target_offset)],
                },
            ],
            final_shift: Some((skill_2, target_offset)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_one_object_script_shape() {
        let script = StageScript::one_object(
            10,
            StageBoundaries::OneStage { skill_1: 3 },
            bbox(),
            Vec3::new(0.1, 0.0, 0.0),
        )
        .unwrap();

        assert_eq!(script.stages.len(), 2);
        assert_eq!(script.stages[0].range, 0..3);
        assert!(script.stages[0].motion.is_some());
        assert_eq!(script.stages[0].partition.len(), 1);
        assert_eq!(script.stages[1].range, 3..10);
        assert!(script.stages[1].motion.is_none());
        assert!(script.stages[1].partition.is_empty());
        assert!(script.final_shift.is_none());
    }

    #[test]
    fn test_two_object_script_shape() {
        let obj = Vec3::new(0.1, 0.0, 0.0);
        let tar = Vec3::new(0.0, 0.2, 0.0);
        let script = StageScript::two_object(
            20,
            StageBoundaries::TwoStage {
                skill_1: 4,
                motion_2: 9,
                skill_2: 14,
            },
            bbox(),
            bbox(),
            obj,
            tar,
        )
        .unwrap();

        assert_eq!(script.stages.len(), 3);
        assert_eq!(script.stages[0].range, 0..4);
        assert_eq!(script.stages[0].partition.len(), 2);
        assert_eq!(script.stages[1].range, 4..9);
        assert!(script.stages[1].motion.is_none());
        assert_eq!(script.stages[2].range, 9..14);
        // Transport covers only the leftover distance
        assert_eq!(script.stages[2].motion, Some(tar - obj));
        assert_eq!(script.final_shift, Some((14, tar)));
    }

    #[test]
    fn test_two_object_rejects_one_stage_boundaries() {
        let result = StageScript::two_object(
            10,
            StageBoundaries::OneStage { skill_1: 3 },
            bbox(),
            bbox(),
            Vec3::ZERO,
            Vec3::ZERO,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_builders_validate_boundaries() {
        let result = StageScript::one_object(
            5,
            StageBoundaries::OneStage { skill_1: 7 },
            bbox(),
            Vec3::ZERO,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
