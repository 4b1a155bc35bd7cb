//! Stage-boundary index sets.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The frame indices at which a source trajectory changes semantic stage.
///
/// Each index marks the first frame of a new stage. For a one-object task a
/// single boundary splits reach from manipulation; for a two-object task
/// three boundaries carve out reach-object, hold, reach-target, and the
/// final placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageBoundaries {
    /// Single manipulation stage: `skill_1` is the first manipulation frame.
    OneStage { skill_1: usize },
    /// Two manipulation stages with an intervening transport motion.
    TwoStage {
        skill_1: usize,
        motion_2: usize,
        skill_2: usize,
    },
}

impl StageBoundaries {
    /// First boundary — the end of the initial reach.
    pub fn skill_1(&self) -> usize {
        match self {
            StageBoundaries::OneStage { skill_1 } => *skill_1,
            StageBoundaries::TwoStage { skill_1, .. } => *skill_1,
        }
    }

    /// Check ordering and range against a trajectory of `len` frames.
    ///
    /// Indices must satisfy `skill_1 < motion_2 <= skill_2 < len`. A zero
    /// `motion_2 - skill_1` or `skill_2 - motion_2` span is a legal empty
    /// stage only insofar as equality is permitted between `motion_2` and
    /// `skill_2`; `skill_1` must strictly precede `motion_2` so the hold
    /// stage has a defined start.
    pub fn validate(&self, len: usize) -> Result<()> {
        let fail = |detail: String| Err(Error::Config(detail));
        match *self {
            StageBoundaries::OneStage { skill_1 } => {
                if skill_1 == 0 || skill_1 >= len {
                    return fail(format!(
                        "skill_1 = {skill_1} out of range for trajectory of {len} frames"
                    ));
                }
            }
            StageBoundaries::TwoStage {
                skill_1,
                motion_2,
                skill_2,
            } => {
                if skill_1 == 0 || skill_2 >= len {
                    return fail(format!(
                        "boundaries ({skill_1}, {motion_2}, {skill_2}) out of range for {len} frames"
                    ));
                }
                if !(skill_1 < motion_2 && motion_2 <= skill_2) {
                    return fail(format!(
                        "boundaries must satisfy skill_1 < motion_2 <= skill_2, got ({skill_1}, {motion_2}, {skill_2})"
                    ));
                }
            }
        }
        Ok(())
    }
}
