//! Motion planning for re-targeted reach stages.
//!
//! A motion stage replaces the source actions of `[start, end)` with a fresh
//! plan that moves the end-effector from the pre-motion pose to the shifted
//! stage endpoint in exactly `end - start` frames. Two planners exist:
//! linear (one constant delta) and the default piecewise planner, which
//! splits vertical and lateral travel into separate phases.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Per-frame vertical travel of the piecewise planner.
pub const DEFAULT_Z_STEP: f32 = 0.015;

fn default_z_step() -> f32 {
    DEFAULT_Z_STEP
}

/// How a motion stage interpolates between its start and end positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Interpolation {
    /// One constant delta per frame
    Linear,
    /// Lateral travel first, vertical approach last
    Piecewise {
        #[serde(default = "default_z_step")]
        z_step: f32,
    },
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Piecewise {
            z_step: DEFAULT_Z_STEP,
        }
    }
}

/// Plan per-frame position deltas carrying the end-effector from `start` to
/// `end` over `frames` frames.
///
/// Linear mode emits `frames` copies of `(end - start) / frames`.
///
/// Piecewise mode plans in two phases. The net z displacement is rounded to
/// millimeters and consumed in fixed sign-preserving `z_step` increments,
/// one frame each; whatever frames remain get uniform xy deltas. The step
/// list is then reversed, so xy travel executes first and the vertical
/// approach comes last, the way a pick motion closes on its object. The
/// sub-`z_step` vertical remainder is dropped, not redistributed.
///
/// `frames == 0` yields an empty plan. Otherwise the plan holds at least
/// `frames` steps; when the z phase alone exceeds the frame count the
/// surplus steps are planned but never played.
pub fn plan_motion(start: Vec3, end: Vec3, frames: usize, interpolation: Interpolation) -> Vec<Vec3> {
    if frames == 0 {
        return Vec::new();
    }
    let net = end - start;

    match interpolation {
        Interpolation::Linear => vec![net / frames as f32; frames],
        Interpolation::Piecewise { z_step } => {
            let mut steps = Vec::with_capacity(frames);
            let mut xy_frames = frames as isize;

            if net.z != 0.0 {
                let z = net.z.signum() * (net.z.abs() * 1000.0).round() / 1000.0;
                let z_steps = (z.abs() / z_step) as usize;
                for _ in 0..z_steps {
                    steps.push(Vec3::new(0.0, 0.0, z.signum() * z_step));
                    xy_frames -= 1;
                }
            }

            if xy_frames > 0 {
                let xy = net.truncate() / xy_frames as f32;
                for _ in 0..xy_frames {
                    steps.push(xy.extend(0.0));
                }
            }

            steps.reverse();
            steps
        }
    }
}
