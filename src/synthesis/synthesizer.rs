//! The stage-script interpreter.
//!
//! One synthesis call rebuilds one source episode under one offset. A single
//! frame loop consumes the script's stages in order, carrying the
//! accumulated drift: the xy distance the already-committed assembly has
//! moved relative to the source trajectory. Motion stages grow the drift by
//! the per-frame difference between the planned step and the source action;
//! manipulation stages hold it frozen. The final batch shift, when present,
//! copies the remaining frames wholesale.

use glam::Vec3;
use tracing::debug;

use crate::dataset::episode::Episode;
use crate::geometry::point_cloud::{Aabb, PointCloud};
use crate::{Error, Result};

use super::motion::{plan_motion, Interpolation};
use super::stage::{Stage, StageScript};

/// Rebuilds episodes from stage scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectorySynthesizer {
    interpolation: Interpolation,
}

impl TrajectorySynthesizer {
    pub fn new(interpolation: Interpolation) -> Self {
        Self { interpolation }
    }

    /// Synthesize one episode. The source is only read; every output buffer
    /// is freshly built.
    pub fn synthesize(&self, source: &Episode, script: &StageScript) -> Result<Episode> {
        source.validate()?;

        let mut out = Episode::default();
        let mut drift = Vec3::ZERO;

        for stage in &script.stages {
            self.run_stage(source, stage, &mut drift, &mut out)?;
        }

        if let Some((start, offset)) = script.final_shift {
            for frame in start..source.len() {
                let state = shifted_state(source, frame, offset)?;
                out.push_frame(
                    state,
                    source.actions[frame].clone(),
                    source.clouds[frame].translated(offset),
                );
            }
        }

        debug!(
            source_frames = source.len(),
            synthesized_frames = out.len(),
            "episode synthesized"
        );
        Ok(out)
    }

    fn run_stage(
        &self,
        source: &Episode,
        stage: &Stage,
        drift: &mut Vec3,
        out: &mut Episode,
    ) -> Result<()> {
        let frames = stage.range.len();
        // Zero-length stages run zero iterations, by contract
        let plan = match stage.motion {
            Some(net) if frames > 0 => {
                let start = source.state_position(stage.range.start)?
                    - source.action_delta(stage.range.start)?;
                let end = source.state_position(stage.range.end - 1)? + net;
                Some(plan_motion(start, end, frames, self.interpolation))
            }
            _ => None,
        };

        let boxes: Vec<Aabb> = stage.partition.iter().map(|(b, _)| *b).collect();

        for (step_idx, frame) in stage.range.clone().enumerate() {
            let action = match &plan {
                Some(steps) => {
                    let step = steps.get(step_idx).copied().ok_or_else(|| {
                        Error::Geometry(format!(
                            "motion plan of {} steps exhausted at stage frame {step_idx}",
                            steps.len()
                        ))
                    })?;
                    let source_delta = source.action_delta(frame)?;
                    // Drift grows by the planned-minus-source delta, xy only
                    drift.x += step.x - source_delta.x;
                    drift.y += step.y - source_delta.y;

                    let mut action = source.actions[frame].clone();
                    action[0] = step.x;
                    action[1] = step.y;
                    action[2] = step.z;
                    action
                }
                None => source.actions[frame].clone(),
            };

            let state = shifted_state(source, frame, *drift)?;
            let cloud = self.partitioned_cloud(&source.clouds[frame], stage, &boxes, *drift)?;
            out.push_frame(state, action, cloud);
        }
        Ok(())
    }

    /// Carve the boxed parts out of the scene and reassemble: the remainder
    /// (robot and everything already moving with the gripper) shifted by the
    /// drift first, then each boxed part shifted by its own fixed offset.
    fn partitioned_cloud(
        &self,
        scene: &PointCloud,
        stage: &Stage,
        boxes: &[Aabb],
        drift: Vec3,
    ) -> Result<PointCloud> {
        let mut parts = scene.partition(boxes)?;
        let remainder = parts
            .pop()
            .ok_or_else(|| Error::Geometry("partition yielded no selections".to_string()))?;

        let mut cloud = remainder.translated(drift);
        for ((_, offset), part) in stage.partition.iter().zip(parts) {
            cloud.extend_from(&part.translated(*offset));
        }
        Ok(cloud)
    }
}

fn shifted_state(source: &Episode, frame: usize, shift: Vec3) -> Result<Vec<f32>> {
    let pos = source.state_position(frame)? + shift;
    let mut state = source.states[frame].clone();
    state[0] = pos.x;
    state[1] = pos.y;
    state[2] = pos.z;
    Ok(state)
}
