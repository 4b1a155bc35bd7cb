//! The demonstration generator.
//!
//! Wires the pipeline together: sample offsets, resolve stage boundaries per
//! source episode (manually supplied or parsed once and reused), seed the
//! episode's bounding boxes from the frame-0 masked clouds, then synthesize
//! one episode per (source, offset) pair. Synthesis is a synchronous batch;
//! each pair is independent and a failure propagates rather than being
//! papered over with partial output.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::assembler::{DatasetAssembler, DatasetStore};
use crate::dataset::episode::Episode;
use crate::geometry::point_cloud::Aabb;
use crate::mask::{MaskSource, SemanticLabel};
use crate::parsing::{DistanceMode, FrameParser, ParserThresholds, StageBoundaries};
use crate::sampling::{
    sample_grid, sample_pairs_grid, sample_pairs_random, sample_random, OffsetPair,
    TranslationRange,
};
use crate::synthesis::{Interpolation, StageScript, TrajectorySynthesizer};
use crate::{Error, Result};

/// How many objects the task manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskShape {
    OneObject,
    TwoObject,
}

/// How offsets are drawn from the translation ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    Grid,
    Random,
}

/// Where stage boundaries come from.
///
/// Manual boundaries are the recommended mode; parsing thresholds are
/// brittle and task-specific.
#[derive(Debug, Clone)]
pub enum BoundarySource {
    /// One boundary set per source episode, in order
    Manual(Vec<StageBoundaries>),
    /// Scan each trajectory with the frame parser
    Parsed {
        mode: DistanceMode,
        thresholds: ParserThresholds,
    },
}

/// Everything one generation run needs.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub task: TaskShape,
    /// Synthetic episodes per source episode
    pub demos_per_source: usize,
    pub sample_mode: SampleMode,
    pub interpolation: Interpolation,
    pub boundaries: BoundarySource,
    pub object_range: TranslationRange,
    /// Required for two-object tasks
    pub target_range: Option<TranslationRange>,
    /// Fixed seed for random sampling; entropy-seeded when absent
    pub seed: Option<u64>,
}

/// The augmentation pipeline, validated at construction.
#[derive(Debug, Clone)]
pub struct DemoGenerator {
    settings: GenerationSettings,
    synthesizer: TrajectorySynthesizer,
}

impl DemoGenerator {
    /// Validate the settings and build the pipeline. Precondition
    /// violations surface here, before any synthesis begins.
    pub fn new(settings: GenerationSettings) -> Result<Self> {
        if settings.demos_per_source == 0 {
            return Err(Error::Config(
                "demos_per_source must be at least 1".to_string(),
            ));
        }
        settings.object_range.validate()?;
        match settings.task {
            TaskShape::OneObject => {}
            TaskShape::TwoObject => {
                settings
                    .target_range
                    .as_ref()
                    .ok_or_else(|| {
                        Error::Config(
                            "two-object tasks need a target translation range".to_string(),
                        )
                    })?
                    .validate()?;
            }
        }
        // Grid counts must factor before anything runs
        if settings.sample_mode == SampleMode::Grid {
            probe_grid(&settings)?;
        }

        let synthesizer = TrajectorySynthesizer::new(settings.interpolation);
        Ok(Self {
            settings,
            synthesizer,
        })
    }

    /// Synthesize all episodes: one per (source episode, sampled offset).
    pub fn generate(
        &self,
        sources: &[Episode],
        masks: &dyn MaskSource,
    ) -> Result<Vec<Episode>> {
        let mut generated = Vec::new();
        let parser = self.parser();
        // One offset list, reused for every source episode
        let offsets = self.sample_offsets()?;

        for (idx, source) in sources.iter().enumerate() {
            source
                .validate()
                .map_err(|e| Error::DataModel(format!("source episode {idx}: {e}")))?;

            let boundaries = self.resolve_boundaries(idx, source, masks, parser.as_ref())?;
            info!(
                episode = idx,
                frames = source.len(),
                offsets = offsets.len(),
                "augmenting source episode"
            );

            let object_bbox = self.frame0_bbox(idx, source, masks, SemanticLabel::Object)?;
            let target_bbox = match self.settings.task {
                TaskShape::TwoObject => {
                    Some(self.frame0_bbox(idx, source, masks, SemanticLabel::Target)?)
                }
                TaskShape::OneObject => None,
            };

            for &offset in &offsets {
                let script = self.script(source.len(), boundaries, object_bbox, target_bbox, offset)?;
                debug!(episode = idx, object = ?offset.object, target = ?offset.target, "synthesizing");
                generated.push(self.synthesizer.synthesize(source, &script)?);
            }
        }

        info!(episodes = generated.len(), "generation complete");
        Ok(generated)
    }

    /// Generate, concatenate, and hand off to the persistence collaborator.
    pub fn generate_to_store(
        &self,
        sources: &[Episode],
        masks: &dyn MaskSource,
        store: &dyn DatasetStore,
    ) -> Result<()> {
        let episodes = self.generate(sources, masks)?;
        let dataset = DatasetAssembler::assemble(&episodes)?;
        store.write(&dataset)
    }

    fn parser(&self) -> Option<FrameParser> {
        match &self.settings.boundaries {
            BoundarySource::Manual(_) => None,
            BoundarySource::Parsed { mode, thresholds } => {
                Some(FrameParser::new(*mode, *thresholds))
            }
        }
    }

    fn resolve_boundaries(
        &self,
        idx: usize,
        source: &Episode,
        masks: &dyn MaskSource,
        parser: Option<&FrameParser>,
    ) -> Result<StageBoundaries> {
        let boundaries = match (&self.settings.boundaries, parser) {
            (BoundarySource::Manual(all), _) => *all.get(idx).ok_or_else(|| {
                Error::Config(format!(
                    "manual boundaries cover {} episodes but episode {idx} was requested",
                    all.len()
                ))
            })?,
            (BoundarySource::Parsed { .. }, Some(parser)) => match self.settings.task {
                TaskShape::OneObject => StageBoundaries::OneStage {
                    skill_1: parser.parse_one_stage(idx, source, masks)?,
                },
                TaskShape::TwoObject => parser.parse_two_stage(idx, source, masks)?,
            },
            (BoundarySource::Parsed { .. }, None) => {
                return Err(Error::Config("parser settings missing".to_string()))
            }
        };
        boundaries.validate(source.len())?;
        self.check_shape(boundaries)?;
        Ok(boundaries)
    }

    fn check_shape(&self, boundaries: StageBoundaries) -> Result<()> {
        let matches = matches!(
            (self.settings.task, boundaries),
            (TaskShape::OneObject, StageBoundaries::OneStage { .. })
                | (TaskShape::TwoObject, StageBoundaries::TwoStage { .. })
        );
        if !matches {
            return Err(Error::Config(format!(
                "boundary shape {boundaries:?} does not fit a {:?} task",
                self.settings.task
            )));
        }
        Ok(())
    }

    /// Bounding boxes come from the frame-0 masked clouds and stay fixed
    /// for the whole episode.
    fn frame0_bbox(
        &self,
        idx: usize,
        source: &Episode,
        masks: &dyn MaskSource,
        label: SemanticLabel,
    ) -> Result<Aabb> {
        let cloud = source.clouds.first().ok_or_else(|| {
            Error::DataModel(format!("source episode {idx} has no frames"))
        })?;
        let masked = masks.filtered_cloud(idx, cloud, label)?;
        Aabb::of_cloud(&masked, true).map_err(|e| {
            Error::Geometry(format!("episode {idx} {label} mask: {e}"))
        })
    }

    fn sample_offsets(&self) -> Result<Vec<OffsetPair>> {
        let n = self.settings.demos_per_source;
        let object_range = &self.settings.object_range;
        match (self.settings.task, self.settings.sample_mode) {
            (TaskShape::OneObject, SampleMode::Grid) => Ok(sample_grid(object_range, n)?
                .into_iter()
                .map(|object| OffsetPair {
                    object,
                    target: Vec3::ZERO,
                })
                .collect()),
            (TaskShape::OneObject, SampleMode::Random) => {
                Ok(sample_random(object_range, n, &mut self.rng())
                    .into_iter()
                    .map(|object| OffsetPair {
                        object,
                        target: Vec3::ZERO,
                    })
                    .collect())
            }
            (TaskShape::TwoObject, SampleMode::Grid) => {
                sample_pairs_grid(object_range, self.target_range()?, n)
            }
            (TaskShape::TwoObject, SampleMode::Random) => Ok(sample_pairs_random(
                object_range,
                self.target_range()?,
                n,
                &mut self.rng(),
            )),
        }
    }

    fn rng(&self) -> StdRng {
        match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn target_range(&self) -> Result<&TranslationRange> {
        self.settings.target_range.as_ref().ok_or_else(|| {
            Error::Config("two-object tasks need a target translation range".to_string())
        })
    }

    fn script(
        &self,
        len: usize,
        boundaries: StageBoundaries,
        object_bbox: Aabb,
        target_bbox: Option<Aabb>,
        offset: OffsetPair,
    ) -> Result<StageScript> {
        match self.settings.task {
            TaskShape::OneObject => {
                StageScript::one_object(len, boundaries, object_bbox, offset.object)
            }
            TaskShape::TwoObject => {
                let target_bbox = target_bbox.ok_or_else(|| {
                    Error::Config("two-object synthesis without a target box".to_string())
                })?;
                StageScript::two_object(
                    len,
                    boundaries,
                    object_bbox,
                    target_bbox,
                    offset.object,
                    offset.target,
                )
            }
        }
    }
}

/// Dry-run the grid factorization so an invalid demo count fails at
/// construction rather than mid-run.
fn probe_grid(settings: &GenerationSettings) -> Result<()> {
    let probe = TranslationRange::new(glam::Vec2::ZERO, glam::Vec2::ONE);
    match settings.task {
        TaskShape::OneObject => sample_grid(&probe, settings.demos_per_source).map(|_| ()),
        TaskShape::TwoObject => {
            sample_pairs_grid(&probe, &probe, settings.demos_per_source).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point_cloud::PointCloud;
    use crate::mask::BoxMaskSource;
    use glam::Vec2;

    fn settings(task: TaskShape, n: usize, mode: SampleMode) -> GenerationSettings {
        GenerationSettings {
            task,
            demos_per_source: n,
            sample_mode: mode,
            interpolation: Interpolation::Linear,
            boundaries: BoundarySource::Manual(vec![StageBoundaries::OneStage { skill_1: 3 }]),
            object_range: TranslationRange::new(Vec2::splat(-0.1), Vec2::splat(0.1)),
            target_range: Some(TranslationRange::new(Vec2::splat(-0.1), Vec2::splat(0.1))),
            seed: Some(11),
        }
    }

    fn source_episode() -> Episode {
        let mut ep = Episode::default();
        for i in 0..10 {
            let x = 0.1 * (i + 1) as f32;
            ep.push_frame(
                vec![x, 0.0, 0.2, 0.0],
                vec![0.1, 0.0, 0.0, 0.0],
                PointCloud::from_rows(&[
                    ([1.0, 0.0, 0.1], [9.0; 3]),
                    ([x, 0.0, 0.5], [5.0; 3]),
                ]),
            );
        }
        ep
    }

    fn masks() -> BoxMaskSource {
        BoxMaskSource::new().with_label(
            SemanticLabel::Object,
            Aabb::new(Vec3::new(0.9, -0.1, 0.0), Vec3::new(1.1, 0.1, 0.2)),
        )
    }

    #[test]
    fn test_grid_generation_count() {
        let generator =
            DemoGenerator::new(settings(TaskShape::OneObject, 4, SampleMode::Grid)).unwrap();
        let out = generator.generate(&[source_episode()], &masks()).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|ep| ep.len() == 10));
    }

    #[test]
    fn test_random_generation_count() {
        let generator =
            DemoGenerator::new(settings(TaskShape::OneObject, 7, SampleMode::Random)).unwrap();
        let out = generator.generate(&[source_episode()], &masks()).unwrap();
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn test_offsets_shared_across_source_episodes() {
        // Unseeded random sampling must still give every source episode the
        // same offset list: one draw before the episode loop
        let mut s = settings(TaskShape::OneObject, 5, SampleMode::Random);
        s.seed = None;
        s.boundaries = BoundarySource::Manual(vec![
            StageBoundaries::OneStage { skill_1: 3 },
            StageBoundaries::OneStage { skill_1: 3 },
        ]);
        let generator = DemoGenerator::new(s).unwrap();
        let out = generator
            .generate(&[source_episode(), source_episode()], &masks())
            .unwrap();

        assert_eq!(out.len(), 10);
        for k in 0..5 {
            assert_eq!(out[k].states, out[5 + k].states);
            assert_eq!(out[k].actions, out[5 + k].actions);
        }
    }

    #[test]
    fn test_invalid_grid_count_fails_at_construction() {
        let result = DemoGenerator::new(settings(TaskShape::OneObject, 5, SampleMode::Grid));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_two_object_needs_target_range() {
        let mut s = settings(TaskShape::TwoObject, 16, SampleMode::Grid);
        s.target_range = None;
        assert!(matches!(DemoGenerator::new(s), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_demos_rejected() {
        let result = DemoGenerator::new(settings(TaskShape::OneObject, 0, SampleMode::Random));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_boundary_shape_mismatch_rejected() {
        let mut s = settings(TaskShape::TwoObject, 16, SampleMode::Grid);
        s.boundaries = BoundarySource::Manual(vec![StageBoundaries::OneStage { skill_1: 3 }]);
        let generator = DemoGenerator::new(s).unwrap();
        let masks = masks().with_label(
            SemanticLabel::Target,
            Aabb::new(Vec3::new(-0.1, -0.1, 0.0), Vec3::new(0.1, 0.1, 0.6)),
        );
        let result = generator.generate(&[source_episode()], &masks);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_manual_boundaries_for_episode() {
        let generator =
            DemoGenerator::new(settings(TaskShape::OneObject, 4, SampleMode::Grid)).unwrap();
        let result = generator.generate(&[source_episode(), source_episode()], &masks());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
