//! End-to-end tests for the demonstration augmentation pipeline.

use approx::assert_relative_eq;
use glam::{Vec2, Vec3};

use demogen::dataset::assembler::{ConcatenatedDataset, JsonDatasetStore};
use demogen::dataset::episode::Episode;
use demogen::geometry::point_cloud::{Aabb, PointCloud};
use demogen::mask::{BoxMaskSource, SemanticLabel};
use demogen::parsing::StageBoundaries;
use demogen::sampling::TranslationRange;
use demogen::synthesis::{Interpolation, StageScript, TrajectorySynthesizer};
use demogen::workflow::{
    BoundarySource, DemoGenerator, GenerationSettings, SampleMode, TaskShape,
};

/// Ten-frame one-object source: the end-effector advances 0.05 in x per
/// frame toward an object slab spanning x in [0, 1] on the table.
fn one_object_source() -> Episode {
    let mut episode = Episode::default();
    for i in 0..10 {
        let x = 0.05 * (i + 1) as f32;
        let mut cloud_rows = vec![([x, 0.0, 0.5], [0.5f32; 3])]; // gripper, above the slab
        for k in 0..11 {
            cloud_rows.push(([0.1 * k as f32, 0.0, 0.05], [1.0; 3]));
        }
        episode.push_frame(
            vec![x, 0.0, 0.2, 1.0],
            vec![0.05, 0.0, 0.0, 0.0],
            PointCloud::from_rows(&cloud_rows),
        );
    }
    episode
}

fn one_object_masks() -> BoxMaskSource {
    BoxMaskSource::new().with_label(
        SemanticLabel::Object,
        Aabb::new(Vec3::new(-0.05, -0.1, 0.0), Vec3::new(1.05, 0.1, 0.1)),
    )
}

fn one_object_settings() -> GenerationSettings {
    // A degenerate range pinned at (0.1, 0) makes the grid collapse to the
    // single offset the assertions are written against
    GenerationSettings {
        task: TaskShape::OneObject,
        demos_per_source: 4,
        sample_mode: SampleMode::Grid,
        interpolation: Interpolation::Linear,
        boundaries: BoundarySource::Manual(vec![StageBoundaries::OneStage { skill_1: 3 }]),
        object_range: TranslationRange::new(Vec2::new(0.1, 0.0), Vec2::new(0.1, 0.0)),
        target_range: None,
        seed: None,
    }
}

#[test]
fn test_end_to_end_one_object_drift_and_shift() {
    let source = one_object_source();
    let generator = DemoGenerator::new(one_object_settings()).expect("settings valid");
    let generated = generator
        .generate(&[source.clone()], &one_object_masks())
        .expect("generation succeeds");

    // The degenerate grid dedups to one offset
    assert_eq!(generated.len(), 1);
    let episode = &generated[0];
    assert_eq!(episode.len(), 10);

    // Motion stage: drift grows strictly monotonically toward the offset
    let drift_at = |frame: usize| episode.states[frame][0] - source.states[frame][0];
    assert!(drift_at(0) > 0.0);
    assert!(drift_at(1) > drift_at(0));
    assert!(drift_at(2) > drift_at(1));
    assert_relative_eq!(drift_at(2), 0.1, epsilon = 1e-5);

    // Manipulation stage: every state is the source shifted by the offset
    for frame in 3..10 {
        assert_relative_eq!(
            episode.states[frame][0],
            source.states[frame][0] + 0.1,
            epsilon = 1e-5
        );
        assert_relative_eq!(episode.states[frame][1], source.states[frame][1], epsilon = 1e-5);
        assert_relative_eq!(episode.states[frame][2], source.states[frame][2], epsilon = 1e-5);
        // Non-position channels pass through
        assert_eq!(episode.states[frame][3], 1.0);
        assert_eq!(episode.actions[frame], source.actions[frame]);
    }
}

#[test]
fn test_end_to_end_point_counts_preserved() {
    let source = one_object_source();
    let generator = DemoGenerator::new(one_object_settings()).expect("settings valid");
    let generated = generator
        .generate(&[source.clone()], &one_object_masks())
        .expect("generation succeeds");

    for (out_cloud, src_cloud) in generated[0].clouds.iter().zip(&source.clouds) {
        assert_eq!(out_cloud.len(), src_cloud.len());
    }
}

/// Twenty-frame two-object source with distinct object and target clusters.
fn two_object_source() -> Episode {
    let mut episode = Episode::default();
    for i in 0..20 {
        let x = 0.05 * (i + 1) as f32;
        episode.push_frame(
            vec![x, 0.0, 0.2, 0.0],
            vec![0.05, 0.0, 0.0, 0.0],
            PointCloud::from_rows(&[
                ([0.3, 0.0, 0.05], [1.0; 3]), // object
                ([0.9, 0.0, 0.05], [2.0; 3]), // target
                ([x, 0.0, 0.5], [0.5; 3]),    // gripper
            ]),
        );
    }
    episode
}

#[test]
fn test_stage_length_invariance_two_stage_zero_offset() {
    let source = two_object_source();
    let boundaries = StageBoundaries::TwoStage {
        skill_1: 5,
        motion_2: 9,
        skill_2: 14,
    };
    let object_bbox = Aabb::new(Vec3::new(0.25, -0.1, 0.0), Vec3::new(0.35, 0.1, 0.1));
    let target_bbox = Aabb::new(Vec3::new(0.85, -0.1, 0.0), Vec3::new(0.95, 0.1, 0.1));

    let script = StageScript::two_object(
        source.len(),
        boundaries,
        object_bbox,
        target_bbox,
        Vec3::ZERO,
        Vec3::ZERO,
    )
    .expect("script builds");

    let out = TrajectorySynthesizer::new(Interpolation::Linear)
        .synthesize(&source, &script)
        .expect("synthesis succeeds");

    // 5 + 4 + 5 + 6 frames, same total as the source
    assert_eq!(out.len(), source.len());
}

#[test]
fn test_pipeline_writes_dataset_with_episode_ends() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("dataset.json");

    let generator = DemoGenerator::new(one_object_settings()).expect("settings valid");
    let store = JsonDatasetStore::new(&path);
    generator
        .generate_to_store(&[one_object_source()], &one_object_masks(), &store)
        .expect("pipeline succeeds");

    let content = std::fs::read_to_string(&path).expect("dataset written");
    let dataset: ConcatenatedDataset = serde_json::from_str(&content).expect("valid JSON");

    assert_eq!(dataset.n_episodes(), 1);
    assert_eq!(dataset.total_frames(), 10);
    assert_eq!(dataset.episode_ends, vec![10]);
    assert!(dataset
        .episode_ends
        .windows(2)
        .all(|w| w[0] < w[1]));
}

#[test]
fn test_two_object_grid_generates_cartesian_product() {
    let range = TranslationRange::new(Vec2::new(-0.05, -0.05), Vec2::new(0.05, 0.05));
    let settings = GenerationSettings {
        task: TaskShape::TwoObject,
        demos_per_source: 16,
        sample_mode: SampleMode::Grid,
        interpolation: Interpolation::Linear,
        boundaries: BoundarySource::Manual(vec![StageBoundaries::TwoStage {
            skill_1: 5,
            motion_2: 9,
            skill_2: 14,
        }]),
        object_range: range,
        target_range: Some(range),
        seed: None,
    };
    let masks = BoxMaskSource::new()
        .with_label(
            SemanticLabel::Object,
            Aabb::new(Vec3::new(0.25, -0.1, 0.0), Vec3::new(0.35, 0.1, 0.1)),
        )
        .with_label(
            SemanticLabel::Target,
            Aabb::new(Vec3::new(0.85, -0.1, 0.0), Vec3::new(0.95, 0.1, 0.1)),
        );

    let generator = DemoGenerator::new(settings).expect("settings valid");
    let generated = generator
        .generate(&[two_object_source()], &masks)
        .expect("generation succeeds");

    // 2x2 object lattice crossed with 2x2 target lattice
    assert_eq!(generated.len(), 16);
    assert!(generated.iter().all(|ep| ep.len() == 20));
}
