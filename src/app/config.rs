//! Configuration Management

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::geometry::point_cloud::Aabb;
use crate::mask::{BoxMaskSource, SemanticLabel};
use crate::parsing::{DistanceMode, ParserThresholds, StageBoundaries};
use crate::sampling::TranslationRange;
use crate::synthesis::Interpolation;
use crate::workflow::{BoundarySource, GenerationSettings, SampleMode, TaskShape};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task shape and stage boundaries
    pub task: TaskConfig,
    /// Offset sampling and synthesis settings
    pub generation: GenerationConfig,
    /// Frame-parser fallback settings
    #[serde(default)]
    pub parsing: ParsingConfig,
    /// Segmentation boxes for the built-in mask collaborator
    pub masks: MaskConfig,
}

/// Task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// One- or two-object task shape
    pub shape: TaskShape,
    /// Manual stage boundaries, one entry per source episode; empty means
    /// parse automatically
    #[serde(default)]
    pub boundaries: Vec<StageBoundaries>,
    /// Admissible object offsets (xy box)
    pub object_range: TranslationRange,
    /// Admissible target offsets, required for two-object tasks
    pub target_range: Option<TranslationRange>,
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Synthetic episodes per source episode
    pub demos_per_source: usize,
    /// Grid or random offset sampling
    pub sample_mode: SampleMode,
    /// Motion-stage interpolation
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Fixed seed for random sampling
    pub seed: Option<u64>,
}

/// Frame-parser configuration, used when no manual boundaries are given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Driving distance signal
    pub mode: DistanceMode,
    /// Object-arrival threshold for one-stage tasks
    pub one_stage_arrive: f32,
    /// Object-arrival threshold (two-stage)
    pub arrive_object: f32,
    /// Pickup-departure threshold (two-stage)
    pub depart_object: f32,
    /// Target-arrival threshold (two-stage)
    pub arrive_target: f32,
}

/// An axis-aligned box in config form
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoxConfig {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl From<BoxConfig> for Aabb {
    fn from(b: BoxConfig) -> Self {
        Aabb::new(Vec3::from_array(b.min), Vec3::from_array(b.max))
    }
}

/// Mask collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Box labeling the manipulated object
    pub object: BoxConfig,
    /// Box labeling the placement target, required for two-object tasks
    pub target: Option<BoxConfig>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            shape: TaskShape::OneObject,
            boundaries: Vec::new(),
            object_range: TranslationRange::new(Vec2::splat(-0.1), Vec2::splat(0.1)),
            target_range: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            demos_per_source: 25,
            sample_mode: SampleMode::Grid,
            interpolation: Interpolation::default(),
            seed: None,
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        let t = ParserThresholds::default();
        Self {
            mode: DistanceMode::Pcd2Pcd,
            one_stage_arrive: 0.23,
            arrive_object: t.arrive_object,
            depart_object: t.depart_object,
            arrive_target: t.arrive_target,
        }
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            object: BoxConfig {
                min: [0.0, 0.0, 0.0],
                max: [0.1, 0.1, 0.1],
            },
            target: None,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.generation.demos_per_source == 0 {
            return Err(crate::Error::Config(
                "demos_per_source must be > 0".to_string(),
            ));
        }
        self.task.object_range.validate()?;
        if let Some(range) = &self.task.target_range {
            range.validate()?;
        }
        if self.task.shape == TaskShape::TwoObject {
            if self.task.target_range.is_none() {
                return Err(crate::Error::Config(
                    "two-object tasks need task.target_range".to_string(),
                ));
            }
            if self.masks.target.is_none() {
                return Err(crate::Error::Config(
                    "two-object tasks need masks.target".to_string(),
                ));
            }
        }
        for t in [
            self.parsing.one_stage_arrive,
            self.parsing.arrive_object,
            self.parsing.depart_object,
            self.parsing.arrive_target,
        ] {
            if t <= 0.0 {
                return Err(crate::Error::Config(format!(
                    "parser thresholds must be positive, got {t}"
                )));
            }
        }
        if let Interpolation::Piecewise { z_step } = self.generation.interpolation {
            if z_step <= 0.0 {
                return Err(crate::Error::Config(format!(
                    "z_step must be positive, got {z_step}"
                )));
            }
        }
        Ok(())
    }

    /// Assemble the generation settings the pipeline runs on.
    pub fn generation_settings(&self) -> GenerationSettings {
        let boundaries = if self.task.boundaries.is_empty() {
            let arrive_object = match self.task.shape {
                TaskShape::OneObject => self.parsing.one_stage_arrive,
                TaskShape::TwoObject => self.parsing.arrive_object,
            };
            BoundarySource::Parsed {
                mode: self.parsing.mode,
                thresholds: ParserThresholds {
                    arrive_object,
                    depart_object: self.parsing.depart_object,
                    arrive_target: self.parsing.arrive_target,
                },
            }
        } else {
            BoundarySource::Manual(self.task.boundaries.clone())
        };

        GenerationSettings {
            task: self.task.shape,
            demos_per_source: self.generation.demos_per_source,
            sample_mode: self.generation.sample_mode,
            interpolation: self.generation.interpolation,
            boundaries,
            object_range: self.task.object_range,
            target_range: self.task.target_range,
            seed: self.generation.seed,
        }
    }

    /// Build the box-based mask collaborator from the configured boxes.
    pub fn mask_source(&self) -> BoxMaskSource {
        let mut masks =
            BoxMaskSource::new().with_label(SemanticLabel::Object, self.masks.object.into());
        if let Some(target) = self.masks.target {
            masks = masks.with_label(SemanticLabel::Target, target.into());
        }
        masks
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".demogen").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation.demos_per_source, 25);
        assert_eq!(config.parsing.one_stage_arrive, 0.23);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[task]"));
        assert!(toml.contains("[generation]"));
        assert!(toml.contains("[parsing]"));
        assert!(toml.contains("[masks]"));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.generation.demos_per_source = 16;
        config.generation.seed = Some(42);
        config.save(&path).expect("save");

        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded.generation.demos_per_source, 16);
        assert_eq!(loaded.generation.seed, Some(42));
    }

    #[test]
    fn test_two_object_requires_target_sections() {
        let mut config = Config::default();
        config.task.shape = TaskShape::TwoObject;
        assert!(config.validate().is_err());

        config.task.target_range = Some(TranslationRange::new(
            Vec2::splat(-0.1),
            Vec2::splat(0.1),
        ));
        assert!(config.validate().is_err());

        config.masks.target = Some(BoxConfig {
            min: [0.4, 0.4, 0.0],
            max: [0.6, 0.6, 0.2],
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_demos_rejected() {
        let mut config = Config::default();
        config.generation.demos_per_source = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_pick_one_stage_threshold() {
        let config = Config::default();
        let settings = config.generation_settings();
        match settings.boundaries {
            BoundarySource::Parsed { thresholds, .. } => {
                assert_eq!(thresholds.arrive_object, 0.23);
            }
            other => panic!("expected parsed boundaries, got {other:?}"),
        }
    }

    #[test]
    fn test_manual_boundaries_win() {
        let mut config = Config::default();
        config.task.boundaries = vec![StageBoundaries::OneStage { skill_1: 5 }];
        let settings = config.generation_settings();
        assert!(matches!(settings.boundaries, BoundarySource::Manual(_)));
    }
}
