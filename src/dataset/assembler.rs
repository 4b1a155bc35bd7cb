//! Dataset assembly and the persistence collaborator.
//!
//! Generated episodes are concatenated into flat per-frame arrays plus an
//! `episode_ends` index (exclusive prefix sums of episode lengths), which is
//! the shape the downstream training store expects. Persistence itself sits
//! behind the [`DatasetStore`] trait; on-disk formats beyond the JSON default
//! are the store's concern, not the core's.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::geometry::point_cloud::PointCloud;
use crate::{Error, Result};

use super::episode::Episode;

/// All generated episodes, concatenated in generation order.
///
/// `episode_ends[i]` is the exclusive upper bound of episode `i` in the
/// concatenated arrays; the sequence is strictly increasing and its last
/// entry equals the total frame count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcatenatedDataset {
    pub states: Vec<Vec<f32>>,
    pub actions: Vec<Vec<f32>>,
    pub clouds: Vec<PointCloud>,
    pub episode_ends: Vec<usize>,
}

impl ConcatenatedDataset {
    /// Total number of frames across all episodes.
    pub fn total_frames(&self) -> usize {
        self.states.len()
    }

    pub fn n_episodes(&self) -> usize {
        self.episode_ends.len()
    }
}

/// Concatenates generated episodes into the flat dataset layout.
#[derive(Debug, Default)]
pub struct DatasetAssembler;

impl DatasetAssembler {
    /// Concatenate `episodes` and compute episode-end offsets.
    ///
    /// Every episode is validated first; a length mismatch anywhere aborts
    /// the assembly rather than producing a silently misaligned dataset.
    pub fn assemble(episodes: &[Episode]) -> Result<ConcatenatedDataset> {
        let mut dataset = ConcatenatedDataset::default();
        let mut count = 0usize;

        for (i, ep) in episodes.iter().enumerate() {
            ep.validate()
                .map_err(|e| Error::DataModel(format!("generated episode {i}: {e}")))?;
            dataset.states.extend_from_slice(&ep.states);
            dataset.actions.extend_from_slice(&ep.actions);
            dataset.clouds.extend_from_slice(&ep.clouds);
            count += ep.len();
            dataset.episode_ends.push(count);
        }

        info!(
            episodes = dataset.n_episodes(),
            frames = dataset.total_frames(),
            "assembled dataset"
        );
        Ok(dataset)
    }
}

/// External persistence collaborator. The core hands the four concatenated
/// arrays over unchanged; the store decides the on-disk representation.
pub trait DatasetStore {
    fn write(&self, dataset: &ConcatenatedDataset) -> Result<()>;
}

/// Default store: one JSON file.
#[derive(Debug, Clone)]
pub struct JsonDatasetStore {
    path: PathBuf,
}

impl JsonDatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetStore for JsonDatasetStore {
    fn write(&self, dataset: &ConcatenatedDataset) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(dataset)?;
        std::fs::write(&self.path, content)?;
        info!(path = %self.path.display(), "wrote dataset");
        Ok(())
    }
}
