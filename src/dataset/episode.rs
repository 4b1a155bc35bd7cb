//! The episode data model.
//!
//! An episode is one recorded or synthesized demonstration: aligned sequences
//! of robot state, applied action, and a colored point cloud, one of each per
//! frame. Source episodes are immutable once loaded; the synthesizer only
//! ever reads them and builds fresh buffers.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::point_cloud::PointCloud;
use crate::{Error, Result};

/// One demonstration trajectory.
///
/// Invariant: `states`, `actions`, and `clouds` have equal length. The first
/// three components of each state are the end-effector position; the first
/// three components of each action are the commanded position delta. Point
/// counts are fixed within an episode but may vary across episodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Episode {
    /// Per-frame robot state vectors
    pub states: Vec<Vec<f32>>,
    /// Per-frame action vectors
    pub actions: Vec<Vec<f32>>,
    /// Per-frame scene point clouds
    pub clouds: Vec<PointCloud>,
}

impl Episode {
    pub fn new(states: Vec<Vec<f32>>, actions: Vec<Vec<f32>>, clouds: Vec<PointCloud>) -> Self {
        Self {
            states,
            actions,
            clouds,
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Check the equal-length invariant across the three sequences.
    pub fn validate(&self) -> Result<()> {
        if self.states.len() != self.actions.len() || self.states.len() != self.clouds.len() {
            return Err(Error::DataModel(format!(
                "episode sequences disagree: {} states, {} actions, {} point clouds",
                self.states.len(),
                self.actions.len(),
                self.clouds.len()
            )));
        }
        Ok(())
    }

    /// End-effector position at `frame` (first three state components).
    pub fn state_position(&self, frame: usize) -> Result<Vec3> {
        vector_head(&self.states[frame], "state", frame)
    }

    /// Commanded position delta at `frame` (first three action components).
    pub fn action_delta(&self, frame: usize) -> Result<Vec3> {
        vector_head(&self.actions[frame], "action", frame)
    }

    /// Append one frame.
    pub fn push_frame(&mut self, state: Vec<f32>, action: Vec<f32>, cloud: PointCloud) {
        self.states.push(state);
        self.actions.push(action);
        self.clouds.push(cloud);
    }
}

fn vector_head(v: &[f32], what: &str, frame: usize) -> Result<Vec3> {
    if v.len() < 3 {
        return Err(Error::DataModel(format!(
            "{what} vector at frame {frame} has {} components, need at least 3",
            v.len()
        )));
    }
    Ok(Vec3::new(v[0], v[1], v[2]))
}

/// Load source episodes from a JSON file.
pub fn load_episodes(path: &Path) -> Result<Vec<Episode>> {
    let content = std::fs::read_to_string(path)?;
    let episodes: Vec<Episode> = serde_json::from_str(&content)?;
    for (i, ep) in episodes.iter().enumerate() {
        ep.validate()
            .map_err(|e| Error::DataModel(format!("source episode {i}: {e}")))?;
    }
    Ok(episodes)
}

/// Save episodes to a JSON file, creating parent directories.
pub fn save_episodes(episodes: &[Episode], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string(episodes)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point_cloud::PointCloud;
    use tempfile::TempDir;

    fn one_frame_episode() -> Episode {
        Episode::new(
            vec![vec![0.1, 0.2, 0.3, 0.0]],
            vec![vec![0.0, 0.0, 0.01, 0.0]],
            vec![PointCloud::from_rows(&[([0.0; 3], [0.0; 3])])],
        )
    }

    #[test]
    fn test_validate_equal_lengths() {
        assert!(one_frame_episode().validate().is_ok());
    }

    #[test]
    fn test_validate_mismatched_lengths() {
        let mut ep = one_frame_episode();
        ep.actions.push(vec![0.0; 4]);
        assert!(ep.validate().is_err());
    }

    #[test]
    fn test_state_position_head() {
        let ep = one_frame_episode();
        let p = ep.state_position(0).unwrap();
        assert_eq!(p, Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_short_state_vector_fails() {
        let ep = Episode::new(
            vec![vec![0.1, 0.2]],
            vec![vec![0.0; 3]],
            vec![PointCloud::default()],
        );
        assert!(ep.state_position(0).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("episodes.json");
        let episodes = vec![one_frame_episode(), one_frame_episode()];

        save_episodes(&episodes, &path).expect("save");
        let loaded = load_episodes(&path).expect("load");

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].states, episodes[0].states);
        assert_eq!(loaded[0].clouds[0].len(), 1);
    }

    #[test]
    fn test_load_rejects_invalid_episode() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("bad.json");
        let mut ep = one_frame_episode();
        ep.clouds.clear();
        save_episodes(&[ep], &path).expect("save");
        assert!(load_episodes(&path).is_err());
    }
}
