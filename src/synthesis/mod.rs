//! Trajectory re-synthesis.
//!
//! Rebuilds a source demonstration under a spatial offset, stage by stage.
//! [`motion`] plans the re-targeted reach actions, [`stage`] describes the
//! per-stage frame ranges and cloud partitions as data, and [`synthesizer`]
//! interprets a stage script over a source episode while carrying the
//! accumulated drift.

pub mod motion;
pub mod stage;
pub mod synthesizer;

pub use motion::{plan_motion, Interpolation};
pub use stage::{Stage, StageScript};
pub use synthesizer::TrajectorySynthesizer;
