//! # DemoGen
//!
//! Augments a small set of recorded robot manipulation demonstrations into a
//! much larger synthetic dataset. Each source trajectory (robot state, action,
//! and a colored point cloud per frame) is segmented into semantic stages and
//! re-synthesized with spatially shifted objects and end-effector paths, so a
//! downstream imitation-learning policy can train on far more object/target
//! placements than were physically demonstrated.
//!
//! ## Quick Start
//!
//! ```no_run
//! use demogen::app::config::Config;
//! use demogen::dataset::episode::Episode;
//! use demogen::workflow::generator::DemoGenerator;
//!
//! let config = Config::default();
//! let sources: Vec<Episode> = vec![/* loaded source demos */];
//! let masks = config.mask_source();
//!
//! let generator = DemoGenerator::new(config.generation_settings()).expect("invalid config");
//! let generated = generator.generate(&sources, &masks).expect("generation failed");
//! println!("generated {} episodes", generated.len());
//! ```
//!
//! ## Architecture
//!
//! - [`geometry`]: point-cloud primitives — bounding boxes, partition,
//!   translation, chamfer distance over a k-d tree
//! - [`parsing`]: stage-boundary detection (geometric state machine)
//! - [`sampling`]: translation-offset sampling (random, grid, pairs)
//! - [`synthesis`]: stage-by-stage trajectory re-synthesis
//! - [`dataset`]: episode data model, concatenation, persistence collaborator
//! - [`mask`]: object/target segmentation collaborator interface
//! - [`workflow`]: high-level generation pipeline
//! - [`app`]: CLI and configuration management
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │    Offset    │───▶│  Trajectory  │───▶│    Dataset   │───▶│   External   │
//! │   Sampler    │    │ Synthesizer  │    │  Assembler   │    │    Store     │
//! └──────────────┘    └──────┬───────┘    └──────────────┘    └──────────────┘
//!                            │
//!                ┌───────────┴───────────┐
//!                │ Frame Parser (cached) │
//!                │ Geometry  (per frame) │
//!                └───────────────────────┘
//! ```

pub mod geometry;
pub mod parsing;
pub mod sampling;
pub mod synthesis;
pub mod dataset;
pub mod mask;
pub mod workflow;
pub mod app;

// Re-export commonly used types
pub use dataset::episode::Episode;
pub use geometry::point_cloud::{Aabb, Point, PointCloud};
pub use parsing::boundaries::StageBoundaries;
pub use workflow::generator::DemoGenerator;

/// Result type alias for the demo generator
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the demo generator
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration; raised before any synthesis begins.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No frame satisfied a stage-boundary condition for a source episode.
    #[error("Parsing failed for source episode {episode}: {detail}")]
    Parsing { episode: usize, detail: String },

    /// A geometric invariant was violated (e.g. partition disjointness).
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The state/action/point-cloud sequences of an episode disagree in length.
    #[error("Data model error: {0}")]
    DataModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
