//! Pipeline orchestration.

pub mod generator;

pub use generator::{
    BoundarySource, DemoGenerator, GenerationSettings, SampleMode, TaskShape,
};
