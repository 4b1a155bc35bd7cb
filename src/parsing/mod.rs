//! Stage-boundary detection.
//!
//! Splits a source trajectory into its semantic manipulation phases, either
//! from manually supplied frame indices (the recommended mode) or by scanning
//! the trajectory with a geometric state machine driven by end-effector or
//! point-cloud distances.

pub mod boundaries;
pub mod frame_parser;
pub mod stage_machine;

pub use boundaries::StageBoundaries;
pub use frame_parser::{DistanceMode, FrameParser, ParserThresholds};
pub use stage_machine::{BoundaryKind, ParsePhase, SignalRequest, TwoStageMachine};
