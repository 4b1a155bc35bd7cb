//! The two-stage parse state machine.
//!
//! An explicit enumerated state with a pure transition function over scalar
//! distance signals. The machine never touches point clouds itself; the
//! [`FrameParser`](super::frame_parser::FrameParser) computes whichever
//! signal the current phase asks for and feeds it in, which keeps every
//! transition unit-testable frame by frame.

/// Parsing phase of a two-stage trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePhase {
    /// Reaching toward the object; waiting for arrival
    ApproachingObject,
    /// Manipulating at the pickup site; waiting for departure
    HoldingObject,
    /// Transporting toward the target; waiting for arrival
    ApproachingTarget,
    /// All boundaries found
    Done,
}

/// Which distance signal the machine needs for the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRequest {
    /// Distance to the live object cloud at the current frame
    ToObject,
    /// Distance to the held-object reference shape frozen at pickup
    ToHeldReference,
    /// Distance to the live target cloud at the current frame
    ToTarget,
}

/// A newly finalized stage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Skill1,
    Motion2,
    Skill2,
}

/// Arrival/departure thresholds driving the transitions.
///
/// `arrive_object` and `arrive_target` are arrival thresholds (signal falls
/// to or below); `depart_object` is an exit threshold (signal rises to or
/// above). Arrival at the object must use a tighter radius than departure,
/// but the two arrival thresholds carry no mutual ordering.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub arrive_object: f32,
    pub depart_object: f32,
    pub arrive_target: f32,
}

/// The geometric state machine for two-stage trajectories.
///
/// Feed it one signal per frame via [`observe`](Self::observe); it returns
/// the boundary finalized at that frame, if any.
#[derive(Debug)]
pub struct TwoStageMachine {
    phase: ParsePhase,
    thresholds: Thresholds,
}

impl TwoStageMachine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            phase: ParsePhase::ApproachingObject,
            thresholds,
        }
    }

    pub fn phase(&self) -> ParsePhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == ParsePhase::Done
    }

    /// The signal the caller must compute for the current frame, or `None`
    /// once parsing is complete.
    pub fn signal_request(&self) -> Option<SignalRequest> {
        match self.phase {
            ParsePhase::ApproachingObject => Some(SignalRequest::ToObject),
            ParsePhase::HoldingObject => Some(SignalRequest::ToHeldReference),
            ParsePhase::ApproachingTarget => Some(SignalRequest::ToTarget),
            ParsePhase::Done => None,
        }
    }

    /// Advance the machine with the signal computed for one frame.
    pub fn observe(&mut self, signal: f32) -> Option<BoundaryKind> {
        match self.phase {
            ParsePhase::ApproachingObject if signal <= self.thresholds.arrive_object => {
                self.phase = ParsePhase::HoldingObject;
                Some(BoundaryKind::Skill1)
            }
            ParsePhase::HoldingObject if signal >= self.thresholds.depart_object => {
                self.phase = ParsePhase::ApproachingTarget;
                Some(BoundaryKind::Motion2)
            }
            ParsePhase::ApproachingTarget if signal <= self.thresholds.arrive_target => {
                self.phase = ParsePhase::Done;
                Some(BoundaryKind::Skill2)
            }
            _ => None,
        }
    }
}
