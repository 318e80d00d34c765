//! Bot state types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::region::Point;
use crate::vision::MatchMode;

/// What the bot believes the game is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    /// Nothing recognised
    #[default]
    Idle,
    Menu,
    CanCook,
    CannotCook,
    Quicktime,
    Done,
}

impl ActivityState {
    pub fn name(&self) -> &'static str {
        match self {
            ActivityState::Idle => "idle",
            ActivityState::Menu => "menu",
            ActivityState::CanCook => "can_cook",
            ActivityState::CannotCook => "cannot_cook",
            ActivityState::Quicktime => "quicktime",
            ActivityState::Done => "done",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedState {
    pub state: ActivityState,
    /// Absolute screen position of the matched cue's center
    pub position: Point,
    pub score: f32,
    /// Matching mode that produced the detection; `None` for color verdicts
    /// and for the idle state
    pub mode: Option<MatchMode>,
}

impl DetectedState {
    pub fn new(state: ActivityState, position: Point, score: f32) -> Self {
        Self {
            state,
            position,
            score,
            mode: None,
        }
    }

    /// Nothing detected this poll
    pub fn none() -> Self {
        Self::new(ActivityState::Idle, Point::default(), 0.0)
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn is_none(&self) -> bool {
        self.state == ActivityState::Idle
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stop key pressed or token signalled
    UserStop,
    /// The "cannot cook" button appeared
    IngredientsExhausted,
    /// Pointer was parked in the top-left screen corner
    FailSafe,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::UserStop => "stopped by user",
            StopReason::IngredientsExhausted => "ingredients exhausted",
            StopReason::FailSafe => "fail-safe triggered",
        };
        f.write_str(s)
    }
}

/// Totals reported when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub reason: StopReason,
    /// Click actions issued; a double click counts once
    pub clicks: u64,
    /// Finished dishes collected
    pub dishes: u64,
    /// Frames classified
    pub polls: u64,
}

impl RunSummary {
    pub fn new(reason: StopReason) -> Self {
        Self {
            reason,
            clicks: 0,
            dishes: 0,
            polls: 0,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} clicks, {} dishes, {} polls",
            self.reason, self.clicks, self.dishes, self.polls
        )
    }
}
