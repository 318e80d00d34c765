//! Activity state machine
//!
//! Pure decision logic: given what the classifier saw this poll, decide which
//! pointer actions to take, how long to wait, and whether the run continues.
//! Nothing here touches the screen or the pointer, and nothing sleeps. The
//! runner executes the returned [`Step`].

use std::time::Duration;

use super::state::{ActivityState, DetectedState, StopReason};
use crate::config::{millis, ClickConfig, TimingConfig};
use crate::input::ClickStyle;
use crate::region::Point;
use crate::vision::Verdict;

/// One thing the runner must do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Click { at: Point, style: ClickStyle },
    Wait(Duration),
}

/// Whether the poll loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop(StopReason),
}

/// How the machine reacts to a detected state, given its memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Act on every poll while the cue persists (quicktime)
    Repeat,
    /// First poll of a new state: run its entry actions
    Enter,
    /// Same state as remembered: do nothing.
    ///
    /// [`StateMachine`] never takes this branch: Done, CanCook and Menu settle
    /// back to `Idle` right after entry (see [`settle_after_entry`]), so a cue
    /// that persists is entered again. It only shows up when [`transition`] is
    /// asked about a remembered Done, CanCook or Menu directly.
    Hold,
    /// End the run
    Terminate,
    /// Nothing detected: forget the current state and keep looking
    Search,
}

/// Transition table
pub fn transition(memory: ActivityState, detected: ActivityState) -> Transition {
    match detected {
        ActivityState::Quicktime => Transition::Repeat,
        ActivityState::CannotCook => Transition::Terminate,
        ActivityState::Idle => Transition::Search,
        ActivityState::Done | ActivityState::CanCook | ActivityState::Menu => {
            if memory == detected {
                Transition::Hold
            } else {
                Transition::Enter
            }
        }
    }
}

/// Memory after a state's entry actions have run.
///
/// Done, CanCook and Menu return to `Idle` as soon as their entry wait is
/// over. A cue still visible on the next poll is therefore entered again.
pub fn settle_after_entry(state: ActivityState) -> ActivityState {
    match state {
        ActivityState::Done | ActivityState::CanCook | ActivityState::Menu => ActivityState::Idle,
        other => other,
    }
}

/// Decision for one poll
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// State that was acted on
    pub state: ActivityState,
    pub transition: Transition,
    pub actions: Vec<Action>,
    pub control: Control,
}

impl Step {
    /// Number of click actions in this step
    pub fn clicks(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Click { .. }))
            .count()
    }

    /// A finished dish was collected
    pub fn completes_dish(&self) -> bool {
        self.state == ActivityState::Done && self.transition == Transition::Enter
    }
}

/// Remembers the current activity and the verify-button flag
#[derive(Debug, Clone)]
pub struct StateMachine {
    memory: ActivityState,
    verify_armed: bool,
    timing: TimingConfig,
    clicks: ClickConfig,
    /// Click target used when a color verdict overrides the detection
    button_center: Point,
}

impl StateMachine {
    pub fn new(timing: TimingConfig, clicks: ClickConfig, button_center: Point) -> Self {
        Self {
            memory: ActivityState::Idle,
            verify_armed: false,
            timing,
            clicks,
            button_center,
        }
    }

    pub fn memory(&self) -> ActivityState {
        self.memory
    }

    pub fn verify_armed(&self) -> bool {
        self.verify_armed
    }

    /// The color check should run this poll
    pub fn wants_verdict(&self, detected: &DetectedState) -> bool {
        self.verify_armed && detected.state != ActivityState::Quicktime
    }

    /// Replace `detected` with a color verdict, if one was reached.
    ///
    /// Quicktime is never overridden. An accepted verdict targets the button
    /// center with score 1.0 and disarms the flag.
    pub fn apply_verdict(
        &mut self,
        detected: DetectedState,
        verdict: Option<&Verdict>,
    ) -> DetectedState {
        match verdict {
            Some(verdict) if detected.state != ActivityState::Quicktime => {
                self.verify_armed = false;
                log::info!(
                    "Button verdict {} (sample {}), overriding {}",
                    verdict.state,
                    verdict.sample,
                    detected.state
                );
                DetectedState::new(verdict.state, self.button_center, 1.0)
            }
            _ => detected,
        }
    }

    /// Decide what to do about `detected` and update memory
    pub fn step(&mut self, detected: &DetectedState) -> Step {
        let state = detected.state;
        let transition = transition(self.memory, state);
        let mut actions = Vec::new();
        let mut control = Control::Continue;

        match transition {
            Transition::Repeat => {
                if self.memory != state {
                    log::info!("Quicktime at {}, clicking", detected.position);
                }
                self.memory = state;
                self.verify_armed = false;
                actions.push(Action::Click {
                    at: detected.position,
                    style: self.quicktime_style(),
                });
                actions.push(self.wait(self.timing.quicktime_click));
            }
            Transition::Enter => {
                actions = self.entry_actions(state, detected.position);
                if state == ActivityState::Menu {
                    self.verify_armed = true;
                }
                self.memory = settle_after_entry(state);
            }
            Transition::Hold => {
                log::debug!("Holding in {}", state);
            }
            Transition::Terminate => {
                log::info!("Cannot cook, ingredients exhausted");
                control = Control::Stop(StopReason::IngredientsExhausted);
            }
            Transition::Search => {
                self.memory = ActivityState::Idle;
                actions.push(self.wait(self.timing.search));
            }
        }

        Step {
            state,
            transition,
            actions,
            control,
        }
    }

    fn entry_actions(&self, state: ActivityState, at: Point) -> Vec<Action> {
        let double = |at| Action::Click {
            at,
            style: ClickStyle::Double,
        };
        match state {
            ActivityState::Done => {
                log::info!("Dish done at {}", at);
                vec![double(at), self.wait(self.timing.done_wait)]
            }
            ActivityState::CanCook => {
                log::info!("Start cooking at {}", at);
                vec![double(at), self.wait(self.timing.can_cook_wait)]
            }
            ActivityState::Menu => {
                let confirm = self.clicks.menu_confirm_point();
                log::info!("Menu at {}, confirming at {}", at, confirm);
                vec![
                    double(at),
                    double(confirm),
                    self.wait(self.timing.menu_wait),
                ]
            }
            // Handled by other transitions
            ActivityState::Idle | ActivityState::Quicktime | ActivityState::CannotCook => Vec::new(),
        }
    }

    fn quicktime_style(&self) -> ClickStyle {
        if self.clicks.double_click_quicktime {
            ClickStyle::Double
        } else {
            ClickStyle::Single
        }
    }

    fn wait(&self, ms: u64) -> Action {
        Action::Wait(millis(ms))
    }
}
