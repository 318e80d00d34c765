//! Core bot abstractions
//!
//! This module contains the decision and control layer:
//! - `StateMachine` - turns detections into pointer actions
//! - `CookBot` - the poll loop tying capture, classification and dispatch together
//! - `BotEvent` - events emitted to observers while the bot runs

mod events;
mod machine;
mod runner;
mod state;

pub use events::{BotEvent, EventCallback, EventHandler};
pub use machine::{settle_after_entry, transition, Action, Control, StateMachine, Step, Transition};
pub use runner::{CookBot, StopToken, FAIL_SAFE_POINT};
pub use state::{ActivityState, DetectedState, RunSummary, StopReason};
