//! Cookbot
//!
//! Automates a repetitive in-game cooking activity. Each poll captures the
//! screen, classifies it against five cue templates using dual-mode
//! (intensity + edge) template matching, and feeds the result to a small state
//! machine that decides which pointer actions to take.
//!
//! This crate can be used as:
//! - A Rust library, driving [`CookBot`] with any [`ScreenSource`] and
//!   [`PointerDevice`]
//! - The `cookbot` binary (real desktop backends need the `desktop` feature)

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod region;
pub mod vision;

#[cfg(feature = "desktop")]
pub mod desktop;

// Re-export commonly used types
pub use config::BotConfig;
pub use self::core::{
    ActivityState, BotEvent, CookBot, DetectedState, RunSummary, StateMachine, StopReason,
    StopToken,
};
pub use error::{CookbotError, Result};
pub use input::{ClickStyle, MockPointer, PointerDevice};
pub use region::{Point, Region};
pub use vision::{Classifier, ColorDisambiguator, Cue, MockScreen, ScreenSource, TemplateStore};
