//! Frame classification
//!
//! Captured frames are matched against five fixed cue templates. Each match
//! runs twice, once on grayscale intensity and once on edge maps, and the
//! better-scoring mode above its own threshold wins. Cues are tried in a
//! fixed priority order and the first hit becomes the detected state.
//!
//! When the start button's icon alone cannot tell "can cook" from "cannot
//! cook", [`ColorDisambiguator`] samples the button fill color instead.

pub mod capture;
pub mod classifier;
pub mod color;
pub mod matcher;
pub mod template;

pub use capture::{to_gray, Frame, MockScreen, ScreenSource};
pub use classifier::Classifier;
pub use color::{Color, ColorDisambiguator, Verdict};
pub use matcher::{EdgeParams, MatchMode, MatchResult, MatchThresholds};
pub use template::{Cue, Template, TemplateStore};
