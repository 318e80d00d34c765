//! Start-button color check
//!
//! The "can cook" and "cannot cook" buttons share an icon; only the fill color
//! differs. After a menu selection the bot locates the icon inside the button
//! area and compares the pixel under it to two reference colors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::capture::{Frame, ScreenSource};
use super::matcher::{match_template, EdgeParams, MatchThresholds};
use super::template::{Cue, TemplateStore};
use crate::config::ButtonConfig;
use crate::core::ActivityState;
use crate::error::{CookbotError, Result};
use crate::region::{Point, Region};

/// An RGB color, written as `#RRGGBB` in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Chebyshev distance: the largest per-channel difference
    pub fn distance(&self, other: &Color) -> u8 {
        self.r
            .abs_diff(other.r)
            .max(self.g.abs_diff(other.g))
            .max(self.b.abs_diff(other.b))
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(pixel: image::Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        Self::new(r, g, b)
    }
}

impl From<image::Rgba<u8>> for Color {
    fn from(pixel: image::Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self::new(r, g, b)
    }
}

impl FromStr for Color {
    type Err = CookbotError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let invalid = || CookbotError::Config(format!("invalid color '{}', expected #RRGGBB", s));
        // from_str_radix alone would accept a leading sign
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = CookbotError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Outcome of one color check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// `CanCook` or `CannotCook`
    pub state: ActivityState,
    /// Icon that located the button
    pub icon: Cue,
    /// Where the color was sampled
    pub sampled_at: Point,
    pub sample: Color,
    pub distance_can: u8,
    pub distance_cannot: u8,
}

/// Decides between "can cook" and "cannot cook" by button color
#[derive(Debug, Clone)]
pub struct ColorDisambiguator {
    region: Region,
    can_cook: Color,
    cannot_cook: Color,
}

impl ColorDisambiguator {
    pub fn new(region: Region, can_cook: Color, cannot_cook: Color) -> Self {
        Self {
            region,
            can_cook,
            cannot_cook,
        }
    }

    pub fn from_config(config: &ButtonConfig) -> Result<Self> {
        Ok(Self::new(
            config.region()?,
            config.can_cook_color,
            config.cannot_cook_color,
        ))
    }

    /// Button area searched for the icon
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Nearest reference color wins; equal distances resolve to `CannotCook`
    pub fn judge(&self, sample: Color) -> (ActivityState, u8, u8) {
        let distance_can = sample.distance(&self.can_cook);
        let distance_cannot = sample.distance(&self.cannot_cook);
        let state = if distance_can < distance_cannot {
            ActivityState::CanCook
        } else {
            ActivityState::CannotCook
        };
        (state, distance_can, distance_cannot)
    }

    /// Look for either button icon inside the button area and judge the color
    /// under it. Returns `None` when no icon is found or the screen cannot be
    /// read; the caller simply retries next poll.
    pub fn check(
        &self,
        screen: &mut dyn ScreenSource,
        store: &TemplateStore,
        thresholds: &MatchThresholds,
        params: EdgeParams,
    ) -> Option<Verdict> {
        let frame = match Frame::grab(screen, Some(&self.region), params) {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Button capture failed: {}", e);
                return None;
            }
        };

        let (icon, sampled_at) = [Cue::CanCook, Cue::CannotCook]
            .into_iter()
            .find_map(|cue| {
                let template = store.get(cue)?;
                let found = match_template(&frame, template, thresholds)?;
                Some((cue, found.absolute_center(frame.origin())))
            })?;

        let sample = match screen.pixel_at(sampled_at) {
            Ok(color) => color,
            Err(e) => {
                log::debug!("Pixel sample at {} failed: {}", sampled_at, e);
                return None;
            }
        };

        let (state, distance_can, distance_cannot) = self.judge(sample);
        log::debug!(
            "Button color {} at {}: can={} cannot={} -> {}",
            sample,
            sampled_at,
            distance_can,
            distance_cannot,
            state
        );

        Some(Verdict {
            state,
            icon,
            sampled_at,
            sample,
            distance_can,
            distance_cannot,
        })
    }
}
