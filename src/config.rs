//! Run configuration
//!
//! Every value has a default, so the bot runs without a `cookbot.toml`. A file,
//! when present, only needs the keys it wants to override:
//!
//! ```toml
//! [matching]
//! raw_threshold = 0.75
//!
//! [timing]
//! done_wait = 3000
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CookbotError, Result};
use crate::region::{Point, Region};
use crate::vision::color::Color;
use crate::vision::Cue;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "cookbot.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub files: FileConfig,
    pub matching: MatchingConfig,
    pub timing: TimingConfig,
    pub clicks: ClickConfig,
    pub button: ButtonConfig,
    pub preview: PreviewConfig,
}

impl BotConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CookbotError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            log::info!("Loading config from {}", path.display());
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

/// Template and region file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory holding the template images and the region file
    pub template_dir: PathBuf,
    pub spatula: String,
    pub menu: String,
    pub done: String,
    pub can_cook: String,
    pub cannot_cook: String,
    pub region_file: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("."),
            spatula: "spatula_template.png".to_string(),
            menu: "select_menu.png".to_string(),
            done: "cookingdone.png".to_string(),
            can_cook: "cancook.png".to_string(),
            cannot_cook: "cannotcook.png".to_string(),
            region_file: "spatula_region.json".to_string(),
        }
    }
}

impl FileConfig {
    /// File name configured for a cue
    pub fn template_name(&self, cue: Cue) -> &str {
        match cue {
            Cue::Spatula => &self.spatula,
            Cue::Menu => &self.menu,
            Cue::Done => &self.done,
            Cue::CanCook => &self.can_cook,
            Cue::CannotCook => &self.cannot_cook,
        }
    }

    /// Full path of a cue's template image
    pub fn template_path(&self, cue: Cue) -> PathBuf {
        self.template_dir.join(self.template_name(cue))
    }

    /// Full path of the region file
    pub fn region_path(&self) -> PathBuf {
        self.template_dir.join(&self.region_file)
    }
}

/// Template matching thresholds and edge detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum grayscale correlation
    pub raw_threshold: f32,
    /// Minimum edge-map correlation
    pub edge_threshold: f32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            raw_threshold: 0.70,
            edge_threshold: 0.35,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Delays, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause after each quicktime click
    pub quicktime_click: u64,
    /// Pause after a poll that detected nothing
    pub search: u64,
    /// Wait after collecting a finished dish
    pub done_wait: u64,
    /// Wait after pressing the start-cooking button
    pub can_cook_wait: u64,
    /// Wait after selecting a menu entry
    pub menu_wait: u64,
    /// Gap between press/release halves of a double click
    pub click_gap: u64,
    /// Delay before the first poll
    pub start_delay: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            quicktime_click: 40,
            search: 80,
            done_wait: 2500,
            can_cook_wait: 800,
            menu_wait: 1000,
            click_gap: 10,
            start_delay: 2000,
        }
    }
}

impl TimingConfig {
    /// All delays set to zero
    pub fn instant() -> Self {
        Self {
            quicktime_click: 0,
            search: 0,
            done_wait: 0,
            can_cook_wait: 0,
            menu_wait: 0,
            click_gap: 0,
            start_delay: 0,
        }
    }
}

/// Convert a millisecond setting into a `Duration`
pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Click behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    /// Double click (instead of single) on the quicktime cue
    pub double_click_quicktime: bool,
    /// Fixed confirm point clicked after selecting a menu entry
    pub menu_confirm: [i32; 2],
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            double_click_quicktime: true,
            menu_confirm: [220, 260],
        }
    }
}

impl ClickConfig {
    pub fn menu_confirm_point(&self) -> Point {
        Point::new(self.menu_confirm[0], self.menu_confirm[1])
    }
}

/// The start-cooking button used for color disambiguation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// Button area as corners `[x1, y1, x2, y2]`
    pub region: [i32; 4],
    pub can_cook_color: Color,
    pub cannot_cook_color: Color,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            region: [1236, 919, 1573, 1041],
            can_cook_color: Color::new(0x3E, 0xCD, 0xC3),
            cannot_cook_color: Color::new(0xBD, 0xC3, 0xC0),
        }
    }
}

impl ButtonConfig {
    /// Button area as a validated region
    pub fn region(&self) -> Result<Region> {
        let [x1, y1, x2, y2] = self.region;
        Region::from_corners(x1, y1, x2, y2)
    }
}

/// Region outline preview before a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub enabled: bool,
    /// Number of times the outline is traced
    pub loops: u32,
    /// Pause between corners, in milliseconds
    pub step_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            loops: 2,
            step_ms: 120,
        }
    }
}
