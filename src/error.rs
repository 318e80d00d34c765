//! Error types for the cooking bot

use thiserror::Error;

use crate::vision::Cue;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, CookbotError>;

/// Errors that can stop or degrade a run
#[derive(Debug, Error)]
pub enum CookbotError {
    /// A template image is absent or unreadable
    #[error("missing template for {cue}: {path}")]
    MissingTemplate { cue: Cue, path: String },

    /// Region corners that do not describe a positive-area rectangle
    #[error("invalid region ({x1}, {y1}) - ({x2}, {y2}): second point must be right of and below the first")]
    InvalidRegion { x1: i32, y1: i32, x2: i32, y2: i32 },

    /// Region file exists but is malformed
    #[error("invalid region file: {0}")]
    InvalidRegionFile(String),

    /// Screen capture failed
    #[error("capture failed: {0}")]
    Capture(String),

    /// Pointer or keyboard injection failed
    #[error("input error: {0}")]
    Input(String),

    /// Configuration file could not be parsed
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
