//! Screen capture seam
//!
//! The bot never talks to the OS directly. Captures and pixel samples go
//! through [`ScreenSource`], so tests can feed synthetic frames.

use image::{GrayImage, Luma, RgbaImage};
use std::collections::{HashMap, VecDeque};

use super::color::Color;
use super::matcher::{edge_map, EdgeParams};
use crate::core::StopToken;
use crate::error::{CookbotError, Result};
use crate::region::{Point, Region};

/// Source of screen images
pub trait ScreenSource {
    /// Grab a grayscale image of `region`, or of the whole screen if `None`
    fn capture(&mut self, region: Option<&Region>) -> Result<GrayImage>;

    /// Read the color of one screen pixel
    fn pixel_at(&mut self, at: Point) -> Result<Color>;
}

/// Grayscale conversion shared by templates and screen captures.
///
/// Uses the BT.601 weights `0.299 R + 0.587 G + 0.114 B`, rounded to nearest,
/// so reference images authored against OpenCV-style grayscale keep their
/// intensities. Alpha is ignored.
pub fn to_gray(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        Luma([luma as u8])
    })
}

/// One captured frame, ready for matching. Lives for a single poll.
#[derive(Debug, Clone)]
pub struct Frame {
    gray: GrayImage,
    edges: GrayImage,
    /// Screen position of the frame's top-left pixel
    origin: Point,
}

impl Frame {
    /// Wrap a grayscale capture. The edge map is computed once here and shared
    /// by every template tried against this frame.
    pub fn new(gray: GrayImage, origin: Point, params: EdgeParams) -> Self {
        let edges = edge_map(&gray, params);
        Self { gray, edges, origin }
    }

    /// Capture `region` (or the full screen) from `source`
    pub fn grab(
        source: &mut dyn ScreenSource,
        region: Option<&Region>,
        params: EdgeParams,
    ) -> Result<Self> {
        let gray = source.capture(region)?;
        let origin = region.map(Region::top_left).unwrap_or_default();
        log::trace!("Captured {}x{} at {}", gray.width(), gray.height(), origin);
        Ok(Self::new(gray, origin, params))
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn edges(&self) -> &GrayImage {
        &self.edges
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Scripted screen for tests and dry runs.
///
/// Main captures pop queued frames in order; the last frame repeats once the
/// queue drains. Captures of a registered sub-region return that region's
/// image instead.
#[derive(Debug, Default)]
pub struct MockScreen {
    frames: VecDeque<GrayImage>,
    region_frames: HashMap<Region, GrayImage>,
    pixels: HashMap<Point, Color>,
    default_color: Color,
    stop_when_drained: Option<StopToken>,
    captures: usize,
    fail_capture: bool,
}

impl MockScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a main-region frame
    pub fn push_frame(mut self, frame: GrayImage) -> Self {
        self.frames.push_back(frame);
        self
    }

    /// Queue the same frame `count` times
    pub fn push_frames(mut self, frame: GrayImage, count: usize) -> Self {
        for _ in 0..count {
            self.frames.push_back(frame.clone());
        }
        self
    }

    /// Serve `image` whenever exactly `region` is captured
    pub fn with_region_frame(mut self, region: Region, image: GrayImage) -> Self {
        self.region_frames.insert(region, image);
        self
    }

    /// Color returned for one pixel
    pub fn with_pixel(mut self, at: Point, color: Color) -> Self {
        self.pixels.insert(at, color);
        self
    }

    /// Color returned for every pixel without an explicit entry
    pub fn with_default_color(mut self, color: Color) -> Self {
        self.default_color = color;
        self
    }

    /// Signal `token` once the last queued frame is served, so a run sees
    /// every queued frame exactly once
    pub fn stop_when_drained(mut self, token: StopToken) -> Self {
        self.stop_when_drained = Some(token);
        self
    }

    /// Make every capture fail
    pub fn failing(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    /// Number of main-region captures served
    pub fn captures(&self) -> usize {
        self.captures
    }
}

impl ScreenSource for MockScreen {
    fn capture(&mut self, region: Option<&Region>) -> Result<GrayImage> {
        if self.fail_capture {
            return Err(CookbotError::Capture("mock capture failure".to_string()));
        }
        if let Some(image) = region.and_then(|r| self.region_frames.get(r)) {
            return Ok(image.clone());
        }

        self.captures += 1;
        if self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop_front() {
                return Ok(frame);
            }
        }

        // Serving the last queued frame
        if let Some(token) = &self.stop_when_drained {
            token.stop();
        }
        self.frames
            .front()
            .cloned()
            .ok_or_else(|| CookbotError::Capture("no frames queued".to_string()))
    }

    fn pixel_at(&mut self, at: Point) -> Result<Color> {
        Ok(self.pixels.get(&at).copied().unwrap_or(self.default_color))
    }
}
