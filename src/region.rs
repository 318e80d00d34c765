//! Screen regions and two-click calibration
//!
//! The detection region is stored on disk as `{"region": [x1, y1, x2, y2]}`.
//! A missing or malformed file means "scan the full screen".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{CookbotError, Result};

/// A point in absolute screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by a capture offset
    pub fn offset_by(self, origin: Point) -> Self {
        Self::new(self.x + origin.x, self.y + origin.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A rectangle in screen pixels. Width and height are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Region {
    /// Build from top-left and bottom-right corners. The second corner must be
    /// strictly right of and below the first, and each side must fit in an
    /// `i32` so every derived corner stays representable.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        let side = |from: i32, to: i32| to.checked_sub(from).filter(|len| *len > 0);
        match (side(x1, x2), side(y1, y2)) {
            (Some(width), Some(height)) => Ok(Self {
                x: x1,
                y: y1,
                width: width as u32,
                height: height as u32,
            }),
            _ => Err(CookbotError::InvalidRegion { x1, y1, x2, y2 }),
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width as i32, self.y + self.height as i32)
    }

    /// Center point, floor division on each axis
    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Corners in `[x1, y1, x2, y2]` form
    pub fn corners(&self) -> [i32; 4] {
        let br = self.bottom_right();
        [self.x, self.y, br.x, br.y]
    }

    /// Outline traced clockwise from the top-left, ending where it started
    pub fn outline(&self) -> [Point; 5] {
        let br = self.bottom_right();
        [
            self.top_left(),
            Point::new(br.x, self.y),
            br,
            Point::new(self.x, br.y),
            self.top_left(),
        ]
    }

    pub fn contains(&self, point: Point) -> bool {
        let br = self.bottom_right();
        point.x >= self.x && point.x < br.x && point.y >= self.y && point.y < br.y
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({}x{})",
            self.top_left(),
            self.bottom_right(),
            self.width,
            self.height
        )
    }
}

/// On-disk region record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFile {
    pub region: [i32; 4],
}

impl RegionFile {
    pub fn from_region(region: &Region) -> Self {
        Self {
            region: region.corners(),
        }
    }

    /// Parse a region file's contents
    pub fn parse(content: &str) -> Result<Region> {
        let file: RegionFile = serde_json::from_str(content)
            .map_err(|e| CookbotError::InvalidRegionFile(e.to_string()))?;
        let [x1, y1, x2, y2] = file.region;
        Region::from_corners(x1, y1, x2, y2)
            .map_err(|e| CookbotError::InvalidRegionFile(e.to_string()))
    }
}

/// Load the detection region. Absent or invalid files yield `None`.
pub fn load_region(path: &Path) -> Option<Region> {
    if !path.exists() {
        log::info!("No region file at {}, scanning full screen", path.display());
        return None;
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(CookbotError::from)
        .and_then(|content| RegionFile::parse(&content));

    match parsed {
        Ok(region) => {
            log::info!("Loaded region {} from {}", region, path.display());
            Some(region)
        }
        Err(e) => {
            log::warn!("Ignoring region file {}: {}", path.display(), e);
            None
        }
    }
}

/// Write the region file
pub fn save_region(path: &Path, region: &Region) -> Result<()> {
    let json = serde_json::to_string_pretty(&RegionFile::from_region(region))
        .map_err(|e| CookbotError::InvalidRegionFile(e.to_string()))?;
    std::fs::write(path, json)?;
    log::info!("Saved region {} to {}", region, path.display());
    Ok(())
}

/// Progress of a two-click calibration
#[derive(Debug, PartialEq, Eq)]
pub enum CalibrationStep {
    /// First corner recorded; waiting for the bottom-right corner
    AwaitingSecond(Point),
    /// Both corners recorded
    Complete(Region),
}

/// Collects the two corner clicks of a region
#[derive(Debug, Default)]
pub struct Calibration {
    first: Option<Point>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a left click. A second point that is not strictly right of and
    /// below the first fails the calibration.
    pub fn click(&mut self, point: Point) -> Result<CalibrationStep> {
        match self.first.take() {
            None => {
                self.first = Some(point);
                Ok(CalibrationStep::AwaitingSecond(point))
            }
            Some(first) => {
                Region::from_corners(first.x, first.y, point.x, point.y)
                    .map(CalibrationStep::Complete)
            }
        }
    }
}

/// Feed clicks into a calibration until it completes. Returns `None` if the
/// clicks run out first.
pub fn calibrate<I>(clicks: I) -> Result<Option<Region>>
where
    I: IntoIterator<Item = Point>,
{
    let mut calibration = Calibration::new();
    for point in clicks {
        match calibration.click(point)? {
            CalibrationStep::AwaitingSecond(first) => {
                log::info!("Top-left corner: {}, now click the bottom-right corner", first);
            }
            CalibrationStep::Complete(region) => {
                log::info!("Bottom-right corner: {}", region.bottom_right());
                return Ok(Some(region));
            }
        }
    }
    Ok(None)
}
