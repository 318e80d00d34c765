//! Real desktop backends
//!
//! Screen capture via `xcap`, pointer injection via `enigo`, and global
//! key/mouse listening via `rdev`. Only the primary monitor is used.

use std::sync::mpsc::Sender;
use std::thread;

use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use image::{imageops, GrayImage, RgbaImage};
use rdev::{listen, Event, EventType, Key};
use xcap::Monitor;

use crate::core::StopToken;
use crate::error::{CookbotError, Result};
use crate::input::PointerDevice;
use crate::region::{Point, Region};
use crate::vision::{to_gray, Color, ScreenSource};

/// Screenshots of the primary monitor
pub struct XcapScreen {
    monitor: Monitor,
}

impl XcapScreen {
    pub fn primary() -> Result<Self> {
        let monitors = Monitor::all().map_err(|e| CookbotError::Capture(e.to_string()))?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| CookbotError::Capture("no primary monitor".to_string()))?;
        log::debug!(
            "Capturing monitor at ({}, {}), {}x{}",
            monitor.x(),
            monitor.y(),
            monitor.width(),
            monitor.height()
        );
        Ok(Self { monitor })
    }

    fn grab(&self) -> Result<RgbaImage> {
        self.monitor
            .capture_image()
            .map_err(|e| CookbotError::Capture(e.to_string()))
    }

    /// Translate a screen point into monitor-image coordinates
    fn local(&self, at: Point, image: &RgbaImage) -> Option<(u32, u32)> {
        let x = u32::try_from(at.x - self.monitor.x()).ok()?;
        let y = u32::try_from(at.y - self.monitor.y()).ok()?;
        (x < image.width() && y < image.height()).then_some((x, y))
    }
}

impl ScreenSource for XcapScreen {
    fn capture(&mut self, region: Option<&Region>) -> Result<GrayImage> {
        let image = self.grab()?;
        let Some(region) = region else {
            return Ok(to_gray(&image));
        };

        let (x, y) = self
            .local(region.top_left(), &image)
            .ok_or_else(|| CookbotError::Capture(format!("region {} is off screen", region)))?;
        let width = region.width().min(image.width() - x);
        let height = region.height().min(image.height() - y);
        let cropped = imageops::crop_imm(&image, x, y, width, height).to_image();
        Ok(to_gray(&cropped))
    }

    fn pixel_at(&mut self, at: Point) -> Result<Color> {
        let image = self.grab()?;
        let (x, y) = self
            .local(at, &image)
            .ok_or_else(|| CookbotError::Capture(format!("pixel {} is off screen", at)))?;
        Ok(Color::from(*image.get_pixel(x, y)))
    }
}

/// System pointer driven through `enigo`
pub struct EnigoPointer {
    enigo: Enigo,
}

impl EnigoPointer {
    pub fn new() -> Result<Self> {
        let enigo =
            Enigo::new(&Settings::default()).map_err(|e| CookbotError::Input(e.to_string()))?;
        Ok(Self { enigo })
    }

    fn left(&mut self, direction: Direction) -> Result<()> {
        self.enigo
            .button(Button::Left, direction)
            .map_err(|e| CookbotError::Input(e.to_string()))
    }
}

impl PointerDevice for EnigoPointer {
    fn move_to(&mut self, at: Point) -> Result<()> {
        self.enigo
            .move_mouse(at.x, at.y, Coordinate::Abs)
            .map_err(|e| CookbotError::Input(e.to_string()))
    }

    fn press(&mut self) -> Result<()> {
        self.left(Direction::Press)
    }

    fn release(&mut self) -> Result<()> {
        self.left(Direction::Release)
    }

    fn click(&mut self) -> Result<()> {
        self.left(Direction::Click)
    }

    fn position(&self) -> Result<Point> {
        let (x, y) = self
            .enigo
            .location()
            .map_err(|e| CookbotError::Input(e.to_string()))?;
        Ok(Point::new(x, y))
    }
}

/// Keys that stop the bot
pub fn is_stop_key(key: Key) -> bool {
    matches!(key, Key::Escape | Key::Space)
}

/// Start the global input listener on its own thread.
///
/// A stop key signals `token` and closes the click channel. Left clicks are
/// forwarded to `clicks`, if given, at the last seen pointer position.
pub fn spawn_listener(token: StopToken, clicks: Option<Sender<Point>>) -> Result<()> {
    thread::Builder::new()
        .name("cookbot-input".into())
        .spawn(move || {
            let mut clicks = clicks;
            let mut last = Point::default();
            let result = listen(move |event: Event| match event.event_type {
                EventType::KeyPress(key) if is_stop_key(key) => {
                    if !token.is_stopped() {
                        log::info!("Stop key pressed");
                        token.stop();
                    }
                    clicks.take();
                }
                EventType::MouseMove { x, y } => {
                    last = Point::new(x as i32, y as i32);
                }
                EventType::ButtonPress(rdev::Button::Left) => {
                    if let Some(tx) = &clicks {
                        if tx.send(last).is_err() {
                            clicks.take();
                        }
                    }
                }
                _ => {}
            });
            if let Err(e) = result {
                log::error!("Input listener failed: {:?}", e);
            }
        })?;
    Ok(())
}
